use crate::{
    add_native_word,
    runtime::{
        data_structures::value::Value,
        error::{self, script_error_str},
        interpreter::Interpreter,
    },
};

/// Concatenate strings.  When the top of the stack is an array, its items' string forms are
/// joined in order.  Otherwise the top two values are concatenated.
///
/// Signature: `a b -- ab` or `[items] -- joined`
fn word_concat(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let top = interpreter.pop()?;

    if let Value::Array(items) = top {
        let mut result = String::new();

        for item in items {
            result.push_str(&item.get_string_val());
        }

        interpreter.push(Value::String(result));
        return Ok(());
    }

    let a = interpreter.pop()?;
    interpreter.push(Value::String(format!(
        "{}{}",
        a.get_string_val(),
        top.get_string_val()
    )));

    Ok(())
}

/// Convert a value to its string form.
///
/// Signature: `value -- string`
fn word_to_str(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let value = interpreter.pop()?;

    interpreter.push(Value::String(value.get_string_val()));
    Ok(())
}

/// Convert a value to an integer.  Strings are parsed, floats are truncated, and null stays
/// null.
///
/// Signature: `value -- int`
fn word_to_int(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let value = interpreter.pop()?;

    let converted = match &value {
        Value::Null => Value::Null,
        Value::Int(_) | Value::Float(_) | Value::Bool(_) => Value::Int(value.get_int_val()),

        Value::String(text) => {
            let trimmed = text.trim();

            if let Ok(parsed) = trimmed.parse::<i64>() {
                Value::Int(parsed)
            } else if let Ok(parsed) = trimmed.parse::<f64>() {
                Value::Int(parsed as i64)
            } else {
                return script_error_str(interpreter, "Value could not be converted to int.");
            }
        }

        _ => return script_error_str(interpreter, "Value could not be converted to int."),
    };

    interpreter.push(converted);
    Ok(())
}

/// Convert a value to a float.  Strings are parsed and null stays null.
///
/// Signature: `value -- float`
fn word_to_float(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let value = interpreter.pop()?;

    let converted = match &value {
        Value::Null => Value::Null,
        Value::Int(_) | Value::Float(_) | Value::Bool(_) => Value::Float(value.get_float_val()),

        Value::String(text) => match text.trim().parse::<f64>() {
            Ok(parsed) => Value::Float(parsed),
            Err(_) => {
                return script_error_str(interpreter, "Value could not be converted to float.");
            }
        },

        _ => return script_error_str(interpreter, "Value could not be converted to float."),
    };

    interpreter.push(converted);
    Ok(())
}

/// Is a character usable in an interpolated variable name?
fn is_name_char(character: char) -> bool {
    character.is_alphanumeric() || character == '_'
}

/// Substitute `.name` occurrences in a string with the current string form of variable `name`.
/// A `.name` is only recognized at the start of the string or after whitespace, and `\.` escapes
/// to a literal dot.  Unset or null variables render as the empty string.
///
/// Signature: `string -- interpolated`
fn word_interpolate(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let text = interpreter.pop_as_string()?;
    let chars: Vec<char> = text.chars().collect();

    let mut result = String::new();
    let mut index = 0;
    let mut at_boundary = true;

    while index < chars.len() {
        let character = chars[index];

        if character == '\\' && chars.get(index + 1) == Some(&'.') {
            result.push('.');
            index += 2;
            at_boundary = false;
            continue;
        }

        if character == '.'
            && at_boundary
            && chars.get(index + 1).is_some_and(|next| is_name_char(*next))
        {
            let mut name = String::new();
            let mut scan = index + 1;

            while scan < chars.len() && is_name_char(chars[scan]) {
                name.push(chars[scan]);
                scan += 1;
            }

            let value = interpreter.get_variable(&name).unwrap_or(Value::Null);
            result.push_str(&value.get_string_val());

            index = scan;
            at_boundary = false;
            continue;
        }

        result.push(character);
        at_boundary = character.is_ascii_whitespace();
        index += 1;
    }

    interpreter.push(Value::String(result));
    Ok(())
}

/// Register the string words.
pub fn register_string_words(interpreter: &mut dyn Interpreter) {
    add_native_word!(interpreter, "CONCAT", word_concat);
    add_native_word!(interpreter, ">STR", word_to_str);
    add_native_word!(interpreter, ">INT", word_to_int);
    add_native_word!(interpreter, ">FLOAT", word_to_float);
    add_native_word!(interpreter, "INTERPOLATE", word_interpolate);
}
