use crate::{
    add_native_word,
    runtime::{
        data_structures::value::Value,
        error::{self, script_error_str},
        interpreter::Interpreter,
    },
};

/// Is the top of the stack an array?
///
/// Signature: `value -- bool`
fn word_is_array(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let value = interpreter.pop()?;

    interpreter.push(Value::Bool(value.is_array()));
    Ok(())
}

/// The length of a string in bytes, of an array in elements, or of a record in entries.
///
/// Signature: `value -- length`
fn word_length(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let value = interpreter.pop()?;

    let length = match &value {
        Value::String(text) => text.len(),
        Value::Array(items) => items.len(),
        Value::Record(entries) => entries.len(),
        _ => return script_error_str(interpreter, "Value has no length."),
    };

    interpreter.push(Value::Int(length as i64));
    Ok(())
}

/// Append a value to an array.
///
/// Signature: `array value -- array`
fn word_append(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let value = interpreter.pop()?;
    let mut items = interpreter.pop_as_array()?;

    items.push(value);
    interpreter.push(Value::Array(items));

    Ok(())
}

/// Reverse an array in place.
///
/// Signature: `array -- reversed`
fn word_reverse(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let mut items = interpreter.pop_as_array()?;

    items.reverse();
    interpreter.push(Value::Array(items));

    Ok(())
}

/// Register the array words.
pub fn register_array_words(interpreter: &mut dyn Interpreter) {
    add_native_word!(interpreter, "ARRAY?", word_is_array);
    add_native_word!(interpreter, "LENGTH", word_length);
    add_native_word!(interpreter, "APPEND", word_append);
    add_native_word!(interpreter, "REVERSE", word_reverse);
}
