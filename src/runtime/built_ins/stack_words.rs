use crate::{
    add_native_word,
    runtime::{
        data_structures::value::Value,
        error::{self, script_error, ErrorKind},
        interpreter::Interpreter,
    },
};

/// Drop the top value on the data stack.
///
/// Signature: `value -- `
fn word_pop(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let _ = interpreter.pop()?;

    Ok(())
}

/// Duplicate the top value on the data stack.  The copy is a deep clone, so mutating one copy can
/// never be observed through the other.
///
/// Signature: `value -- value value`
fn word_dup(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let value = interpreter.pop()?;

    interpreter.push(value.clone());
    interpreter.push(value);

    Ok(())
}

/// Swap the top 2 values on the data stack.
///
/// Signature: `a b -- b a`
fn word_swap(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let b = interpreter.pop()?;
    let a = interpreter.pop()?;

    interpreter.push(b);
    interpreter.push(a);

    Ok(())
}

/// Make a copy of the second value and place the copy over the first item.
///
/// Signature: `a b -- a b a`
fn word_over(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let b = interpreter.pop()?;
    let a = interpreter.pop()?;

    interpreter.push(a.clone());
    interpreter.push(b);
    interpreter.push(a);

    Ok(())
}

/// Rotate the top 3 values on the stack.
///
/// Signature: `a b c -- b c a`
fn word_rot(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let c = interpreter.pop()?;
    let b = interpreter.pop()?;
    let a = interpreter.pop()?;

    interpreter.push(b);
    interpreter.push(c);
    interpreter.push(a);

    Ok(())
}

/// Get the depth of the data stack before calling this word.
///
/// Signature: ` -- depth`
fn word_depth(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    interpreter.push(Value::Int(interpreter.stack_length() as i64));
    Ok(())
}

/// Push a null value.
///
/// Signature: ` -- null`
fn word_null(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    interpreter.push(Value::Null);
    Ok(())
}

/// Leave the stack exactly as it is.
///
/// Signature: ` -- `
fn word_identity(_interpreter: &mut dyn Interpreter) -> error::Result<()> {
    Ok(())
}

/// Does a value trigger the DEFAULT replacement?  Null and the empty string do.
fn triggers_default(value: &Value) -> bool {
    value.is_null() || matches!(value, Value::String(text) if text.is_empty())
}

/// Replace a null or empty string value with a default.
///
/// Signature: `value default -- value-or-default`
fn word_default(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let default = interpreter.pop()?;
    let value = interpreter.pop()?;

    if triggers_default(&value) {
        interpreter.push(default);
    } else {
        interpreter.push(value);
    }

    Ok(())
}

/// Replace a null or empty string value by running a snippet of Forthic code, otherwise keep the
/// value.  The snippet is only executed when the replacement actually happens.
///
/// Signature: `value code -- value-or-result`
fn word_star_default(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let code = interpreter.pop_as_string()?;
    let value = interpreter.pop()?;

    if triggers_default(&value) {
        interpreter.run(&code)?;
    } else {
        interpreter.push(value);
    }

    Ok(())
}

/// Pop a string and run it as Forthic source against the current interpreter.
///
/// Signature: `source -- <effects of source>`
fn word_interpret(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let source = interpreter.pop_as_string()?;

    interpreter.run_with_name("<interpret>", &source)
}

/// Print the data stack, top first, then stop execution.  The intentional stop is treated by
/// hosts as a clean halt, which makes this the quick way to inspect a script mid-flight.
///
/// Signature: `... -- ...`
fn word_stack_dump(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    println!("Stack depth: {}", interpreter.stack_length());

    for (index, value) in interpreter.stack().iter().rev().enumerate() {
        if value.is_string() {
            println!("  {}: {}", index, Value::stringify(&value.get_string_val()));
        } else {
            println!("  {}: {}", index, value);
        }
    }

    script_error(interpreter, ErrorKind::IntentionalStop)
}

/// Register the stack manipulation words.
pub fn register_stack_words(interpreter: &mut dyn Interpreter) {
    add_native_word!(interpreter, "POP", word_pop);
    add_native_word!(interpreter, "DUP", word_dup);
    add_native_word!(interpreter, "SWAP", word_swap);
    add_native_word!(interpreter, "OVER", word_over);
    add_native_word!(interpreter, "ROT", word_rot);
    add_native_word!(interpreter, "DEPTH", word_depth);

    add_native_word!(interpreter, "NULL", word_null);
    add_native_word!(interpreter, "IDENTITY", word_identity);
    add_native_word!(interpreter, "NOP", word_identity);

    add_native_word!(interpreter, "DEFAULT", word_default);
    add_native_word!(interpreter, "*DEFAULT", word_star_default);

    add_native_word!(interpreter, "INTERPRET", word_interpret);
    add_native_word!(interpreter, "SHOW-STACK", word_stack_dump);
}
