use crate::{
    add_native_word,
    runtime::{
        data_structures::value::Value,
        error::{self, script_error_str},
        interpreter::Interpreter,
    },
};

/// Assign a variable in the current module, creating it on first assignment.  Names beginning
/// with two underscores are reserved and refused.
///
/// Signature: `value name -- `
fn word_store(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let name = interpreter.pop_as_string()?;
    let value = interpreter.pop()?;

    interpreter.set_variable(&name, value)
}

/// Read a variable, searching the module stack innermost to outermost.  An unknown variable
/// reads as null.
///
/// Signature: `name -- value`
fn word_fetch(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let name = interpreter.pop_as_string()?;
    let value = interpreter.get_variable(&name).unwrap_or(Value::Null);

    interpreter.push(value);
    Ok(())
}

/// Assign a variable and leave the value on the stack.
///
/// Signature: `value name -- value`
fn word_store_fetch(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let name = interpreter.pop_as_string()?;
    let value = interpreter.pop()?;

    interpreter.set_variable(&name, value.clone())?;
    interpreter.push(value);

    Ok(())
}

/// Declare a list of variables in the current module, each with a null value.  Variables that
/// already exist keep their values.
///
/// Signature: `[name ...] -- `
fn word_variables(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let names = interpreter.pop_as_array()?;

    for name in names {
        if !name.is_string() {
            return script_error_str(interpreter, "Variable names must be strings.");
        }

        interpreter.declare_variable(&name.get_string_val())?;
    }

    Ok(())
}

/// Register the variable access words.
pub fn register_variable_words(interpreter: &mut dyn Interpreter) {
    add_native_word!(interpreter, "!", word_store);
    add_native_word!(interpreter, "@", word_fetch);
    add_native_word!(interpreter, "!@", word_store_fetch);
    add_native_word!(interpreter, "VARIABLES", word_variables);
}
