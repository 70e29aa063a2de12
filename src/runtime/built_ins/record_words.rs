use crate::{
    add_native_word,
    runtime::{
        data_structures::value::Value,
        error,
        interpreter::Interpreter,
    },
};
use std::collections::HashMap;

/// Push an empty record.
///
/// Signature: ` -- record`
fn word_rec(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    interpreter.push(Value::Record(HashMap::new()));
    Ok(())
}

/// Set a field in a record.  Dot symbols supply the field-name strings, so this reads naturally
/// as `REC 42 .answer REC!`.
///
/// Signature: `record value field -- record`
fn word_rec_store(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let field = interpreter.pop_as_string()?;
    let value = interpreter.pop()?;
    let mut entries = interpreter.pop_as_record()?;

    entries.insert(field, value);
    interpreter.push(Value::Record(entries));

    Ok(())
}

/// Read a field from a record.  A missing field reads as null.
///
/// Signature: `record field -- value`
fn word_rec_fetch(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let field = interpreter.pop_as_string()?;
    let entries = interpreter.pop_as_record()?;

    let value = entries.get(&field).cloned().unwrap_or(Value::Null);

    interpreter.push(value);
    Ok(())
}

/// Register the record words.
pub fn register_record_words(interpreter: &mut dyn Interpreter) {
    add_native_word!(interpreter, "REC", word_rec);
    add_native_word!(interpreter, "REC!", word_rec_store);
    add_native_word!(interpreter, "REC@", word_rec_fetch);
}
