use crate::{
    add_native_word,
    runtime::{
        data_structures::value::Value,
        error::{self, script_error, script_error_str, ErrorKind},
        interpreter::Interpreter,
    },
};
use std::rc::Rc;

/// Mark a list of word names as exportable from the current module.  Only exported words
/// propagate through imports.
///
/// Signature: `[name ...] -- `
fn word_export(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let names = interpreter.pop_as_array()?;
    let mut exported = Vec::with_capacity(names.len());

    for name in names {
        if !name.is_string() {
            return script_error_str(interpreter, "Exported names must be strings.");
        }

        exported.push(name.get_string_val());
    }

    interpreter.current_module().borrow_mut().add_exportable(exported);
    Ok(())
}

/// Import registered modules into the current module.
///
/// Each item of the popped array is either a module name, imported under its own name as the
/// prefix, or a `[name prefix]` pair.  An empty prefix splices the exported words in under their
/// bare names.
///
/// Signature: `[spec ...] -- `
fn word_use_modules(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let specs = interpreter.pop_as_array()?;

    for spec in specs {
        let (name, prefix) = match &spec {
            Value::String(name) => (name.clone(), name.clone()),

            Value::Array(pair) if pair.len() == 2 && pair[0].is_string() && pair[1].is_string() => {
                (pair[0].get_string_val(), pair[1].get_string_val())
            }

            _ => {
                return script_error_str(
                    interpreter,
                    "Module specs must be a name or a [name prefix] pair.",
                );
            }
        };

        let module = interpreter.find_registered_module(&name)?;
        let target = interpreter.current_module();

        if Rc::ptr_eq(&module, &target) {
            return script_error(
                interpreter,
                ErrorKind::ModuleError(format!("module {} can not import itself", name)),
            );
        }

        target.borrow_mut().import_from(&module, &prefix);
    }

    Ok(())
}

/// Register the module words.
pub fn register_module_words(interpreter: &mut dyn Interpreter) {
    add_native_word!(interpreter, "EXPORT", word_export);
    add_native_word!(interpreter, "USE-MODULES", word_use_modules);
}
