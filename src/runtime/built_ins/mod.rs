use crate::runtime::interpreter::Interpreter;

/// Stack manipulation words plus the small glue words like DEFAULT and INTERPRET.
pub mod stack_words;

/// Variable access words.
pub mod variable_words;

/// Module export and import words.
pub mod module_words;

/// Arithmetic, comparison, and logic words.
pub mod math_words;

/// String manipulation words, INTERPOLATE included.
pub mod string_words;

/// Array words.
pub mod array_words;

/// Record words.
pub mod record_words;

/// Register the full standard word set with an interpreter.  Hosts call this once after creating
/// the interpreter and before the first run.
pub fn register_base_words(interpreter: &mut dyn Interpreter) {
    stack_words::register_stack_words(interpreter);
    variable_words::register_variable_words(interpreter);
    module_words::register_module_words(interpreter);
    math_words::register_math_words(interpreter);
    string_words::register_string_words(interpreter);
    array_words::register_array_words(interpreter);
    record_words::register_record_words(interpreter);
}
