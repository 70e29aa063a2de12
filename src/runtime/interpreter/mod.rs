use crate::{
    lang::source_buffer::SourceLocation,
    runtime::{
        data_structures::{
            module::ModulePtr,
            value::Value,
            words::{Word, WordRef},
        },
        error,
    },
};
use std::collections::HashMap;

pub mod forthic_interpreter;

/// A literal handler inspects a source word that did not resolve as a defined name and yields a
/// value when it recognizes the text.  Handlers are offered the text in registration order and
/// the first match wins.
pub type LiteralHandler = fn(&str) -> Option<Value>;

/// Trait for managing the interpreter's data stack.  Intended to be called by native word
/// handlers and by embedding hosts.
pub trait InterpreterStack {
    /// Use to examine the full data stack when required, for example for the `.s` stack dump.
    fn stack(&self) -> &Vec<Value>;

    /// Push a value onto the stack.  This is the primary way of sending values to words.
    fn push(&mut self, value: Value);

    /// Pop a value from the stack, transferring ownership to the caller.  If the stack is empty a
    /// stack underflow error is returned.
    fn pop(&mut self) -> error::Result<Value>;

    /// Borrow the top value without consuming it.
    fn peek(&self) -> error::Result<&Value>;

    /// The number of values currently on the stack.
    fn stack_length(&self) -> usize {
        self.stack().len()
    }

    /// Drop every value on the stack.
    fn clear_stack(&mut self);

    /// Pop the top value and attempt to convert it to an integer.  If the value can not be
    /// converted an error is returned.  We also fail if the stack is empty.
    fn pop_as_int(&mut self) -> error::Result<i64>;

    /// Pop the top value and attempt to convert it to a floating point value.  If the value can
    /// not be converted an error is returned.  We also fail if the stack is empty.
    fn pop_as_float(&mut self) -> error::Result<f64>;

    /// Pop the top value and convert it to a boolean using the language's truthiness rules.  We
    /// fail if the stack is empty.
    fn pop_as_bool(&mut self) -> error::Result<bool>;

    /// Pop the top value and attempt to convert it to a string.  If the value can not be
    /// converted an error is returned.  We also fail if the stack is empty.
    fn pop_as_string(&mut self) -> error::Result<String>;

    /// Pop the top value and attempt to convert it to an array of values.  If the value is not an
    /// array an error is returned.  We also fail if the stack is empty.
    fn pop_as_array(&mut self) -> error::Result<Vec<Value>>;

    /// Pop the top value and attempt to convert it to a record.  If the value is not a record an
    /// error is returned.  We also fail if the stack is empty.
    fn pop_as_record(&mut self) -> error::Result<HashMap<String, Value>>;
}

/// Trait for managing and executing words known to the interpreter.
pub trait WordManagement {
    /// If currently set, this represents the current executing location in the original Forthic
    /// source code.
    fn current_location(&self) -> &Option<SourceLocation>;

    /// Record the location execution has reached.  Words with a known source location update this
    /// as they execute so errors can point at the right place.
    fn set_current_location(&mut self, location: Option<SourceLocation>);

    /// Find a word by name.  The search runs top-to-bottom of the module stack, checking each
    /// module's dictionary newest-first and then its variables, and finally checks the global
    /// module.  A matching variable materializes as a transient push-value word carrying its
    /// current value.  The lookup never mutates a module.
    fn find_word(&self, name: &str) -> Option<WordRef>;

    /// Add a word to the current module, the module on top of the module stack.
    fn add_word(&mut self, name: String, word: Word);

    /// Add a word to the global module that hosts the standard word sets.
    fn add_global_word(&mut self, name: String, word: Word);

    /// Execute a word, updating the current location when the word carries one.
    fn execute_word(&mut self, word: &WordRef) -> error::Result<()>;

    /// Find and execute a word by name.  If the word is not found an unknown word error is
    /// returned.
    fn execute_word_named(&mut self, name: &str) -> error::Result<()>;
}

/// Trait for managing the module stack and the modules it holds.
pub trait ModuleManagement {
    /// The module user code executes in by default.  Its name is the empty string.
    fn app_module(&self) -> ModulePtr;

    /// The module hosting the standard word sets.  Searched after the module stack.
    fn global_module(&self) -> ModulePtr;

    /// The module on top of the module stack.  New definitions land here.
    fn current_module(&self) -> ModulePtr;

    /// Push a module onto the module stack, making it the current definition target.
    fn module_stack_push(&mut self, module: ModulePtr);

    /// Pop the module stack.  The app module at the bottom can not be popped.
    fn module_stack_pop(&mut self) -> error::Result<()>;

    /// Register a module as a sub-module of the app module so scripts can import it.
    fn register_module(&mut self, module: ModulePtr);

    /// Find a module by name among the current module's sub-modules, falling back to the app
    /// module's.  Returns an unknown module error when nothing matches.
    fn find_registered_module(&self, name: &str) -> error::Result<ModulePtr>;

    /// Assign a variable in the current module, creating it on first assignment.
    fn set_variable(&mut self, name: &str, value: Value) -> error::Result<()>;

    /// Read a variable, searching the module stack innermost to outermost.
    fn get_variable(&self, name: &str) -> Option<Value>;

    /// Declare a variable with a null value in the current module.
    fn declare_variable(&mut self, name: &str) -> error::Result<()>;
}

/// Core interpreter trait.
///
/// This trait defines and brings together the traits that define the core functionality of the
/// Forthic interpreter: the data stack, word lookup and execution, and the module system, plus
/// running source text and literal recognition.
pub trait Interpreter: InterpreterStack + WordManagement + ModuleManagement {
    /// Execute a source fragment.  On error the stack retains whatever state was reached.
    fn run(&mut self, source: &str) -> error::Result<()>;

    /// Execute a source fragment under a meaningful name, for example "\<repl\>", used in error
    /// locations.
    fn run_with_name(&mut self, source_name: &str, source: &str) -> error::Result<()>;

    /// Append a literal handler to the recognition chain.
    fn add_literal_handler(&mut self, handler: LiteralHandler);

    /// Clear the stack and abandon any in-progress compilation, returning the interpreter to a
    /// runnable state.  Modules and their words are left alone.
    fn reset(&mut self);
}

/// Simplify registering a native word with the interpreter.  The word lands in the global module.
///
/// Required parameters are the interpreter instance to register with, the name of the word to
/// register, and the word function handler to execute for the word.  The Rust-side registration
/// site is recorded as the word's location.
#[macro_export]
macro_rules! add_native_word {
    ($interpreter:expr , $name:expr , $function:expr) => {{
        use std::rc::Rc;
        use $crate::runtime::data_structures::words::Word;

        $interpreter.add_global_word(
            $name.to_string(),
            Word::new_builtin(
                $name.to_string(),
                Rc::new($function),
                Some($crate::location_here!()),
            ),
        );
    }};
}
