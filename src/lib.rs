//! Core runtime for the Forthic stack-based, concatenative language.
//!
//! A Forthic program is a sequence of whitespace-separated tokens that manipulate a shared value
//! stack.  This crate implements the language core: the tokenizer, the compile/execute
//! interpreter, the module system with memoized definitions, and the value model they all share.
//!
//! The embedding API is small:
//!
//! ```
//! use forthic::runtime::{
//!     built_ins::register_base_words,
//!     interpreter::{forthic_interpreter::ForthicInterpreter, Interpreter, InterpreterStack},
//! };
//!
//! let mut interpreter = ForthicInterpreter::new();
//! register_base_words(&mut interpreter);
//!
//! interpreter.run("1 2 +").unwrap();
//! assert_eq!(interpreter.pop().unwrap().get_int_val(), 3);
//! ```

/// Module for managing the source code and turning it into tokens.
pub mod lang;

/// Module for the runtime and the data structures used by the interpreter.  As well as the
/// interpreter itself.
pub mod runtime;
