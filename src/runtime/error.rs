use crate::{lang::source_buffer::SourceLocation, runtime::interpreter::Interpreter};
use std::{
    error::Error,
    fmt::{self, Debug, Display, Formatter},
    process::{ExitCode, Termination},
};

pub type Result<T> = std::result::Result<T, ScriptError>;

/// The kinds of error that can occur while tokenizing or executing a Forthic script.  These are a
/// stable API surface, hosts match on them to decide how to react.
#[derive(Clone, PartialEq, Debug, thiserror::Error)]
pub enum ErrorKind {
    /// A word could not be resolved in any module and no literal handler claimed it.
    #[error("Unknown word {0}.")]
    UnknownWord(String),

    /// A module was referenced by a name that is not registered.
    #[error("Unknown module {0}.")]
    UnknownModule(String),

    /// A value was popped from an empty data stack.
    #[error("Stack underflow.")]
    StackUnderflow,

    /// A module operation failed, including popping an empty module stack.
    #[error("Module error: {0}")]
    ModuleError(String),

    /// The source ended while a definition was still being compiled.
    #[error("Missing ; to terminate the definition.")]
    MissingTerminator,

    /// A ; was found outside of any definition.
    #[error("Extra ; found outside of a definition.")]
    ExtraTerminator,

    /// A : or @: was found while a definition was already being compiled.
    #[error("Definitions can not be nested.")]
    NestedDefinition,

    /// The name following a : or @: was not a usable identifier.
    #[error("Invalid definition name {0}.")]
    InvalidWordName(String),

    /// A variable name starting with __ is reserved.
    #[error("Invalid variable name {0}.")]
    InvalidVariableName(String),

    /// Raised by debug words.  Hosts treat this as a clean halt.
    #[error("Intentional stop.")]
    IntentionalStop,

    /// A string literal was still open at the end of the source.
    #[error("Unterminated string literal.")]
    UnterminatedString,

    /// A remote word's transport reported a failure.
    #[error("Remote execution failed: {0}.")]
    RemoteExecutionFailed(String),

    /// A value was not of the type an operation required.
    #[error("{0}")]
    TypeMismatch(String),

    /// An underlying I/O operation failed.
    #[error("I/O error: {0}")]
    Io(String),
}

/// Any error that occurs during the tokenization or execution of a Forthic script.
#[derive(Clone)]
pub struct ScriptError {
    /// The location in the source code the error occurred, if available.
    location: Option<SourceLocation>,

    /// What went wrong.
    kind: ErrorKind,

    /// The error that triggered this one, if any.
    cause: Option<Box<ScriptError>>,
}

impl Error for ScriptError {}

/// When returned from main, convert the error result to an operating system exit code.
impl Termination for ScriptError {
    /// Because this type represents an error, the exit code is always FAILURE.
    fn report(self) -> ExitCode {
        eprintln!("Error: {}", self);
        ExitCode::FAILURE
    }
}

/// Pretty print the ScriptError for reporting the error that occurred within the Forthic script.
impl Display for ScriptError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{}: {}", location, self.kind)?,
            None => write!(f, "{}", self.kind)?,
        }

        if let Some(cause) = &self.cause {
            write!(f, "\n  caused by: {}", cause)?;
        }

        Ok(())
    }
}

impl Debug for ScriptError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl ScriptError {
    /// Create a new ScriptError.
    pub fn new(location: Option<SourceLocation>, kind: ErrorKind) -> ScriptError {
        ScriptError {
            location,
            kind,
            cause: None,
        }
    }

    /// Create a new ScriptError and wrap it in a Result::Err.
    pub fn new_as_result<T>(location: Option<SourceLocation>, kind: ErrorKind) -> Result<T> {
        Err(ScriptError::new(location, kind))
    }

    /// Attach the error that triggered this one.
    pub fn with_cause(mut self, cause: ScriptError) -> ScriptError {
        self.cause = Some(Box::new(cause));
        self
    }

    /// If available, the location in the source code the error occurred.
    pub fn location(&self) -> &Option<SourceLocation> {
        &self.location
    }

    /// What went wrong.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// If available, the error that triggered this one.
    pub fn cause(&self) -> Option<&ScriptError> {
        self.cause.as_deref()
    }
}

/// Allow for the conversion of a std::io::Error into a ScriptError.
impl From<std::io::Error> for ScriptError {
    fn from(error: std::io::Error) -> ScriptError {
        ScriptError::new(None, ErrorKind::Io(error.to_string()))
    }
}

/// A convenience function for creating a ScriptError and wrapping it in a Result::Err using the
/// interpreter's current execution location.
pub fn script_error<T>(interpreter: &dyn Interpreter, kind: ErrorKind) -> Result<T> {
    let location = interpreter.current_location().clone();

    ScriptError::new_as_result(location, kind)
}

/// As script_error, but for the common case of a free form type mismatch message.
pub fn script_error_str<T>(interpreter: &dyn Interpreter, message: &str) -> Result<T> {
    script_error(interpreter, ErrorKind::TypeMismatch(message.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_location() {
        let location = SourceLocation::new_from_info("<repl>", 3, 7, 12);
        let error = ScriptError::new(Some(location), ErrorKind::StackUnderflow);

        assert_eq!(error.to_string(), "<repl> (3, 7): Stack underflow.");
    }

    #[test]
    fn test_display_includes_cause() {
        let inner = ScriptError::new(None, ErrorKind::UnknownWord("FOO".to_string()));
        let outer =
            ScriptError::new(None, ErrorKind::ModuleError("import failed".to_string()))
                .with_cause(inner);

        let rendered = outer.to_string();

        assert!(rendered.contains("Module error: import failed"));
        assert!(rendered.contains("caused by: Unknown word FOO."));
    }
}
