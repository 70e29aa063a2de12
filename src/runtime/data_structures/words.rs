use crate::{
    lang::source_buffer::SourceLocation,
    runtime::{
        data_structures::value::Value,
        error::{self, ErrorKind, ScriptError},
        interpreter::Interpreter,
        remote::RemoteTransport,
    },
};
use std::{cell::RefCell, fmt, rc::Rc};

/// Definition of a native word handler function.  This is the function that is called when a
/// built-in word is executed.  Can be a lambda, a callable object, or a Rust function.
pub type WordHandler = dyn Fn(&mut dyn Interpreter) -> error::Result<()>;

/// A stable, shareable reference to a word.  Words are owned by the module that defined them and
/// referenced from definitions, imports, and the interpreter without copying.
pub type WordRef = Rc<Word>;

/// A user-defined word.  The body is a flat, ordered sequence of references to words that were
/// resolved while the definition was being compiled.
pub struct DefinitionWord {
    /// The word's name.
    name: String,

    /// Where in the source the definition started.
    location: Option<SourceLocation>,

    /// The words making up the body, executed in stored order.
    words: Vec<WordRef>,

    /// Optional error handler words.  When a body word fails the handlers are tried in
    /// registration order; the first that completes absorbs the error.
    error_handlers: Vec<WordRef>,
}

impl DefinitionWord {
    /// Start a new, empty definition.
    pub fn new(name: String, location: Option<SourceLocation>) -> DefinitionWord {
        DefinitionWord {
            name,
            location,
            words: Vec::new(),
            error_handlers: Vec::new(),
        }
    }

    /// The definition's name.
    pub fn name(&self) -> &String {
        &self.name
    }

    /// Append a word to the body.
    pub fn add_word(&mut self, word: WordRef) {
        self.words.push(word);
    }

    /// Attach an error handler word.  Handlers run in the order they were attached.
    pub fn add_error_handler(&mut self, handler: WordRef) {
        self.error_handlers.push(handler);
    }

    /// Execute the body words in order.  When a word fails and handlers are attached, the
    /// rendered error message is pushed for the handler to inspect; a handler that completes
    /// without error absorbs the failure and execution resumes at the next sibling word.
    fn execute(&self, interpreter: &mut dyn Interpreter) -> error::Result<()> {
        for word in &self.words {
            if let Err(error) = interpreter.execute_word(word) {
                self.handle_error(interpreter, error)?;
            }
        }

        Ok(())
    }

    /// Offer a failure to the attached handlers.  If every handler itself fails the original
    /// error escapes.
    fn handle_error(
        &self,
        interpreter: &mut dyn Interpreter,
        error: ScriptError,
    ) -> error::Result<()> {
        for handler in &self.error_handlers {
            interpreter.push(Value::String(error.to_string()));

            if interpreter.execute_word(handler).is_ok() {
                return Ok(());
            }
        }

        Err(error)
    }
}

/// The shared state behind a memoized definition and its refresh siblings.  The cache holds the
/// top-of-stack value the inner word last produced.
pub struct MemoState {
    /// The name of the memoized word.
    name: String,

    /// The wrapped definition.
    inner: WordRef,

    /// The cached value.  Empty until the first execution or refresh.
    cache: RefCell<Option<Value>>,
}

impl MemoState {
    /// Wrap a completed definition in fresh memo state.
    pub fn new(name: String, inner: WordRef) -> MemoState {
        MemoState {
            name,
            inner,
            cache: RefCell::new(None),
        }
    }

    /// The name of the memoized word.
    pub fn name(&self) -> &String {
        &self.name
    }

    /// Is there a cached value?
    pub fn is_cached(&self) -> bool {
        self.cache.borrow().is_some()
    }

    /// Unconditionally recompute the cache: execute the inner word and capture the value it left
    /// on top of the stack.  Pushes nothing itself.
    pub fn refresh(&self, interpreter: &mut dyn Interpreter) -> error::Result<()> {
        self.inner.execute(interpreter)?;

        let value = interpreter.pop()?;
        *self.cache.borrow_mut() = Some(value);

        Ok(())
    }

    /// Push a clone of the cached value, filling the cache first if it is empty.
    fn execute(&self, interpreter: &mut dyn Interpreter) -> error::Result<()> {
        if self.cache.borrow().is_none() {
            self.refresh(interpreter)?;
        }

        self.push_cached(interpreter);
        Ok(())
    }

    /// Push a clone of the cached value.  A no-op when the cache is empty, which the callers rule
    /// out by refreshing first.
    fn push_cached(&self, interpreter: &mut dyn Interpreter) {
        if let Some(value) = &*self.cache.borrow() {
            interpreter.push(value.clone());
        }
    }
}

/// A word is a named executable unit, the language's only form of abstraction.  The fixed set of
/// variants bounds the kinds and keeps dispatch to a single match.
pub enum Word {
    /// Pushes a clone of a carried value.  Literals, string tokens, dot symbols, and variable
    /// lookups all materialize as this variant.
    PushValue {
        name: String,
        value: Value,
        location: Option<SourceLocation>,
    },

    /// A native word backed by a Rust handler.
    Builtin {
        name: String,
        handler: Rc<WordHandler>,
        location: Option<SourceLocation>,
    },

    /// A user-defined word compiled from `:` ... `;`.
    Definition(DefinitionWord),

    /// A memoized word compiled from `@:` ... `;`.
    Memo(Rc<MemoState>),

    /// The `NAME!` companion of a memoized word.  Forces recomputation, pushes nothing.
    MemoRefresh(Rc<MemoState>),

    /// The `NAME!@` companion of a memoized word.  Forces recomputation and pushes the fresh
    /// value.
    MemoRefreshAndPush(Rc<MemoState>),

    /// An opaque word whose execution delegates to an external transport.
    Remote {
        name: String,
        transport: Rc<dyn RemoteTransport>,
    },
}

impl Word {
    /// Create a push-value word.
    pub fn new_push_value(name: String, value: Value, location: Option<SourceLocation>) -> Word {
        Word::PushValue {
            name,
            value,
            location,
        }
    }

    /// Create a native word from a handler.
    pub fn new_builtin(
        name: String,
        handler: Rc<WordHandler>,
        location: Option<SourceLocation>,
    ) -> Word {
        Word::Builtin {
            name,
            handler,
            location,
        }
    }

    /// Create a remote word bound to a transport.
    pub fn new_remote(name: String, transport: Rc<dyn RemoteTransport>) -> Word {
        Word::Remote { name, transport }
    }

    /// The word's name.
    pub fn name(&self) -> &String {
        match self {
            Word::PushValue { name, .. } => name,
            Word::Builtin { name, .. } => name,
            Word::Definition(definition) => &definition.name,
            Word::Memo(state) => &state.name,
            Word::MemoRefresh(state) => &state.name,
            Word::MemoRefreshAndPush(state) => &state.name,
            Word::Remote { name, .. } => name,
        }
    }

    /// Where the word came from, when known.
    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            Word::PushValue { location, .. } => location.as_ref(),
            Word::Builtin { location, .. } => location.as_ref(),
            Word::Definition(definition) => definition.location.as_ref(),
            _ => None,
        }
    }

    /// Execute the word against the interpreter.
    pub fn execute(&self, interpreter: &mut dyn Interpreter) -> error::Result<()> {
        match self {
            Word::PushValue { value, .. } => {
                interpreter.push(value.clone());
                Ok(())
            }

            Word::Builtin { handler, .. } => handler(interpreter),

            Word::Definition(definition) => definition.execute(interpreter),

            Word::Memo(state) => state.execute(interpreter),

            Word::MemoRefresh(state) => state.refresh(interpreter),

            Word::MemoRefreshAndPush(state) => {
                state.refresh(interpreter)?;
                state.push_cached(interpreter);
                Ok(())
            }

            Word::Remote { name, transport } => {
                Word::execute_remote(interpreter, name, transport.as_ref())
            }
        }
    }

    /// The remote word contract: snapshot the stack, hand it to the transport along with the
    /// word's name, and on success replace the local stack with the values the transport
    /// returned, in order.
    fn execute_remote(
        interpreter: &mut dyn Interpreter,
        name: &str,
        transport: &dyn RemoteTransport,
    ) -> error::Result<()> {
        let snapshot = interpreter.stack().clone();

        match transport.call(name, &snapshot) {
            Ok(values) => {
                interpreter.clear_stack();

                for value in values {
                    interpreter.push(value);
                }

                Ok(())
            }

            Err(message) => error::script_error(
                interpreter,
                ErrorKind::RemoteExecutionFailed(format!("{}: {}", name, message)),
            ),
        }
    }
}

impl fmt::Debug for Word {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<word {}>", self.name())
    }
}
