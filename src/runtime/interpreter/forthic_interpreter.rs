use crate::{
    lang::{
        source_buffer::SourceLocation,
        tokenizing::{Token, TokenKind, Tokenizer},
    },
    runtime::{
        data_structures::{
            module::{Module, ModulePtr},
            value::{DateTime, Value},
            words::{DefinitionWord, MemoState, Word, WordRef},
        },
        error::{self, ErrorKind, ScriptError},
        interpreter::{
            Interpreter, InterpreterStack, LiteralHandler, ModuleManagement, WordManagement,
        },
    },
};
use std::{collections::HashMap, rc::Rc};
use tracing::{debug, trace};

/// The core interpreter implementation for the Forthic language.
///
/// The interpreter owns the data stack, the app module, a stack of active modules whose top is
/// the current definition target, a stack of active tokenizers for nested source, and the
/// compile/execute state.  It consumes tokens one at a time and either executes the resulting
/// word immediately or appends it into the definition currently being compiled.
pub struct ForthicInterpreter {
    /// The data stack used by the interpreter.
    stack: Vec<Value>,

    /// The anonymous module user code executes in by default.
    app_module: ModulePtr,

    /// The module hosting the standard word sets, searched after the module stack.
    global_module: ModulePtr,

    /// The stack of active modules.  The bottom is always the app module; the top is the current
    /// definition target.
    module_stack: Vec<ModulePtr>,

    /// The stack of active tokenizers.  Nested source, for example from INTERPRET, opens a
    /// sub-stream on top of the enclosing one.
    tokenizers: Vec<Tokenizer>,

    /// The literal recognition chain, tried in order for unresolved words.
    literal_handlers: Vec<LiteralHandler>,

    /// Set between a `:`/`@:` token and the matching `;`.
    is_compiling: bool,

    /// Whether the definition being compiled was opened with `@:`.
    is_memo: bool,

    /// The definition being compiled, owned by the interpreter until the terminator completes it
    /// and it moves into the current module.
    current_definition: Option<DefinitionWord>,

    /// The last known location execution has reached in the original source code.
    current_location: Option<SourceLocation>,

    /// The word executed or compiled for the `[` token.
    start_array_word: WordRef,

    /// The word executed or compiled for the `]` token.
    end_array_word: WordRef,
}

impl ForthicInterpreter {
    /// Create a new interpreter with the standard literal handlers pre-registered and the app
    /// module installed.  Standard word sets are installed separately, see
    /// `built_ins::register_base_words`.
    pub fn new() -> ForthicInterpreter {
        let app_module = Module::new_ptr("");

        ForthicInterpreter {
            stack: Vec::with_capacity(20),

            app_module: app_module.clone(),
            global_module: Module::new_ptr("<global>"),
            module_stack: vec![app_module],

            tokenizers: Vec::new(),

            literal_handlers: vec![
                literal_bool,
                literal_float,
                literal_int,
                literal_date,
                literal_datetime,
            ],

            is_compiling: false,
            is_memo: false,
            current_definition: None,

            current_location: None,

            start_array_word: Rc::new(Word::new_builtin(
                "[".to_string(),
                Rc::new(word_start_array),
                None,
            )),
            end_array_word: Rc::new(Word::new_builtin(
                "]".to_string(),
                Rc::new(word_end_array),
                None,
            )),
        }
    }

    /// Pull tokens from the innermost tokenizer until its end of source.
    fn process_tokens(&mut self) -> error::Result<()> {
        loop {
            let next = match self.tokenizers.last_mut() {
                Some(tokenizer) => tokenizer.next_token()?,
                None => panic!("No active tokenizer."),
            };

            let token = match next {
                Some(token) => token,
                None => return Ok(()),
            };

            if token.kind() == TokenKind::Eos {
                if self.is_compiling {
                    return ScriptError::new_as_result(
                        Some(token.location().clone()),
                        ErrorKind::MissingTerminator,
                    );
                }

                return Ok(());
            }

            self.handle_token(token)?;
        }
    }

    /// Dispatch a single token through the compile/execute state machine.
    fn handle_token(&mut self, token: Token) -> error::Result<()> {
        match token.kind() {
            TokenKind::Comment | TokenKind::Eos => Ok(()),

            // Strings and dot symbols both push their literal text.
            TokenKind::String | TokenKind::DotSymbol => {
                self.handle_literal_value(Value::String(token.text().clone()), &token)
            }

            TokenKind::StartArray => self.handle_delimiter_word(self.start_array_word.clone()),
            TokenKind::EndArray => self.handle_delimiter_word(self.end_array_word.clone()),

            TokenKind::StartModule => self.handle_start_module(&token),
            TokenKind::EndModule => self.handle_end_module(&token),

            TokenKind::StartDef => self.handle_start_definition(&token, false),
            TokenKind::StartMemo => self.handle_start_definition(&token, true),
            TokenKind::EndDef => self.handle_end_definition(&token),

            TokenKind::Word => self.handle_word(&token),
        }
    }

    /// Push a literal value, or compile a word that will.
    fn handle_literal_value(&mut self, value: Value, token: &Token) -> error::Result<()> {
        if self.is_compiling {
            let word = Rc::new(Word::new_push_value(
                token.text().clone(),
                value,
                Some(token.location().clone()),
            ));

            if let Some(definition) = &mut self.current_definition {
                definition.add_word(word);
            }

            return Ok(());
        }

        self.push(value);
        Ok(())
    }

    /// Execute one of the array delimiter words, or compile it into the current definition.
    fn handle_delimiter_word(&mut self, word: WordRef) -> error::Result<()> {
        if self.is_compiling {
            if let Some(definition) = &mut self.current_definition {
                definition.add_word(word);
            }

            return Ok(());
        }

        self.execute_word(&word)
    }

    /// Enter a module.  An empty name re-enters the app module; otherwise the named sub-module of
    /// the current module is looked up or created and pushed.
    fn handle_start_module(&mut self, token: &Token) -> error::Result<()> {
        if self.is_compiling {
            return ScriptError::new_as_result(
                Some(token.location().clone()),
                ErrorKind::ModuleError(
                    "module boundaries are not allowed inside a definition".to_string(),
                ),
            );
        }

        let name = token.text();

        let module = if name.is_empty() {
            self.app_module()
        } else {
            let current = self.current_module();
            let module = current.borrow_mut().find_or_create_module(name);
            module
        };

        self.module_stack.push(module);
        Ok(())
    }

    /// Leave the current module.  The app module at the bottom of the stack can not be popped.
    fn handle_end_module(&mut self, token: &Token) -> error::Result<()> {
        if self.is_compiling {
            return ScriptError::new_as_result(
                Some(token.location().clone()),
                ErrorKind::ModuleError(
                    "module boundaries are not allowed inside a definition".to_string(),
                ),
            );
        }

        self.module_stack_pop().map_err(|underflow| {
            ScriptError::new(Some(token.location().clone()), underflow.kind().clone())
        })
    }

    /// Begin compiling a fresh definition.
    fn handle_start_definition(&mut self, token: &Token, memo: bool) -> error::Result<()> {
        if self.is_compiling {
            return ScriptError::new_as_result(
                Some(token.location().clone()),
                ErrorKind::NestedDefinition,
            );
        }

        self.current_definition = Some(DefinitionWord::new(
            token.text().clone(),
            Some(token.location().clone()),
        ));
        self.is_compiling = true;
        self.is_memo = memo;

        Ok(())
    }

    /// Finalize the definition being compiled and install it in the current module.  A memoized
    /// definition installs three words: the memo itself, `name!`, and `name!@`.
    fn handle_end_definition(&mut self, token: &Token) -> error::Result<()> {
        let definition = match self.current_definition.take() {
            Some(definition) if self.is_compiling => definition,
            _ => {
                return ScriptError::new_as_result(
                    Some(token.location().clone()),
                    ErrorKind::ExtraTerminator,
                );
            }
        };

        self.is_compiling = false;

        let name = definition.name().clone();
        let word = Rc::new(Word::Definition(definition));

        if self.is_memo {
            self.is_memo = false;

            let state = Rc::new(MemoState::new(name, word));
            self.current_module().borrow_mut().install_memo(state);
        } else {
            self.current_module().borrow_mut().add_word(name, word);
        }

        Ok(())
    }

    /// Resolve a word token and either execute it or append it into the current definition.
    fn handle_word(&mut self, token: &Token) -> error::Result<()> {
        let word = self.resolve_word(token)?;

        if self.is_compiling {
            if let Some(definition) = &mut self.current_definition {
                definition.add_word(word);
            }

            return Ok(());
        }

        self.execute_word(&word)
    }

    /// Resolve a word token through module lookup and then the literal handler chain.
    fn resolve_word(&self, token: &Token) -> error::Result<WordRef> {
        if let Some(word) = self.find_word(token.text()) {
            return Ok(word);
        }

        for handler in &self.literal_handlers {
            if let Some(value) = handler(token.text()) {
                return Ok(Rc::new(Word::new_push_value(
                    token.text().clone(),
                    value,
                    Some(token.location().clone()),
                )));
            }
        }

        ScriptError::new_as_result(
            Some(token.location().clone()),
            ErrorKind::UnknownWord(token.text().clone()),
        )
    }
}

impl Default for ForthicInterpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl InterpreterStack for ForthicInterpreter {
    fn stack(&self) -> &Vec<Value> {
        &self.stack
    }

    fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    fn pop(&mut self) -> error::Result<Value> {
        match self.stack.pop() {
            Some(value) => Ok(value),
            None => error::script_error(self, ErrorKind::StackUnderflow),
        }
    }

    fn peek(&self) -> error::Result<&Value> {
        match self.stack.last() {
            Some(value) => Ok(value),
            None => error::script_error(self, ErrorKind::StackUnderflow),
        }
    }

    fn clear_stack(&mut self) {
        self.stack.clear();
    }

    fn pop_as_int(&mut self) -> error::Result<i64> {
        let value = self.pop()?;

        if !value.is_numeric() {
            error::script_error_str(self, "Expected a numeric value.")?;
        }

        Ok(value.get_int_val())
    }

    fn pop_as_float(&mut self) -> error::Result<f64> {
        let value = self.pop()?;

        if !value.is_numeric() {
            error::script_error_str(self, "Expected a numeric value.")?;
        }

        Ok(value.get_float_val())
    }

    fn pop_as_bool(&mut self) -> error::Result<bool> {
        let value = self.pop()?;
        Ok(value.get_bool_val())
    }

    fn pop_as_string(&mut self) -> error::Result<String> {
        let value = self.pop()?;

        if !value.is_stringable() {
            error::script_error_str(self, "Expected a string value.")?;
        }

        Ok(value.get_string_val())
    }

    fn pop_as_array(&mut self) -> error::Result<Vec<Value>> {
        match self.pop()? {
            Value::Array(items) => Ok(items),
            _ => error::script_error_str(self, "Expected an array."),
        }
    }

    fn pop_as_record(&mut self) -> error::Result<HashMap<String, Value>> {
        match self.pop()? {
            Value::Record(entries) => Ok(entries),
            _ => error::script_error_str(self, "Expected a record."),
        }
    }
}

impl WordManagement for ForthicInterpreter {
    fn current_location(&self) -> &Option<SourceLocation> {
        &self.current_location
    }

    fn set_current_location(&mut self, location: Option<SourceLocation>) {
        self.current_location = location;
    }

    fn find_word(&self, name: &str) -> Option<WordRef> {
        for module_ptr in self.module_stack.iter().rev() {
            let module = module_ptr.borrow();

            if let Some(word) = module.find_word(name) {
                return Some(word);
            }

            if let Some(value) = module.get_variable(name) {
                return Some(Rc::new(Word::new_push_value(name.to_string(), value, None)));
            }
        }

        self.global_module.borrow().find_word(name)
    }

    fn add_word(&mut self, name: String, word: Word) {
        self.current_module()
            .borrow_mut()
            .add_word(name, Rc::new(word));
    }

    fn add_global_word(&mut self, name: String, word: Word) {
        self.global_module
            .borrow_mut()
            .add_word(name, Rc::new(word));
    }

    fn execute_word(&mut self, word: &WordRef) -> error::Result<()> {
        if let Some(location) = word.location() {
            self.current_location = Some(location.clone());
        }

        trace!(word = %word.name(), "executing word");

        word.execute(self)
    }

    fn execute_word_named(&mut self, name: &str) -> error::Result<()> {
        match self.find_word(name) {
            Some(word) => self.execute_word(&word),
            None => error::script_error(self, ErrorKind::UnknownWord(name.to_string())),
        }
    }
}

impl ModuleManagement for ForthicInterpreter {
    fn app_module(&self) -> ModulePtr {
        self.app_module.clone()
    }

    fn global_module(&self) -> ModulePtr {
        self.global_module.clone()
    }

    fn current_module(&self) -> ModulePtr {
        match self.module_stack.last() {
            Some(module) => module.clone(),
            None => panic!("The module stack is empty."),
        }
    }

    fn module_stack_push(&mut self, module: ModulePtr) {
        self.module_stack.push(module);
    }

    fn module_stack_pop(&mut self) -> error::Result<()> {
        if self.module_stack.len() <= 1 {
            return error::script_error(
                self,
                ErrorKind::ModuleError("popped the last module from the module stack".to_string()),
            );
        }

        let _ = self.module_stack.pop();
        Ok(())
    }

    fn register_module(&mut self, module: ModulePtr) {
        self.app_module.borrow_mut().register_module(module);
    }

    fn find_registered_module(&self, name: &str) -> error::Result<ModulePtr> {
        if let Some(module) = self.current_module().borrow().find_module(name) {
            return Ok(module);
        }

        if let Some(module) = self.app_module.borrow().find_module(name) {
            return Ok(module);
        }

        error::script_error(self, ErrorKind::UnknownModule(name.to_string()))
    }

    fn set_variable(&mut self, name: &str, value: Value) -> error::Result<()> {
        let module = self.current_module();
        let result = module.borrow_mut().set_variable(name, value);

        result.map_err(|bare| ScriptError::new(self.current_location.clone(), bare.kind().clone()))
    }

    fn get_variable(&self, name: &str) -> Option<Value> {
        for module_ptr in self.module_stack.iter().rev() {
            if let Some(value) = module_ptr.borrow().get_variable(name) {
                return Some(value);
            }
        }

        None
    }

    fn declare_variable(&mut self, name: &str) -> error::Result<()> {
        let module = self.current_module();
        let result = module.borrow_mut().declare_variable(name);

        result.map_err(|bare| ScriptError::new(self.current_location.clone(), bare.kind().clone()))
    }
}

impl Interpreter for ForthicInterpreter {
    fn run(&mut self, source: &str) -> error::Result<()> {
        self.run_with_name("<input>", source)
    }

    fn run_with_name(&mut self, source_name: &str, source: &str) -> error::Result<()> {
        debug!(source_name, "running source");

        self.tokenizers.push(Tokenizer::new(source_name, source));

        let result = self.process_tokens();

        let _ = self.tokenizers.pop();

        if result.is_err() {
            // Errors unwind through any compiling state.
            self.is_compiling = false;
            self.is_memo = false;
            self.current_definition = None;
        }

        result
    }

    fn add_literal_handler(&mut self, handler: LiteralHandler) {
        self.literal_handlers.push(handler);
    }

    fn reset(&mut self) {
        self.stack.clear();

        self.is_compiling = false;
        self.is_memo = false;
        self.current_definition = None;
        self.current_location = None;

        self.module_stack.truncate(1);
    }
}

/// Handler for the `[` token: push the array construction marker.
fn word_start_array(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    interpreter.push(Value::ArrayMarker);
    Ok(())
}

/// Handler for the `]` token: pop values down to the marker, restore source order, and push the
/// assembled array.
fn word_end_array(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let mut items = Vec::new();

    loop {
        let value = interpreter.pop()?;

        if value.is_array_marker() {
            break;
        }

        items.push(value);
    }

    items.reverse();
    interpreter.push(Value::Array(items));

    Ok(())
}

/// Recognize the TRUE and FALSE literals.
fn literal_bool(text: &str) -> Option<Value> {
    match text {
        "TRUE" => Some(Value::Bool(true)),
        "FALSE" => Some(Value::Bool(false)),
        _ => None,
    }
}

/// Recognize a floating point literal.  The text must contain a decimal point, plain integers
/// belong to the int handler.
fn literal_float(text: &str) -> Option<Value> {
    if !text.contains('.') {
        return None;
    }

    text.parse::<f64>().ok().map(Value::Float)
}

/// Recognize a decimal integer literal.  The canonical re-serialization must equal the input so
/// that texts like "007" or "+5" stay unclaimed.
fn literal_int(text: &str) -> Option<Value> {
    let parsed = text.parse::<i64>().ok()?;

    if parsed.to_string() != text {
        return None;
    }

    Some(Value::Int(parsed))
}

/// Recognize a YYYY-MM-DD date literal as a datetime at midnight.
fn literal_date(text: &str) -> Option<Value> {
    let (year, month, day) = parse_date_fields(text)?;

    Some(Value::DateTime(DateTime {
        year,
        month,
        day,
        hour: 0,
        minute: 0,
        second: 0,
    }))
}

/// Recognize an RFC 9557 datetime lexeme such as `2025-05-24T10:15:00[America/Los_Angeles]`.
/// Seconds, the offset, and the bracketed zone annotation are optional; no timezone is stored
/// post-parse.
fn literal_datetime(text: &str) -> Option<Value> {
    let (date_part, time_part) = text.split_once('T')?;

    let (year, month, day) = parse_date_fields(date_part)?;
    let (hour, minute, second) = parse_time_fields(time_part)?;

    Some(Value::DateTime(DateTime {
        year,
        month,
        day,
        hour,
        minute,
        second,
    }))
}

/// Parse the YYYY-MM-DD fields of a date, fixed widths only.
fn parse_date_fields(text: &str) -> Option<(i32, u8, u8)> {
    let mut parts = text.splitn(3, '-');

    let year_text = parts.next()?;
    let month_text = parts.next()?;
    let day_text = parts.next()?;

    if year_text.len() != 4 || month_text.len() != 2 || day_text.len() != 2 {
        return None;
    }

    let year = year_text.parse::<i32>().ok()?;
    let month = month_text.parse::<u8>().ok()?;
    let day = day_text.parse::<u8>().ok()?;

    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }

    Some((year, month, day))
}

/// Parse the HH:MM[:SS] fields of a time, dropping any trailing Z, numeric offset, or bracketed
/// zone annotation.
fn parse_time_fields(text: &str) -> Option<(u8, u8, u8)> {
    let mut time_text = text;

    if let Some(open) = time_text.find('[') {
        if !time_text.ends_with(']') {
            return None;
        }

        time_text = &time_text[..open];
    }

    time_text = time_text.strip_suffix('Z').unwrap_or(time_text);

    if let Some(index) = time_text.find('+') {
        time_text = &time_text[..index];
    } else if let Some(index) = time_text.find('-') {
        time_text = &time_text[..index];
    }

    let mut parts = time_text.splitn(3, ':');

    let hour_text = parts.next()?;
    let minute_text = parts.next()?;
    let second_text = parts.next().unwrap_or("00");

    if hour_text.len() != 2 || minute_text.len() != 2 || second_text.len() != 2 {
        return None;
    }

    let hour = hour_text.parse::<u8>().ok()?;
    let minute = minute_text.parse::<u8>().ok()?;
    let second = second_text.parse::<u8>().ok()?;

    if hour > 23 || minute > 59 || second > 59 {
        return None;
    }

    Some((hour, minute, second))
}
