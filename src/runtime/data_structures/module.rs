use crate::runtime::{
    data_structures::{
        value::Value,
        words::{MemoState, Word, WordRef},
    },
    error::{self, ErrorKind, ScriptError},
};
use std::{cell::RefCell, collections::HashMap, rc::Rc};

/// A reference counted pointer to a Module.  Modules are shared between the interpreter's module
/// stack, parent modules, and importing modules, and their addresses must stay stable for the
/// lifetime of the process once registered.
pub type ModulePtr = Rc<RefCell<Module>>;

/// A named container for words, exportable names, variables, and sub-modules.  The module created
/// at startup for the running program is the app module and its name is the empty string.
///
/// The word list is append-only and is searched newest-first, so later definitions shadow earlier
/// ones within the same module.
pub struct Module {
    /// The module's name.  Empty for the app module.
    name: String,

    /// The dictionary.  An append-only list of (name, word) entries searched newest-first.
    words: Vec<(String, WordRef)>,

    /// Names of the words this module exposes to importing modules.
    exportable: Vec<String>,

    /// The variables owned by this module.
    variables: HashMap<String, Value>,

    /// Sub-modules registered within this module.
    modules: HashMap<String, ModulePtr>,

    /// The prefixes each sub-module has been imported under.
    import_prefixes: HashMap<String, Vec<String>>,
}

impl Module {
    /// Create a new module with the given name.
    pub fn new(name: &str) -> Module {
        Module {
            name: name.to_string(),
            words: Vec::new(),
            exportable: Vec::new(),
            variables: HashMap::new(),
            modules: HashMap::new(),
            import_prefixes: HashMap::new(),
        }
    }

    /// Create a new module already wrapped in the shared pointer the rest of the runtime deals
    /// in.
    pub fn new_ptr(name: &str) -> ModulePtr {
        Rc::new(RefCell::new(Module::new(name)))
    }

    /// The module's name.
    pub fn name(&self) -> &String {
        &self.name
    }

    /// Append a word to the dictionary.  A word added later shadows any earlier word with the
    /// same name.
    pub fn add_word(&mut self, name: String, word: WordRef) {
        self.words.push((name, word));
    }

    /// Append a word to the dictionary and mark it exportable in one step.
    pub fn add_exportable_word(&mut self, name: String, word: WordRef) {
        self.exportable.push(name.clone());
        self.words.push((name, word));
    }

    /// Mark a list of word names as exportable.  Only exported words propagate through imports.
    pub fn add_exportable(&mut self, names: Vec<String>) {
        for name in names {
            if !self.exportable.contains(&name) {
                self.exportable.push(name);
            }
        }
    }

    /// The names this module exports.
    pub fn exportable(&self) -> &Vec<String> {
        &self.exportable
    }

    /// Search the dictionary for a word, newest-first.  The lookup is read-only.
    pub fn find_word(&self, name: &str) -> Option<WordRef> {
        for (entry_name, word) in self.words.iter().rev() {
            if entry_name == name {
                return Some(word.clone());
            }
        }

        None
    }

    /// Install the three words a completed `@:` definition produces: the memo itself under the
    /// definition's name, `name!` to refresh it, and `name!@` to refresh and push.
    ///
    /// When the newest dictionary entry under the name is itself a memo, the entries are replaced
    /// in place rather than shadowed, which keeps redefinition from piling up stale cache
    /// carriers.
    pub fn install_memo(&mut self, state: Rc<MemoState>) {
        let name = state.name().clone();
        let refresh_name = format!("{}!", name);
        let refresh_push_name = format!("{}!@", name);

        let replace = matches!(self.find_word(&name).as_deref(), Some(Word::Memo(_)));

        let entries = [
            (name, Rc::new(Word::Memo(state.clone()))),
            (refresh_name, Rc::new(Word::MemoRefresh(state.clone()))),
            (refresh_push_name, Rc::new(Word::MemoRefreshAndPush(state))),
        ];

        for (entry_name, word) in entries {
            if replace {
                if let Some(slot) = self
                    .words
                    .iter_mut()
                    .rev()
                    .find(|(existing, _)| *existing == entry_name)
                {
                    slot.1 = word;
                    continue;
                }
            }

            self.words.push((entry_name, word));
        }
    }

    /// Get the current value of a variable, if it has been declared or assigned.
    pub fn get_variable(&self, name: &str) -> Option<Value> {
        self.variables.get(name).cloned()
    }

    /// Check if a variable exists in this module.
    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// Assign a variable, creating it on first assignment.  Names beginning with two underscores
    /// are reserved and refused.
    pub fn set_variable(&mut self, name: &str, value: Value) -> error::Result<()> {
        Module::check_variable_name(name)?;
        self.variables.insert(name.to_string(), value);
        Ok(())
    }

    /// Declare a variable with a null value.  Re-declaring an existing variable leaves its
    /// current value alone, so module loads stay idempotent.
    pub fn declare_variable(&mut self, name: &str) -> error::Result<()> {
        Module::check_variable_name(name)?;
        self.variables.entry(name.to_string()).or_insert(Value::Null);
        Ok(())
    }

    /// Refuse the reserved double underscore namespace.
    fn check_variable_name(name: &str) -> error::Result<()> {
        if name.starts_with("__") {
            return ScriptError::new_as_result(
                None,
                ErrorKind::InvalidVariableName(name.to_string()),
            );
        }

        Ok(())
    }

    /// Find the sub-module registered under the given name.
    pub fn find_module(&self, name: &str) -> Option<ModulePtr> {
        self.modules.get(name).cloned()
    }

    /// Find the sub-module registered under the given name, creating an empty one if it does not
    /// exist yet.  This is the `{name` path.
    pub fn find_or_create_module(&mut self, name: &str) -> ModulePtr {
        self.modules
            .entry(name.to_string())
            .or_insert_with(|| Module::new_ptr(name))
            .clone()
    }

    /// Register an existing module as a sub-module of this one.
    pub fn register_module(&mut self, module: ModulePtr) {
        let name = module.borrow().name().clone();
        self.modules.insert(name, module);
    }

    /// Import another module's exported words into this module's dictionary.
    ///
    /// With an empty prefix the exported words are spliced in under their own names.  With a
    /// nonempty prefix each exported word W becomes available as `prefix.W`.  Either way the
    /// imported entry delegates to the word still owned by the exporting module.
    pub fn import_from(&mut self, source: &ModulePtr, prefix: &str) {
        let source_ref = source.borrow();
        let source_name = source_ref.name().clone();

        for exported in source_ref.exportable() {
            if let Some(word) = source_ref.find_word(exported) {
                let alias = if prefix.is_empty() {
                    exported.clone()
                } else {
                    format!("{}.{}", prefix, exported)
                };

                self.words.push((alias, word));
            }
        }

        self.import_prefixes
            .entry(source_name)
            .or_default()
            .push(prefix.to_string());
    }

    /// The prefixes a sub-module has been imported under so far.
    pub fn import_prefixes(&self, name: &str) -> Option<&Vec<String>> {
        self.import_prefixes.get(name)
    }
}
