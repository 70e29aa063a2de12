use forthic::runtime::{
    built_ins::register_base_words,
    data_structures::{
        value::{DateTime, Value},
        words::{DefinitionWord, Word},
    },
    error::ErrorKind,
    interpreter::{
        forthic_interpreter::ForthicInterpreter, Interpreter, InterpreterStack, ModuleManagement,
        WordManagement,
    },
};
use std::rc::Rc;

/// Build an interpreter with the standard word sets installed, the way a host would.
fn new_interpreter() -> ForthicInterpreter {
    let mut interpreter = ForthicInterpreter::new();
    register_base_words(&mut interpreter);
    interpreter
}

/// Run a source fragment on a fresh interpreter and return it for inspection.
fn run(source: &str) -> ForthicInterpreter {
    let mut interpreter = new_interpreter();

    let result = interpreter.run(source);
    assert!(result.is_ok(), "Script failed: {:?}", result.err());

    interpreter
}

#[test]
fn test_addition() {
    let mut interpreter = run("1 2 +");

    assert_eq!(interpreter.pop().unwrap(), Value::Int(3));
    assert_eq!(interpreter.stack_length(), 0);
}

#[test]
fn test_addition_preserves_int() {
    let mut interpreter = run("1 2 +");
    let value = interpreter.pop().unwrap();

    assert!(value.is_int());
}

#[test]
fn test_mixed_addition_promotes() {
    let mut interpreter = run("1 2.5 +");

    assert_eq!(interpreter.pop().unwrap(), Value::Float(3.5));
}

#[test]
fn test_array_length() {
    let mut interpreter = run("[ \"a\" \"b\" \"c\" ] LENGTH");

    assert_eq!(interpreter.pop().unwrap(), Value::Int(3));
}

#[test]
fn test_definition_and_call() {
    let mut interpreter = run(": DOUBLE 2 * ; 21 DOUBLE");

    // Multiplication promotes, and the promotion is consistent: the result compares equal to
    // both int 42 and float 42.
    let value = interpreter.pop().unwrap();

    assert!(value.is_float());
    assert_eq!(value, Value::Int(42));
}

#[test]
fn test_variable_workout() {
    let mut interpreter = run("[ \"x\" ] VARIABLES 10 \"x\" ! 5 \"x\" @ + \"x\" !@");

    assert_eq!(interpreter.pop().unwrap(), Value::Int(15));
    assert_eq!(interpreter.get_variable("x"), Some(Value::Int(15)));
    assert_eq!(interpreter.stack_length(), 0);
}

#[test]
fn test_memo_pushes_cached_value() {
    let mut interpreter = run("@: M 99 ; M M");

    assert_eq!(interpreter.pop().unwrap(), Value::Int(99));
    assert_eq!(interpreter.pop().unwrap(), Value::Int(99));
    assert_eq!(interpreter.stack_length(), 0);
}

#[test]
fn test_memo_refresh_of_constant_body() {
    let mut interpreter = run("@: M 99 ; M M! M");

    // Refreshing a constant body changes nothing.
    assert_eq!(interpreter.pop().unwrap(), Value::Int(99));
    assert_eq!(interpreter.pop().unwrap(), Value::Int(99));
}

#[test]
fn test_memo_body_runs_once() {
    let source = "
        [ \"count\" ] VARIABLES
        0 \"count\" !
        @: M \"count\" @ 1 + \"count\" !@ ;
        M M
    ";

    let mut interpreter = run(source);

    // Both executions pushed the value cached by the first one.
    assert_eq!(interpreter.pop().unwrap(), Value::Int(1));
    assert_eq!(interpreter.pop().unwrap(), Value::Int(1));

    // The body executed exactly once.
    assert_eq!(interpreter.get_variable("count"), Some(Value::Int(1)));
}

#[test]
fn test_memo_refresh_recomputes() {
    let source = "
        [ \"n\" ] VARIABLES
        1 \"n\" !
        @: M \"n\" @ ;
        M
        2 \"n\" !
        M
        M!
        M
    ";

    let mut interpreter = run(source);

    // After the refresh the cache sees the new binding.
    assert_eq!(interpreter.pop().unwrap(), Value::Int(2));

    // Before the refresh the stale cache kept replaying.
    assert_eq!(interpreter.pop().unwrap(), Value::Int(1));
    assert_eq!(interpreter.pop().unwrap(), Value::Int(1));
}

#[test]
fn test_memo_refresh_pushes_nothing() {
    let interpreter = run("@: M 5 ; M!");

    assert_eq!(interpreter.stack_length(), 0);
}

#[test]
fn test_memo_refresh_and_push() {
    let mut interpreter = run("@: M 5 ; M!@");

    assert_eq!(interpreter.pop().unwrap(), Value::Int(5));
    assert_eq!(interpreter.stack_length(), 0);
}

#[test]
fn test_extra_terminator() {
    let mut interpreter = new_interpreter();
    let error = interpreter.run("1 2 ; 3").unwrap_err();

    assert_eq!(*error.kind(), ErrorKind::ExtraTerminator);

    // The stack retains whatever state was reached.
    assert_eq!(interpreter.stack(), &vec![Value::Int(1), Value::Int(2)]);
}

#[test]
fn test_missing_terminator() {
    let mut interpreter = new_interpreter();
    let error = interpreter.run(": UNFINISHED 1 2").unwrap_err();

    assert_eq!(*error.kind(), ErrorKind::MissingTerminator);
}

#[test]
fn test_nested_definition_is_rejected() {
    let mut interpreter = new_interpreter();
    let error = interpreter.run(": OUTER : INNER 1 ; ;").unwrap_err();

    assert_eq!(*error.kind(), ErrorKind::NestedDefinition);
}

#[test]
fn test_unknown_word_carries_location() {
    let mut interpreter = new_interpreter();
    let error = interpreter.run("\n  NO-SUCH-WORD").unwrap_err();

    assert_eq!(
        *error.kind(),
        ErrorKind::UnknownWord("NO-SUCH-WORD".to_string())
    );

    let location = error.location().as_ref().unwrap();
    assert_eq!(location.line(), 2);
    assert_eq!(location.column(), 3);
}

#[test]
fn test_string_round_trip() {
    let mut interpreter = run("\"hello world\"");

    assert_eq!(
        interpreter.pop().unwrap(),
        Value::String("hello world".to_string())
    );
}

#[test]
fn test_dup_then_pop_restores() {
    let mut interpreter = run("5 DUP POP");

    assert_eq!(interpreter.pop().unwrap(), Value::Int(5));
    assert_eq!(interpreter.stack_length(), 0);
}

#[test]
fn test_swap_twice_is_identity() {
    let interpreter = run("1 2 SWAP SWAP");

    assert_eq!(interpreter.stack(), &vec![Value::Int(1), Value::Int(2)]);
}

#[test]
fn test_definition_does_not_alter_stack() {
    let interpreter = run("1 : LATER 2 3 + ;");

    assert_eq!(interpreter.stack(), &vec![Value::Int(1)]);
}

#[test]
fn test_later_definition_shadows() {
    let mut interpreter = run(": X 1 ; : X 2 ; X");

    assert_eq!(interpreter.pop().unwrap(), Value::Int(2));
}

#[test]
fn test_variable_reservation() {
    let mut interpreter = new_interpreter();
    let error = interpreter.run("10 \"__x\" !").unwrap_err();

    assert!(matches!(error.kind(), ErrorKind::InvalidVariableName(_)));

    let error = interpreter.run("[ \"__y\" ] VARIABLES").unwrap_err();
    assert!(matches!(error.kind(), ErrorKind::InvalidVariableName(_)));
}

#[test]
fn test_array_in_source_order() {
    let mut interpreter = run("[ 1 2 3 ]");

    assert_eq!(
        interpreter.pop().unwrap(),
        Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
    );
}

#[test]
fn test_array_may_contain_null() {
    // The construction marker is distinct from null, so a raw null survives as an element.
    let mut interpreter = run("[ NULL 1 ]");

    assert_eq!(
        interpreter.pop().unwrap(),
        Value::Array(vec![Value::Null, Value::Int(1)])
    );
}

#[test]
fn test_nested_arrays() {
    let mut interpreter = run("[ 1 [ 2 3 ] ]");

    assert_eq!(
        interpreter.pop().unwrap(),
        Value::Array(vec![
            Value::Int(1),
            Value::Array(vec![Value::Int(2), Value::Int(3)])
        ])
    );
}

#[test]
fn test_arrays_inside_definitions() {
    let mut interpreter = run(": PAIR [ 1 2 ] ; PAIR");

    assert_eq!(
        interpreter.pop().unwrap(),
        Value::Array(vec![Value::Int(1), Value::Int(2)])
    );
}

#[test]
fn test_dot_symbol_pushes_string() {
    let mut interpreter = run(".field");

    assert_eq!(interpreter.pop().unwrap(), Value::String("field".to_string()));
}

#[test]
fn test_records() {
    let mut interpreter = run("REC 42 .answer REC! .answer REC@");

    assert_eq!(interpreter.pop().unwrap(), Value::Int(42));
}

#[test]
fn test_record_missing_field_is_null() {
    let mut interpreter = run("REC .missing REC@");

    assert_eq!(interpreter.pop().unwrap(), Value::Null);
}

#[test]
fn test_default_word() {
    let mut interpreter = run("NULL 5 DEFAULT");
    assert_eq!(interpreter.pop().unwrap(), Value::Int(5));

    let mut interpreter = run("3 5 DEFAULT");
    assert_eq!(interpreter.pop().unwrap(), Value::Int(3));

    let mut interpreter = run("\"\" \"fallback\" DEFAULT");
    assert_eq!(
        interpreter.pop().unwrap(),
        Value::String("fallback".to_string())
    );
}

#[test]
fn test_star_default_runs_code_on_trigger() {
    let mut interpreter = run("NULL \"1 2 +\" *DEFAULT");
    assert_eq!(interpreter.pop().unwrap(), Value::Int(3));

    let mut interpreter = run("7 \"1 2 +\" *DEFAULT");
    assert_eq!(interpreter.pop().unwrap(), Value::Int(7));
}

#[test]
fn test_interpret_defines_words() {
    let mut interpreter = run("\": TRIPLE 3 * ;\" INTERPRET 4 TRIPLE");

    assert_eq!(interpreter.pop().unwrap(), Value::Float(12.0));
}

#[test]
fn test_bool_literals() {
    let interpreter = run("TRUE FALSE");

    assert_eq!(
        interpreter.stack(),
        &vec![Value::Bool(true), Value::Bool(false)]
    );
}

#[test]
fn test_datetime_literal() {
    let mut interpreter = run("2025-05-24T10:15:00[America/Los_Angeles]");

    assert_eq!(
        interpreter.pop().unwrap(),
        Value::DateTime(DateTime {
            year: 2025,
            month: 5,
            day: 24,
            hour: 10,
            minute: 15,
            second: 0,
        })
    );
}

#[test]
fn test_date_literal() {
    let mut interpreter = run("2025-05-24");

    assert_eq!(
        interpreter.pop().unwrap(),
        Value::DateTime(DateTime {
            year: 2025,
            month: 5,
            day: 24,
            hour: 0,
            minute: 0,
            second: 0,
        })
    );
}

#[test]
fn test_comparisons() {
    let interpreter = run("1 2 < 2 2 <= 3 2 > \"a\" \"b\" <");

    assert_eq!(
        interpreter.stack(),
        &vec![
            Value::Bool(true),
            Value::Bool(true),
            Value::Bool(true),
            Value::Bool(true)
        ]
    );
}

#[test]
fn test_logic_words_use_truthiness() {
    let interpreter = run("1 0 OR \"\" NOT NULL \"x\" AND");

    assert_eq!(
        interpreter.stack(),
        &vec![Value::Bool(true), Value::Bool(true), Value::Bool(false)]
    );
}

#[test]
fn test_module_import_with_prefix() {
    let source = "
        {geo
            : LAT 37.77 ;
            [ \"LAT\" ] EXPORT
        }
        [ \"geo\" ] USE-MODULES
        geo.LAT
    ";

    let mut interpreter = run(source);

    assert_eq!(interpreter.pop().unwrap(), Value::Float(37.77));
}

#[test]
fn test_module_import_with_empty_prefix() {
    let source = "
        {m
            : W 5 ;
            [ \"W\" ] EXPORT
        }
        [ [ \"m\" \"\" ] ] USE-MODULES
        W
    ";

    let mut interpreter = run(source);

    assert_eq!(interpreter.pop().unwrap(), Value::Int(5));
}

#[test]
fn test_unexported_words_do_not_propagate() {
    let source = "
        {m
            : W 5 ;
        }
        [ \"m\" ] USE-MODULES
        m.W
    ";

    let mut interpreter = new_interpreter();
    let error = interpreter.run(source).unwrap_err();

    assert_eq!(*error.kind(), ErrorKind::UnknownWord("m.W".to_string()));
}

#[test]
fn test_module_words_are_scoped() {
    let source = "
        {m : INSIDE 1 ; }
        INSIDE
    ";

    let mut interpreter = new_interpreter();
    let error = interpreter.run(source).unwrap_err();

    assert_eq!(*error.kind(), ErrorKind::UnknownWord("INSIDE".to_string()));
}

#[test]
fn test_reentering_a_module_finds_its_words() {
    let source = "
        {m : INSIDE 1 ; }
        {m INSIDE }
    ";

    let mut interpreter = run(source);

    assert_eq!(interpreter.pop().unwrap(), Value::Int(1));
}

#[test]
fn test_unknown_module() {
    let mut interpreter = new_interpreter();
    let error = interpreter.run("[ \"nope\" ] USE-MODULES").unwrap_err();

    assert_eq!(*error.kind(), ErrorKind::UnknownModule("nope".to_string()));
}

#[test]
fn test_module_stack_underflow() {
    let mut interpreter = new_interpreter();
    let error = interpreter.run("}").unwrap_err();

    assert!(matches!(error.kind(), ErrorKind::ModuleError(_)));
}

#[test]
fn test_module_boundary_inside_definition_is_rejected() {
    let mut interpreter = new_interpreter();
    let error = interpreter.run(": BAD {m } ;").unwrap_err();

    assert!(matches!(error.kind(), ErrorKind::ModuleError(_)));
}

#[test]
fn test_stack_underflow_kind() {
    let mut interpreter = new_interpreter();
    let error = interpreter.run("POP").unwrap_err();

    assert_eq!(*error.kind(), ErrorKind::StackUnderflow);
}

#[test]
fn test_memo_redefinition_replaces() {
    // Redefining a memo under the same name installs the fresh body.
    let mut interpreter = run("@: M 1 ; M POP @: M 2 ; M");

    assert_eq!(interpreter.pop().unwrap(), Value::Int(2));
}

#[test]
fn test_intentional_stop() {
    let mut interpreter = new_interpreter();
    let error = interpreter.run("1 2 SHOW-STACK").unwrap_err();

    assert_eq!(*error.kind(), ErrorKind::IntentionalStop);

    // The stack is left for the host to inspect.
    assert_eq!(interpreter.stack(), &vec![Value::Int(1), Value::Int(2)]);
}

#[test]
fn test_definition_error_handler_absorbs() {
    let mut interpreter = new_interpreter();
    register_base_words(&mut interpreter);

    // A definition whose body fails, with a handler that consumes the error message and pushes a
    // fallback.  The handler absorbing the error lets the next sibling word run.
    let failing = interpreter.find_word("POP").unwrap();

    let mut definition = DefinitionWord::new("GUARDED".to_string(), None);
    definition.add_word(failing);

    let handler_body: Rc<Word> = Rc::new(Word::new_builtin(
        "fallback".to_string(),
        Rc::new(|interp: &mut dyn Interpreter| {
            // The rendered error message is on top of the stack.
            let _message = interp.pop_as_string()?;
            interp.push(Value::Int(-1));
            Ok(())
        }),
        None,
    ));

    definition.add_error_handler(handler_body);

    let pushes_done: Rc<Word> = Rc::new(Word::new_push_value(
        "done".to_string(),
        Value::String("done".to_string()),
        None,
    ));
    definition.add_word(pushes_done);

    let guarded: Rc<Word> = Rc::new(Word::Definition(definition));

    // Popping an empty stack fails, the handler absorbs it, and the trailing word still runs.
    interpreter.execute_word(&guarded).unwrap();

    assert_eq!(
        interpreter.stack(),
        &vec![Value::Int(-1), Value::String("done".to_string())]
    );
}

#[test]
fn test_definition_without_handlers_propagates() {
    let mut interpreter = new_interpreter();
    let error = interpreter.run(": BOOM POP ; BOOM").unwrap_err();

    assert_eq!(*error.kind(), ErrorKind::StackUnderflow);
}

#[test]
fn test_triple_quoted_strings() {
    let mut interpreter = run("'''can contain \"quotes\" and\nnewlines'''");

    assert_eq!(
        interpreter.pop().unwrap(),
        Value::String("can contain \"quotes\" and\nnewlines".to_string())
    );
}

#[test]
fn test_comments_are_ignored() {
    let mut interpreter = run("1 # this is ignored\n2 +");

    assert_eq!(interpreter.pop().unwrap(), Value::Int(3));
}

#[test]
fn test_benign_separators() {
    let mut interpreter = run("( 1 , 2 ) +");

    assert_eq!(interpreter.pop().unwrap(), Value::Int(3));
}

#[test]
fn test_clear_stack() {
    let mut interpreter = run("1 2 3");

    interpreter.clear_stack();
    assert_eq!(interpreter.stack_length(), 0);
}

#[test]
fn test_run_keeps_state_across_calls() {
    let mut interpreter = new_interpreter();

    interpreter.run(": GREETING \"hi\" ;").unwrap();
    interpreter.run("GREETING").unwrap();

    assert_eq!(interpreter.pop().unwrap(), Value::String("hi".to_string()));
}

#[test]
fn test_variables_shadow_across_modules() {
    // A variable declared in a sub-module wins over one in the app module while the sub-module
    // is current.
    let source = "
        [ \"v\" ] VARIABLES  1 \"v\" !
        {m
            [ \"v\" ] VARIABLES  2 \"v\" !
            \"v\" @
        }
        \"v\" @
    ";

    let mut interpreter = run(source);

    assert_eq!(interpreter.pop().unwrap(), Value::Int(1));
    assert_eq!(interpreter.pop().unwrap(), Value::Int(2));
}
