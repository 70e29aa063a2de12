use crate::{
    add_native_word,
    runtime::{
        data_structures::value::Value,
        error::{self, script_error_str},
        interpreter::Interpreter,
    },
};
use std::cmp::Ordering;

/// Pop the two operands of a binary numeric word, checking both are numbers.  The right operand
/// is on top of the stack.
fn pop_numeric_pair(interpreter: &mut dyn Interpreter) -> error::Result<(Value, Value)> {
    let b = interpreter.pop()?;
    let a = interpreter.pop()?;

    if !a.is_numeric() || !b.is_numeric() {
        return script_error_str(interpreter, "Expected two numeric values.");
    }

    Ok((a, b))
}

/// Add two numbers.  The int type is preserved when both operands are ints.
///
/// Signature: `a b -- a+b`
fn word_plus(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let (a, b) = pop_numeric_pair(interpreter)?;

    if a.is_int() && b.is_int() {
        interpreter.push(Value::Int(a.get_int_val() + b.get_int_val()));
    } else {
        interpreter.push(Value::Float(a.get_float_val() + b.get_float_val()));
    }

    Ok(())
}

/// Subtract two numbers.  The int type is preserved when both operands are ints.
///
/// Signature: `a b -- a-b`
fn word_minus(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let (a, b) = pop_numeric_pair(interpreter)?;

    if a.is_int() && b.is_int() {
        interpreter.push(Value::Int(a.get_int_val() - b.get_int_val()));
    } else {
        interpreter.push(Value::Float(a.get_float_val() - b.get_float_val()));
    }

    Ok(())
}

/// Multiply two numbers.  The result is always promoted to a float.
///
/// Signature: `a b -- a*b`
fn word_times(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let (a, b) = pop_numeric_pair(interpreter)?;

    interpreter.push(Value::Float(a.get_float_val() * b.get_float_val()));
    Ok(())
}

/// Divide two numbers.  The result is always promoted to a float.
///
/// Signature: `a b -- a/b`
fn word_divide(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let (a, b) = pop_numeric_pair(interpreter)?;

    if b.get_float_val() == 0.0 {
        return script_error_str(interpreter, "Division by zero.");
    }

    interpreter.push(Value::Float(a.get_float_val() / b.get_float_val()));
    Ok(())
}

/// Remainder after integer division.
///
/// Signature: `a b -- a%b`
fn word_modulo(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let (a, b) = pop_numeric_pair(interpreter)?;

    if b.get_int_val() == 0 {
        return script_error_str(interpreter, "Division by zero.");
    }

    interpreter.push(Value::Int(a.get_int_val() % b.get_int_val()));
    Ok(())
}

/// Test two values for equality using the language's coercion rules.
///
/// Signature: `a b -- a==b`
fn word_equal(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let b = interpreter.pop()?;
    let a = interpreter.pop()?;

    interpreter.push(Value::Bool(a == b));
    Ok(())
}

/// Test two values for inequality.
///
/// Signature: `a b -- a!=b`
fn word_not_equal(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let b = interpreter.pop()?;
    let a = interpreter.pop()?;

    interpreter.push(Value::Bool(a != b));
    Ok(())
}

/// Order two values.  Numbers compare numerically, strings lexicographically.
fn compare_values(
    interpreter: &mut dyn Interpreter,
    a: &Value,
    b: &Value,
) -> error::Result<Ordering> {
    if a.is_numeric() && b.is_numeric() {
        let ordering = a
            .get_float_val()
            .partial_cmp(&b.get_float_val())
            .unwrap_or(Ordering::Equal);

        return Ok(ordering);
    }

    if let (Value::String(a_text), Value::String(b_text)) = (a, b) {
        return Ok(a_text.cmp(b_text));
    }

    script_error_str(interpreter, "Values are not comparable.")
}

/// Build one of the four ordering words out of the orderings it accepts.
fn word_ordering(
    interpreter: &mut dyn Interpreter,
    accepts: fn(Ordering) -> bool,
) -> error::Result<()> {
    let b = interpreter.pop()?;
    let a = interpreter.pop()?;

    let ordering = compare_values(interpreter, &a, &b)?;

    interpreter.push(Value::Bool(accepts(ordering)));
    Ok(())
}

/// Logical AND of two truthiness values.
///
/// Signature: `a b -- bool`
fn word_and(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let b = interpreter.pop_as_bool()?;
    let a = interpreter.pop_as_bool()?;

    interpreter.push(Value::Bool(a && b));
    Ok(())
}

/// Logical OR of two truthiness values.
///
/// Signature: `a b -- bool`
fn word_or(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let b = interpreter.pop_as_bool()?;
    let a = interpreter.pop_as_bool()?;

    interpreter.push(Value::Bool(a || b));
    Ok(())
}

/// Logical negation of a truthiness value.
///
/// Signature: `a -- bool`
fn word_not(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let a = interpreter.pop_as_bool()?;

    interpreter.push(Value::Bool(!a));
    Ok(())
}

/// Register the arithmetic, comparison, and logic words.
pub fn register_math_words(interpreter: &mut dyn Interpreter) {
    add_native_word!(interpreter, "+", word_plus);
    add_native_word!(interpreter, "-", word_minus);
    add_native_word!(interpreter, "*", word_times);
    add_native_word!(interpreter, "/", word_divide);
    add_native_word!(interpreter, "MOD", word_modulo);

    add_native_word!(interpreter, "==", word_equal);
    add_native_word!(interpreter, "!=", word_not_equal);

    add_native_word!(interpreter, "<", |interp: &mut dyn Interpreter| {
        word_ordering(interp, Ordering::is_lt)
    });
    add_native_word!(interpreter, "<=", |interp: &mut dyn Interpreter| {
        word_ordering(interp, Ordering::is_le)
    });
    add_native_word!(interpreter, ">", |interp: &mut dyn Interpreter| {
        word_ordering(interp, Ordering::is_gt)
    });
    add_native_word!(interpreter, ">=", |interp: &mut dyn Interpreter| {
        word_ordering(interp, Ordering::is_ge)
    });

    add_native_word!(interpreter, "AND", word_and);
    add_native_word!(interpreter, "OR", word_or);
    add_native_word!(interpreter, "NOT", word_not);
}
