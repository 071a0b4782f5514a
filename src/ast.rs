//! This module defines the core value tree for the interpreter. The main
//! enum, [`Value`], covers all seven Knight kinds: integers, strings,
//! booleans, null, lists, interned variables and function applications.
//! The same type is both the parser's output and the evaluator's result;
//! literals are inert while variables and function nodes do work when run.
//! Cross-kind coercions (`to_integer`, `to_boolean`, `to_text`, `to_list`)
//! and the polymorphic operations (`add`, `compare`, `head`, `get`, ...)
//! are defined here; which kinds support which operation follows the
//! language's per-kind contracts, and an unsupported combination is a
//! runtime type error, not a compile-time one. Display renders the `DUMP`
//! form. Ergonomic helpers such as [`val`] are provided for convenient
//! construction in tests.

use std::cmp::Ordering;
use std::rc::Rc;

use crate::Error;
use crate::builtinops::BuiltinOp;
use crate::evaluator::{self, Environment, Variable};

/// Type alias for integer values in the interpreter
pub type IntType = i64;

/// Core value type in the interpreter
///
/// Note: `Variable` and `Function` compare by node identity, not contents.
/// All occurrences of one variable name share a single interned node, so
/// identity equality is exactly "same variable". A `Function` value only
/// escapes the tree through `BLOCK`, and two blocks are equal only when
/// they are the same parse node.
///
/// To build values in tests, use the ergonomic helpers:
/// - `val(42)`, `val("text")`, `val(true)` for scalars
/// - `val([1, 2, 3])` for homogeneous lists
/// - `val(vec![val(1), val("mixed")])` for mixed lists
#[derive(Clone)]
pub enum Value {
    /// Signed machine integers
    Integer(IntType),
    /// Immutable text
    String(String),
    /// Boolean values
    Boolean(bool),
    /// The null singleton
    Null,
    /// Ordered sequences of values
    List(Vec<Value>),
    /// An interned global variable; running it reads the binding cell
    Variable(Rc<Variable>),
    /// A function application: registry entry plus fixed-arity argument
    /// subtrees. Running it invokes the operation on the subtrees.
    Function {
        op: &'static BuiltinOp,
        args: Rc<[Value]>,
    },
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "Integer({n})"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::Boolean(b) => write!(f, "Boolean({b})"),
            Value::Null => write!(f, "Null"),
            Value::List(items) => {
                write!(f, "List(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item:?}")?;
                }
                write!(f, ")")
            }
            // Bindings are omitted: a block bound to a variable it mentions
            // would otherwise recurse forever
            Value::Variable(var) => write!(f, "Variable({})", var.name()),
            Value::Function { op, args } => {
                write!(f, "Function({}, args=[", op.name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg:?}")?;
                }
                write!(f, "])")
            }
        }
    }
}

// From trait implementations for Value - enables .into() conversion
impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

macro_rules! impl_from_integer {
    ($int_type:ty) => {
        impl From<$int_type> for Value {
            fn from(n: $int_type) -> Self {
                Value::Integer(n as IntType)
            }
        }
    };
}

// Generate From implementations for the common integer types
impl_from_integer!(i8);
impl_from_integer!(i16);
impl_from_integer!(i32);
impl_from_integer!(IntType); // Special case - no casting
impl_from_integer!(u8);
impl_from_integer!(u16);
impl_from_integer!(u32);

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(|x| x.into()).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(arr: [T; N]) -> Self {
        Value::List(arr.into_iter().map(|x| x.into()).collect())
    }
}

/// Helper function for creating Values - works great in mixed lists!
/// Accepts any type that can be converted to Value
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn val<T: Into<Value>>(value: T) -> Value {
    value.into()
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::List(a), Value::List(b)) => a == b,
            // Interned nodes: same variable means same cell
            (Value::Variable(a), Value::Variable(b)) => Rc::ptr_eq(a, b),
            // Blocks are equal only as the same parse node
            (Value::Function { args: a, .. }, Value::Function { args: b, .. }) => Rc::ptr_eq(a, b),
            _ => false, // Different kinds are never equal
        }
    }
}

impl std::fmt::Display for Value {
    /// The `DUMP` representation
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{n}"),
            Value::String(s) => {
                write!(f, "\"")?;
                for ch in s.chars() {
                    match ch {
                        '"' => write!(f, "\\\"")?,
                        '\\' => write!(f, "\\\\")?,
                        '\n' => write!(f, "\\n")?,
                        '\t' => write!(f, "\\t")?,
                        '\r' => write!(f, "\\r")?,
                        c => write!(f, "{c}")?,
                    }
                }
                write!(f, "\"")
            }
            Value::Boolean(b) => write!(f, "{}", if *b { "true" } else { "false" }),
            Value::Null => write!(f, "null"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Variable(var) => write!(f, "#<variable:{}>", var.name()),
            Value::Function { op, .. } => write!(f, "#<block:{}>", op.name),
        }
    }
}

/// Integer value of a string: optional leading whitespace, optional sign,
/// then greedy decimal digits; anything else yields 0. Scientific notation
/// is not recognized. Accumulation saturates at the integer bounds so the
/// coercion stays total.
fn integer_prefix(s: &str) -> IntType {
    let mut chars = s.trim_start().chars().peekable();

    let negative = match chars.peek() {
        Some('-') => {
            chars.next();
            true
        }
        Some('+') => {
            chars.next();
            false
        }
        _ => false,
    };

    let mut value: IntType = 0;
    for ch in chars {
        let Some(digit) = ch.to_digit(10) else {
            break;
        };
        let digit = IntType::from(digit);
        value = if negative {
            value.saturating_mul(10).saturating_sub(digit)
        } else {
            value.saturating_mul(10).saturating_add(digit)
        };
    }

    value
}

impl Value {
    /// The kind name used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::String(_) => "string",
            Value::Boolean(_) => "boolean",
            Value::Null => "null",
            Value::List(_) => "list",
            Value::Variable(_) => "variable",
            Value::Function { .. } => "block",
        }
    }

    fn unsupported(&self, op_name: &str) -> Error {
        Error::TypeError(format!("{op_name} is not defined for {}", self.type_name()))
    }

    //
    // Coercions. Each is total over the five data kinds; variables and
    // function nodes are run first and the result is coerced.
    //

    pub fn to_integer(&self, env: &mut Environment) -> Result<IntType, Error> {
        match self {
            Value::Integer(n) => Ok(*n),
            Value::String(s) => Ok(integer_prefix(s)),
            Value::Boolean(b) => Ok(IntType::from(*b)),
            Value::Null => Ok(0),
            Value::List(items) => Ok(items.len() as IntType),
            Value::Variable(_) | Value::Function { .. } => {
                evaluator::eval(self, env)?.to_integer(env)
            }
        }
    }

    pub fn to_boolean(&self, env: &mut Environment) -> Result<bool, Error> {
        match self {
            Value::Integer(n) => Ok(*n != 0),
            Value::String(s) => Ok(!s.is_empty()),
            Value::Boolean(b) => Ok(*b),
            Value::Null => Ok(false),
            Value::List(items) => Ok(!items.is_empty()),
            Value::Variable(_) | Value::Function { .. } => {
                evaluator::eval(self, env)?.to_boolean(env)
            }
        }
    }

    /// String value. Named `to_text` to keep `ToString` (which renders the
    /// `DUMP` form via `Display`) untouched.
    pub fn to_text(&self, env: &mut Environment) -> Result<String, Error> {
        match self {
            Value::Integer(n) => Ok(n.to_string()),
            Value::String(s) => Ok(s.clone()),
            Value::Boolean(b) => Ok(if *b { "true" } else { "false" }.to_owned()),
            Value::Null => Ok(String::new()),
            Value::List(items) => {
                let mut parts = Vec::with_capacity(items.len());
                for item in items {
                    parts.push(item.to_text(env)?);
                }
                Ok(parts.join("\n"))
            }
            Value::Variable(_) | Value::Function { .. } => evaluator::eval(self, env)?.to_text(env),
        }
    }

    pub fn to_list(&self, env: &mut Environment) -> Result<Vec<Value>, Error> {
        match self {
            // Decimal digits, most significant first; negatives use the
            // digits of the absolute value
            Value::Integer(n) => {
                let mut rest = n.unsigned_abs();
                let mut digits = vec![Value::Integer((rest % 10) as IntType)];
                rest /= 10;
                while rest > 0 {
                    digits.push(Value::Integer((rest % 10) as IntType));
                    rest /= 10;
                }
                digits.reverse();
                Ok(digits)
            }
            Value::String(s) => Ok(s.chars().map(|c| Value::String(c.to_string())).collect()),
            Value::Boolean(b) => Ok(if *b { vec![Value::Boolean(true)] } else { vec![] }),
            Value::Null => Ok(vec![]),
            Value::List(items) => Ok(items.clone()),
            Value::Variable(_) | Value::Function { .. } => evaluator::eval(self, env)?.to_list(env),
        }
    }

    //
    // Arithmetic. The receiver picks the interpretation and the right-hand
    // side is coerced to the receiver's kind. Integer arithmetic is
    // checked: overflow is an error, never a wrap.
    //

    pub fn add(&self, rhs: &Value, env: &mut Environment) -> Result<Value, Error> {
        match self {
            Value::Integer(a) => {
                let b = rhs.to_integer(env)?;
                a.checked_add(b)
                    .map(Value::Integer)
                    .ok_or_else(|| Error::DomainError("integer overflow in addition".into()))
            }
            Value::String(a) => {
                let mut out = a.clone();
                out.push_str(&rhs.to_text(env)?);
                Ok(Value::String(out))
            }
            Value::List(a) => {
                let mut out = a.clone();
                out.extend(rhs.to_list(env)?);
                Ok(Value::List(out))
            }
            other => Err(other.unsupported("`+`")),
        }
    }

    pub fn sub(&self, rhs: &Value, env: &mut Environment) -> Result<Value, Error> {
        match self {
            Value::Integer(a) => {
                let b = rhs.to_integer(env)?;
                a.checked_sub(b)
                    .map(Value::Integer)
                    .ok_or_else(|| Error::DomainError("integer overflow in subtraction".into()))
            }
            other => Err(other.unsupported("`-`")),
        }
    }

    pub fn mul(&self, rhs: &Value, env: &mut Environment) -> Result<Value, Error> {
        match self {
            Value::Integer(a) => {
                let b = rhs.to_integer(env)?;
                a.checked_mul(b)
                    .map(Value::Integer)
                    .ok_or_else(|| Error::DomainError("integer overflow in multiplication".into()))
            }
            Value::String(a) => {
                let count = repeat_count(rhs, a.len(), env)?;
                Ok(Value::String(a.repeat(count)))
            }
            Value::List(a) => {
                let count = repeat_count(rhs, a.len(), env)?;
                let mut result = Vec::with_capacity(a.len() * count);
                for _ in 0..count {
                    result.extend(a.iter().cloned());
                }
                Ok(Value::List(result))
            }
            other => Err(other.unsupported("`*`")),
        }
    }

    pub fn div(&self, rhs: &Value, env: &mut Environment) -> Result<Value, Error> {
        match self {
            Value::Integer(a) => {
                let b = rhs.to_integer(env)?;
                if b == 0 {
                    return Err(Error::DomainError("division by zero".into()));
                }
                // Truncates toward zero; MIN / -1 is the one overflow case
                a.checked_div(b)
                    .map(Value::Integer)
                    .ok_or_else(|| Error::DomainError("integer overflow in division".into()))
            }
            other => Err(other.unsupported("`/`")),
        }
    }

    pub fn modulo(&self, rhs: &Value, env: &mut Environment) -> Result<Value, Error> {
        match self {
            Value::Integer(a) => {
                let b = rhs.to_integer(env)?;
                if b == 0 {
                    return Err(Error::DomainError("modulo by zero".into()));
                }
                a.checked_rem(b)
                    .map(Value::Integer)
                    .ok_or_else(|| Error::DomainError("integer overflow in modulo".into()))
            }
            other => Err(other.unsupported("`%`")),
        }
    }

    pub fn pow(&self, rhs: &Value, env: &mut Environment) -> Result<Value, Error> {
        match self {
            Value::Integer(base) => {
                let exponent = rhs.to_integer(env)?;
                if exponent < 0 {
                    // Truncated 1 / base^n
                    return match base {
                        0 => Err(Error::DomainError(
                            "zero raised to a negative exponent".into(),
                        )),
                        1 => Ok(Value::Integer(1)),
                        -1 => Ok(Value::Integer(if exponent % 2 == 0 { 1 } else { -1 })),
                        _ => Ok(Value::Integer(0)),
                    };
                }
                let exponent = u32::try_from(exponent)
                    .map_err(|_| Error::DomainError("integer overflow in exponentiation".into()))?;
                base.checked_pow(exponent)
                    .map(Value::Integer)
                    .ok_or_else(|| Error::DomainError("integer overflow in exponentiation".into()))
            }
            // Join: elements string-coerced, separated by the rhs
            Value::List(items) => {
                let separator = rhs.to_text(env)?;
                let mut parts = Vec::with_capacity(items.len());
                for item in items {
                    parts.push(item.to_text(env)?);
                }
                Ok(Value::String(parts.join(&separator)))
            }
            other => Err(other.unsupported("`^`")),
        }
    }

    /// Total order within the receiver's kind; the right-hand side is
    /// coerced to that kind first.
    pub fn compare(&self, rhs: &Value, env: &mut Environment) -> Result<Ordering, Error> {
        match self {
            Value::Integer(a) => Ok(a.cmp(&rhs.to_integer(env)?)),
            Value::String(a) => Ok(a.as_str().cmp(rhs.to_text(env)?.as_str())),
            Value::Boolean(a) => Ok(a.cmp(&rhs.to_boolean(env)?)),
            Value::List(a) => {
                let b = rhs.to_list(env)?;
                for (left, right) in a.iter().zip(b.iter()) {
                    let ordering = left.compare(right, env)?;
                    if ordering != Ordering::Equal {
                        return Ok(ordering);
                    }
                }
                Ok(a.len().cmp(&b.len()))
            }
            other => Err(other.unsupported("comparison")),
        }
    }

    //
    // Container operations (strings and lists).
    //

    pub fn head(&self) -> Result<Value, Error> {
        match self {
            Value::String(s) => match s.chars().next() {
                Some(c) => Ok(Value::String(c.to_string())),
                None => Err(Error::DomainError("`[` of empty string".into())),
            },
            Value::List(items) => match items.first() {
                Some(first) => Ok(first.clone()),
                None => Err(Error::DomainError("`[` of empty list".into())),
            },
            other => Err(other.unsupported("`[`")),
        }
    }

    pub fn tail(&self) -> Result<Value, Error> {
        match self {
            Value::String(s) => {
                let mut chars = s.chars();
                if chars.next().is_none() {
                    return Err(Error::DomainError("`]` of empty string".into()));
                }
                Ok(Value::String(chars.as_str().to_owned()))
            }
            Value::List(items) => match items.split_first() {
                Some((_, rest)) => Ok(Value::List(rest.to_vec())),
                None => Err(Error::DomainError("`]` of empty list".into())),
            },
            other => Err(other.unsupported("`]`")),
        }
    }

    /// Subrange `[start, start + length)`, clamped to the container
    pub fn get(&self, start: usize, length: usize) -> Result<Value, Error> {
        match self {
            Value::String(s) => {
                let chars: Vec<char> = s.chars().collect();
                let (start, end) = clamp_range(chars.len(), start, length);
                Ok(Value::String(chars[start..end].iter().collect()))
            }
            Value::List(items) => {
                let (start, end) = clamp_range(items.len(), start, length);
                Ok(Value::List(items[start..end].to_vec()))
            }
            other => Err(other.unsupported("`GET`")),
        }
    }

    /// Fresh value with `[start, start + length)` replaced by `replacement`
    /// (coerced to the receiver's kind). A start at or past the end appends.
    pub fn set(
        &self,
        start: usize,
        length: usize,
        replacement: &Value,
        env: &mut Environment,
    ) -> Result<Value, Error> {
        match self {
            Value::String(s) => {
                let chars: Vec<char> = s.chars().collect();
                let (start, end) = clamp_range(chars.len(), start, length);
                let mut out: String = chars[..start].iter().collect();
                out.push_str(&replacement.to_text(env)?);
                out.extend(&chars[end..]);
                Ok(Value::String(out))
            }
            Value::List(items) => {
                let (start, end) = clamp_range(items.len(), start, length);
                let mut out = items[..start].to_vec();
                out.extend(replacement.to_list(env)?);
                out.extend_from_slice(&items[end..]);
                Ok(Value::List(out))
            }
            other => Err(other.unsupported("`SET`")),
        }
    }

    /// Integer to one-character string (low 8 bits), or first character of
    /// a string to its integer value
    pub fn ascii(&self) -> Result<Value, Error> {
        match self {
            Value::Integer(n) => {
                let byte = (*n & 0xFF) as u8;
                Ok(Value::String(char::from(byte).to_string()))
            }
            Value::String(s) => match s.chars().next() {
                Some(c) => Ok(Value::Integer(IntType::from(u32::from(c)))),
                None => Err(Error::DomainError("`ASCII` of empty string".into())),
            },
            other => Err(other.unsupported("`ASCII`")),
        }
    }
}

/// Clamp `[start, start + length)` to a container of `len` elements
fn clamp_range(len: usize, start: usize, length: usize) -> (usize, usize) {
    let start = start.min(len);
    let end = start.saturating_add(length).min(len);
    (start, end)
}

/// Repetition count for `*` on strings and lists: integer-coerced,
/// non-negative, and small enough that the result fits in memory
fn repeat_count(rhs: &Value, unit_len: usize, env: &mut Environment) -> Result<usize, Error> {
    let count = rhs.to_integer(env)?;
    if count < 0 {
        return Err(Error::DomainError("negative repetition count".into()));
    }
    let count = usize::try_from(count)
        .map_err(|_| Error::DomainError("integer overflow in repetition".into()))?;
    if unit_len.checked_mul(count).is_none() {
        return Err(Error::DomainError("integer overflow in repetition".into()));
    }
    Ok(count)
}
