//! Built-in operations registry.
//!
//! Every Knight function is selected by a single source character and has a
//! fixed arity; this module owns the table mapping opcode characters to
//! their operations. The parser consults the table to know how many
//! argument subtrees to consume, and the evaluator invokes the stored
//! function when a node is run.
//!
//! ## One signature for everything
//!
//! Each operation receives its **unevaluated** argument subtrees and the
//! environment, and runs the arguments itself. Most operations run
//! everything up front and dispatch to the value methods in [`crate::ast`];
//! the control-flow operations (`IF`, `WHILE`, `&`, `|`, `BLOCK`, `=`) are
//! exactly the ones that don't.
//!
//! ## Error handling
//!
//! - Type safety: operations reject receiver kinds they are not defined
//!   for (e.g. `- "a" 1` errors)
//! - Overflow detection: integer arithmetic is checked, never wrapping
//! - Domain checks: zero divisors, empty containers and negative counts
//!   are reported with the opcode name
//!
//! ## Adding a new operation
//!
//! 1. Implement the function with the signature
//!    `fn(args: &[Value], env: &mut Environment) -> Result<Value, Error>`
//! 2. Add a `BuiltinOp` entry with its opcode character and arity
//! 3. Add test coverage in the evaluation table below

use std::cmp::Ordering;
use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::rc::Rc;
use std::sync::LazyLock;

use rand::Rng;

use crate::Error;
use crate::ast::{IntType, Value};
use crate::evaluator::{Environment, eval};
use crate::parser::parse_program;

/// Definition of a built-in operation
pub struct BuiltinOp {
    /// Name used in diagnostics: the keyword (`OUTPUT`) or the word the
    /// symbol is read as (`ASSIGN` for `=`); plain symbols keep themselves
    pub name: &'static str,
    /// The source character that selects this operation
    pub opcode: char,
    /// Number of argument subtrees consumed at parse time. The parser
    /// guarantees every node carries exactly this many, so operations may
    /// index their slice freely.
    pub arity: usize,
    /// The implementation; receives unevaluated argument subtrees
    pub func: fn(&[Value], &mut Environment) -> Result<Value, Error>,
}

impl std::fmt::Debug for BuiltinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "BuiltinOp({} `{}`/{})",
            self.name, self.opcode, self.arity
        )
    }
}

//
// Nullary operations
//

/// `P`: one line from standard input, without its line ending.
/// End of input yields null, not an error.
fn builtin_prompt(_args: &[Value], _env: &mut Environment) -> Result<Value, Error> {
    let mut line = String::new();
    let read = io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| Error::IoError(format!("PROMPT: {e}")))?;
    if read == 0 {
        return Ok(Value::Null);
    }
    trim_line_ending(&mut line);
    Ok(Value::String(line))
}

/// Strip at most one trailing `\r` and one `\n`, in either order
fn trim_line_ending(line: &mut String) {
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    } else if line.ends_with('\r') {
        line.pop();
        if line.ends_with('\n') {
            line.pop();
        }
    }
}

/// `R`: a uniform integer in `[0, 2^32)`
fn builtin_random(_args: &[Value], _env: &mut Environment) -> Result<Value, Error> {
    Ok(Value::Integer(rand::thread_rng().gen_range(0..(1_i64 << 32))))
}

//
// Unary operations
//

/// `E`: parse the string-coerced argument as a program and run it against
/// the same environment, so evaluated code shares the caller's variables
fn builtin_eval(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    let source = eval(&args[0], env)?.to_text(env)?;
    let program = parse_program(&source, env)?;
    eval(&program, env)
}

/// `B`: the argument subtree itself, unevaluated
fn builtin_block(args: &[Value], _env: &mut Environment) -> Result<Value, Error> {
    Ok(args[0].clone())
}

/// `C`: run the argument, then run the result again; the counterpart that
/// forces a `B` value
fn builtin_call(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    let block = eval(&args[0], env)?;
    eval(&block, env)
}

/// `` ` ``: run the string-coerced argument through the host's command
/// processor and capture its stdout
#[cfg(feature = "shell")]
fn builtin_shell(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    let command = eval(&args[0], env)?.to_text(env)?;

    let mut shell = if cfg!(windows) {
        let mut c = std::process::Command::new("cmd");
        c.arg("/C");
        c
    } else {
        let mut c = std::process::Command::new("sh");
        c.arg("-c");
        c
    };

    let output = shell
        .arg(&command)
        .output()
        .map_err(|e| Error::IoError(format!("SHELL: {e}")))?;
    Ok(Value::String(
        String::from_utf8_lossy(&output.stdout).into_owned(),
    ))
}

/// `Q`: terminate the process with the integer-coerced exit code
fn builtin_quit(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    let code = eval(&args[0], env)?.to_integer(env)?;
    std::process::exit(code as i32)
}

fn builtin_not(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    let b = eval(&args[0], env)?.to_boolean(env)?;
    Ok(Value::Boolean(!b))
}

fn builtin_negate(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    let n = eval(&args[0], env)?.to_integer(env)?;
    n.checked_neg()
        .map(Value::Integer)
        .ok_or_else(|| Error::DomainError("integer overflow in negation".into()))
}

fn builtin_ascii(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    eval(&args[0], env)?.ascii()
}

/// `L`: length of the list-coerced argument, so strings count characters
/// and integers count digits
fn builtin_length(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    let items = eval(&args[0], env)?.to_list(env)?;
    Ok(Value::Integer(items.len() as IntType))
}

/// `D`: write the dump form to stdout (no newline) and pass the value
/// through, which makes it usable mid-expression for inspection
fn builtin_dump(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    let value = eval(&args[0], env)?;
    let mut out = io::stdout().lock();
    write!(out, "{value}").map_err(|e| Error::IoError(format!("DUMP: {e}")))?;
    out.flush().map_err(|e| Error::IoError(format!("DUMP: {e}")))?;
    Ok(value)
}

/// How `O` renders a string: a trailing backslash is removed and
/// suppresses the newline
fn output_form(text: &str) -> (&str, bool) {
    match text.strip_suffix('\\') {
        Some(body) => (body, false),
        None => (text, true),
    }
}

/// `O`: write the string-coerced argument and a newline; returns null
fn builtin_output(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    let text = eval(&args[0], env)?.to_text(env)?;
    let (body, newline) = output_form(&text);

    let mut out = io::stdout().lock();
    let result = if newline {
        writeln!(out, "{body}")
    } else {
        write!(out, "{body}").and_then(|()| out.flush())
    };
    result.map_err(|e| Error::IoError(format!("OUTPUT: {e}")))?;
    Ok(Value::Null)
}

/// `,`: the run argument wrapped in a one-element list
fn builtin_box(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    Ok(Value::List(vec![eval(&args[0], env)?]))
}

fn builtin_head(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    eval(&args[0], env)?.head()
}

fn builtin_tail(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    eval(&args[0], env)?.tail()
}

//
// Binary operations
//

// Macro to generate the arithmetic operations: run both arguments, then
// dispatch on the left-hand side's kind
macro_rules! arithmetic_op {
    ($name:ident, $method:ident) => {
        fn $name(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
            let lhs = eval(&args[0], env)?;
            let rhs = eval(&args[1], env)?;
            lhs.$method(&rhs, env)
        }
    };
}

arithmetic_op!(builtin_add, add);
arithmetic_op!(builtin_sub, sub);
arithmetic_op!(builtin_mul, mul);
arithmetic_op!(builtin_div, div);
arithmetic_op!(builtin_mod, modulo);
arithmetic_op!(builtin_pow, pow);

// Macro to generate the strict comparisons
macro_rules! comparison_op {
    ($name:ident, $ordering:pat) => {
        fn $name(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
            let lhs = eval(&args[0], env)?;
            let rhs = eval(&args[1], env)?;
            Ok(Value::Boolean(matches!(
                lhs.compare(&rhs, env)?,
                $ordering
            )))
        }
    };
}

comparison_op!(builtin_less, Ordering::Less);
comparison_op!(builtin_greater, Ordering::Greater);

/// `?`: structural equality, no coercion
fn builtin_equals(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    let lhs = eval(&args[0], env)?;
    let rhs = eval(&args[1], env)?;
    Ok(Value::Boolean(lhs == rhs))
}

// Macro to generate `&` and `|`: the deciding value itself is returned,
// not its boolean coercion, and the right-hand side only runs when the
// left doesn't decide
macro_rules! short_circuit_op {
    ($name:ident, $decides:literal) => {
        fn $name(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
            let lhs = eval(&args[0], env)?;
            if lhs.to_boolean(env)? == $decides {
                return Ok(lhs);
            }
            eval(&args[1], env)
        }
    };
}

short_circuit_op!(builtin_and, false);
short_circuit_op!(builtin_or, true);

/// `;`: run the left for its effect, return the right
fn builtin_then(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    eval(&args[0], env)?;
    eval(&args[1], env)
}

/// `W`: re-run the condition before every iteration; always returns null
fn builtin_while(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    while args[0].to_boolean(env)? {
        eval(&args[1], env)?;
    }
    Ok(Value::Null)
}

/// `=`: write a variable's binding cell. A non-variable left-hand side is
/// run and string-coerced, and that name's variable is the target.
fn builtin_assign(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    let variable = match &args[0] {
        Value::Variable(var) => Rc::clone(var),
        other => {
            let name = eval(other, env)?.to_text(env)?;
            env.lookup_or_intern(&name)
        }
    };
    let value = eval(&args[1], env)?;
    variable.assign(value.clone());
    Ok(value)
}

//
// Ternary and quaternary operations
//

fn builtin_if(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    if args[0].to_boolean(env)? {
        eval(&args[1], env)
    } else {
        eval(&args[2], env)
    }
}

/// A run-and-integer-coerced index or count; negative is out of domain
fn count_arg(arg: &Value, env: &mut Environment, op_name: &str) -> Result<usize, Error> {
    let n = arg.to_integer(env)?;
    usize::try_from(n).map_err(|_| {
        Error::DomainError(format!("`{op_name}` requires a non-negative count, got {n}"))
    })
}

fn builtin_get(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    let container = eval(&args[0], env)?;
    let start = count_arg(&args[1], env, "GET")?;
    let length = count_arg(&args[2], env, "GET")?;
    container.get(start, length)
}

fn builtin_set(args: &[Value], env: &mut Environment) -> Result<Value, Error> {
    let container = eval(&args[0], env)?;
    let start = count_arg(&args[1], env, "SET")?;
    let length = count_arg(&args[2], env, "SET")?;
    let replacement = eval(&args[3], env)?;
    container.set(start, length, &replacement, env)
}

/// Global registry of all built-in operations.
///
/// The registry is populated once at first use and frozen thereafter; the
/// parser stores `&'static` references into it, which is what makes
/// function nodes cheap to clone.
static BUILTIN_OPS: LazyLock<Vec<BuiltinOp>> = LazyLock::new(|| {
    let mut ops = vec![
        // Input sources
        BuiltinOp {
            name: "PROMPT",
            opcode: 'P',
            arity: 0,
            func: builtin_prompt,
        },
        BuiltinOp {
            name: "RANDOM",
            opcode: 'R',
            arity: 0,
            func: builtin_random,
        },
        // Metaprogramming
        BuiltinOp {
            name: "EVAL",
            opcode: 'E',
            arity: 1,
            func: builtin_eval,
        },
        BuiltinOp {
            name: "BLOCK",
            opcode: 'B',
            arity: 1,
            func: builtin_block,
        },
        BuiltinOp {
            name: "CALL",
            opcode: 'C',
            arity: 1,
            func: builtin_call,
        },
        BuiltinOp {
            name: "QUIT",
            opcode: 'Q',
            arity: 1,
            func: builtin_quit,
        },
        // Unary value operations
        BuiltinOp {
            name: "NOT",
            opcode: '!',
            arity: 1,
            func: builtin_not,
        },
        BuiltinOp {
            name: "NEG",
            opcode: '~',
            arity: 1,
            func: builtin_negate,
        },
        BuiltinOp {
            name: "ASCII",
            opcode: 'A',
            arity: 1,
            func: builtin_ascii,
        },
        BuiltinOp {
            name: "LENGTH",
            opcode: 'L',
            arity: 1,
            func: builtin_length,
        },
        BuiltinOp {
            name: "DUMP",
            opcode: 'D',
            arity: 1,
            func: builtin_dump,
        },
        BuiltinOp {
            name: "OUTPUT",
            opcode: 'O',
            arity: 1,
            func: builtin_output,
        },
        BuiltinOp {
            name: "BOX",
            opcode: ',',
            arity: 1,
            func: builtin_box,
        },
        BuiltinOp {
            name: "HEAD",
            opcode: '[',
            arity: 1,
            func: builtin_head,
        },
        BuiltinOp {
            name: "TAIL",
            opcode: ']',
            arity: 1,
            func: builtin_tail,
        },
        // Arithmetic
        BuiltinOp {
            name: "+",
            opcode: '+',
            arity: 2,
            func: builtin_add,
        },
        BuiltinOp {
            name: "-",
            opcode: '-',
            arity: 2,
            func: builtin_sub,
        },
        BuiltinOp {
            name: "*",
            opcode: '*',
            arity: 2,
            func: builtin_mul,
        },
        BuiltinOp {
            name: "/",
            opcode: '/',
            arity: 2,
            func: builtin_div,
        },
        BuiltinOp {
            name: "%",
            opcode: '%',
            arity: 2,
            func: builtin_mod,
        },
        BuiltinOp {
            name: "^",
            opcode: '^',
            arity: 2,
            func: builtin_pow,
        },
        // Comparison and equality
        BuiltinOp {
            name: "<",
            opcode: '<',
            arity: 2,
            func: builtin_less,
        },
        BuiltinOp {
            name: ">",
            opcode: '>',
            arity: 2,
            func: builtin_greater,
        },
        BuiltinOp {
            name: "?",
            opcode: '?',
            arity: 2,
            func: builtin_equals,
        },
        // Control flow
        BuiltinOp {
            name: "AND",
            opcode: '&',
            arity: 2,
            func: builtin_and,
        },
        BuiltinOp {
            name: "OR",
            opcode: '|',
            arity: 2,
            func: builtin_or,
        },
        BuiltinOp {
            name: "THEN",
            opcode: ';',
            arity: 2,
            func: builtin_then,
        },
        BuiltinOp {
            name: "WHILE",
            opcode: 'W',
            arity: 2,
            func: builtin_while,
        },
        BuiltinOp {
            name: "ASSIGN",
            opcode: '=',
            arity: 2,
            func: builtin_assign,
        },
        BuiltinOp {
            name: "IF",
            opcode: 'I',
            arity: 3,
            func: builtin_if,
        },
        // Container access
        BuiltinOp {
            name: "GET",
            opcode: 'G',
            arity: 3,
            func: builtin_get,
        },
        BuiltinOp {
            name: "SET",
            opcode: 'S',
            arity: 4,
            func: builtin_set,
        },
    ];

    #[cfg(feature = "shell")]
    ops.push(BuiltinOp {
        name: "SHELL",
        opcode: '`',
        arity: 1,
        func: builtin_shell,
    });

    ops
});

/// Lazy static map from opcode character to BuiltinOp (private - use find_op)
static BUILTIN_INDEX: LazyLock<HashMap<char, &'static BuiltinOp>> = LazyLock::new(|| {
    let ops: &'static [BuiltinOp] = BUILTIN_OPS.as_slice();
    ops.iter().map(|op| (op.opcode, op)).collect()
});

/// Find a builtin operation by its opcode character
pub fn find_op(opcode: char) -> Option<&'static BuiltinOp> {
    BUILTIN_INDEX.get(&opcode).copied()
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::ast::val;

    /// Evaluate one source program in a fresh environment
    fn run_source(source: &str) -> Result<Value, Error> {
        let mut env = Environment::new();
        crate::run(source, &mut env)
    }

    /// Micro-helper for success cases in comprehensive tests
    fn success<T: Into<Value>>(value: T) -> Option<Value> {
        Some(val(value))
    }

    #[test]
    fn test_registry() {
        let prompt = find_op('P').unwrap();
        assert_eq!(prompt.name, "PROMPT");
        assert_eq!(prompt.arity, 0);

        let set = find_op('S').unwrap();
        assert_eq!(set.name, "SET");
        assert_eq!(set.arity, 4);

        let assign = find_op('=').unwrap();
        assert_eq!(assign.name, "ASSIGN");
        assert_eq!(assign.arity, 2);

        // QUIT terminates the process, so only its registration is checked
        let quit = find_op('Q').unwrap();
        assert_eq!(quit.name, "QUIT");
        assert_eq!(quit.arity, 1);

        // Unknown opcodes miss; lowercase never names a function
        assert!(find_op('X').is_none());
        assert!(find_op('p').is_none());

        // Every opcode maps to exactly one operation
        assert_eq!(BUILTIN_INDEX.len(), BUILTIN_OPS.len());
    }

    #[test]
    #[cfg(feature = "shell")]
    fn test_shell_is_registered() {
        let shell = find_op('`').unwrap();
        assert_eq!(shell.name, "SHELL");
        assert_eq!(shell.arity, 1);
    }

    #[test]
    fn test_evaluation_comprehensive() {
        // (source, expected final value; None expects an error)
        type TestCase = (&'static str, Option<Value>);

        let test_cases: Vec<TestCase> = vec![
            // ===== ARITHMETIC =====
            ("+ 1 2", success(3)),
            ("+ 5 \"3\"", success(8)),
            ("+ \"hello, \" \"world\"", success("hello, world")),
            ("+ \"n=\" 4", success("n=4")),
            ("+ @ 1", success([1])), // list concat; rhs list-coerced to digits
            ("- 5 8", success(-3)),
            ("* 6 7", success(42)),
            ("* \"ab\" 3", success("ababab")),
            ("* \"ab\" 0", success("")),
            ("/ 7 2", success(3)),
            ("/ ~7 2", success(-3)), // truncation toward zero
            ("% 7 3", success(1)),
            ("^ 2 10", success(1024)),
            ("^ 2 0", success(1)),
            ("^ 2 ~1", success(0)),
            ("^ + @ 1 \"\"", success("1")), // list join
            ("~ 5", success(-5)),
            ("~ ~5", success(5)),
            // Algebraic identities
            ("+ 17 0", success(17)),
            ("* 17 1", success(17)),
            ("- 17 17", success(0)),
            ("% 17 17", success(0)),
            ("/ 0 17", success(0)),
            // Arithmetic errors
            ("/ 1 0", None),
            ("% 1 0", None),
            ("+ T 1", None),
            ("+ N 1", None),
            ("- \"a\" 1", None),
            ("* \"ab\" ~1", None),
            // ===== COMPARISON AND EQUALITY =====
            ("< 1 2", success(true)),
            ("< 2 1", success(false)),
            ("< 2 2", success(false)), // strict
            ("> 2 1", success(true)),
            ("< \"abc\" \"abd\"", success(true)),
            ("< \"10\" 9", success(true)), // rhs string-coerced
            ("< F T", success(true)),
            ("< N N", None), // null does not compare
            ("? 1 1", success(true)),
            ("? 1 2", success(false)),
            ("? \"1\" 1", success(false)), // no coercion
            ("? @ @", success(true)),
            ("? N N", success(true)),
            ("? + 1 2 3", success(true)),
            // ===== LOGIC =====
            ("! T", success(false)),
            ("! \"\"", success(true)),
            ("! 0", success(true)),
            // The deciding run value is returned, not a boolean
            ("& 0 1", success(0)),
            ("& 1 2", success(2)),
            ("| 0 2", success(2)),
            ("| 1 2", success(1)),
            ("& \"\" \"x\"", success("")),
            ("| \"a\" \"b\"", success("a")),
            // The right-hand side must not run when the left decides
            ("& F QUIT 1", success(false)),
            ("| T QUIT 1", success(true)),
            // ===== STRINGS, LISTS, CONTAINERS =====
            ("A 72", success("H")),
            ("A \"Hi\"", success(72)),
            ("A \"\"", None),
            ("L \"hello\"", success(5)),
            ("L 123", success(3)), // digit count via list coercion
            ("L @", success(0)),
            ("L , T", success(1)),
            (", 1", success([1])),
            ("[ , 1", success(1)),
            ("] , 1", success(Vec::<Value>::new())),
            ("[ \"abc\"", success("a")),
            ("] \"abc\"", success("bc")),
            ("[ \"\"", None),
            ("] @", None),
            ("G \"abcdef\" 1 3", success("bcd")),
            ("G \"abc\" 1 99", success("bc")), // clamps
            ("S \"abcd\" 1 2 \"XY\"", success("aXYd")),
            ("S \"ab\" 9 0 \"!\"", success("ab!")), // start past the end appends
            ("S \"abc\" 1 1 5", success("a5c")),    // replacement string-coerced
            ("G 1 0 0", None),
            ("G \"abc\" ~1 1", None),
            // ===== CONTROL FLOW =====
            ("I T 1 2", success(1)),
            ("I F 1 2", success(2)),
            ("I 0 1 2", success(2)),   // condition boolean-coerced
            ("I \"x\" 1 2", success(1)),
            ("; 1 2", success(2)),
            ("W F 1", Some(Value::Null)), // zero iterations, returns null
            // ===== VARIABLES =====
            ("= x 5", success(5)),
            ("; = x 5 x", success(5)),
            ("; = x 5 ; = x + x 1 x", success(6)),
            // Assigning to a non-variable goes through its string form
            ("; = \"dynamic\" 7 dynamic", success(7)),
            ("nowhere", None), // unbound read
            // ===== BLOCK / CALL / EVAL =====
            ("C B 42", success(42)),
            ("; = f B + 1 2 C f", success(3)),
            ("; = x 9 ; = f B x C f", success(9)), // late binding
            ("E \"+ 1 2\"", success(3)),
            ("; = a 5 E \"a\"", success(5)), // evaluated code shares variables
            ("E \"\"", None),                // empty program
            // ===== COERCION PIPELINES =====
            ("+ \"\" + 1 + 2 3", success("6")),
            ("+ 0 \"12x\"", success(12)),
            ("+ 0 T", success(1)),
            ("+ 0 @", success(0)),
        ];

        for (source, expected) in test_cases {
            let result = run_source(source);
            match (result, expected) {
                (Ok(actual), Some(expected_val)) => {
                    assert_eq!(actual, expected_val, "Failed for program: {source}");
                }
                (Err(_), None) => {} // Expected error
                (actual, expected) => panic!(
                    "Unexpected result for program: {}\nGot ok: {:?}, Expected ok: {:?}",
                    source,
                    actual.is_ok(),
                    expected.is_some()
                ),
            }
        }
    }

    #[test]
    fn test_while_accumulates() {
        // Sum of 10..=1, the classic countdown loop
        let source = "; = n 10 ; = s 0 ; W n ; = s + s n = n - n 1 s";
        assert_eq!(run_source(source).unwrap(), val(55));
    }

    #[test]
    fn test_box_nesting_dumps_as_nested_lists() {
        let value = run_source(", , , 1").unwrap();
        assert_eq!(format!("{value}"), "[[[1]]]");
    }

    #[test]
    fn test_dump_returns_its_value() {
        assert_eq!(run_source("+ 1 D 2").unwrap(), val(3));
    }

    #[test]
    fn test_output_returns_null() {
        assert_eq!(run_source("O \"scenario\"").unwrap(), Value::Null);
    }

    #[test]
    fn test_equality_on_blocks_is_by_node() {
        // The same node equals itself; two textually identical blocks do not
        assert_eq!(run_source("; = f B + 1 2 ? f f").unwrap(), val(true));
        assert_eq!(run_source("? B + 1 2 B + 1 2").unwrap(), val(false));
    }

    #[test]
    fn test_output_form() {
        assert_eq!(output_form("plain"), ("plain", true));
        assert_eq!(output_form("no newline\\"), ("no newline", false));
        assert_eq!(output_form("\\"), ("", false));
        // Only the final backslash is special
        assert_eq!(output_form("a\\b"), ("a\\b", true));
        assert_eq!(output_form("two\\\\"), ("two\\", false));
    }

    #[test]
    fn test_trim_line_ending() {
        let cases = [
            ("line\n", "line"),
            ("line\r\n", "line"),
            ("line\n\r", "line"),
            ("line\r", "line"),
            ("line", "line"),
            ("line\n\n", "line\n"), // at most one of each
            ("line\r\r", "line\r"),
            ("", ""),
        ];
        for (input, expected) in cases {
            let mut line = input.to_owned();
            trim_line_ending(&mut line);
            assert_eq!(line, expected, "input {input:?}");
        }
    }

    #[test]
    fn test_random_is_in_range() {
        for _ in 0..64 {
            let Value::Integer(n) = run_source("R").unwrap() else {
                panic!("RANDOM must return an integer");
            };
            assert!((0..(1_i64 << 32)).contains(&n));
        }
    }

    #[test]
    #[cfg(all(feature = "shell", unix))]
    fn test_shell_captures_stdout() {
        assert_eq!(run_source("` \"printf ok\"").unwrap(), val("ok"));
    }
}
