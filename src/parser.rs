//! Source text to value tree.
//!
//! Knight needs no token stream: after stripping filler (whitespace,
//! parentheses, `:` and `#`-comments, all equivalent), the first character
//! decides which of the seven parse rules applies, and function arity
//! drives the recursion. A program is a single expression; anything after
//! it is ignored.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, satisfy},
    combinator::{recognize, value},
    multi::many0,
    sequence::{pair, preceded},
};

use crate::ast::{IntType, Value};
use crate::builtinops::find_op;
use crate::evaluator::Environment;
use crate::{Error, ParseError, ParseErrorKind};

/// Filler between tokens: whitespace, the grouping sugar `(` `)` `:`
/// (no semantic effect) and `#` line comments
fn filler(input: &str) -> IResult<&str, Vec<()>> {
    many0(alt((
        value(
            (),
            take_while1(|c: char| c.is_ascii_whitespace() || matches!(c, '(' | ')' | ':')),
        ),
        value((), preceded(char('#'), take_while(|c| c != '\n'))),
    )))
    .parse(input)
}

/// An identifier: a lowercase letter or underscore, then lowercase
/// letters, digits and underscores
fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c| c.is_ascii_lowercase() || c == '_'),
        take_while(|c: char| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'),
    ))
    .parse(input)
}

/// A run of decimal digits (integer literals carry no sign; `~` negates)
fn integer_literal(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_digit()).parse(input)
}

/// A run of uppercase letters: a keyword spelling whose first letter is
/// the opcode (`OUTPUT`, `OUT` and `O` are the same function)
fn keyword(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_uppercase()).parse(input)
}

/// Byte offset of `rest` within `source`, for error context snippets
fn offset(source: &str, rest: &str) -> usize {
    source.len() - rest.len()
}

/// Parse one expression. `Ok((rest, None))` means the input was exhausted
/// after stripping filler; the caller decides whether that is an empty
/// program or a missing argument.
fn parse_expr<'a>(
    source: &'a str,
    input: &'a str,
    env: &mut Environment,
) -> Result<(&'a str, Option<Value>), Error> {
    // Filler matches the empty string, so stripping it cannot fail
    let input = filler(input).map(|(rest, _)| rest).unwrap_or(input);

    let Some(first) = input.chars().next() else {
        return Ok((input, None));
    };

    match first {
        c if c.is_ascii_digit() => {
            let (rest, digits) = integer_literal(input)
                .map_err(|_| invalid_syntax(source, input, first))?;
            match digits.parse::<IntType>() {
                Ok(n) => Ok((rest, Some(Value::Integer(n)))),
                Err(_) => Err(Error::ParseError(ParseError::with_context_and_found(
                    ParseErrorKind::ImplementationLimit,
                    "integer literal does not fit the native integer width",
                    source,
                    offset(source, input),
                    Some(digits.to_owned()),
                ))),
            }
        }

        '"' | '\'' => parse_string_literal(source, input, first),

        c if c.is_ascii_lowercase() || c == '_' => {
            let (rest, name) =
                identifier(input).map_err(|_| invalid_syntax(source, input, first))?;
            Ok((rest, Some(Value::Variable(env.lookup_or_intern(name)))))
        }

        '@' => Ok((&input[1..], Some(Value::List(vec![])))),

        c if c.is_ascii_uppercase() => {
            let (rest, _word) = keyword(input).map_err(|_| invalid_syntax(source, input, first))?;
            // The opcode is the first letter; the rest of the run is
            // spelling and is discarded
            match first {
                'T' => Ok((rest, Some(Value::Boolean(true)))),
                'F' => Ok((rest, Some(Value::Boolean(false)))),
                'N' => Ok((rest, Some(Value::Null))),
                opcode => parse_function(source, input, rest, opcode, env),
            }
        }

        opcode => {
            let rest = &input[opcode.len_utf8()..];
            parse_function(source, input, rest, opcode, env)
        }
    }
}

/// A string literal delimited by matching `"` or `'`. No escapes;
/// newlines are allowed inside; unterminated is fatal.
fn parse_string_literal<'a>(
    source: &'a str,
    input: &'a str,
    quote: char,
) -> Result<(&'a str, Option<Value>), Error> {
    let body = &input[1..];
    match body.find(quote) {
        Some(end) => Ok((
            &body[end + 1..],
            Some(Value::String(body[..end].to_owned())),
        )),
        None => Err(Error::ParseError(ParseError::with_context(
            ParseErrorKind::UnterminatedString,
            format!("string literal opened with {quote} is never closed"),
            source,
            offset(source, input),
        ))),
    }
}

/// Look up the opcode, then parse exactly `arity` argument expressions.
/// The registry is consulted before any argument work, so an unknown
/// opcode fails immediately.
fn parse_function<'a>(
    source: &'a str,
    at: &'a str,
    mut rest: &'a str,
    opcode: char,
    env: &mut Environment,
) -> Result<(&'a str, Option<Value>), Error> {
    let Some(op) = find_op(opcode) else {
        return Err(Error::ParseError(ParseError::with_context_and_found(
            ParseErrorKind::UnknownFunction,
            format!("unknown function `{opcode}`"),
            source,
            offset(source, at),
            Some(opcode.to_string()),
        )));
    };

    let mut args = Vec::with_capacity(op.arity);
    for index in 0..op.arity {
        let (next, arg) = parse_expr(source, rest, env)?;
        let Some(arg) = arg else {
            return Err(Error::ParseError(ParseError::with_context(
                ParseErrorKind::MissingArgument,
                format!(
                    "`{}` requires {} arguments, found only {}",
                    op.name, op.arity, index
                ),
                source,
                offset(source, rest),
            )));
        };
        args.push(arg);
        rest = next;
    }

    Ok((
        rest,
        Some(Value::Function {
            op,
            args: args.into(),
        }),
    ))
}

fn invalid_syntax(source: &str, at: &str, found: char) -> Error {
    Error::ParseError(ParseError::with_context_and_found(
        ParseErrorKind::InvalidSyntax,
        "no parse rule matches here",
        source,
        offset(source, at),
        Some(found.to_string()),
    ))
}

/// Parse a complete Knight program: one expression, with any trailing
/// text ignored. All-filler input is an error surfaced to the driver.
pub fn parse_program(source: &str, env: &mut Environment) -> Result<Value, Error> {
    let (_rest, program) = parse_expr(source, source, env)?;
    program.ok_or_else(|| {
        Error::ParseError(ParseError::from_message(
            ParseErrorKind::EmptyProgram,
            "program contains no expression",
        ))
    })
}
