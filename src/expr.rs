// Arithmetic expression evaluator for text cells

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, char, digit0, digit1, multispace0, one_of},
    combinator::{all_consuming, map_res, opt, recognize},
    error::{Error, ErrorKind},
    number::complete::recognize_float,
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};
use std::f64::consts::{E, PI};

// Nesting deeper than this (parentheses, unary signs, exponents) is rejected.
const MAX_DEPTH: usize = 64;

/// Evaluate an arithmetic expression to a number.
///
/// Supports `+ - * / %` (modulo), `^`, unary signs, parentheses, postfix `%`
/// (percent, `50%` is `0.5`) and the constants `pi`, `e` and `Infinity`.
/// Returns `None` when the whole input is not a valid expression or nests
/// too deeply.
pub fn evaluate(input: &str) -> Option<f64> {
    all_consuming(delimited(multispace0, |i| expr(i, 0), multispace0))(input)
        .ok()
        .map(|(_, value)| value)
}

/// Read the longest leading number of `input`, ignoring leading whitespace.
///
/// `"12abc"` reads as `12`, `"1,000"` as `1` and `"-Infinity!"` as negative
/// infinity. Returns `None` when the text does not start with a number.
pub fn leading_number(input: &str) -> Option<f64> {
    alt((map_res(decimal, |s: &str| s.parse::<f64>()), infinity))(input.trim_start())
        .ok()
        .map(|(_, value)| value)
}

fn decimal(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        opt(one_of("+-")),
        alt((
            recognize(pair(digit1, opt(pair(char('.'), digit0)))),
            recognize(pair(char('.'), digit1)),
        )),
        opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
    )))(input)
}

fn infinity(input: &str) -> IResult<&str, f64> {
    let (input, sign) = opt(one_of("+-"))(input)?;
    let (input, _) = tag("Infinity")(input)?;
    let value = if sign == Some('-') {
        f64::NEG_INFINITY
    } else {
        f64::INFINITY
    };
    Ok((input, value))
}

fn expr(input: &str, depth: usize) -> IResult<&str, f64> {
    let (mut input, mut acc) = term(input, depth)?;
    loop {
        match preceded(multispace0, one_of("+-"))(input) {
            Ok((rest, op)) => {
                let (rest, rhs) = term(rest, depth)?;
                acc = if op == '+' { acc + rhs } else { acc - rhs };
                input = rest;
            }
            Err(nom::Err::Error(_)) => return Ok((input, acc)),
            Err(e) => return Err(e),
        }
    }
}

fn term(input: &str, depth: usize) -> IResult<&str, f64> {
    let (mut input, mut acc) = unary(input, depth)?;
    loop {
        match preceded(multispace0, one_of("*/%"))(input) {
            Ok((rest, op)) => {
                let (rest, rhs) = unary(rest, depth)?;
                acc = match op {
                    '*' => acc * rhs,
                    '/' => acc / rhs,
                    _ => modulo(acc, rhs),
                };
                input = rest;
            }
            Err(nom::Err::Error(_)) => return Ok((input, acc)),
            Err(e) => return Err(e),
        }
    }
}

fn unary(input: &str, depth: usize) -> IResult<&str, f64> {
    if depth > MAX_DEPTH {
        return Err(nom::Err::Failure(Error::new(input, ErrorKind::TooLarge)));
    }
    let (input, _) = multispace0(input)?;
    if let Ok((rest, sign)) = one_of::<_, _, Error<&str>>("+-")(input) {
        let (rest, value) = unary(rest, depth + 1)?;
        return Ok((rest, if sign == '-' { -value } else { value }));
    }
    power(input, depth)
}

// Right associative: 2^3^2 == 2^9
fn power(input: &str, depth: usize) -> IResult<&str, f64> {
    let (input, base) = postfix(input, depth)?;
    match preceded(multispace0, char('^'))(input) {
        Ok((rest, _)) => {
            let (rest, exponent) = unary(rest, depth + 1)?;
            Ok((rest, base.powf(exponent)))
        }
        Err(nom::Err::Error(_)) => Ok((input, base)),
        Err(e) => Err(e),
    }
}

fn postfix(input: &str, depth: usize) -> IResult<&str, f64> {
    let (mut input, mut value) = atom(input, depth)?;
    loop {
        let attempt: IResult<&str, char> = preceded(multispace0, char('%'))(input);
        match attempt {
            Ok((rest, _)) if !starts_operand(rest) => {
                value /= 100.0;
                input = rest;
            }
            _ => return Ok((input, value)),
        }
    }
}

fn atom(input: &str, depth: usize) -> IResult<&str, f64> {
    preceded(
        multispace0,
        alt((
            map_res(recognize_float, |s: &str| s.parse::<f64>()),
            delimited(
                char('('),
                |i| expr(i, depth + 1),
                preceded(multispace0, char(')')),
            ),
            map_res(alpha1, constant),
        )),
    )(input)
}

fn constant(name: &str) -> Result<f64, String> {
    match name {
        "pi" | "PI" => Ok(PI),
        "e" | "E" => Ok(E),
        "Infinity" => Ok(f64::INFINITY),
        _ => Err(format!("Unknown symbol '{}'", name)),
    }
}

fn starts_operand(rest: &str) -> bool {
    rest.trim_start()
        .chars()
        .next()
        .map_or(false, |c| c.is_ascii_digit() || c == '.' || c == '(' || c.is_alphabetic())
}

// Result takes the sign of the divisor; x mod 0 is x.
fn modulo(x: f64, y: f64) -> f64 {
    if y == 0.0 {
        x
    } else {
        x - y * (x / y).floor()
    }
}
