/*!
  The human readable textual form of bytecode is called assembly. A program is one instruction
  per line, blank lines are ignored, and each instruction is a mnemonic followed by its two
  operands in base 10:

    ```text
    LOAD_CONST 11 4
    BITREVERSE 4 5
    ```

  Lines are tokenized with `nom`; mnemonics are resolved through the `strum` derives of
  `Operation`. Parsing is all-or-nothing: the first bad line aborts the whole program.
*/

use std::str::FromStr;

use nom::{
  branch::alt,
  bytes::complete::{take_till1, take_while, take_while1},
  character::complete::{char as one_char, digit1},
  combinator::{all_consuming, map, opt, recognize},
  multi::many0,
  sequence::{delimited, pair, preceded},
  IResult
};
use thiserror::Error;

use crate::bytecode::{Instruction, Operation, Program, Word};

/// Why a program could not be assembled. Lines are numbered from 1.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum AssemblyError {
  #[error("Error on line {line}: {name} is not an operation.")]
  NotAnOperation {
    line: usize,
    name: String
  },
  #[error("Error on line {line}: {operation} requires {} arguments but was given {given}.", .operation.arity())]
  WrongArity {
    line: usize,
    operation: Operation,
    given: usize
  },
  #[error("Error on line {line}: {token} is not an integer.")]
  NotAnInteger {
    line: usize,
    token: String
  },
  #[error("Error on line {line}: values out of range: B={b}, C={c} for {operation}.")]
  OutOfRange {
    line: usize,
    operation: Operation,
    b: i64,
    c: i64
  },
  #[error("Error on line {line}: could not read instruction: {text}")]
  Malformed {
    line: usize,
    text: String
  },
}

fn token(input: &str) -> IResult<&str, &str> {
  take_till1(char::is_whitespace)(input)
}

fn whitespace0(input: &str) -> IResult<&str, &str> {
  take_while(char::is_whitespace)(input)
}

fn whitespace1(input: &str) -> IResult<&str, &str> {
  take_while1(char::is_whitespace)(input)
}

/// A mnemonic followed by any number of whitespace separated operand tokens.
fn instruction_line(input: &str) -> IResult<&str, (&str, Vec<&str>)> {
  all_consuming(
    delimited(
      whitespace0,
      pair(token, many0(preceded(whitespace1, token))),
      whitespace0
    )
  )(input)
}

/// A base 10 integer with an optional sign. Negative values are accepted here so that they are
/// reported as out of range rather than as not being numbers. Values past the range of `i64`
/// saturate, which keeps them out of range too.
fn integer(input: &str) -> IResult<&str, i64> {
  map(
    recognize(pair(opt(alt((one_char('-'), one_char('+')))), digit1)),
    |digits: &str| match digits.parse::<i64>() {
      Ok(value) => value,
      Err(_e) if digits.starts_with('-') => i64::MIN,
      Err(_e) => i64::MAX
    }
  )(input)
}

fn parse_operand(line: usize, text: &str) -> Result<i64, AssemblyError> {
  match all_consuming(integer)(text) {
    Ok((_rest, value)) => Ok(value),
    Err(_e) => Err(AssemblyError::NotAnInteger { line, token: text.to_string() })
  }
}

/// Parses a single non-blank line.
pub fn parse_line(line: usize, text: &str) -> Result<Instruction, AssemblyError> {
  let (name, operands) = match instruction_line(text) {
    Ok((_rest, parts)) => parts,
    Err(_e) => return Err(AssemblyError::Malformed { line, text: text.to_string() })
  };

  let operation = Operation::from_str(name)
    .map_err(|_e| AssemblyError::NotAnOperation { line, name: name.to_string() })?;

  if operands.len() != operation.arity() {
    return Err(AssemblyError::WrongArity { line, operation, given: operands.len() });
  }

  let b = parse_operand(line, operands[0])?;
  let c = parse_operand(line, operands[1])?;

  let (b_limit, c_limit) = operation.operand_limits();
  if !(0 <= b && b < b_limit && 0 <= c && c < c_limit) {
    return Err(AssemblyError::OutOfRange { line, operation, b, c });
  }

  Ok(Instruction::new(operation, b as Word, c as Word))
}

/// Parses a whole program. Nothing is returned unless every line is valid.
pub fn parse_assembly(text: &str) -> Result<Program, AssemblyError> {
  let mut instructions = Vec::new();

  for (idx, line) in text.lines().enumerate() {
    if line.trim().is_empty() {
      continue;
    }
    instructions.push(parse_line(idx + 1, line)?);
  }

  Ok(instructions.into())
}
