use std::fmt::{Display, Formatter};
use std::slice::Iter;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum_macros::{Display as StrumDisplay, EnumIter, EnumString, IntoStaticStr};

use super::Word;

/**
  Opcodes of the virtual machine.

  The discriminant of each variant is its opcode byte, so `Operation::code()` and
  `Operation::try_from(u8)` are the only conversions needed between the enum and the binary
  record. The mnemonic used in assembly text is the `strum` serialization of the variant.
*/
#[derive(
  StrumDisplay, IntoStaticStr, EnumString, EnumIter, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq,         PartialEq, Debug,            Hash
)]
#[repr(u8)]
pub enum Operation {
  /// load_const( value, destination )
  #[strum(serialize = "LOAD_CONST")]
  LoadConst  = 0x24,
  /// read_mem( source, destination )
  #[strum(serialize = "READ_MEM")]
  ReadMem    = 0x37,
  /// write_mem( destination, source )
  #[strum(serialize = "WRITE_MEM")]
  WriteMem   = 0x54,
  /// bitreverse( source, destination )
  #[strum(serialize = "BITREVERSE")]
  BitReverse = 0xBA,
}

impl Operation {
  pub fn code(&self) -> u8 {
    Into::<u8>::into(*self)
  }

  pub fn mnemonic(&self) -> &'static str {
    self.into()
  }

  /// Number of operands every instruction takes.
  pub fn arity(&self) -> usize {
    2
  }

  /// Widths in bits of the `B` and `C` fields of the payload.
  pub fn field_widths(&self) -> (u32, u32) {
    match self {
      Operation::LoadConst => (13, 12),
      Operation::ReadMem
      | Operation::WriteMem
      | Operation::BitReverse => (12, 12),
    }
  }

  /**
    The exclusive upper bounds the assembler accepts for `B` and `C`. These are not the field
    widths: `LOAD_CONST` accepts `C < 1024` for a 12 bit field, and every opcode accepts
    `B < 65536` for a 12 or 13 bit field.
  */
  pub fn operand_limits(&self) -> (i64, i64) {
    match self {
      Operation::LoadConst => (1 << 16, 1024),
      Operation::ReadMem
      | Operation::WriteMem
      | Operation::BitReverse => (1 << 16, 1 << 16),
    }
  }
}

/// One decoded or parsed instruction. The operands are stored as written, before any
/// truncation to the payload field widths.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Instruction {
  pub opcode: Operation,
  pub b: Word,
  pub c: Word,
}

impl Instruction {
  pub fn new(opcode: Operation, b: Word, c: Word) -> Instruction {
    Instruction { opcode, b, c }
  }
}

impl Display for Instruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}({}, {})", self.opcode, self.b, self.c)
  }
}

/// An assembled program: instructions in load and execution order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Program {
  instructions: Vec<Instruction>,
}

impl Program {
  pub fn len(&self) -> usize {
    self.instructions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.instructions.is_empty()
  }

  pub fn iter(&self) -> Iter<'_, Instruction> {
    self.instructions.iter()
  }

  pub fn instructions(&self) -> &[Instruction] {
    &self.instructions
  }
}

impl From<Vec<Instruction>> for Program {
  fn from(instructions: Vec<Instruction>) -> Program {
    Program { instructions }
  }
}

impl<'a> IntoIterator for &'a Program {
  type Item = &'a Instruction;
  type IntoIter = Iter<'a, Instruction>;

  fn into_iter(self) -> Self::IntoIter {
    self.instructions.iter()
  }
}
