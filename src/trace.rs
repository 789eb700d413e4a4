//! Trace logs produced alongside the primary artifacts. Both the assembler and the VM append to
//! an explicit `Trace` accumulator which is serialized once, at the end, as a YAML sequence.

use serde::Serialize;

use crate::address::Address;
use crate::bytecode::{Instruction, Operation, Record, Word};

/// An append-only list of trace entries.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Trace<T> {
  entries: Vec<T>
}

impl<T> Trace<T> {
  pub fn new() -> Trace<T> {
    Trace { entries: Vec::new() }
  }

  pub fn push(&mut self, entry: T) {
    self.entries.push(entry);
  }

  pub fn entries(&self) -> &[T] {
    &self.entries
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

impl<T> Default for Trace<T> {
  fn default() -> Trace<T> {
    Trace::new()
  }
}

impl<T: Serialize> Trace<T> {
  pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(self)
  }
}

/// One record emitted by the assembler. `B` and `C` are the operands as written in the source,
/// `bytes` is the record as written to the image.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct EncodedEntry {
  pub instruction: &'static str,
  #[serde(rename = "A")]
  pub a: u8,
  #[serde(rename = "B")]
  pub b: Word,
  #[serde(rename = "C")]
  pub c: Word,
  pub bytes: Vec<String>,
}

impl EncodedEntry {
  pub fn new(instruction: &Instruction, record: &Record) -> EncodedEntry {
    EncodedEntry {
      instruction: instruction.opcode.mnemonic(),
      a: instruction.opcode.code(),
      b: instruction.b,
      c: instruction.c,
      bytes: record.iter().map(|byte| format!("0x{:02X}", byte)).collect(),
    }
  }
}

/// A recoverable problem met while executing an image.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Fault {
  /// An address operand does not index into memory. The instruction was skipped.
  AddressOutOfBounds {
    address: usize,
    memory_size: usize
  },
  /// The image ended in the middle of a record. Decoding stopped.
  TruncatedRecord {
    available: usize
  },
}

impl Fault {
  pub fn out_of_bounds(address: Address, memory_size: usize) -> Fault {
    Fault::AddressOutOfBounds { address: address.idx(), memory_size }
  }
}

impl std::fmt::Display for Fault {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Fault::AddressOutOfBounds { address, memory_size } => {
        write!(f, "address {} out of bounds for memory of size {}", address, memory_size)
      }
      Fault::TruncatedRecord { available } => {
        write!(f, "record truncated after {} bytes", available)
      }
    }
  }
}

/// One record processed by the VM, whether it executed or was skipped.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ExecutedEntry {
  pub offset: usize,
  pub instruction: &'static str,
  #[serde(rename = "B", skip_serializing_if = "Option::is_none")]
  pub b: Option<Word>,
  #[serde(rename = "C", skip_serializing_if = "Option::is_none")]
  pub c: Option<Word>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub fault: Option<Fault>,
}

impl ExecutedEntry {
  pub fn new(offset: usize, instruction: &Instruction, fault: Option<Fault>) -> ExecutedEntry {
    ExecutedEntry {
      offset,
      instruction: instruction.opcode.mnemonic(),
      b: Some(instruction.b),
      c: Some(instruction.c),
      fault,
    }
  }

  pub fn truncated(offset: usize, opcode: Operation, available: usize) -> ExecutedEntry {
    ExecutedEntry {
      offset,
      instruction: opcode.mnemonic(),
      b: None,
      c: None,
      fault: Some(Fault::TruncatedRecord { available }),
    }
  }

  pub fn is_fault(&self) -> bool {
    self.fault.is_some()
  }
}

/// The memory window written out after execution.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct MemoryDump {
  pub memory_range: [usize; 2],
  pub values: Vec<Word>,
}

impl MemoryDump {
  pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(self)
  }
}
