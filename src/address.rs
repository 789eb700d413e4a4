//! The address of a memory cell, with some convenience functions.

use std::fmt::{Display, Formatter};
use std::ops::Add;

use crate::bytecode::Word;
use crate::trace::Fault;

// `AddressNumberType` is `usize`, as it is naturally an index into a memory store.
pub type AddressNumberType = usize;

/// A "pointer" to a memory cell is an index into the VM's memory vector.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub struct Address(pub AddressNumberType);

impl Address {
  /// Converts the address to an index into the memory vector.
  pub fn idx(&self) -> AddressNumberType {
    self.0
  }

  /// Returns the address unchanged if it indexes into a memory of `memory_size` cells.
  pub fn require_in_bounds(self, memory_size: usize) -> Result<Address, Fault> {
    match self.0 < memory_size {
      true  => Ok(self),
      false => Err(Fault::out_of_bounds(self, memory_size))
    }
  }
}

impl From<Word> for Address {
  fn from(operand: Word) -> Address {
    Address(operand as AddressNumberType)
  }
}

impl Display for Address {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "M[{}]", self.0)
  }
}

// Increment an address
impl Add<AddressNumberType> for Address {
  type Output = Address;
  fn add(self, rhs: AddressNumberType) -> Address {
    Address(self.0 + rhs)
  }
}
