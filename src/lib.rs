/*!
  An assembler and interpreter for a four-opcode machine over a flat memory.

  ```text
  text -> [`assembler::assemble`] -> image (+ trace) -> [`vm::interpret`] -> dump (+ trace)
  ```

  The binary image is the only thing the two halves share. Its format is described in
  [`bytecode`].
*/

#[macro_use] extern crate prettytable;
#[macro_use] extern crate lazy_static;

pub mod address;
pub mod artifact;
pub mod assembler;
pub mod bytecode;
pub mod error;
pub mod trace;
pub mod vm;

pub use assembler::{assemble, assemble_file, Assembly};
pub use error::Error;
pub use vm::{interpret, interpret_file, Interpretation, VmConfig, Window, VM};
