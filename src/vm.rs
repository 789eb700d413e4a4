//! Structures and functions for the virtual machine: a flat, fixed-size memory of cells and an
//! executor for the four operations on it.

use std::fmt::{Display, Formatter};
use std::fs;
use std::path::Path;

use prettytable::{format as TableFormat, Table};

use crate::address::Address;
use crate::artifact::write_all_or_nothing;
use crate::bytecode::{decode_image, DecodedRecord, Instruction, Operation, Word};
use crate::error::Error;
use crate::trace::{ExecutedEntry, Fault, MemoryDump, Trace};

pub type Cell = Word;

pub const DEFAULT_MEMORY_SIZE: usize = 1024;

/// Runtime configuration of the machine.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct VmConfig {
  /// Number of cells of memory. Memory never grows past this.
  pub memory_size: usize,
}

impl Default for VmConfig {
  fn default() -> VmConfig {
    VmConfig { memory_size: DEFAULT_MEMORY_SIZE }
  }
}

/// The half-open range of addresses `[start, end)` dumped after execution.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Window {
  pub start: usize,
  pub end: usize,
}

impl Window {
  pub fn new(start: usize, end: usize) -> Window {
    Window { start, end }
  }

  pub fn require_in_bounds(&self, memory_size: usize) -> Result<(), Error> {
    match self.start <= self.end && self.end <= memory_size {
      true  => Ok(()),
      false => Err(Error::WindowOutOfBounds { start: self.start, end: self.end, memory_size })
    }
  }
}

/// Reverses the order of the low 8 bits of `value`. Higher bits are discarded.
pub fn reverse_bits_8(value: Cell) -> Cell {
  (value as u8).reverse_bits() as Cell
}

pub struct VM {
  // Memory Store
  memory: Vec<Cell>,
  // The most recently written cell, highlighted when displayed.
  last_written: Option<usize>,
  // One entry per executed or skipped record.
  trace: Trace<ExecutedEntry>,
}

impl VM {

  // region Display methods

  fn make_memory_table<'a, I>(cells: I, highlight: Option<usize>) -> Table
    where I: Iterator<Item = (Address, &'a Cell)>
  {
    let mut table = Table::new();

    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Address", ubl->"Contents"]);

    for (address, cell) in cells {
      match Some(address.idx()) == highlight {

        true  => {
          table.add_row(row![r->format!("* --> {} =", address), format!("{}", cell)]);
        }

        false => {
          table.add_row(row![r->format!("{} =", address), format!("{}", cell)]);
        }

      }
    }
    table
  }

  /// A table of every cell in `window`. The window is assumed to be in bounds.
  pub fn window_table(&self, window: Window) -> Table {
    let cells = self.memory[window.start..window.end]
      .iter()
      .enumerate()
      .map(|(i, cell)| (Address(window.start) + i, cell));
    VM::make_memory_table(cells, self.last_written)
  }

  // endregion

  // region Low-level utility methods

  pub fn new(config: VmConfig) -> VM {
    VM {
      memory       : vec![0; config.memory_size],
      last_written : None,
      trace        : Trace::new(),
    }
  }

  pub fn memory_size(&self) -> usize {
    self.memory.len()
  }

  pub fn memory(&self) -> &[Cell] {
    &self.memory
  }

  pub fn trace(&self) -> &Trace<ExecutedEntry> {
    &self.trace
  }

  pub fn into_trace(self) -> Trace<ExecutedEntry> {
    self.trace
  }

  /// Checks that an address operand indexes into memory.
  fn address(&self, operand: Word) -> Result<Address, Fault> {
    Address::from(operand).require_in_bounds(self.memory.len())
  }

  /// The address must already be checked with `VM::address`.
  fn value_at(&self, address: Address) -> Cell {
    self.memory[address.idx()]
  }

  /// The address must already be checked with `VM::address`. Memory is never resized.
  fn set_value_at(&mut self, address: Address, value: Cell) {
    self.memory[address.idx()] = value;
    self.last_written = Some(address.idx());
  }

  // endregion

  // region Interpretation

  /**
    Decodes and executes every record of `image` in order. Bytes that are not opcodes are
    skipped one at a time, address faults skip a single instruction, and a truncated record at
    the end of the image is recorded and ends the run. Nothing here is fatal.
  */
  pub fn run(&mut self, image: &[u8]) {
    for record in decode_image(image) {
      match record {

        DecodedRecord::Instruction { offset, instruction } => {
          self.execute(offset, &instruction);
        }

        #[allow(unused_variables)]
        DecodedRecord::Filler { offset, byte } => {
          #[cfg(feature = "trace_computation")]
          println!("Skipping byte 0x{:02X} at offset {}", byte, offset);
        }

        DecodedRecord::Truncated { offset, opcode, available } => {
          #[cfg(feature = "trace_computation")]
          println!("Error: {} at offset {} is truncated after {} bytes", opcode, offset, available);
          self.trace.push(ExecutedEntry::truncated(offset, opcode, available));
        }

      }
    }
  }

  /// Executes one instruction and appends its trace entry. Returns the fault, if any, that
  /// caused the instruction to be skipped.
  #[allow(unused_variables)]
  pub fn execute(&mut self, offset: usize, instruction: &Instruction) -> Option<Fault> {
    let result = match instruction.opcode {
      Operation::LoadConst  => self.load_const(instruction.b, instruction.c),
      Operation::ReadMem    => self.read_mem(instruction.b, instruction.c),
      Operation::WriteMem   => self.write_mem(instruction.b, instruction.c),
      Operation::BitReverse => self.bitreverse(instruction.b, instruction.c),
    };
    let fault = result.err();

    #[cfg(feature = "trace_computation")]
    match &fault {
      Some(fault) => println!("Error: {} at offset {} skipped: {}", instruction, offset, fault),
      None        => println!("{} executed", instruction),
    }

    self.trace.push(ExecutedEntry::new(offset, instruction, fault));
    fault
  }

  /// Copies the cells of `window` out of memory.
  pub fn dump(&self, window: Window) -> Result<MemoryDump, Error> {
    window.require_in_bounds(self.memory.len())?;
    Ok(MemoryDump {
      memory_range: [window.start, window.end],
      values: self.memory[window.start..window.end].to_vec(),
    })
  }

  // endregion

  // region VM instruction methods

  /// `M[destination] := value`. Only the destination is an address.
  fn load_const(&mut self, value: Word, destination: Word) -> Result<(), Fault> {
    let destination = self.address(destination)?;
    self.set_value_at(destination, value);
    Ok(())
  }

  /// `M[destination] := M[source]`
  fn read_mem(&mut self, source: Word, destination: Word) -> Result<(), Fault> {
    let source = self.address(source)?;
    let destination = self.address(destination)?;
    self.set_value_at(destination, self.value_at(source));
    Ok(())
  }

  /// `M[destination] := M[source]`, with the operands in the opposite order to `read_mem`.
  fn write_mem(&mut self, destination: Word, source: Word) -> Result<(), Fault> {
    let destination = self.address(destination)?;
    let source = self.address(source)?;
    self.set_value_at(destination, self.value_at(source));
    Ok(())
  }

  /// `M[destination] := reverse_bits_8(M[source])`
  fn bitreverse(&mut self, source: Word, destination: Word) -> Result<(), Fault> {
    let source = self.address(source)?;
    let destination = self.address(destination)?;
    self.set_value_at(destination, reverse_bits_8(self.value_at(source)));
    Ok(())
  }

  // endregion

}


lazy_static! {
  static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}

/// Shows the non-zero cells of memory.
impl Display for VM {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let cells = self.memory
      .iter()
      .enumerate()
      .filter(|(_, cell)| **cell != 0)
      .map(|(i, cell)| (Address(i), cell));
    let table = VM::make_memory_table(cells, self.last_written);

    let faults = self.trace.entries().iter().filter(|entry| entry.is_fault()).count();
    write!(f, "Executed {} records, {} faults.\n{}", self.trace.len(), faults, table)
  }
}


/// The output of a successful interpreter run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Interpretation {
  pub dump: MemoryDump,
  pub trace: Trace<ExecutedEntry>,
}

/**
  Executes `image` against a fresh memory of `memory_size` cells and dumps
  `[window_start, window_end)`. The window is checked before anything is decoded.
*/
pub fn interpret(
  image: &[u8],
  memory_size: usize,
  window_start: usize,
  window_end: usize
) -> Result<Interpretation, Error> {
  let window = Window::new(window_start, window_end);
  window.require_in_bounds(memory_size)?;

  let mut vm = VM::new(VmConfig { memory_size });
  vm.run(image);
  let dump = vm.dump(window)?;

  #[cfg(feature = "trace_computation")]
  println!("{}", vm.window_table(window));

  Ok(Interpretation { dump, trace: vm.into_trace() })
}

/**
  Executes the image at `input` and writes the YAML dump to `output`, and the YAML execution
  trace to `trace_log` if one is given. The window is checked before `input` is read, and
  nothing is written unless the image was read and both documents serialized.
*/
pub fn interpret_file(
  input: impl AsRef<Path>,
  output: impl AsRef<Path>,
  trace_log: Option<&Path>,
  config: VmConfig,
  window: Window
) -> Result<Interpretation, Error> {
  let (input, output) = (input.as_ref(), output.as_ref());

  window.require_in_bounds(config.memory_size)?;
  let image = fs::read(input).map_err(|e| Error::io(input, e))?;

  let interpretation = interpret(&image, config.memory_size, window.start, window.end)?;
  let dump_yaml = interpretation.dump.to_yaml()?;
  let trace_yaml = match trace_log {
    Some(_) => Some(interpretation.trace.to_yaml()?),
    None    => None
  };

  let mut artifacts = vec![(output, dump_yaml.as_bytes())];
  if let (Some(path), Some(yaml)) = (trace_log, trace_yaml.as_ref()) {
    artifacts.push((path, yaml.as_bytes()));
  }
  write_all_or_nothing(&artifacts)?;

  #[cfg(feature = "trace_computation")]
  println!("Result successfully written to {}", output.display());

  Ok(interpretation)
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::assembler::assemble;
  use crate::bytecode::{encode_instruction, RECORD_SIZE};

  fn run_text(text: &str, memory_size: usize) -> VM {
    let mut vm = VM::new(VmConfig { memory_size });
    vm.run(&assemble(text).unwrap().image);
    vm
  }

  #[test]
  fn load_const(){
    let vm = run_text("LOAD_CONST 5 10", DEFAULT_MEMORY_SIZE);
    assert_eq!(vm.memory()[10], 5);
    assert_eq!(vm.memory().iter().filter(|cell| **cell != 0).count(), 1);
  }

  #[test]
  fn load_const_value_is_not_an_address(){
    let vm = run_text("LOAD_CONST 5000 0", 16);
    assert_eq!(vm.memory()[0], 5000);
    assert!(vm.trace().entries().iter().all(|entry| !entry.is_fault()));
  }

  #[test]
  fn read_mem_copies_b_into_c(){
    let vm = run_text("LOAD_CONST 42 3\nREAD_MEM 3 7", DEFAULT_MEMORY_SIZE);
    assert_eq!(vm.memory()[7], 42);
    assert_eq!(vm.memory()[3], 42);
  }

  #[test]
  fn write_mem_copies_c_into_b(){
    let vm = run_text("LOAD_CONST 42 3\nWRITE_MEM 7 3", DEFAULT_MEMORY_SIZE);
    assert_eq!(vm.memory()[7], 42);

    let vm = run_text("LOAD_CONST 42 3\nWRITE_MEM 3 7", DEFAULT_MEMORY_SIZE);
    assert_eq!(vm.memory()[3], 0);
  }

  #[test]
  fn bitreverse(){
    let vm = run_text("LOAD_CONST 11 4\nBITREVERSE 4 5", DEFAULT_MEMORY_SIZE);
    assert_eq!(vm.memory()[4], 11);
    assert_eq!(vm.memory()[5], 208);
  }

  #[test]
  fn bitreverse_ignores_high_bits(){
    assert_eq!(reverse_bits_8(0b1011), 0b1101_0000);
    assert_eq!(reverse_bits_8(0x100 | 0b1011), 0b1101_0000);
    assert_eq!(reverse_bits_8(1), 128);
    assert_eq!(reverse_bits_8(0xFF), 0xFF);

    let vm = run_text("LOAD_CONST 267 4\nBITREVERSE 4 5", DEFAULT_MEMORY_SIZE);
    assert_eq!(vm.memory()[5], 208);
  }

  #[test]
  fn out_of_bounds_address_is_a_fault(){
    let before = run_text("LOAD_CONST 9 3", DEFAULT_MEMORY_SIZE);
    let vm = run_text("LOAD_CONST 9 3\nREAD_MEM 3 2000", DEFAULT_MEMORY_SIZE);
    assert_eq!(vm.memory(), before.memory());

    let faults: Vec<&ExecutedEntry> =
      vm.trace().entries().iter().filter(|entry| entry.is_fault()).collect();
    assert_eq!(faults.len(), 1);
    assert_eq!(faults[0].instruction, "READ_MEM");
    assert_eq!(faults[0].offset, RECORD_SIZE);
    assert_eq!(
      faults[0].fault,
      Some(Fault::AddressOutOfBounds { address: 2000, memory_size: 1024 })
    );
  }

  #[test]
  fn execution_continues_after_fault(){
    let vm = run_text("BITREVERSE 2000 1\nWRITE_MEM 1 1500\nLOAD_CONST 9 1", DEFAULT_MEMORY_SIZE);
    assert_eq!(vm.memory()[1], 9);
    assert_eq!(vm.trace().len(), 3);
    assert!(vm.trace().entries()[0].is_fault());
    assert!(vm.trace().entries()[1].is_fault());
    assert!(!vm.trace().entries()[2].is_fault());
  }

  #[test]
  fn load_const_destination_is_checked(){
    let mut vm = VM::new(VmConfig { memory_size: 16 });
    let fault = vm.execute(0, &Instruction::new(Operation::LoadConst, 1, 100));
    assert_eq!(fault, Some(Fault::AddressOutOfBounds { address: 100, memory_size: 16 }));
    assert!(vm.memory().iter().all(|cell| *cell == 0));
  }

  #[test]
  fn records_after_load_const_are_decoded(){
    // Every record is five bytes, including LOAD_CONST.
    let vm = run_text(
      "LOAD_CONST 11 4\nLOAD_CONST 7 6\nREAD_MEM 6 8\nBITREVERSE 4 9",
      DEFAULT_MEMORY_SIZE
    );
    assert_eq!(vm.trace().len(), 4);
    let offsets: Vec<usize> = vm.trace().entries().iter().map(|entry| entry.offset).collect();
    assert_eq!(offsets, vec![0, 5, 10, 15]);
    assert_eq!(vm.memory()[8], 7);
    assert_eq!(vm.memory()[9], 208);
  }

  #[test]
  fn filler_bytes_are_skipped(){
    let mut image = vec![0x00, 0x01];
    image.extend_from_slice(&encode_instruction(&Instruction::new(Operation::LoadConst, 3, 2)));
    let interpretation = interpret(&image, DEFAULT_MEMORY_SIZE, 0, 4).unwrap();
    assert_eq!(interpretation.dump.values, vec![0, 0, 3, 0]);
    assert_eq!(interpretation.trace.len(), 1);
    assert_eq!(interpretation.trace.entries()[0].offset, 2);
  }

  #[test]
  fn truncated_record_is_recorded(){
    let mut image = encode_instruction(&Instruction::new(Operation::LoadConst, 3, 2)).to_vec();
    image.extend_from_slice(&[0x37, 0x03]);
    let interpretation = interpret(&image, DEFAULT_MEMORY_SIZE, 0, 4).unwrap();
    assert_eq!(interpretation.dump.values[2], 3);
    assert_eq!(interpretation.trace.len(), 2);
    assert_eq!(
      interpretation.trace.entries()[1],
      ExecutedEntry::truncated(5, Operation::ReadMem, 2)
    );
  }

  #[test]
  fn dump_window(){
    let image = assemble("LOAD_CONST 11 4\nBITREVERSE 4 5").unwrap().image;
    let interpretation = interpret(&image, DEFAULT_MEMORY_SIZE, 3, 7).unwrap();
    assert_eq!(interpretation.dump.memory_range, [3, 7]);
    assert_eq!(interpretation.dump.values, vec![0, 11, 208, 0]);

    let empty = interpret(&image, DEFAULT_MEMORY_SIZE, 1024, 1024).unwrap();
    assert!(empty.dump.values.is_empty());
  }

  #[test]
  fn window_out_of_bounds(){
    let image = assemble("LOAD_CONST 11 4").unwrap().image;
    assert!(matches!(
      interpret(&image, 1024, 0, 1025),
      Err(Error::WindowOutOfBounds { start: 0, end: 1025, memory_size: 1024 })
    ));
    assert!(matches!(
      interpret(&image, 1024, 10, 5),
      Err(Error::WindowOutOfBounds { .. })
    ));
  }

  #[test]
  fn interpret_to_files(){
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("program.bin");
    let output = dir.path().join("dump.yaml");
    let trace_log = dir.path().join("trace.yaml");
    fs::write(&input, assemble("LOAD_CONST 11 4\nBITREVERSE 4 5\nREAD_MEM 3 2000").unwrap().image)
      .unwrap();

    interpret_file(&input, &output, Some(trace_log.as_path()), VmConfig::default(), Window::new(4, 6))
      .unwrap();

    let dump: serde_yaml::Value =
      serde_yaml::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(dump["memory_range"][0].as_u64(), Some(4));
    assert_eq!(dump["memory_range"][1].as_u64(), Some(6));
    assert_eq!(dump["values"][0].as_u64(), Some(11));
    assert_eq!(dump["values"][1].as_u64(), Some(208));

    let trace: serde_yaml::Value =
      serde_yaml::from_str(&fs::read_to_string(&trace_log).unwrap()).unwrap();
    assert_eq!(trace.as_sequence().unwrap().len(), 3);
    assert_eq!(trace[2]["fault"]["address"].as_u64(), Some(2000));
  }

  #[test]
  fn missing_image_writes_nothing(){
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("dump.yaml");
    let result = interpret_file(
      dir.path().join("nope.bin"), &output, None, VmConfig::default(), Window::new(0, 8)
    );
    assert!(matches!(result, Err(Error::Io { .. })));
    assert!(!output.exists());
  }

  #[test]
  fn unwritable_trace_leaves_no_dump(){
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("program.bin");
    let output = dir.path().join("dump.yaml");
    let trace = dir.path().join("missing").join("trace.yaml");
    fs::write(&input, assemble("LOAD_CONST 5 1").unwrap().image).unwrap();

    let result = interpret_file(
      &input, &output, Some(trace.as_path()), VmConfig::default(), Window::new(0, 4)
    );
    assert!(matches!(result, Err(Error::Io { ref path, .. }) if path == &trace));
    assert!(!output.exists());
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
  }

  #[test]
  fn window_is_checked_before_reading(){
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("dump.yaml");
    let result = interpret_file(
      dir.path().join("nope.bin"), &output, None, VmConfig::default(), Window::new(0, 2048)
    );
    assert!(matches!(result, Err(Error::WindowOutOfBounds { .. })));
    assert!(!output.exists());
  }

  #[test]
  fn display_highlights_last_write(){
    let vm = run_text("LOAD_CONST 11 4\nBITREVERSE 4 5", DEFAULT_MEMORY_SIZE);
    let text = format!("{}", vm);
    assert!(text.contains("* --> M[5] ="));
    assert!(text.contains("M[4] ="));
    assert!(text.starts_with("Executed 2 records, 0 faults."));
  }
}
