/*!
  Turns assembly text into a program image and a trace of every record emitted.

  Assembly happens in two passes: every line is parsed and validated first, and only then is
  the program packed. A file is never written unless both passes succeed.
*/

use std::fs;
use std::path::Path;

use crate::artifact::write_all_or_nothing;
use crate::bytecode::{encode_instruction, parse_assembly, AssemblyError, Program};
use crate::error::Error;
use crate::trace::{EncodedEntry, Trace};

/// The output of a successful assembly.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Assembly {
  pub image: Vec<u8>,
  pub trace: Trace<EncodedEntry>,
}

/// Packs an already validated program, in order.
pub fn encode_program(program: &Program) -> Assembly {
  let mut image = Vec::with_capacity(program.len() * crate::bytecode::RECORD_SIZE);
  let mut trace = Trace::new();

  for instruction in program {
    let record = encode_instruction(instruction);

    #[cfg(feature = "trace_computation")]
    println!(
      "{} (A={}, B={}, C={}): {}",
      instruction.opcode,
      instruction.opcode.code(),
      instruction.b,
      instruction.c,
      record.iter().map(|byte| format!("0x{:02X}", byte)).collect::<Vec<String>>().join(", ")
    );

    trace.push(EncodedEntry::new(instruction, &record));
    image.extend_from_slice(&record);
  }

  Assembly { image, trace }
}

pub fn assemble(text: &str) -> Result<Assembly, AssemblyError> {
  let program = parse_assembly(text)?;
  Ok(encode_program(&program))
}

/**
  Assembles the program at `input`, writing the image to `output` and the YAML trace to `log`.
  Either both files are written or neither is, whichever step fails.
*/
pub fn assemble_file(
  input: impl AsRef<Path>,
  output: impl AsRef<Path>,
  log: impl AsRef<Path>
) -> Result<Assembly, Error> {
  let (input, output, log) = (input.as_ref(), output.as_ref(), log.as_ref());

  let text = fs::read_to_string(input).map_err(|e| Error::io(input, e))?;
  let assembly = assemble(&text)?;
  let yaml = assembly.trace.to_yaml()?;

  write_all_or_nothing(&[(output, &assembly.image[..]), (log, yaml.as_bytes())])?;

  #[cfg(feature = "trace_computation")]
  println!("Assembled {} instructions into {} bytes.", assembly.trace.len(), assembly.image.len());

  Ok(assembly)
}
