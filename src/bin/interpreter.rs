// Executes a binary image and dumps a window of the final memory as YAML.
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use memvm::vm::DEFAULT_MEMORY_SIZE;
use memvm::{interpret_file, VmConfig, Window};

#[derive(Parser, Debug)]
#[command(about = "Execute a binary image and dump a memory window", version)]
struct Args {
  /// Binary image produced by the assembler
  input_file: PathBuf,
  /// YAML file to write the memory window to
  output_file: PathBuf,
  /// First address of the window (inclusive)
  memory_start: usize,
  /// Last address of the window (exclusive)
  memory_end: usize,
  /// Number of memory cells
  #[arg(long, default_value_t = DEFAULT_MEMORY_SIZE)]
  memory_size: usize,
  /// Also write the execution trace as YAML
  #[arg(long)]
  trace: Option<PathBuf>,
}

fn main() -> ExitCode {
  let args = Args::parse();
  let config = VmConfig { memory_size: args.memory_size };
  let window = Window::new(args.memory_start, args.memory_end);

  match interpret_file(&args.input_file, &args.output_file, args.trace.as_deref(), config, window) {
    Ok(_interpretation) => ExitCode::SUCCESS,
    Err(e) => {
      eprintln!("{}", e);
      ExitCode::FAILURE
    }
  }
}
