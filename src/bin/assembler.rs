// Assembles a text program into a binary image and a YAML log of every record.
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use memvm::assemble_file;

#[derive(Parser, Debug)]
#[command(about = "Assemble a program into a binary image", version)]
struct Args {
  /// Program text, one instruction per line
  input_file: PathBuf,
  /// Binary image to write
  output_file: PathBuf,
  /// YAML log of the encoded records
  log_file: PathBuf,
}

fn main() -> ExitCode {
  let args = Args::parse();

  match assemble_file(&args.input_file, &args.output_file, &args.log_file) {
    Ok(_assembly) => ExitCode::SUCCESS,
    Err(e) => {
      eprintln!("{}", e);
      ExitCode::FAILURE
    }
  }
}
