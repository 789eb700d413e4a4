/*!

  The machine has four instructions, and every instruction is encoded as a record of exactly
  five bytes, whatever its opcode. The first byte is the opcode. The remaining four bytes are a
  little-endian 32 bit payload into which the two operands `B` and `C` are bit-packed:

    LOAD_CONST:                           [Opcode:8][B:13][C:12][Reserved:7]
    READ_MEM, WRITE_MEM, BITREVERSE:      [Opcode:8][B:12][C:12][Reserved:8]

  (Bit fields are listed from least to most significant.) A program image is a flat
  concatenation of records with no header and no delimiters, so a single byte of misalignment
  corrupts the decoding of everything after it.

  The assembler checks operands against a declared range before packing. The declared ranges
  are wider than the fields they are packed into, so an operand can pass validation and still
  be truncated by the field mask. This is part of the format and is not corrected here: the
  assembler's trace records the operands as written next to the bytes actually emitted.

  As with the opcode enum of a larger VM, the `Operation` enum inhabits a single byte, and its
  discriminants are the opcode values themselves.

*/

mod assembly;
mod binary;
mod instruction;

pub use assembly::{parse_assembly, parse_line, AssemblyError};
pub use binary::{
  decode_image, encode_instruction, pack_payload, try_decode_instruction, unpack_payload,
  DecodedRecord, ImageDecoder, Record, Word, RECORD_SIZE
};
pub use instruction::{Instruction, Operation, Program};
