/*!
  This module is responsible for the encoding and decoding of binary records.

*/

use super::{Instruction, Operation};

// If you change this you must also change `pack_payload` and `unpack_payload`.
pub type Word = u32;

/// Every record is one opcode byte followed by a four byte payload.
pub const RECORD_SIZE: usize = 5;
pub type Record = [u8; RECORD_SIZE];

fn mask(width: u32) -> Word {
  (1 << width) - 1
}

/**
  Packs the operands into the payload word, `B` in the low bits and `C` directly above it.
  Operands wider than their field are truncated by the mask without complaint.
*/
pub fn pack_payload(instruction: &Instruction) -> Word {
  let (b_width, c_width) = instruction.opcode.field_widths();
  (instruction.b & mask(b_width)) | ((instruction.c & mask(c_width)) << b_width)
}

/// The inverse of `pack_payload`. Bits above the `C` field are ignored.
pub fn unpack_payload(opcode: Operation, payload: Word) -> (Word, Word) {
  let (b_width, c_width) = opcode.field_widths();
  (payload & mask(b_width), (payload >> b_width) & mask(c_width))
}

pub fn encode_instruction(instruction: &Instruction) -> Record {
  let payload = pack_payload(instruction).to_le_bytes();
  [instruction.opcode.code(), payload[0], payload[1], payload[2], payload[3]]
}

/**
  Decodes a single record. Returns `None` if the slice is not exactly `RECORD_SIZE` bytes long
  or if its first byte is not an opcode.
*/
pub fn try_decode_instruction(record: &[u8]) -> Option<Instruction> {
  if record.len() != RECORD_SIZE {
    return None;
  }
  let opcode = Operation::try_from(record[0]).ok()?;
  let payload = Word::from_le_bytes([record[1], record[2], record[3], record[4]]);
  let (b, c) = unpack_payload(opcode, payload);

  Some(Instruction::new(opcode, b, c))
}

/// What the decoder found at a given offset of a program image.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DecodedRecord {
  /// A complete record.
  Instruction {
    offset: usize,
    instruction: Instruction
  },
  /// A byte that is not an opcode. The decoder skips it and resynchronizes on the next byte.
  Filler {
    offset: usize,
    byte: u8
  },
  /// An opcode too close to the end of the image to be followed by a full payload. Nothing is
  /// decoded after it.
  Truncated {
    offset: usize,
    opcode: Operation,
    available: usize
  },
}

/**
  Walks a program image record by record. The cursor advances by `RECORD_SIZE` after every
  opcode, including `LOAD_CONST`, and by a single byte after anything else.
*/
pub struct ImageDecoder<'a> {
  image: &'a [u8],
  offset: usize,
}

pub fn decode_image(image: &[u8]) -> ImageDecoder<'_> {
  ImageDecoder { image, offset: 0 }
}

impl<'a> Iterator for ImageDecoder<'a> {
  type Item = DecodedRecord;

  fn next(&mut self) -> Option<DecodedRecord> {
    let offset = self.offset;
    let byte = *self.image.get(offset)?;

    match Operation::try_from(byte) {

      Ok(opcode) => {
        let end = offset + RECORD_SIZE;
        if end > self.image.len() {
          self.offset = self.image.len();
          return Some(DecodedRecord::Truncated {
            offset,
            opcode,
            available: self.image.len() - offset
          });
        }
        self.offset = end;
        // The slice is exactly one record long and starts with an opcode.
        try_decode_instruction(&self.image[offset..end])
          .map(|instruction| DecodedRecord::Instruction { offset, instruction })
      }

      Err(_) => {
        self.offset += 1;
        Some(DecodedRecord::Filler { offset, byte })
      }

    }
  }
}
