//! Decoders for everything stored inside a .blend file: the file-level block
//! stream, the SDNA descriptor, and the field-name declarator grammar.

pub mod blend;
pub mod dna;
pub mod field;

/// Size of a pointer on the machine used to save the blend file.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PointerSize {
    Bits32,
    Bits64,
}

impl PointerSize {
    /// Returns the pointer size in bytes.
    pub fn bytes_num(self) -> usize {
        match self {
            PointerSize::Bits32 => 4,
            PointerSize::Bits64 => 8,
        }
    }
}

/// Endianness of the machine used to save the blend file.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Endianness {
    Little,
    Big,
}
