//! The SDNA descriptor: the type dictionary embedded in the `DNA1` block.
//!
//! The descriptor is four consecutive sections (`NAME`, `TYPE`, `TLEN`,
//! `STRC`), each 4-byte aligned at its end, preceded by an `SDNA` tag. It
//! names every aggregate layout used by the rest of the file.

use crate::error::{FormatError, StreamError};
use crate::parsers::blend::{RawBlend, BLOCK_CODE_DNA1};
use crate::parsers::Endianness;
use crate::stream::{MemoryStream, Stream};

pub const SDNA_MAGIC: &[u8; 4] = b"SDNA";
pub const SDNA_NAME_MAGIC: &[u8; 4] = b"NAME";
pub const SDNA_TYPE_MAGIC: &[u8; 4] = b"TYPE";
pub const SDNA_TLEN_MAGIC: &[u8; 4] = b"TLEN";
pub const SDNA_STRC_MAGIC: &[u8; 4] = b"STRC";

#[derive(Debug, Clone, Copy)]
pub struct DnaField {
    /// Index into [`Dna::type_names`].
    pub type_index: u16,
    /// Index into [`Dna::field_names`].
    pub name_index: u16,
}

#[derive(Debug, Clone)]
pub struct DnaStruct {
    /// Index into [`Dna::type_names`] naming this struct.
    pub type_index: u16,
    pub fields: Vec<DnaField>,
}

/// The parsed type dictionary. `type_names` and `type_lengths` always have
/// the same length.
#[derive(Debug)]
pub struct Dna {
    pub field_names: Vec<String>,
    pub type_names: Vec<String>,
    pub type_lengths: Vec<u16>,
    pub structs: Vec<DnaStruct>,
}

fn sdna_eof(_: StreamError) -> FormatError {
    FormatError::UnexpectedEndOfSdna
}

fn read_section_tag(stream: &mut MemoryStream, magic: &[u8; 4]) -> Result<(), FormatError> {
    let tag = stream.read_tag().map_err(sdna_eof)?;
    if &tag != magic {
        return Err(FormatError::InvalidSdnaHeader);
    }
    Ok(())
}

fn read_strings(stream: &mut MemoryStream, magic: &[u8; 4]) -> Result<Vec<String>, FormatError> {
    read_section_tag(stream, magic)?;

    // The count is untrusted; let the vector grow instead of reserving it.
    let count = stream.read_u32().map_err(sdna_eof)?;
    let mut strings = Vec::new();
    for _ in 0..count {
        let raw = stream.read_cstr().map_err(sdna_eof)?;
        strings.push(String::from_utf8_lossy(raw).into_owned());
    }

    stream.align(4).map_err(sdna_eof)?;
    Ok(strings)
}

fn read_lengths(stream: &mut MemoryStream, count: usize) -> Result<Vec<u16>, FormatError> {
    read_section_tag(stream, SDNA_TLEN_MAGIC)?;

    let mut lengths = Vec::with_capacity(count);
    for _ in 0..count {
        lengths.push(stream.read_u16().map_err(sdna_eof)?);
    }

    stream.align(4).map_err(sdna_eof)?;
    Ok(lengths)
}

fn read_structs(stream: &mut MemoryStream) -> Result<Vec<DnaStruct>, FormatError> {
    read_section_tag(stream, SDNA_STRC_MAGIC)?;

    let count = stream.read_u32().map_err(sdna_eof)?;
    let mut structs = Vec::new();

    for _ in 0..count {
        let type_index = stream.read_u16().map_err(sdna_eof)?;
        let field_count = stream.read_u16().map_err(sdna_eof)?;

        let mut fields = Vec::with_capacity(field_count as usize);
        for _ in 0..field_count {
            let type_index = stream.read_u16().map_err(sdna_eof)?;
            let name_index = stream.read_u16().map_err(sdna_eof)?;
            fields.push(DnaField {
                type_index,
                name_index,
            });
        }

        structs.push(DnaStruct { type_index, fields });
    }

    Ok(structs)
}

/// Parses an SDNA descriptor from the body of a `DNA1` block. The body must
/// be consumed exactly.
pub fn parse_sdna(body: &[u8], endianness: Endianness) -> Result<Dna, FormatError> {
    let mut stream = MemoryStream::new(body);
    stream.set_endian(endianness);

    read_section_tag(&mut stream, SDNA_MAGIC)?;

    let field_names = read_strings(&mut stream, SDNA_NAME_MAGIC)?;
    let type_names = read_strings(&mut stream, SDNA_TYPE_MAGIC)?;
    let type_lengths = read_lengths(&mut stream, type_names.len())?;
    let structs = read_structs(&mut stream)?;

    if !stream.at_end() {
        return Err(FormatError::SdnaNotExhausted);
    }

    Ok(Dna {
        field_names,
        type_names,
        type_lengths,
        structs,
    })
}

/// Locates the unique `DNA1` block and parses the descriptor out of it.
pub fn read_dna(blend: &RawBlend) -> Result<Dna, FormatError> {
    let block = blend
        .blocks
        .iter()
        .find(|b| b.header.code == BLOCK_CODE_DNA1)
        .ok_or(FormatError::SdnaNotFound)?;

    parse_sdna(&block.body, blend.header.endianness)
}
