//! The file-level container format: header, tagged blocks, end sentinel.

use crate::error::{FormatError, StreamError};
use crate::parsers::{Endianness, PointerSize};
use crate::stream::Stream;
use std::fmt::{self, Debug, Formatter};

/// The seven bytes every uncompressed .blend file starts with.
pub const HEADER_MAGIC: &[u8; 7] = b"BLENDER";

/// A four-byte block tag, compared and ordered as a little-endian `u32`
/// regardless of the host's endianness. Blender writes these as raw bytes,
/// so two-letter codes occupy the low two bytes with the rest zero.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct BlockCode(u32);

impl BlockCode {
    pub const fn new(bytes: [u8; 4]) -> Self {
        BlockCode(u32::from_le_bytes(bytes))
    }

    /// Builds a code from a two-letter principal tag such as `ME` or `OB`.
    pub const fn compact(bytes: [u8; 2]) -> Self {
        BlockCode(u32::from_le_bytes([bytes[0], bytes[1], 0, 0]))
    }

    /// The raw bytes as they appear on disk.
    pub fn bytes(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }
}

impl fmt::Display for BlockCode {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        for byte in self.bytes().iter().take_while(|&&b| b != 0) {
            write!(f, "{}", *byte as char)?;
        }
        Ok(())
    }
}

pub const BLOCK_CODE_DATA: BlockCode = BlockCode::new(*b"DATA"); // Arbitrary data
pub const BLOCK_CODE_GLOB: BlockCode = BlockCode::new(*b"GLOB"); // Global struct
pub const BLOCK_CODE_DNA1: BlockCode = BlockCode::new(*b"DNA1"); // SDNA data
pub const BLOCK_CODE_TEST: BlockCode = BlockCode::new(*b"TEST"); // Thumbnail previews
pub const BLOCK_CODE_REND: BlockCode = BlockCode::new(*b"REND"); // Scene and frame info
pub const BLOCK_CODE_USER: BlockCode = BlockCode::new(*b"USER"); // User preferences
pub const BLOCK_CODE_ENDB: BlockCode = BlockCode::new(*b"ENDB"); // End of file

pub const BLOCK_CODE_AC: BlockCode = BlockCode::compact(*b"AC"); // Action channel
pub const BLOCK_CODE_AR: BlockCode = BlockCode::compact(*b"AR"); // Armature
pub const BLOCK_CODE_BR: BlockCode = BlockCode::compact(*b"BR"); // Brush
pub const BLOCK_CODE_CA: BlockCode = BlockCode::compact(*b"CA"); // Camera
pub const BLOCK_CODE_CU: BlockCode = BlockCode::compact(*b"CU"); // Curve
pub const BLOCK_CODE_GR: BlockCode = BlockCode::compact(*b"GR"); // Collection
pub const BLOCK_CODE_IM: BlockCode = BlockCode::compact(*b"IM"); // Image
pub const BLOCK_CODE_KE: BlockCode = BlockCode::compact(*b"KE"); // Shape key
pub const BLOCK_CODE_LA: BlockCode = BlockCode::compact(*b"LA"); // Light
pub const BLOCK_CODE_LT: BlockCode = BlockCode::compact(*b"LT"); // Lattice
pub const BLOCK_CODE_MA: BlockCode = BlockCode::compact(*b"MA"); // Material
pub const BLOCK_CODE_ME: BlockCode = BlockCode::compact(*b"ME"); // Mesh
pub const BLOCK_CODE_NT: BlockCode = BlockCode::compact(*b"NT"); // Node tree
pub const BLOCK_CODE_OB: BlockCode = BlockCode::compact(*b"OB"); // Object
pub const BLOCK_CODE_SC: BlockCode = BlockCode::compact(*b"SC"); // Scene
pub const BLOCK_CODE_SR: BlockCode = BlockCode::compact(*b"SR"); // Screen
pub const BLOCK_CODE_TE: BlockCode = BlockCode::compact(*b"TE"); // Texture
pub const BLOCK_CODE_TX: BlockCode = BlockCode::compact(*b"TX"); // Text
pub const BLOCK_CODE_WM: BlockCode = BlockCode::compact(*b"WM"); // Window manager
pub const BLOCK_CODE_WO: BlockCode = BlockCode::compact(*b"WO"); // World
pub const BLOCK_CODE_WS: BlockCode = BlockCode::compact(*b"WS"); // Workspace

/// The fixed prefix of the file.
#[derive(Debug, Clone)]
pub struct Header {
    /// The size of the pointer on the machine used to save the blend file.
    pub pointer_size: PointerSize,
    /// The endianness of the machine used to save the blend file.
    pub endianness: Endianness,
    /// The version of Blender used to save the blend file, e.g. `*b"401"`.
    pub version: [u8; 3],
}

#[derive(Debug, Clone)]
pub struct BlockHeader {
    pub code: BlockCode,
    /// Length in bytes of the block body.
    pub length: u32,
    /// The address the body had in the producer's process at save time,
    /// zero-extended to 64 bits. Only used to resolve pointers between
    /// blocks.
    pub address: u64,
    /// Index into the SDNA struct table describing the body's layout.
    pub struct_index: u32,
    /// Number of consecutive struct instances stored in the body.
    pub count: u32,
}

pub struct Block {
    pub header: BlockHeader,
    pub body: Vec<u8>,
}

impl Debug for Block {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("Block")
            .field("header", &self.header)
            .field("body_len", &self.body.len())
            .finish()
    }
}

/// Header plus the raw block sequence, before any reflection is applied.
#[derive(Debug)]
pub struct RawBlend {
    pub header: Header,
    pub blocks: Vec<Block>,
}

fn eof(_: StreamError) -> FormatError {
    FormatError::UnexpectedEndOfFile
}

/// Reads and validates the fixed file prefix. The caller is expected to set
/// the stream's endianness to the returned header's before reading blocks.
pub fn read_header<S: Stream>(stream: &mut S) -> Result<Header, FormatError> {
    let mut magic = [0u8; HEADER_MAGIC.len()];
    stream.read_into(&mut magic).map_err(eof)?;

    if &magic != HEADER_MAGIC {
        return Err(FormatError::InvalidFileHeader);
    }

    let pointer_size = match stream.read_u8().map_err(eof)? {
        b'_' => PointerSize::Bits32,
        b'-' => PointerSize::Bits64,
        _ => return Err(FormatError::InvalidFileHeader),
    };

    let endianness = match stream.read_u8().map_err(eof)? {
        b'v' => Endianness::Little,
        b'V' => Endianness::Big,
        _ => return Err(FormatError::InvalidFileHeader),
    };

    let mut version = [0u8; 3];
    stream.read_into(&mut version).map_err(eof)?;

    Ok(Header {
        pointer_size,
        endianness,
        version,
    })
}

fn read_block_header<S: Stream>(
    stream: &mut S,
    header: &Header,
) -> Result<BlockHeader, FormatError> {
    let code = BlockCode::new(stream.read_tag().map_err(eof)?);
    let length = stream.read_u32().map_err(eof)?;
    let address = stream.read_ptr(header.pointer_size).map_err(eof)?;
    let struct_index = stream.read_u32().map_err(eof)?;
    let count = stream.read_u32().map_err(eof)?;

    // A body without a persisted address could never be dereferenced and
    // would poison the memory table.
    if length > 0 && address == 0 {
        return Err(FormatError::InvalidBlockHeader);
    }

    Ok(BlockHeader {
        code,
        length,
        address,
        struct_index,
        count,
    })
}

/// Reads the block sequence up to and including the `ENDB` sentinel. The
/// stream must be exhausted once the sentinel has been consumed.
pub fn read_blocks<S: Stream>(
    stream: &mut S,
    header: &Header,
) -> Result<Vec<Block>, FormatError> {
    let mut blocks = Vec::new();

    loop {
        let block_header = read_block_header(stream, header)?;

        let mut body = vec![0u8; block_header.length as usize];
        if !body.is_empty() {
            stream.read_into(&mut body).map_err(eof)?;
        }

        let code = block_header.code;
        blocks.push(Block {
            header: block_header,
            body,
        });

        if code == BLOCK_CODE_ENDB {
            break;
        }
    }

    if !stream.at_end() {
        return Err(FormatError::FileNotExhausted);
    }

    Ok(blocks)
}
