//! # blendna - reflective access to Blender's .blend files
//!
//! ## Example
//!
//! ```ignore
//! use blendna::{Blend, Query, BLOCK_CODE_ME};
//!
//! /// Prints the vertex count of every mesh in the file.
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let blend = Blend::open("file.blend")?;
//!
//!     for mesh in blend.blocks(BLOCK_CODE_ME) {
//!         let mesh_type = blend.block_type(mesh).expect("meshes are typed");
//!         let totvert: i32 = mesh_type.query_value(&mesh.body, &Query::parse("totvert")?)?;
//!         println!("{} vertices", totvert);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## The .blend file
//!
//! Blender saves by dumping its memory to disk: a .blend file is a header
//! followed by tagged blocks, each of which is a snapshot of one or more C
//! structs from the producer's address space, terminated by an `ENDB`
//! sentinel block. Because struct layouts change between Blender versions,
//! the file carries its own schema: a distinguished `DNA1` block holds the
//! "Structure DNA" (SDNA), a dictionary naming every struct layout used in
//! the file - field names with their C declarator syntax (`*next`,
//! `mat[4][4]`, `(*free)()`), type names, type sizes and struct field lists.
//!
//! This crate parses the block stream, builds a type graph from the SDNA and
//! gives you typed, bounds-checked access into the raw block bodies:
//!
//! - [`Blend`] owns the parsed file and answers block and type lookups.
//! - [`TypeView`] and [`FieldView`] are borrowed windows onto the type
//!   graph; they slice block bytes and never copy them.
//! - [`Query`] is a small path language (`"vdata.layers[0].type"`) for
//!   multi-hop navigation, including dereferencing pointers between blocks.
//!
//! Pointers are resolved through the persisted addresses in the block
//! headers: every block remembers the address its body had when the file was
//! saved, and pointer fields store those stale addresses. Following a
//! pointer means finding the block whose address range covers the value and
//! slicing into its body. A null or dangling pointer simply fails to
//! resolve; it never panics.
//!
//! ## Compressed files
//!
//! Blender can gzip whole save files. [`Blend::open`] detects the gzip magic
//! and decompresses before parsing. [`Blend::read`] expects uncompressed
//! bytes.
//!
//! ## Endianness
//!
//! The file declares the endianness and pointer width of the machine that
//! wrote it, and the parser honours both: header fields, block headers, the
//! SDNA tables and pointer payloads inside block bodies are all decoded per
//! the declaration. Typed *value* reads ([`TypeView::query_value`],
//! [`FieldView::value`] and friends) are bit-casts and assume the file and
//! host agree on byte order; reading a big-endian file on a little-endian
//! host yields correctly parsed structure but byte-swapped primitives.
//!
//! ## Thread safety
//!
//! A `Blend` is immutable after construction. Share it by reference from as
//! many threads as you like; views and query results borrow from it and
//! cannot outlive it.

pub mod error;
pub mod memory;
pub mod parsers;
pub mod query;
pub mod reflection;
pub mod runtime;
pub mod stream;

pub use error::{BlendError, FormatError, QueryError, ReflectionError, StreamError};
pub use parsers::blend::{Block, BlockCode, BlockHeader, Header, RawBlend};
pub use parsers::blend::{
    BLOCK_CODE_AC, BLOCK_CODE_AR, BLOCK_CODE_BR, BLOCK_CODE_CA, BLOCK_CODE_CU, BLOCK_CODE_DATA,
    BLOCK_CODE_DNA1, BLOCK_CODE_ENDB, BLOCK_CODE_GLOB, BLOCK_CODE_GR, BLOCK_CODE_IM,
    BLOCK_CODE_KE, BLOCK_CODE_LA, BLOCK_CODE_LT, BLOCK_CODE_MA, BLOCK_CODE_ME, BLOCK_CODE_NT,
    BLOCK_CODE_OB, BLOCK_CODE_REND, BLOCK_CODE_SC, BLOCK_CODE_SR, BLOCK_CODE_TE, BLOCK_CODE_TEST,
    BLOCK_CODE_TX, BLOCK_CODE_USER, BLOCK_CODE_WM, BLOCK_CODE_WO, BLOCK_CODE_WS,
};
pub use parsers::{Endianness, PointerSize};
pub use query::{Query, QueryToken};
pub use runtime::{Blend, FieldView, TypeView};
