//! The user-facing layer: [`Blend`] owns a parsed file, [`TypeView`] and
//! [`FieldView`] are borrowed windows into its type graph, and path queries
//! slice block bodies while following pointers across blocks.
//!
//! Everything here is read-only. A `Blend` is built whole during
//! [`Blend::open`]/[`Blend::read`] and never mutated afterwards, so shared
//! references to it can be handed freely across threads.

use crate::error::{BlendError, QueryError, StreamError};
use crate::memory::MemoryTable;
use crate::parsers::blend::{read_blocks, read_header, Block, BlockCode, RawBlend};
use crate::parsers::dna::read_dna;
use crate::parsers::{Endianness, PointerSize};
use crate::query::{Query, QueryToken};
use crate::reflection::{Field, Type, TypeDatabase, TypeHandle};
use crate::stream::{FileStream, MemoryStream, SeekFrom, Stream};
use bytemuck::Pod;
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use libflate::gzip;
use std::fmt::{self, Debug, Formatter};
use std::io::Read;
use std::mem::size_of;
use std::num::NonZeroU64;
use std::path::Path;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// A fully parsed .blend file: the block stream, the type graph built from
/// its SDNA, and the persisted-address table used to resolve pointers.
pub struct Blend {
    blend: RawBlend,
    types: TypeDatabase,
    memory: MemoryTable,
}

impl Debug for Blend {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("Blend")
            .field("header", &self.blend.header)
            .field("blocks", &self.blend.blocks.len())
            .field("types", &self.types.type_count())
            .finish()
    }
}

impl Blend {
    /// Opens and parses a .blend file from disk. Gzip-compressed files are
    /// decompressed up front and parsed from memory.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Blend, BlendError> {
        let mut stream = FileStream::open(path).map_err(BlendError::Stream)?;

        let mut magic = [0u8; 2];
        let is_gzip = stream.read_into(&mut magic).is_ok() && magic == GZIP_MAGIC;
        stream.seek(SeekFrom::Start(0)).map_err(BlendError::Stream)?;

        if is_gzip {
            tracing::debug!("gzip magic found, decompressing");
            let io = |e| BlendError::Stream(StreamError::Io(e));
            let mut decoder = gzip::Decoder::new(stream).map_err(io)?;
            let mut data = Vec::new();
            decoder.read_to_end(&mut data).map_err(io)?;
            return Blend::read(&data);
        }

        Self::parse(&mut stream)
    }

    /// Parses a .blend file already held in memory. The bytes are only
    /// borrowed for the duration of the call; block bodies are copied out.
    pub fn read(data: &[u8]) -> Result<Blend, BlendError> {
        Self::parse(&mut MemoryStream::new(data))
    }

    fn parse<S: Stream>(stream: &mut S) -> Result<Blend, BlendError> {
        let header = read_header(stream)?;
        stream.set_endian(header.endianness);

        let blocks = read_blocks(stream, &header)?;
        let raw = RawBlend { header, blocks };

        let dna = read_dna(&raw)?;
        let types = TypeDatabase::build(&raw.header, &dna)?;
        let memory = MemoryTable::build(&raw.blocks);

        tracing::debug!(
            blocks = raw.blocks.len(),
            types = types.type_count(),
            ranges = memory.range_count(),
            "opened blend file"
        );

        Ok(Blend {
            blend: raw,
            types,
            memory,
        })
    }

    pub fn endian(&self) -> Endianness {
        self.blend.header.endianness
    }

    pub fn pointer_size(&self) -> PointerSize {
        self.blend.header.pointer_size
    }

    /// The producer's version triple, e.g. `*b"401"`.
    pub fn version(&self) -> [u8; 3] {
        self.blend.header.version
    }

    /// Total number of blocks, end sentinel included.
    pub fn block_count(&self) -> usize {
        self.blend.blocks.len()
    }

    /// Every block in file order, end sentinel included.
    pub fn all_blocks(&self) -> &[Block] {
        &self.blend.blocks
    }

    pub fn block_count_of(&self, code: BlockCode) -> usize {
        self.blocks(code).count()
    }

    /// All blocks carrying `code`, in file order.
    pub fn blocks(&self, code: BlockCode) -> impl Iterator<Item = &Block> {
        self.blend
            .blocks
            .iter()
            .filter(move |block| block.header.code == code)
    }

    /// The first block carrying `code`, if any.
    pub fn block(&self, code: BlockCode) -> Option<&Block> {
        self.blocks(code).next()
    }

    /// Looks up a type from the SDNA by name.
    pub fn type_by_name(&self, name: &str) -> Option<TypeView<'_>> {
        let handle = self.types.type_by_name(name)?;
        Some(TypeView {
            blend: self,
            handle,
        })
    }

    /// The aggregate a block declares for its body, per the block header's
    /// SDNA struct index (1-based; 0 means untyped bytes). `None` for
    /// untyped blocks and indices past the struct table.
    pub fn block_type(&self, block: &Block) -> Option<TypeView<'_>> {
        let handle = self.types.struct_by_index(block.header.struct_index)?;
        match self.types.get(handle) {
            Type::Aggregate { .. } => Some(TypeView {
                blend: self,
                handle,
            }),
            _ => None,
        }
    }

    /// Decodes a pointer payload stored in a block body. These bytes are
    /// kept exactly as the producer wrote them, so they follow the file's
    /// endianness, not the host's.
    fn decode_address(&self, data: &[u8]) -> Option<NonZeroU64> {
        let header = &self.blend.header;
        if data.len() < header.pointer_size.bytes_num() {
            return None;
        }

        let address = match (header.endianness, header.pointer_size) {
            (Endianness::Little, PointerSize::Bits32) => u64::from(LittleEndian::read_u32(data)),
            (Endianness::Big, PointerSize::Bits32) => u64::from(BigEndian::read_u32(data)),
            (Endianness::Little, PointerSize::Bits64) => LittleEndian::read_u64(data),
            (Endianness::Big, PointerSize::Bits64) => BigEndian::read_u64(data),
        };

        NonZeroU64::new(address)
    }

    fn resolve(&self, address: u64, size: usize) -> Option<&[u8]> {
        self.memory.get(&self.blend.blocks, address, size)
    }
}

/// A borrowed window onto one node of the type graph.
#[derive(Clone, Copy)]
pub struct TypeView<'a> {
    blend: &'a Blend,
    handle: TypeHandle,
}

impl PartialEq for TypeView<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.blend, other.blend) && self.handle == other.handle
    }
}

impl Eq for TypeView<'_> {}

impl Debug for TypeView<'_> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("TypeView")
            .field("name", &self.name())
            .field("size", &self.size())
            .finish()
    }
}

impl<'a> TypeView<'a> {
    fn node(&self) -> &'a Type {
        self.blend.types.get(self.handle)
    }

    /// The SDNA name for fundamentals, aggregates and functions; arrays and
    /// pointers are anonymous.
    pub fn name(&self) -> Option<&'a str> {
        self.node().name()
    }

    /// In-memory size in bytes.
    pub fn size(&self) -> usize {
        self.node().size()
    }

    pub fn is_struct(&self) -> bool {
        matches!(self.node(), Type::Aggregate { .. })
    }

    pub fn is_array(&self) -> bool {
        matches!(self.node(), Type::Array { .. })
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self.node(), Type::Pointer { .. })
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self.node(), Type::Fundamental { .. })
    }

    pub fn is_function(&self) -> bool {
        matches!(self.node(), Type::Function { .. })
    }

    /// The element type of an array or the pointee of a pointer.
    pub fn element_type(&self) -> Option<TypeView<'a>> {
        let handle = match self.node() {
            Type::Array { element, .. } => *element,
            Type::Pointer { pointee, .. } => *pointee,
            _ => return None,
        };
        Some(TypeView {
            blend: self.blend,
            handle,
        })
    }

    /// The aggregate's fields in declaration order; empty for other kinds.
    pub fn fields(&self) -> Vec<FieldView<'a>> {
        match self.node() {
            Type::Aggregate { fields, .. } => fields
                .values()
                .map(|field| FieldView {
                    blend: self.blend,
                    declaring: self.handle,
                    field,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<FieldView<'a>> {
        match self.node() {
            Type::Aggregate { fields, .. } => Some(FieldView {
                blend: self.blend,
                declaring: self.handle,
                field: fields.get(name)?,
            }),
            _ => None,
        }
    }

    /// Evaluates a path against `bytes`, which should be the body (or a
    /// typed sub-slice of the body) of a block whose layout is this type.
    /// Yields the reached type and its bytes.
    pub fn query(
        &self,
        bytes: &'a [u8],
        query: &Query,
    ) -> Result<(TypeView<'a>, &'a [u8]), QueryError> {
        let mut current_type = *self;
        let mut current_bytes = bytes;

        for token in query {
            match token {
                QueryToken::Name(name) => {
                    if !current_type.is_struct() {
                        return Err(QueryError::IndexedInvalidType);
                    }
                    let next = current_type
                        .field(name)
                        .ok_or_else(|| QueryError::FieldNotFound(name.clone()))?;
                    current_bytes = next.data(current_bytes).unwrap_or(&[]);
                    current_type = next.field_type();
                }
                QueryToken::Index(index) => {
                    let element = current_type
                        .element_type()
                        .ok_or(QueryError::IndexedInvalidType)?;

                    // For pointers the bytes reached so far are the pointer
                    // payload itself: decode it and swap in the pointed-at
                    // block bytes. Each index step peels one level of
                    // indirection, so a doubly indirect field dereferences
                    // level by level.
                    let slice = if current_type.is_pointer() {
                        let address = self
                            .blend
                            .decode_address(current_bytes)
                            .ok_or(QueryError::InvalidValue)?;
                        self.blend
                            .resolve(address.get(), element.size())
                            .ok_or(QueryError::InvalidValue)?
                    } else {
                        current_bytes
                    };

                    let element_size = element.size();
                    current_type = element;

                    // An empty slice means an earlier step ran out of data;
                    // it stays empty and the final size check reports it.
                    if slice.is_empty() {
                        current_bytes = slice;
                        continue;
                    }

                    let offset = index
                        .checked_mul(element_size)
                        .filter(|offset| {
                            offset
                                .checked_add(element_size)
                                .is_some_and(|end| end <= slice.len())
                        })
                        .ok_or(QueryError::IndexOutOfBounds {
                            index: *index,
                            len: slice.len(),
                        })?;

                    // Zero-sized elements (`void` pointees) keep the whole
                    // remainder; the producer's pointer maths has nothing
                    // better to offer.
                    current_bytes = if element_size > 0 {
                        &slice[offset..offset + element_size]
                    } else {
                        &slice[offset..]
                    };
                }
            }
        }

        Ok((current_type, current_bytes))
    }

    /// Evaluates a path and bit-casts the reached bytes into `T`. The bytes
    /// must be exactly `size_of::<T>()` long.
    pub fn query_value<T: Pod>(&self, bytes: &'a [u8], query: &Query) -> Result<T, QueryError> {
        let (_, data) = self.query(bytes, query)?;
        if data.len() != size_of::<T>() {
            return Err(QueryError::InvalidType);
        }
        Ok(bytemuck::pod_read_unaligned(data))
    }

    /// Evaluates a path whose final step followed a pointer and borrows the
    /// resolved bytes as a `T`. Requires the resolved bytes to hold at least
    /// `size_of::<T>()` bytes, naturally aligned for `T`.
    pub fn query_pointer<T: Pod>(&self, bytes: &'a [u8], query: &Query) -> Result<&'a T, QueryError> {
        let (_, data) = self.query(bytes, query)?;
        let prefix = data.get(..size_of::<T>()).ok_or(QueryError::InvalidType)?;
        bytemuck::try_from_bytes(prefix).map_err(|_| QueryError::InvalidType)
    }

    /// Walks an intrusive linked list starting at `bytes`, evaluating the
    /// path on every node and handing the reached type and bytes to `each`.
    /// The walk follows the node's `next` pointer (step `next[0]`) until it
    /// no longer resolves.
    pub fn query_each(
        &self,
        bytes: &'a [u8],
        query: &Query,
        mut each: impl FnMut(TypeView<'a>, &'a [u8]),
    ) -> Result<(), QueryError> {
        let next = Query::next_element();
        let mut current = bytes;

        loop {
            let (ty, data) = self.query(current, query)?;
            each(ty, data);

            match self.query(current, &next) {
                Ok((_, data)) if !data.is_empty() => current = data,
                Ok(_) => break,
                Err(QueryError::InvalidValue) => break,
                Err(error) => return Err(error),
            }
        }

        Ok(())
    }

    /// Typed variant of [`TypeView::query_each`]: bit-casts every node's
    /// path result into `T` before invoking the callback.
    pub fn query_each_value<T: Pod>(
        &self,
        bytes: &'a [u8],
        query: &Query,
        mut each: impl FnMut(T),
    ) -> Result<(), QueryError> {
        let next = Query::next_element();
        let mut current = bytes;

        loop {
            each(self.query_value(current, query)?);

            match self.query(current, &next) {
                Ok((_, data)) if !data.is_empty() => current = data,
                Ok(_) => break,
                Err(QueryError::InvalidValue) => break,
                Err(error) => return Err(error),
            }
        }

        Ok(())
    }
}

/// A borrowed window onto one field of an aggregate.
#[derive(Clone, Copy)]
pub struct FieldView<'a> {
    blend: &'a Blend,
    declaring: TypeHandle,
    field: &'a Field,
}

impl PartialEq for FieldView<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.blend, other.blend)
            && self.declaring == other.declaring
            && std::ptr::eq(self.field, other.field)
    }
}

impl Eq for FieldView<'_> {}

impl Debug for FieldView<'_> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("FieldView")
            .field("name", &self.field.name)
            .field("offset", &self.field.offset)
            .field("size", &self.field.size)
            .finish()
    }
}

impl<'a> FieldView<'a> {
    pub fn name(&self) -> &'a str {
        &self.field.name
    }

    pub fn declaring_type(&self) -> TypeView<'a> {
        TypeView {
            blend: self.blend,
            handle: self.declaring,
        }
    }

    pub fn field_type(&self) -> TypeView<'a> {
        TypeView {
            blend: self.blend,
            handle: self.field.ty,
        }
    }

    pub fn size(&self) -> usize {
        self.field.size
    }

    /// Byte offset within the declaring aggregate.
    pub fn offset(&self) -> usize {
        self.field.offset
    }

    /// Slices this field out of the declaring aggregate's bytes. `None` when
    /// the slice is too short to hold the field.
    pub fn data<'b>(&self, bytes: &'b [u8]) -> Option<&'b [u8]> {
        bytes.get(self.field.offset..self.field.offset + self.field.size)
    }

    fn pointee(&self) -> Option<TypeHandle> {
        match self.blend.types.get(self.field.ty) {
            Type::Pointer { pointee, .. } => Some(*pointee),
            _ => None,
        }
    }

    /// For pointer fields: decodes the stored address and resolves it
    /// through the memory table, asking for at least the pointee's size.
    /// `None` for non-pointer fields, null pointers and addresses no block
    /// covers. The returned slice borrows the `Blend`, not `bytes`.
    pub fn pointer_data(&self, bytes: &[u8]) -> Option<&'a [u8]> {
        let pointee = self.pointee()?;
        let data = self.data(bytes)?;
        let address = self.blend.decode_address(data)?;
        let size = self.blend.types.size_of(pointee);
        self.blend.resolve(address.get(), size)
    }

    /// Bit-casts the field's bytes into `T`. Requires the field size to
    /// equal `size_of::<T>()` exactly.
    pub fn value<T: Pod>(&self, bytes: &[u8]) -> Option<T> {
        if self.field.size != size_of::<T>() {
            return None;
        }
        let data = self.data(bytes)?;
        Some(bytemuck::pod_read_unaligned(data))
    }

    /// Borrows the pointed-at bytes as a `T`. Requires the pointee size to
    /// equal `size_of::<T>()` and the resolved bytes to be naturally
    /// aligned for `T`; [`FieldView::pointer_value`] copies instead and has
    /// no alignment requirement.
    pub fn pointer<T: Pod>(&self, bytes: &[u8]) -> Option<&'a T> {
        let pointee = self.pointee()?;
        if self.blend.types.size_of(pointee) != size_of::<T>() {
            return None;
        }
        let data = self.pointer_data(bytes)?;
        bytemuck::try_from_bytes(data.get(..size_of::<T>())?).ok()
    }

    /// Copies the pointed-at bytes into a `T`. Requires the pointee size to
    /// equal `size_of::<T>()`.
    pub fn pointer_value<T: Pod>(&self, bytes: &[u8]) -> Option<T> {
        let pointee = self.pointee()?;
        if self.blend.types.size_of(pointee) != size_of::<T>() {
            return None;
        }
        let data = self.pointer_data(bytes)?;
        Some(bytemuck::pod_read_unaligned(data.get(..size_of::<T>())?))
    }
}
