//! Builds a small synthetic .blend file in memory for the end-to-end tests.
//!
//! The file mimics the shape of a real save: a mesh block whose `vdata`
//! aggregate points at a layer block, which in turn points at a block of
//! eight vertex records (the corners of a unit cube), a doubly indirect
//! material table (`Material **mats`), and a three-node intrusive linked
//! list. The SDNA is emitted with sizes matching the requested pointer
//! width so the same schema round-trips through 32-bit, 64-bit, little-
//! and big-endian renditions. Block struct indices follow the producer's
//! convention: 1-based, with 0 marking untyped bytes.

use blendna::{Endianness, PointerSize};
use byteorder::{BigEndian, LittleEndian, WriteBytesExt};

pub const MESH_ADDRESS: u64 = 0x1000;
pub const LAYER_ADDRESS: u64 = 0x2000;
pub const VERTS_ADDRESS: u64 = 0x3000;
pub const NODE_ADDRESSES: [u64; 3] = [0x4000, 0x4100, 0x4200];
pub const MAT_POINTERS_ADDRESS: u64 = 0x5000;
pub const MAT_ADDRESSES: [u64; 2] = [0x6000, 0x6100];
pub const DNA_ADDRESS: u64 = 0x9000;

pub const NODE_VALUES: [i32; 3] = [10, 20, 30];

pub const MAT_COLORS: [[f32; 4]; 2] = [[0.25, 0.5, 0.75, 1.0], [2.0, 4.0, 8.0, 16.0]];

#[rustfmt::skip]
pub const CUBE_CORNERS: [[f32; 3]; 8] = [
    [1.0, 1.0, 1.0], [1.0, 1.0, -1.0], [1.0, -1.0, 1.0], [1.0, -1.0, -1.0],
    [-1.0, 1.0, 1.0], [-1.0, 1.0, -1.0], [-1.0, -1.0, 1.0], [-1.0, -1.0, -1.0],
];

pub struct Writer {
    endianness: Endianness,
    pointer_size: PointerSize,
    pub data: Vec<u8>,
}

impl Writer {
    pub fn new(endianness: Endianness, pointer_size: PointerSize) -> Self {
        Self {
            endianness,
            pointer_size,
            data: Vec::new(),
        }
    }

    pub fn bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    pub fn cstr(&mut self, string: &str) {
        self.bytes(string.as_bytes());
        self.data.push(0);
    }

    pub fn pad4(&mut self) {
        while self.data.len() % 4 != 0 {
            self.data.push(0);
        }
    }

    pub fn u16(&mut self, value: u16) {
        match self.endianness {
            Endianness::Little => self.data.write_u16::<LittleEndian>(value).unwrap(),
            Endianness::Big => self.data.write_u16::<BigEndian>(value).unwrap(),
        }
    }

    pub fn u32(&mut self, value: u32) {
        match self.endianness {
            Endianness::Little => self.data.write_u32::<LittleEndian>(value).unwrap(),
            Endianness::Big => self.data.write_u32::<BigEndian>(value).unwrap(),
        }
    }

    pub fn i32(&mut self, value: i32) {
        self.u32(value as u32);
    }

    pub fn f32(&mut self, value: f32) {
        self.u32(value.to_bits());
    }

    pub fn u64(&mut self, value: u64) {
        match self.endianness {
            Endianness::Little => self.data.write_u64::<LittleEndian>(value).unwrap(),
            Endianness::Big => self.data.write_u64::<BigEndian>(value).unwrap(),
        }
    }

    pub fn ptr(&mut self, value: u64) {
        match self.pointer_size {
            PointerSize::Bits32 => self.u32(value as u32),
            PointerSize::Bits64 => self.u64(value),
        }
    }
}

pub fn write_block(
    out: &mut Writer,
    code: [u8; 4],
    address: u64,
    struct_index: u32,
    count: u32,
    body: &[u8],
) {
    out.bytes(&code);
    out.u32(body.len() as u32);
    out.ptr(address);
    out.u32(struct_index);
    out.u32(count);
    out.bytes(body);
}

/// SDNA field names, by index.
const FIELD_NAMES: [&str; 21] = [
    "*next",     // 0
    "*prev",     // 1
    "*layers",   // 2
    "totlayer",  // 3
    "_pad0",     // 4
    "*pool",     // 5
    "vdata",     // 6
    "totvert",   // 7
    "flag",      // 8
    "size[3]",   // 9
    "type",      // 10
    "offset",    // 11
    "*data",     // 12
    "(*free)()", // 13
    "value",     // 14
    "_pad1[4]",  // 15
    "**mats",    // 16
    "r",         // 17
    "g",         // 18
    "b",         // 19
    "alpha",     // 20
];

/// SDNA type names, by index.
const TYPE_NAMES: [&str; 11] = [
    "char",            // 0
    "short",           // 1
    "int",             // 2
    "float",           // 3
    "void",            // 4
    "Link",            // 5
    "Mesh",            // 6
    "CustomData",      // 7
    "CustomDataLayer", // 8
    "LinkNode",        // 9
    "Material",        // 10
];

fn sdna_body(endianness: Endianness, pointer_size: PointerSize) -> Vec<u8> {
    let ps = pointer_size.bytes_num() as u16;
    let link_size = 2 * ps;
    let mesh_size = 3 * ps + 32;
    let cdata_size = 2 * ps + 8;
    let layer_size = 2 * ps + 8;
    let node_size = ps + 8;
    let material_size = 16;

    let mut out = Writer::new(endianness, pointer_size);
    out.bytes(b"SDNA");

    out.bytes(b"NAME");
    out.u32(FIELD_NAMES.len() as u32);
    for name in FIELD_NAMES {
        out.cstr(name);
    }
    out.pad4();

    out.bytes(b"TYPE");
    out.u32(TYPE_NAMES.len() as u32);
    for name in TYPE_NAMES {
        out.cstr(name);
    }
    out.pad4();

    out.bytes(b"TLEN");
    for size in [
        1,
        2,
        4,
        4,
        0,
        link_size,
        mesh_size,
        cdata_size,
        layer_size,
        node_size,
        material_size,
    ] {
        out.u16(size);
    }
    out.pad4();

    out.bytes(b"STRC");
    out.u32(6);
    // struct 0: Link { Link *next; Link *prev; }
    for value in [5, 2, 5, 0, 5, 1] {
        out.u16(value);
    }
    // struct 1: Mesh { CustomData vdata; int totvert; int flag;
    //                  float size[3]; int _pad0; Material **mats; }
    for value in [6, 6, 7, 6, 2, 7, 2, 8, 3, 9, 2, 4, 10, 16] {
        out.u16(value);
    }
    // struct 2: CustomData { CustomDataLayer *layers; int totlayer;
    //                        int _pad0; void *pool; }
    for value in [7, 4, 8, 2, 2, 3, 2, 4, 4, 5] {
        out.u16(value);
    }
    // struct 3: CustomDataLayer { int type; int offset; void *data;
    //                             void (*free)(); }
    for value in [8, 4, 2, 10, 2, 11, 4, 12, 0, 13] {
        out.u16(value);
    }
    // struct 4: LinkNode { LinkNode *next; int value; char _pad1[4]; }
    for value in [9, 3, 9, 0, 2, 14, 0, 15] {
        out.u16(value);
    }
    // struct 5: Material { float r; float g; float b; float alpha; }
    for value in [10, 4, 3, 17, 3, 18, 3, 19, 3, 20] {
        out.u16(value);
    }

    out.data
}

fn mesh_body(endianness: Endianness, pointer_size: PointerSize) -> Vec<u8> {
    let mut out = Writer::new(endianness, pointer_size);
    // vdata
    out.ptr(LAYER_ADDRESS);
    out.i32(1);
    out.i32(0);
    out.ptr(0);
    // totvert, flag
    out.i32(8);
    out.i32(0);
    // size[3]
    out.f32(1.0);
    out.f32(1.0);
    out.f32(1.0);
    // _pad0
    out.i32(0);
    // mats
    out.ptr(MAT_POINTERS_ADDRESS);
    out.data
}

fn layer_body(endianness: Endianness, pointer_size: PointerSize) -> Vec<u8> {
    let mut out = Writer::new(endianness, pointer_size);
    out.i32(0);
    out.i32(0);
    out.ptr(VERTS_ADDRESS);
    out.ptr(0);
    out.data
}

fn verts_body(endianness: Endianness, pointer_size: PointerSize) -> Vec<u8> {
    let mut out = Writer::new(endianness, pointer_size);
    for [x, y, z] in CUBE_CORNERS {
        out.f32(x);
        out.f32(y);
        out.f32(z);
        out.u32(0);
    }
    out.data
}

fn mat_pointers_body(endianness: Endianness, pointer_size: PointerSize) -> Vec<u8> {
    let mut out = Writer::new(endianness, pointer_size);
    for address in MAT_ADDRESSES {
        out.ptr(address);
    }
    out.data
}

fn material_body(
    endianness: Endianness,
    pointer_size: PointerSize,
    color: [f32; 4],
) -> Vec<u8> {
    let mut out = Writer::new(endianness, pointer_size);
    for channel in color {
        out.f32(channel);
    }
    out.data
}

fn node_body(
    endianness: Endianness,
    pointer_size: PointerSize,
    next: u64,
    value: i32,
) -> Vec<u8> {
    let mut out = Writer::new(endianness, pointer_size);
    out.ptr(next);
    out.i32(value);
    out.bytes(&[0; 4]);
    out.data
}

/// Assembles the whole fixture file for the given memory model.
pub fn build_fixture(endianness: Endianness, pointer_size: PointerSize) -> Vec<u8> {
    let mut out = Writer::new(endianness, pointer_size);

    out.bytes(b"BLENDER");
    out.bytes(match pointer_size {
        PointerSize::Bits32 => b"_",
        PointerSize::Bits64 => b"-",
    });
    out.bytes(match endianness {
        Endianness::Little => b"v",
        Endianness::Big => b"V",
    });
    out.bytes(b"401");

    write_block(
        &mut out,
        *b"ME\0\0",
        MESH_ADDRESS,
        2,
        1,
        &mesh_body(endianness, pointer_size),
    );
    write_block(
        &mut out,
        *b"DATA",
        LAYER_ADDRESS,
        4,
        1,
        &layer_body(endianness, pointer_size),
    );
    write_block(
        &mut out,
        *b"DATA",
        VERTS_ADDRESS,
        0,
        8,
        &verts_body(endianness, pointer_size),
    );
    for (address, value) in NODE_ADDRESSES.iter().zip(NODE_VALUES) {
        let next = NODE_ADDRESSES
            .iter()
            .find(|&&other| other > *address)
            .copied()
            .unwrap_or(0);
        write_block(
            &mut out,
            *b"DATA",
            *address,
            5,
            1,
            &node_body(endianness, pointer_size, next, value),
        );
    }
    write_block(
        &mut out,
        *b"DATA",
        MAT_POINTERS_ADDRESS,
        0,
        2,
        &mat_pointers_body(endianness, pointer_size),
    );
    for (address, color) in MAT_ADDRESSES.iter().zip(MAT_COLORS) {
        write_block(
            &mut out,
            *b"DATA",
            *address,
            6,
            1,
            &material_body(endianness, pointer_size, color),
        );
    }
    write_block(
        &mut out,
        *b"DNA1",
        DNA_ADDRESS,
        0,
        1,
        &sdna_body(endianness, pointer_size),
    );
    write_block(&mut out, *b"ENDB", 0, 0, 0, &[]);

    out.data
}

/// The 64-bit little-endian rendition most tests use.
pub fn default_fixture() -> Vec<u8> {
    build_fixture(Endianness::Little, PointerSize::Bits64)
}
