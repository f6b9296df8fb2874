//! The type graph built from the SDNA tables.
//!
//! Types live in an append-only arena and reference each other by stable
//! integer handles, which is what lets aggregates point at each other freely
//! (linked-list `next`/`prev` fields reference the aggregate that contains
//! them). The arena is populated in two passes: every SDNA type slot is
//! seeded as a fundamental carrying its `TLEN` size, then each SDNA struct
//! overwrites its own slot with the resolved aggregate. Array, pointer and
//! function nodes are synthesised on demand while fields are resolved and
//! appended after the seeded slots, so a slot index always equals its SDNA
//! type index.

use crate::error::ReflectionError;
use crate::parsers::blend::Header;
use crate::parsers::dna::Dna;
use crate::parsers::field::{parse_field_name, FieldShape};
use linked_hash_map::LinkedHashMap;
use std::collections::HashMap;

/// Stable reference to a node in the type arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeHandle(usize);

/// One resolved member of an aggregate, stored under its name.
#[derive(Debug, Clone)]
pub struct Field {
    /// The bare field name, stripped of declarator syntax. Matches the key
    /// the field is stored under.
    pub name: String,
    /// Byte offset from the start of the aggregate.
    pub offset: usize,
    /// In-memory size of the field, per the type graph.
    pub size: usize,
    pub ty: TypeHandle,
}

/// A node of the type graph.
#[derive(Debug)]
pub enum Type {
    Fundamental {
        name: String,
        size: usize,
    },
    Aggregate {
        name: String,
        size: usize,
        /// Insertion order matches declaration order, so iterating the map
        /// and looking names up agree by construction.
        fields: LinkedHashMap<String, Field>,
    },
    Array {
        element: TypeHandle,
        count: usize,
        size: usize,
    },
    Pointer {
        pointee: TypeHandle,
        size: usize,
    },
    Function {
        name: String,
        size: usize,
    },
}

impl Type {
    pub fn size(&self) -> usize {
        match self {
            Type::Fundamental { size, .. }
            | Type::Aggregate { size, .. }
            | Type::Array { size, .. }
            | Type::Pointer { size, .. }
            | Type::Function { size, .. } => *size,
        }
    }

    /// Named kinds only; arrays and pointers are anonymous.
    pub fn name(&self) -> Option<&str> {
        match self {
            Type::Fundamental { name, .. }
            | Type::Aggregate { name, .. }
            | Type::Function { name, .. } => Some(name),
            Type::Array { .. } | Type::Pointer { .. } => None,
        }
    }
}

/// The frozen type arena plus its lookup tables.
#[derive(Debug, Default)]
pub struct TypeDatabase {
    types: Vec<Type>,
    type_map: HashMap<String, TypeHandle>,
    struct_map: HashMap<u32, TypeHandle>,
}

impl TypeDatabase {
    pub fn get(&self, handle: TypeHandle) -> &Type {
        &self.types[handle.0]
    }

    pub fn size_of(&self, handle: TypeHandle) -> usize {
        self.get(handle).size()
    }

    /// Looks up a type by its SDNA name.
    pub fn type_by_name(&self, name: &str) -> Option<TypeHandle> {
        self.type_map.get(name).copied()
    }

    /// Looks up the aggregate a block header's `struct_index` refers to.
    /// Indices follow the block-header convention: 1-based over the SDNA
    /// struct table, with 0 reserved for untyped bytes. Index 0 never
    /// resolves.
    pub fn struct_by_index(&self, struct_index: u32) -> Option<TypeHandle> {
        self.struct_map.get(&struct_index).copied()
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    fn push(&mut self, ty: Type) -> TypeHandle {
        self.types.push(ty);
        TypeHandle(self.types.len() - 1)
    }

    pub(crate) fn build(header: &Header, dna: &Dna) -> Result<Self, ReflectionError> {
        let pointer_size = header.pointer_size.bytes_num();
        let type_count = dna.type_names.len();

        // First pass: every type slot starts out fundamental with its TLEN
        // size, so field resolution can size anything it references.
        let mut database = TypeDatabase {
            types: Vec::with_capacity(type_count),
            type_map: HashMap::with_capacity(type_count),
            struct_map: HashMap::with_capacity(dna.structs.len()),
        };

        for (index, name) in dna.type_names.iter().enumerate() {
            database.types.push(Type::Fundamental {
                name: name.clone(),
                size: dna.type_lengths[index] as usize,
            });
            database.type_map.insert(name.clone(), TypeHandle(index));
        }

        for (struct_index, entry) in dna.structs.iter().enumerate() {
            let type_index = entry.type_index as usize;
            if type_index >= type_count {
                return Err(ReflectionError::InvalidSdnaStruct(struct_index));
            }
            // Block headers use 0 for untyped bytes, so the first struct is
            // reachable at index 1.
            database
                .struct_map
                .insert(struct_index as u32 + 1, TypeHandle(type_index));
        }

        // Second pass: resolve every aggregate, replacing its seeded slot.
        for (struct_index, entry) in dna.structs.iter().enumerate() {
            let type_index = entry.type_index as usize;
            let mut fields = LinkedHashMap::new();
            let mut offset = 0usize;

            for field in &entry.fields {
                let field_type_index = field.type_index as usize;
                let field_name_index = field.name_index as usize;
                if field_type_index >= type_count || field_name_index >= dna.field_names.len() {
                    return Err(ReflectionError::InvalidSdnaField {
                        type_index: field_type_index,
                        name_index: field_name_index,
                    });
                }

                let declarator = &dna.field_names[field_name_index];
                let bad_name = || ReflectionError::InvalidSdnaFieldName(declarator.clone());
                let (name, shape) = parse_field_name(declarator).map_err(|_| bad_name())?;

                let handle = match shape {
                    FieldShape::Function => {
                        let function = database.push(Type::Function {
                            name: name.to_owned(),
                            size: pointer_size,
                        });
                        database.push(Type::Pointer {
                            pointee: function,
                            size: pointer_size,
                        })
                    }
                    FieldShape::Plain {
                        pointers,
                        dimensions,
                    } => {
                        let mut handle = TypeHandle(field_type_index);
                        for count in dimensions {
                            let size = database
                                .size_of(handle)
                                .checked_mul(count)
                                .ok_or_else(bad_name)?;
                            let element = handle;
                            handle = database.push(Type::Array {
                                element,
                                count,
                                size,
                            });
                        }
                        for _ in 0..pointers {
                            let pointee = handle;
                            handle = database.push(Type::Pointer {
                                pointee,
                                size: pointer_size,
                            });
                        }
                        handle
                    }
                };

                let size = database.size_of(handle);
                fields.insert(
                    name.to_owned(),
                    Field {
                        name: name.to_owned(),
                        offset,
                        size,
                        ty: handle,
                    },
                );
                offset = offset
                    .checked_add(size)
                    .ok_or(ReflectionError::InvalidSdnaStruct(struct_index))?;
            }

            // Trailing padding is allowed, overrunning the declared size is
            // not.
            let declared_size = dna.type_lengths[type_index] as usize;
            if offset > declared_size {
                return Err(ReflectionError::InvalidSdnaStruct(struct_index));
            }

            database.types[type_index] = Type::Aggregate {
                name: dna.type_names[type_index].clone(),
                size: declared_size,
                fields,
            };
        }

        tracing::debug!(
            types = database.types.len(),
            structs = dna.structs.len(),
            "type database built"
        );

        Ok(database)
    }
}
