//! DEX image index: class definitions and method references.
//!
//! Images are read with the `dex` crate. Code items, checksums and the
//! signature are not inspected.

use dex::{Dex, DexReader};
use memmap2::Mmap;
use std::fs::File;
use thiserror::Error;

const HEADER_SIZE: usize = 0x70;
const ENDIAN_CONSTANT: u32 = 0x1234_5678;
const NO_OFFSET: u32 = 0;

#[derive(Debug, Error)]
pub enum DexError {
    #[error("{name}: file too short for a dex header ({len} bytes)")]
    TooShort { name: String, len: usize },
    #[error("{name}: bad dex magic")]
    BadMagic { name: String },
    #[error("{name}: unsupported endian tag {tag:#010x}")]
    UnsupportedEndian { name: String, tag: u32 },
    #[error("{name}: {what}: {message}")]
    Malformed {
        name: String,
        what: &'static str,
        message: String,
    },
    #[error("{name}: parameter list at offset {offset:#x} lies outside the image")]
    OutOfBounds { name: String, offset: usize },
    #[error("{name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// One entry of the method id table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodRecord {
    pub declaring_class: String,
    pub name: String,
    /// `(` + parameter descriptors + `)` + return descriptor.
    pub descriptor: String,
}

#[derive(Debug, Clone, Default)]
pub struct DexIndex {
    class_descriptors: Vec<String>,
    method_refs: Vec<MethodRecord>,
}

impl DexIndex {
    /// Maps and indexes an open image. Failures are logged here once; callers
    /// only need to propagate them.
    pub fn load(file: &File, name: &str) -> Result<Self, DexError> {
        let result = map_image(file, name).and_then(|mmap| Self::parse(&mmap, name));
        if let Err(e) = &result {
            log::error!("Failed: {e}");
        }
        result
    }

    pub fn parse(bytes: &[u8], name: &str) -> Result<Self, DexError> {
        check_header(bytes, name)?;
        let malformed = |what: &'static str| {
            move |e: dex::Error| DexError::Malformed {
                name: name.to_string(),
                what,
                message: e.to_string(),
            }
        };

        let dex = DexReader::from_vec(bytes.to_vec()).map_err(malformed("header"))?;

        let mut class_descriptors = Vec::new();
        for class in dex.classes() {
            let class = class.map_err(malformed("class definition"))?;
            class_descriptors.push(class.jtype().type_descriptor().to_string());
        }

        let mut method_refs = Vec::new();
        for item in dex.method_ids() {
            let item = item.map_err(malformed("method id"))?;
            let declaring_class = type_descriptor(&dex, item.class_idx().into())
                .map_err(malformed("method class"))?;
            let method_name = dex
                .get_string(item.name_idx())
                .map_err(malformed("method name"))?
                .to_string();
            let proto = dex
                .get_proto_item(item.proto_idx().into())
                .map_err(malformed("method proto"))?;

            let mut descriptor = String::from("(");
            for type_idx in parameter_type_ids(bytes, proto.params_off(), name)? {
                let param = type_descriptor(&dex, type_idx.into())
                    .map_err(malformed("parameter type"))?;
                descriptor.push_str(&param);
            }
            descriptor.push(')');
            descriptor.push_str(
                &type_descriptor(&dex, proto.return_type()).map_err(malformed("return type"))?,
            );

            method_refs.push(MethodRecord {
                declaring_class,
                name: method_name,
                descriptor,
            });
        }

        Ok(Self {
            class_descriptors,
            method_refs,
        })
    }

    pub fn class_descriptors(&self) -> &[String] {
        &self.class_descriptors
    }

    pub fn method_refs(&self) -> &[MethodRecord] {
        &self.method_refs
    }
}

fn map_image(file: &File, name: &str) -> Result<Mmap, DexError> {
    let io = |source| DexError::Io {
        name: name.to_string(),
        source,
    };
    let len = file.metadata().map_err(io)?.len() as usize;
    if len < HEADER_SIZE {
        return Err(DexError::TooShort {
            name: name.to_string(),
            len,
        });
    }
    // SAFETY: The file is only read through this mapping, and the mapping is
    // dropped before the handle is released by the caller.
    unsafe { Mmap::map(file) }.map_err(io)
}

/// Rejects foreign files before they reach the parser, so the error names
/// what is wrong with them.
fn check_header(bytes: &[u8], name: &str) -> Result<(), DexError> {
    if bytes.len() < HEADER_SIZE {
        return Err(DexError::TooShort {
            name: name.to_string(),
            len: bytes.len(),
        });
    }
    let magic = &bytes[..8];
    let version_ok = magic[4..7].iter().all(u8::is_ascii_digit);
    if &magic[..4] != b"dex\n" || !version_ok || magic[7] != 0 {
        return Err(DexError::BadMagic {
            name: name.to_string(),
        });
    }
    let tag = u32::from_le_bytes([bytes[40], bytes[41], bytes[42], bytes[43]]);
    if tag != ENDIAN_CONSTANT {
        return Err(DexError::UnsupportedEndian {
            name: name.to_string(),
            tag,
        });
    }
    Ok(())
}

fn type_descriptor<T: AsRef<[u8]>>(dex: &Dex<T>, type_idx: u32) -> Result<String, dex::Error> {
    Ok(dex.get_type(type_idx)?.type_descriptor().to_string())
}

/// Type ids of a proto's parameter list: a `u32` count followed by `u16`
/// entries. The crate only resolves these lists for defined methods, so
/// referenced methods read them here.
fn parameter_type_ids(bytes: &[u8], params_off: u32, name: &str) -> Result<Vec<u16>, DexError> {
    if params_off == NO_OFFSET {
        return Ok(Vec::new());
    }
    let offset = params_off as usize;
    let out_of_bounds = || DexError::OutOfBounds {
        name: name.to_string(),
        offset,
    };

    let size = bytes
        .get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize)
        .ok_or_else(out_of_bounds)?;
    let entries = size
        .checked_mul(2)
        .and_then(|len| bytes.get(offset + 4..offset + 4 + len))
        .ok_or_else(out_of_bounds)?;

    Ok(entries
        .chunks_exact(2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .collect())
}
