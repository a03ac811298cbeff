#![allow(dead_code)]

use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;

/// Builds a small dex image: id tables, type lists, string data and a map
/// list, with a valid checksum. Classes carry no class data.
#[derive(Debug, Default, Clone)]
pub struct DexBuilder {
    classes: Vec<String>,
    methods: Vec<(String, String, Vec<String>, String)>,
}

impl DexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn class(mut self, descriptor: &str) -> Self {
        self.classes.push(descriptor.to_string());
        self
    }

    pub fn method(mut self, class: &str, name: &str, params: &[&str], ret: &str) -> Self {
        self.methods.push((
            class.to_string(),
            name.to_string(),
            params.iter().map(|p| p.to_string()).collect(),
            ret.to_string(),
        ));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut type_set = BTreeSet::new();
        let mut string_set = BTreeSet::new();
        let mut proto_set = BTreeSet::new();
        for c in &self.classes {
            type_set.insert(c.clone());
        }
        for (class, name, params, ret) in &self.methods {
            type_set.insert(class.clone());
            type_set.extend(params.iter().cloned());
            type_set.insert(ret.clone());
            string_set.insert(name.clone());
            proto_set.insert((params.clone(), ret.clone()));
        }
        string_set.extend(type_set.iter().cloned());

        let strings: Vec<String> = string_set.into_iter().collect();
        let types: Vec<String> = type_set.into_iter().collect();
        let protos: Vec<(Vec<String>, String)> = proto_set.into_iter().collect();

        let string_idx = |s: &str| strings.iter().position(|x| x == s).unwrap() as u32;
        let type_idx = |s: &str| types.iter().position(|x| x == s).unwrap() as u32;
        let proto_idx = |p: &(Vec<String>, String)| protos.iter().position(|x| x == p).unwrap() as u32;

        let string_ids_off = 0x70;
        let type_ids_off = string_ids_off + strings.len() * 4;
        let proto_ids_off = type_ids_off + types.len() * 4;
        let method_ids_off = proto_ids_off + protos.len() * 12;
        let class_defs_off = method_ids_off + self.methods.len() * 8;
        let data_off = class_defs_off + self.classes.len() * 32;

        let mut out = vec![0u8; data_off];

        let mut param_offsets = Vec::new();
        for (params, _) in &protos {
            if params.is_empty() {
                param_offsets.push(0u32);
                continue;
            }
            while out.len() % 4 != 0 {
                out.push(0);
            }
            param_offsets.push(out.len() as u32);
            out.extend((params.len() as u32).to_le_bytes());
            for p in params {
                out.extend((type_idx(p) as u16).to_le_bytes());
            }
        }

        let mut string_offsets = Vec::new();
        for s in &strings {
            string_offsets.push(out.len() as u32);
            write_uleb128(&mut out, s.encode_utf16().count() as u32);
            out.extend(s.as_bytes());
            out.push(0);
        }

        while out.len() % 4 != 0 {
            out.push(0);
        }
        let map_off = out.len();
        let first_type_list = param_offsets.iter().copied().find(|off| *off != 0);
        let mut map = vec![(0x0000u16, 1usize, 0usize)];
        for (code, count, off) in [
            (0x0001, strings.len(), string_ids_off),
            (0x0002, types.len(), type_ids_off),
            (0x0003, protos.len(), proto_ids_off),
            (0x0005, self.methods.len(), method_ids_off),
            (0x0006, self.classes.len(), class_defs_off),
        ] {
            if count > 0 {
                map.push((code, count, off));
            }
        }
        if let Some(off) = first_type_list {
            let lists = param_offsets.iter().filter(|off| **off != 0).count();
            map.push((0x1001, lists, off as usize));
        }
        if let Some(off) = string_offsets.first() {
            map.push((0x2002, strings.len(), *off as usize));
        }
        map.push((0x1000, 1, map_off));
        out.extend((map.len() as u32).to_le_bytes());
        for (code, count, off) in map {
            out.extend(code.to_le_bytes());
            out.extend(0u16.to_le_bytes());
            out.extend((count as u32).to_le_bytes());
            out.extend((off as u32).to_le_bytes());
        }

        put(&mut out, 0, b"dex\n035\0");
        let file_size = out.len() as u32;
        put_u32(&mut out, 52, map_off as u32);
        put_u32(&mut out, 32, file_size);
        put_u32(&mut out, 36, 0x70);
        put_u32(&mut out, 40, 0x1234_5678);
        put_u32(&mut out, 56, strings.len() as u32);
        put_u32(&mut out, 60, string_ids_off as u32);
        put_u32(&mut out, 64, types.len() as u32);
        put_u32(&mut out, 68, type_ids_off as u32);
        put_u32(&mut out, 72, protos.len() as u32);
        put_u32(&mut out, 76, proto_ids_off as u32);
        put_u32(&mut out, 88, self.methods.len() as u32);
        put_u32(&mut out, 92, method_ids_off as u32);
        put_u32(&mut out, 96, self.classes.len() as u32);
        put_u32(&mut out, 100, class_defs_off as u32);
        put_u32(&mut out, 104, file_size - data_off as u32);
        put_u32(&mut out, 108, data_off as u32);

        for (i, off) in string_offsets.iter().enumerate() {
            put_u32(&mut out, string_ids_off + i * 4, *off);
        }
        for (i, t) in types.iter().enumerate() {
            put_u32(&mut out, type_ids_off + i * 4, string_idx(t));
        }
        for (i, (_, ret)) in protos.iter().enumerate() {
            let item = proto_ids_off + i * 12;
            // shorty: reuse the return descriptor string
            put_u32(&mut out, item, string_idx(ret));
            put_u32(&mut out, item + 4, type_idx(ret));
            put_u32(&mut out, item + 8, param_offsets[i]);
        }
        for (i, (class, name, params, ret)) in self.methods.iter().enumerate() {
            let item = method_ids_off + i * 8;
            let proto = proto_idx(&(params.clone(), ret.clone()));
            put(&mut out, item, &(type_idx(class) as u16).to_le_bytes());
            put(&mut out, item + 2, &(proto as u16).to_le_bytes());
            put_u32(&mut out, item + 4, string_idx(name));
        }
        for (i, class) in self.classes.iter().enumerate() {
            let item = class_defs_off + i * 32;
            put_u32(&mut out, item, type_idx(class));
            put_u32(&mut out, item + 8, u32::MAX);
            put_u32(&mut out, item + 16, u32::MAX);
        }

        let checksum = adler32(&out[12..]);
        put_u32(&mut out, 8, checksum);
        out
    }

    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.build())
    }
}

fn put(out: &mut [u8], offset: usize, bytes: &[u8]) {
    out[offset..offset + bytes.len()].copy_from_slice(bytes);
}

fn put_u32(out: &mut [u8], offset: usize, value: u32) {
    put(out, offset, &value.to_le_bytes());
}

fn adler32(data: &[u8]) -> u32 {
    let (mut a, mut b) = (1u32, 0u32);
    for byte in data {
        a = (a + u32::from(*byte)) % 65521;
        b = (b + a) % 65521;
    }
    (b << 16) | a
}

fn write_uleb128(out: &mut Vec<u8>, mut value: u32) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

pub fn write_zip(path: &Path, entries: &[(&str, &[u8])]) -> anyhow::Result<()> {
    use zip::write::FileOptions;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    let mut zip = zip::ZipWriter::new(file);
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, content) in entries {
        zip.start_file(*name, options)?;
        zip.write_all(content)?;
    }
    zip.finish()?;
    Ok(())
}
