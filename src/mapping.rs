//! ProGuard/R8 mapping files and the frame remapping built on them.

use anyhow::{Context, Result};
use proguard::{ProguardMapper, ProguardMapping, ProguardRecord, StackFrame};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::pattern::Frame;

/// Turns one obfuscated frame into its original candidates. Several results
/// mean the obfuscated name is ambiguous (e.g. collapsed overloads).
pub trait MappingResolver {
    fn transform(&self, frame: &Frame) -> Vec<Frame>;
}

/// The contents of one mapping file. Resolvers borrow from it.
#[derive(Debug)]
pub struct MappingFile {
    path: PathBuf,
    bytes: Vec<u8>,
}

impl MappingFile {
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read mapping file: {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            bytes,
        })
    }

    pub fn retracer(&self) -> Retracer<'_> {
        log::debug!("loading mapping file {}", self.path.display());
        Retracer::new(&self.bytes)
    }
}

#[derive(Debug, Clone, Copy)]
struct FieldEntry<'s> {
    ty: &'s str,
    name: &'s str,
}

/// Original declaration of one obfuscated method, as written in the mapping.
#[derive(Debug, Clone)]
struct MethodSignature<'s> {
    class: &'s str,
    name: &'s str,
    ty: &'s str,
    /// `,` joined, without spaces.
    arguments: String,
    /// Start of the obfuscated line range, `0` when the member has none.
    first_line: usize,
}

/// Remaps frames through a [`ProguardMapper`]. Class and method candidates
/// come from the mapper; the member signatures it does not expose (field
/// types, method return and argument types) are indexed here.
pub struct Retracer<'s> {
    mapper: ProguardMapper<'s>,
    fields: HashMap<&'s str, HashMap<&'s str, Vec<FieldEntry<'s>>>>,
    methods: HashMap<&'s str, HashMap<&'s str, Vec<MethodSignature<'s>>>>,
}

impl<'s> Retracer<'s> {
    pub fn new(bytes: &'s [u8]) -> Self {
        let mut retracer = Self {
            mapper: ProguardMapper::new(ProguardMapping::new(bytes)),
            fields: HashMap::new(),
            methods: HashMap::new(),
        };

        // (obfuscated, original) name of the class being read
        let mut current: Option<(&'s str, &'s str)> = None;

        for record in ProguardMapping::new(bytes).iter() {
            match record {
                Ok(ProguardRecord::Class {
                    original,
                    obfuscated,
                    ..
                }) => current = Some((obfuscated, original)),
                Ok(ProguardRecord::Field {
                    ty,
                    original,
                    obfuscated,
                    ..
                }) => {
                    let Some((class, _)) = current else {
                        continue;
                    };
                    retracer
                        .fields
                        .entry(class)
                        .or_default()
                        .entry(obfuscated)
                        .or_default()
                        .push(FieldEntry { ty, name: original });
                }
                Ok(ProguardRecord::Method {
                    ty,
                    original,
                    obfuscated,
                    arguments,
                    original_class,
                    line_mapping,
                    ..
                }) => {
                    let Some((class, class_original)) = current else {
                        continue;
                    };
                    retracer
                        .methods
                        .entry(class)
                        .or_default()
                        .entry(obfuscated)
                        .or_default()
                        .push(MethodSignature {
                            class: original_class.unwrap_or(class_original),
                            name: original,
                            ty,
                            arguments: join_arguments(arguments),
                            first_line: line_mapping.map_or(0, |lm| lm.startline),
                        });
                }
                Ok(_) => {}
                Err(e) => log::debug!("skipping mapping line: {e:?}"),
            }
        }

        retracer
    }

    pub fn original_class_name(&self, obfuscated: &str) -> String {
        self.mapper
            .remap_class(obfuscated)
            .unwrap_or(obfuscated)
            .to_string()
    }

    /// Remaps the element class of a type, keeping any `[]` suffixes.
    pub fn original_type(&self, ty: &str) -> String {
        let base = ty.trim_end_matches("[]");
        let dims = &ty[base.len()..];
        format!("{}{dims}", self.original_class_name(base))
    }

    /// Remaps each type of a comma separated list. The result is `,` joined,
    /// the way argument lists appear in mapping files.
    pub fn original_arguments(&self, arguments: &str) -> String {
        arguments
            .split(',')
            .map(|a| self.original_type(a.trim()))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Original `(class, method, line)` triples for an obfuscated method.
    /// A frame without a line number is looked up once per mapped line range,
    /// so every member folded into the obfuscated name is found.
    fn remapped_methods(
        &self,
        class: &str,
        method: &str,
        line: usize,
        signatures: &[MethodSignature<'_>],
    ) -> Vec<(String, String, usize)> {
        let mut lines: Vec<usize> = if line > 0 {
            vec![line]
        } else {
            signatures.iter().map(|s| s.first_line).collect()
        };
        lines.sort_unstable();
        lines.dedup();

        let mut out = Vec::new();
        for at in lines {
            let frame = StackFrame::new(class, method, at);
            for remapped in self.mapper.remap_frame(&frame) {
                let line_number = if line > 0 { remapped.line() } else { 0 };
                let entry = (
                    remapped.class().to_string(),
                    remapped.method().to_string(),
                    line_number,
                );
                if !out.contains(&entry) {
                    out.push(entry);
                }
            }
        }
        out
    }
}

fn join_arguments(arguments: &str) -> String {
    arguments
        .split(',')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(",")
}

impl MappingResolver for Retracer<'_> {
    fn transform(&self, frame: &Frame) -> Vec<Frame> {
        let Some(obfuscated_class) = frame.class_name.as_deref() else {
            return vec![frame.clone()];
        };
        let class_name = self.original_class_name(obfuscated_class);
        let ty = frame.ty.as_deref().map(|t| self.original_type(t));
        let arguments = frame.arguments.as_deref().map(|a| self.original_arguments(a));

        if let Some(field) = frame.field_name.as_deref() {
            let candidates: Vec<Frame> = self
                .fields
                .get(obfuscated_class)
                .and_then(|fields| fields.get(field))
                .into_iter()
                .flatten()
                .filter(|entry| ty.as_deref().is_none_or(|t| t == entry.ty))
                .map(|entry| Frame {
                    class_name: Some(class_name.clone()),
                    ty: Some(entry.ty.to_string()),
                    field_name: Some(entry.name.to_string()),
                    arguments: arguments.clone(),
                    ..frame.clone()
                })
                .collect();
            if !candidates.is_empty() {
                return candidates;
            }
        }

        if let Some(method) = frame.method_name.as_deref() {
            let signatures = self
                .methods
                .get(obfuscated_class)
                .and_then(|methods| methods.get(method))
                .map(Vec::as_slice)
                .unwrap_or_default();

            let mut candidates: Vec<Frame> = Vec::new();
            for (class, name, line) in
                self.remapped_methods(obfuscated_class, method, frame.line_number, signatures)
            {
                let matching = signatures.iter().filter(|s| {
                    s.class == class
                        && s.name == name
                        && ty.as_deref().is_none_or(|t| t == s.ty)
                        && arguments.as_deref().is_none_or(|a| a == s.arguments)
                });
                for signature in matching {
                    let candidate = Frame {
                        class_name: Some(class.clone()),
                        line_number: line,
                        ty: Some(signature.ty.to_string()),
                        method_name: Some(name.clone()),
                        arguments: Some(signature.arguments.clone()),
                        ..frame.clone()
                    };
                    if !candidates.contains(&candidate) {
                        candidates.push(candidate);
                    }
                }
            }
            if !candidates.is_empty() {
                return candidates;
            }
        }

        vec![Frame {
            class_name: Some(class_name),
            ty,
            arguments,
            ..frame.clone()
        }]
    }
}
