//! Opening inputs: apk/jar/zip containers with embedded `classes*.dex`
//! entries, or raw dex images.

use anyhow::{Context, Result};
use memmap2::Mmap;
use std::fs::File;
use std::io::{Cursor, Seek, SeekFrom};
use std::path::Path;
use zip::ZipArchive;
use zip::result::ZipError;

/// An open image ready to be indexed. Extracted entries live in anonymous
/// temp files that are reclaimed as soon as the handle drops.
#[derive(Debug)]
pub struct ImageFile {
    pub name: String,
    pub file: File,
}

#[derive(Debug)]
pub enum ContainerKind {
    Container(Vec<ImageFile>),
    NotContainer,
}

/// Entry names of the form `classes*.dex`, at the archive root.
pub fn is_dex_entry(name: &str) -> bool {
    name.starts_with("classes") && name.ends_with(".dex") && !name.contains('\n')
}

/// Opens every image held by `path`: the matching entries of a container, or
/// the file itself when it is not a container or holds no dex entries.
pub fn open_images(path: &Path) -> Result<Vec<ImageFile>> {
    match inspect_container(path)? {
        ContainerKind::Container(images) if !images.is_empty() => Ok(images),
        _ => {
            let file = File::open(path)
                .with_context(|| format!("Unable to open '{}'", path.display()))?;
            Ok(vec![ImageFile {
                name: path.display().to_string(),
                file,
            }])
        }
    }
}

pub fn inspect_container(path: &Path) -> Result<ContainerKind> {
    let file =
        File::open(path).with_context(|| format!("Unable to open '{}'", path.display()))?;
    if file.metadata()?.len() == 0 {
        return Ok(ContainerKind::NotContainer);
    }
    // SAFETY: The file is opened read-only and remains valid for the lifetime of the mmap.
    let mmap = unsafe { Mmap::map(&file) }
        .with_context(|| format!("mmap failed: {}", path.display()))?;

    let mut archive = match ZipArchive::new(Cursor::new(&mmap[..])) {
        Ok(archive) => archive,
        Err(ZipError::InvalidArchive(_) | ZipError::UnsupportedArchive(_)) => {
            return Ok(ContainerKind::NotContainer);
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read zip: {}", path.display()));
        }
    };

    let mut images = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .with_context(|| format!("Failed to read entry {i} of {}", path.display()))?;
        if !is_dex_entry(entry.name()) {
            continue;
        }

        let name = format!("{}!{}", path.display(), entry.name());
        let mut tmp = tempfile::tempfile().context("Failed to create temp file")?;
        std::io::copy(&mut entry, &mut tmp)
            .with_context(|| format!("Failed to extract {name}"))?;
        tmp.seek(SeekFrom::Start(0))?;
        log::debug!("extracted {name}");

        images.push(ImageFile { name, file: tmp });
    }

    Ok(ContainerKind::Container(images))
}
