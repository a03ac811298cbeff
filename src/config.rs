use anyhow::{Context, Result};
use ignore::WalkBuilder;
use std::env;
use std::path::{Path, PathBuf};

use crate::cli::{Cli, OutputFormat};

/// Consulted when `--mapping` is not given; same comma separated syntax.
pub const MAPPING_ENV: &str = "DEX_METHOD_DIFF_MAPPING";

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub inputs: Vec<PathBuf>,
    pub mappings: Vec<PathBuf>,
    pub format: OutputFormat,
}

impl RunConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        Ok(Self {
            inputs: collect_inputs(&cli.inputs)?,
            mappings: resolve_mappings(cli),
            format: cli.format,
        })
    }
}

pub fn resolve_mappings(cli: &Cli) -> Vec<PathBuf> {
    if !cli.mapping.is_empty() {
        return cli.mapping.clone();
    }

    match env::var(MAPPING_ENV) {
        Ok(raw) => split_mapping_list(&raw),
        Err(_) => Vec::new(),
    }
}

pub fn split_mapping_list(raw: &str) -> Vec<PathBuf> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// Expands directories into their immediate files (sorted by name); other
/// paths are kept as given.
pub fn collect_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            files.extend(list_dir(path)?);
        } else {
            files.push(path.clone());
        }
    }
    Ok(files)
}

fn list_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let dir = std::path::absolute(dir)
        .with_context(|| format!("Failed to resolve directory: {}", dir.display()))?;

    let walker = WalkBuilder::new(&dir)
        .max_depth(Some(1))
        .standard_filters(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to list {}", dir.display()))?;
        if entry.depth() == 0 {
            continue;
        }
        if entry.file_type().is_some_and(|t| t.is_file()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
