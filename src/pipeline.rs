//! Drives indexing, unmapping and diffing across the ordered inputs.

use anyhow::{Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::archive::open_images;
use crate::cli::OutputFormat;
use crate::config::RunConfig;
use crate::dex::DexIndex;
use crate::diff::{DiffReport, diff};
use crate::mapping::MappingFile;
use crate::pattern::{CLASS_EXPRESSION, FramePattern, METHOD_EXPRESSION};
use crate::snapshot::Snapshot;
use crate::unmap::unmap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Class,
    Method,
}

impl SectionKind {
    fn as_str(self) -> &'static str {
        match self {
            SectionKind::Class => "class",
            SectionKind::Method => "method",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairReport {
    pub kind: SectionKind,
    pub old: String,
    pub new: String,
    #[serde(flatten)]
    pub report: DiffReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct InputSummary {
    pub path: String,
    pub size: u64,
    /// Only computed for JSON output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    pub images: usize,
    pub classes: usize,
    pub methods: usize,
    pub unmapped: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub inputs: Vec<InputSummary>,
    pub diffs: Vec<PairReport>,
}

/// The snapshot of the previous input and its label. Empty before the first
/// input, so the first step produces no reports.
#[derive(Debug, Clone, Default)]
pub struct PipelineState {
    pub label: String,
    pub snapshot: Snapshot,
}

impl PipelineState {
    /// Diffs `current` against the held snapshot and hands back the state for
    /// the next input. A section is only diffed when its previous set is
    /// non-empty.
    pub fn advance(self, label: &str, current: Snapshot) -> (PipelineState, Vec<PairReport>) {
        let mut reports = Vec::new();

        if !self.snapshot.classes.is_empty() {
            reports.push(PairReport {
                kind: SectionKind::Class,
                old: self.label.clone(),
                new: label.to_string(),
                report: diff(&self.snapshot.classes, &current.classes),
            });
        }
        if !self.snapshot.methods.is_empty() {
            reports.push(PairReport {
                kind: SectionKind::Method,
                old: self.label.clone(),
                new: label.to_string(),
                report: diff(&self.snapshot.methods, &current.methods),
            });
        }

        let next = PipelineState {
            label: label.to_string(),
            snapshot: current,
        };
        (next, reports)
    }
}

struct Patterns {
    class: FramePattern,
    method: FramePattern,
}

pub fn run<W: Write>(config: &RunConfig, out: &mut W) -> Result<RunSummary> {
    let text = config.format == OutputFormat::Text;
    let patterns = Patterns {
        class: FramePattern::new(CLASS_EXPRESSION)?,
        method: FramePattern::new(METHOD_EXPRESSION)?,
    };

    let mut state = PipelineState::default();
    let mut summary = RunSummary::default();

    for (i, path) in config.inputs.iter().enumerate() {
        let label = path.display().to_string();
        let size = std::fs::metadata(path)
            .with_context(|| format!("Unable to open '{label}'"))?
            .len();
        if text {
            writeln!(out, "Processing {label}")?;
            writeln!(out, "file size:{}", readable_file_size(size))?;
        }

        let (mut snapshot, images) = load_snapshot(path)?;
        if text {
            writeln!(out, "total classes[{}]", snapshot.classes.len())?;
            writeln!(out, "total methods[{}]", snapshot.methods.len())?;
        }

        let mut unmapped = false;
        if !config.mappings.is_empty() {
            match config.mappings.get(i) {
                Some(mapping) => {
                    if text {
                        writeln!(out, "unmapping...")?;
                    }
                    unmap_snapshot(mapping, &patterns, &mut snapshot)?;
                    unmapped = true;
                }
                None => log::warn!("unmatched mapping file for file[{label}]"),
            }
        }

        summary.inputs.push(InputSummary {
            path: label.clone(),
            size,
            sha256: if text { None } else { Some(sha256_file(path)?) },
            images,
            classes: snapshot.classes.len(),
            methods: snapshot.methods.len(),
            unmapped,
        });

        let (next, reports) = state.advance(&label, snapshot);
        state = next;

        if text {
            for pair in &reports {
                writeln!(
                    out,
                    "===={} diff old:{} new:{}====",
                    pair.kind.as_str(),
                    pair.old,
                    pair.new
                )?;
                writeln!(out, "{}", pair.report)?;
            }
        }
        summary.diffs.extend(reports);
    }

    if !text {
        serde_json::to_writer_pretty(&mut *out, &summary)?;
        writeln!(out)?;
    }

    Ok(summary)
}

/// Indexes every image of one input into a single snapshot. Returns the
/// snapshot and the number of images read.
pub fn load_snapshot(path: &Path) -> Result<(Snapshot, usize)> {
    let images = open_images(path)?;
    let count = images.len();

    let mut snapshot = Snapshot::default();
    for image in &images {
        let index = DexIndex::load(&image.file, &image.name)?;
        snapshot.absorb(index.class_descriptors(), index.method_refs());
    }

    Ok((snapshot, count))
}

fn unmap_snapshot(mapping: &Path, patterns: &Patterns, snapshot: &mut Snapshot) -> Result<()> {
    let file = MappingFile::open(mapping)?;
    let retracer = file.retracer();
    if !unmap(&retracer, &patterns.class, &mut snapshot.classes) {
        log::debug!("class unmapping with {} was a no-op", mapping.display());
    }
    if !unmap(&retracer, &patterns.method, &mut snapshot.methods) {
        log::debug!("method unmapping with {} was a no-op", mapping.display());
    }
    Ok(())
}

fn sha256_file(path: &Path) -> Result<String> {
    let mut file =
        File::open(path).with_context(|| format!("Unable to open '{}'", path.display()))?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)
        .with_context(|| format!("Failed to hash {}", path.display()))?;
    Ok(hex::encode(hasher.finalize()))
}

/// `1536 -> "1.5 kB"`, grouping thousands and keeping at most one decimal.
/// Halves round to even, so `1280` is `"1.2 kB"`.
pub fn readable_file_size(size: u64) -> String {
    const UNITS: [&str; 5] = ["B", "kB", "MB", "GB", "TB"];
    if size == 0 {
        return "0".to_string();
    }

    let mut group = 0;
    let mut scaled = size;
    while scaled >= 1024 && group < UNITS.len() - 1 {
        scaled /= 1024;
        group += 1;
    }

    let value = size as f64 / 1024f64.powi(group as i32);
    let tenths = (value * 10.0).round_ties_even() as u64;
    let (whole, fraction) = (tenths / 10, tenths % 10);

    let digits = whole.to_string();
    let mut out = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if fraction != 0 {
        out.push_str(&format!(".{fraction}"));
    }
    format!("{out} {}", UNITS[group])
}
