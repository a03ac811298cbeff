//! # dex-method-diff
//!
//! Compares the class and method surface of consecutive Android builds
//! (dex images, or apk/jar archives holding `classes*.dex`) and reports what
//! was added and removed, optionally unmapping ProGuard/R8 obfuscated names
//! first.
//!
//! ## Architecture
//!
//! - **descriptor**: JVM type descriptor decoding (`[Ljava/lang/String;` -> `java.lang.String[]`)
//! - **signature**: canonical method/class strings, synthetic member filtering
//! - **dex**: dex id-table reader yielding class descriptors and method references
//! - **archive**: container probing and `classes*.dex` extraction into temp files
//! - **snapshot**: per-input class and method sets
//! - **pattern**: line patterns locating qualified names inside text lines
//! - **mapping**: mapping file index and frame remapping
//! - **unmap**: obfuscated-to-original line rewriting with ambiguity trimming
//! - **diff**: sorted added/removed reports
//! - **pipeline**: rolling previous/current comparison over all inputs
//! - **config**: run configuration and directory expansion

pub mod archive;
pub mod cli;
pub mod config;
pub mod descriptor;
pub mod dex;
pub mod diff;
pub mod mapping;
pub mod pattern;
pub mod pipeline;
pub mod signature;
pub mod snapshot;
pub mod unmap;
