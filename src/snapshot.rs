use serde::Serialize;
use std::collections::BTreeSet;

use crate::dex::MethodRecord;
use crate::signature::{format_class, format_method};

/// Class names and method signatures of one input, possibly spread over
/// several dex images.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub classes: BTreeSet<String>,
    pub methods: BTreeSet<String>,
}

impl Snapshot {
    /// Adds the formatted classes and methods of one indexed image. Malformed
    /// method records are logged and skipped.
    pub fn absorb(&mut self, class_descriptors: &[String], method_refs: &[MethodRecord]) {
        for record in method_refs {
            match format_method(record) {
                Ok(Some(signature)) if !signature.is_empty() => {
                    self.methods.insert(signature);
                }
                Ok(_) => {}
                Err(e) => {
                    log::warn!(
                        "skipping method {}.{}: {e}",
                        record.declaring_class,
                        record.name
                    );
                }
            }
        }

        for descriptor in class_descriptors {
            if let Some(name) = format_class(descriptor) {
                self.classes.insert(name);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.methods.is_empty()
    }
}
