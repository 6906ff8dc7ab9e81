//! File type and size checks against a website's declared limits
//!
//! Scaling itself is external; this module only asks a [`ScaleProbe`]
//! whether a file could be brought under a byte limit, and turns the
//! answer into warnings (autoscale will handle it) or problems (it won't).

use crate::types::{SubmissionFile, ValidationReport};

/// One website's effective file constraints. Tier-dependent limits are the
/// adapter's concern; by the time they reach this check they are a single
/// number.
#[derive(Debug, Clone)]
pub struct FileConstraints {
    /// Accepted types as lowercase extensions/subtypes, e.g. ["jpeg", "png"]
    pub accepted_types: Vec<String>,
    pub max_bytes: u64,
}

impl FileConstraints {
    pub fn new(accepted_types: &[&str], max_bytes: u64) -> Self {
        Self {
            accepted_types: accepted_types.iter().map(|t| t.to_string()).collect(),
            max_bytes,
        }
    }

    /// A file type is supported when either its MIME subtype or its file
    /// name extension appears in the accepted list.
    pub fn supports(&self, file: &SubmissionFile) -> bool {
        let subtype = file.mime_subtype().to_lowercase();
        if self.accepted_types.contains(&subtype) {
            return true;
        }
        match file.extension() {
            Some(ext) => self.accepted_types.contains(&ext),
            None => false,
        }
    }
}

pub fn mb_to_bytes(mb: u64) -> u64 {
    mb * 1024 * 1024
}

/// External "could scaling bring this under size X" capability.
pub trait ScaleProbe: Send + Sync {
    /// Whether the file's format is one the scaler can reduce at all.
    fn can_scale(&self, file: &SubmissionFile) -> bool;
}

/// Default probe: raster images scale, everything else does not.
#[derive(Debug, Default)]
pub struct ImageScaleProbe;

impl ScaleProbe for ImageScaleProbe {
    fn can_scale(&self, file: &SubmissionFile) -> bool {
        matches!(
            file.mime_type.to_lowercase().as_str(),
            "image/jpeg" | "image/jpg" | "image/png" | "image/webp"
        )
    }
}

/// Evaluate a file against a website's constraints.
///
/// An unsupported type is always a blocking problem. An oversized file is a
/// warning when autoscaling can fix it, a problem otherwise.
pub fn check_file(
    file: &SubmissionFile,
    constraints: &FileConstraints,
    autoscale_allowed: bool,
    probe: &dyn ScaleProbe,
) -> ValidationReport {
    let mut report = ValidationReport::new();

    if !constraints.supports(file) {
        report.problem(format!(
            "Does not support file format: ({}) {}.",
            file.name, file.mime_type
        ));
    }

    if file.size > constraints.max_bytes {
        let limit_mb = constraints.max_bytes / (1024 * 1024);
        if autoscale_allowed && probe.can_scale(file) {
            report.warning(format!(
                "{} will be scaled down to fit the {}MB limit.",
                file.name, limit_mb
            ));
        } else {
            report.problem(format!(
                "{} is limited to {}MB for {}.",
                file.name, limit_mb, file.mime_type
            ));
        }
    }

    report
}
