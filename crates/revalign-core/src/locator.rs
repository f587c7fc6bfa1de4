//! Locating the next revision of an essay.
//!
//! Essay files encode their draft number in one `_`-separated segment of the
//! file name (`CTL_0011_3210_Asgn_2_version1_fixed.xml`). The next draft is
//! `version2`; the last draft of an essay is suffixed `final`.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::domain::{Document, Result};
use crate::loader::load_document;

const VERSION_MARKER: &str = "version";
const FINAL_SUFFIX: &str = "final";

/// Candidate paths for the revision following `original`, in lookup order.
///
/// Empty when the file name carries no `version<N>` segment.
pub fn revision_candidates(original: &Path) -> Vec<PathBuf> {
    let Some(file_name) = original.file_name().and_then(|n| n.to_str()) else {
        return Vec::new();
    };
    let segments: Vec<&str> = file_name.split('_').collect();
    let Some((at, stem, version)) = segments
        .iter()
        .copied()
        .enumerate()
        .rev()
        .find_map(|(at, segment)| version_of(segment).map(|(stem, n)| (at, stem, n)))
    else {
        return Vec::new();
    };

    let next = version + 1;
    [
        format!("{stem}{VERSION_MARKER}{next}"),
        format!("{stem}{VERSION_MARKER}{next}{FINAL_SUFFIX}"),
        format!("{stem}{VERSION_MARKER}{FINAL_SUFFIX}"),
    ]
    .into_iter()
    .map(|replacement| {
        let mut renamed: Vec<&str> = segments.clone();
        renamed[at] = replacement.as_str();
        original.with_file_name(renamed.join("_"))
    })
    .collect()
}

/// Split `<stem>version<N>` into its stem and `N`.
fn version_of(segment: &str) -> Option<(&str, u32)> {
    let marker = segment.rfind(VERSION_MARKER)?;
    let digits = &segment[marker + VERSION_MARKER.len()..];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((&segment[..marker], digits.parse().ok()?))
}

/// Find and load the next revision of the essay at `original`.
///
/// Returns `Ok(None)` when the path has no version marker or no later draft
/// exists. A later draft that exists but cannot be parsed is an error.
pub fn find_next_revision(original: &Path) -> Result<Option<(PathBuf, Document)>> {
    let candidates = revision_candidates(original);
    if candidates.is_empty() {
        debug!(path = %original.display(), "no version marker in file name");
        return Ok(None);
    }

    for candidate in candidates {
        if candidate.is_file() {
            let document = load_document(&candidate)?;
            debug!(
                original = %original.display(),
                revision = %candidate.display(),
                "revision located"
            );
            return Ok(Some((candidate, document)));
        }
    }

    debug!(path = %original.display(), "no subsequent revision");
    Ok(None)
}
