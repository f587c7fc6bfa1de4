//! Corpus layout: `<semester>/<course>/<assignment>/<essay files>`.
//!
//! Each annotated draft `<essay>_version<N>_fixed_notes.xml` sits next to its
//! plain text `<essay>_version<N>_fixed.xml`. Drafts are aligned to their
//! successors in `<essay>_version<N+1>_fixed_wordAlign.xml`.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::trace;

use crate::domain::{Result, RevalignError};

const IGNORED_ENTRY: &str = "DS_Store";
const NOTES_MARKER: &str = "fixed_notes";
const NOTES_SUFFIX: &str = "_notes";
const FIRST_DRAFT: &str = "version0";
const LAST_DRAFT: &str = "final";
const ALIGNMENT_FROM: &str = "_fixed";
const ALIGNMENT_TO: &str = "_fixed_wordAlign";

/// Number of `_`-separated file name parts identifying an essay.
const ESSAY_ID_PARTS: usize = 6;

/// One annotated draft found in the corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EssayEntry {
    pub semester: String,
    pub course: String,
    pub assignment: String,
    pub notes_path: PathBuf,
}

impl EssayEntry {
    pub fn file_name(&self) -> &str {
        self.notes_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }

    /// The unannotated draft the notes refer to.
    pub fn original_path(&self) -> PathBuf {
        self.notes_path
            .with_file_name(self.file_name().replacen(NOTES_SUFFIX, "", 1))
    }

    /// `<semester>_` followed by the first six parts of the file name,
    /// e.g. `2007-08A_CTL_0011_3210_Asgn_2_version1`.
    pub fn essay_id(&self) -> String {
        std::iter::once(self.semester.as_str())
            .chain(self.file_name().split('_').take(ESSAY_ID_PARTS))
            .collect::<Vec<_>>()
            .join("_")
    }
}

/// Alignment document between a draft and the revision at `revision`.
pub fn alignment_path(revision: &Path) -> PathBuf {
    let name = revision
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    revision.with_file_name(name.replacen(ALIGNMENT_FROM, ALIGNMENT_TO, 1))
}

/// Annotated drafts that have a predecessor's feedback to revise against.
/// The first draft carries no teacher comments and the last has no revision.
pub fn is_eligible(file_name: &str) -> bool {
    file_name.ends_with(".xml")
        && file_name.contains(NOTES_MARKER)
        && !file_name.contains(FIRST_DRAFT)
        && !file_name.contains(LAST_DRAFT)
}

/// Entry names of `dir`, sorted, without Finder debris.
pub fn sorted_entries(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let name = entry?.file_name().to_string_lossy().into_owned();
        if !name.contains(IGNORED_ENTRY) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

/// All eligible annotated drafts under `root`, in sorted walk order.
pub fn discover(root: &Path) -> Result<Vec<EssayEntry>> {
    if !root.is_dir() {
        return Err(RevalignError::NotFound(root.to_path_buf()));
    }
    let mut entries = Vec::new();
    for semester in sorted_entries(root)? {
        let semester_dir = root.join(&semester);
        if !semester_dir.is_dir() {
            continue;
        }
        for course in sorted_entries(&semester_dir)? {
            let course_dir = semester_dir.join(&course);
            if !course_dir.is_dir() {
                continue;
            }
            for assignment in sorted_entries(&course_dir)? {
                let assignment_dir = course_dir.join(&assignment);
                if !assignment_dir.is_dir() {
                    continue;
                }
                trace!(%semester, %course, %assignment, "scanning assignment");
                for file in sorted_entries(&assignment_dir)? {
                    if is_eligible(&file) {
                        entries.push(EssayEntry {
                            semester: semester.clone(),
                            course: course.clone(),
                            assignment: assignment.clone(),
                            notes_path: assignment_dir.join(file),
                        });
                    }
                }
            }
        }
    }
    Ok(entries)
}
