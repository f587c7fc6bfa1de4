//! Error category lookup: per-semester numeric codes to category labels.
//!
//! The table is a CSV file whose header row names the label column followed
//! by one column per semester; each row holds a label and its code in each
//! semester's tag bank.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::domain::{Result, RevalignError};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryTable {
    labels: HashMap<(String, String), String>,
}

impl CategoryTable {
    /// Load the table from a CSV file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(RevalignError::NotFound(path.to_path_buf()));
        }
        let file = std::fs::File::open(path)?;
        let table = Self::from_reader(file)?;
        debug!(path = %path.display(), entries = table.len(), "category table loaded");
        Ok(table)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        let semesters: Vec<String> = csv
            .headers()?
            .iter()
            .skip(1)
            .map(|s| s.trim().to_string())
            .collect();

        let mut labels = HashMap::new();
        for row in csv.records() {
            let row = row?;
            let Some(label) = row.get(0).map(str::trim).filter(|l| !l.is_empty()) else {
                continue;
            };
            for (semester, code) in semesters.iter().zip(row.iter().skip(1)) {
                let code = code.trim();
                if code.is_empty() {
                    continue;
                }
                labels.insert((semester.clone(), code.to_string()), label.to_string());
            }
        }
        Ok(Self { labels })
    }

    /// Category label for `code` in `semester`'s tag bank.
    pub fn lookup(&self, semester: &str, code: &str) -> Option<&str> {
        self.labels
            .get(&(semester.to_string(), code.to_string()))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
