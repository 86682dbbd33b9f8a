//! Checks on the source selection handed to the qSIP2 feature filter.
//!
//! The filter keeps the listed labeled and unlabeled sources and the
//! features seen in enough of them. Catching bad ids and thresholds here
//! gives the user a metadata-level message instead of an engine failure.

use std::collections::HashSet;

use crate::error::QsipError;
use crate::table::MetadataTable;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSelection {
    pub unlabeled_sources: Vec<String>,
    pub labeled_sources: Vec<String>,
    pub min_unlabeled_sources: usize,
    pub min_labeled_sources: usize,
    pub min_unlabeled_fractions: usize,
    pub min_labeled_fractions: usize,
}

impl SourceSelection {
    pub fn new(unlabeled_sources: Vec<String>, labeled_sources: Vec<String>) -> Self {
        Self {
            unlabeled_sources,
            labeled_sources,
            min_unlabeled_sources: 1,
            min_labeled_sources: 1,
            min_unlabeled_fractions: 1,
            min_labeled_fractions: 1,
        }
    }

    /// Check the selection against the reconciled source metadata.
    ///
    /// All problems are collected into one `Validation` error.
    pub fn validate(&self, source: &MetadataTable) -> Result<(), QsipError> {
        let mut problems: Vec<String> = Vec::new();

        for (label, ids) in [
            ("unlabeled", &self.unlabeled_sources),
            ("labeled", &self.labeled_sources),
        ] {
            if ids.is_empty() {
                problems.push(format!("no {label} sources were given"));
            }
            let dups = repeated(ids);
            if !dups.is_empty() {
                problems.push(format!(
                    "{label} sources listed more than once: {}",
                    dups.join(", ")
                ));
            }
        }

        let unlabeled: HashSet<&str> = self.unlabeled_sources.iter().map(String::as_str).collect();
        let mut both: Vec<&str> = self
            .labeled_sources
            .iter()
            .map(String::as_str)
            .filter(|id| unlabeled.contains(id))
            .collect();
        if !both.is_empty() {
            both.sort_unstable();
            both.dedup();
            problems.push(format!(
                "sources listed as both labeled and unlabeled: {}",
                both.join(", ")
            ));
        }

        let known: HashSet<String> = source.ids()?.into_iter().collect();
        let mut unknown: Vec<&str> = self
            .unlabeled_sources
            .iter()
            .chain(&self.labeled_sources)
            .map(String::as_str)
            .filter(|id| !known.contains(*id))
            .collect();
        if !unknown.is_empty() {
            unknown.sort_unstable();
            unknown.dedup();
            problems.push(format!(
                "sources not found in the source metadata ('{}'): {}",
                source.id_column(),
                unknown.join(", ")
            ));
        }

        for (name, value) in [
            ("min_unlabeled_sources", self.min_unlabeled_sources),
            ("min_labeled_sources", self.min_labeled_sources),
            ("min_unlabeled_fractions", self.min_unlabeled_fractions),
            ("min_labeled_fractions", self.min_labeled_fractions),
        ] {
            if value == 0 {
                problems.push(format!("{name} must be at least 1"));
            }
        }
        if self.min_unlabeled_sources > self.unlabeled_sources.len() {
            problems.push(format!(
                "min_unlabeled_sources is {} but only {} unlabeled sources were given",
                self.min_unlabeled_sources,
                self.unlabeled_sources.len()
            ));
        }
        if self.min_labeled_sources > self.labeled_sources.len() {
            problems.push(format!(
                "min_labeled_sources is {} but only {} labeled sources were given",
                self.min_labeled_sources,
                self.labeled_sources.len()
            ));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(QsipError::Validation(problems.join("; ")))
        }
    }
}

fn repeated(ids: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    let mut out: Vec<&str> = ids
        .iter()
        .map(String::as_str)
        .filter(|id| !seen.insert(*id))
        .collect();
    out.sort_unstable();
    out.dedup();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn sources() -> MetadataTable {
        let df = df![
            "id" => &["S1", "S2", "S3", "S4"],
            "isotope" => &["12C", "12C", "13C", "13C"],
        ]
        .unwrap();
        MetadataTable::new(df, "id").unwrap()
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn accepts_a_valid_selection() {
        let mut selection = SourceSelection::new(ids(&["S1", "S2"]), ids(&["S3", "S4"]));
        selection.min_labeled_sources = 2;

        assert!(selection.validate(&sources()).is_ok());
    }

    #[test]
    fn reports_unknown_sources() {
        let selection = SourceSelection::new(ids(&["S1", "S9"]), ids(&["S3", "S0"]));

        let err = selection.validate(&sources()).unwrap_err().to_string();

        assert!(err.contains("not found in the source metadata ('id'): S0, S9"));
    }

    #[test]
    fn reports_overlap_and_repeats() {
        let selection = SourceSelection::new(ids(&["S1", "S1", "S3"]), ids(&["S3"]));

        let err = selection.validate(&sources()).unwrap_err().to_string();

        assert!(err.contains("unlabeled sources listed more than once: S1"));
        assert!(err.contains("both labeled and unlabeled: S3"));
    }

    #[test]
    fn reports_out_of_range_thresholds() {
        let mut selection = SourceSelection::new(ids(&["S1"]), ids(&["S3"]));
        selection.min_unlabeled_fractions = 0;
        selection.min_labeled_sources = 3;

        let err = selection.validate(&sources()).unwrap_err().to_string();

        assert!(err.contains("min_unlabeled_fractions must be at least 1"));
        assert!(err.contains("min_labeled_sources is 3 but only 1 labeled sources"));
    }

    #[test]
    fn empty_lists_are_rejected() {
        let selection = SourceSelection::new(Vec::new(), ids(&["S3"]));

        let err = selection.validate(&sources()).unwrap_err();

        assert!(matches!(err, QsipError::Validation(_)));
        assert!(err.to_string().contains("no unlabeled sources were given"));
    }
}
