use std::collections::HashMap;
use std::fmt;

use log::debug;

use crate::error::QsipError;
use crate::mapping::{ColumnRequirement, Scope};
use crate::table::MetadataTable;

/// Marker shown when the canonical name itself was expected.
pub const DEFAULT_USED: &str = "N/A (default used)";

const COLUMN_WIDTH: usize = 25;
const RULE_WIDTH: usize = 23;

/// A required column that is absent from a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingColumn {
    pub default: String,
    pub provided: Option<String>,
}

/// Every required column missing from one metadata table.
///
/// Renders as the diagnostic shown to the user: a `Default | Provided`
/// table followed by what to do about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingColumnsReport {
    pub table: Scope,
    pub derived: bool,
    pub missing: Vec<MissingColumn>,
}

impl fmt::Display for MissingColumnsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "-".repeat(RULE_WIDTH);
        write!(
            f,
            "The following required columns were not found in the {} metadata:\n\n",
            self.table
        )?;
        write!(
            f,
            "{:^w$} | {:^w$}\n{:^w$} | {:^w$}",
            "Default",
            "Provided",
            rule,
            rule,
            w = COLUMN_WIDTH
        )?;
        for column in &self.missing {
            write!(
                f,
                "\n{:^w$} | {:^w$}",
                column.default,
                column.provided.as_deref().unwrap_or(DEFAULT_USED),
                w = COLUMN_WIDTH
            )?;
        }
        f.write_str(
            "\n\nPlease update the column names passed to the method \
             or update your metadata to use the defaults.",
        )?;

        if self.table == Scope::Source && self.derived {
            f.write_str(
                "\n\nThe source metadata was extracted from the sample metadata. \
                 A column is kept as source-level only if it takes exactly one value \
                 within every source, so a column listed above may be present in the \
                 sample metadata but vary among the samples of some source.",
            )?;
        }
        Ok(())
    }
}

/// Check that `table` has every required column and rename aliased columns
/// to their canonical names.
///
/// `derived` marks a source table extracted from sample metadata and only
/// changes the error wording.
pub fn validate_and_rename(
    table: &MetadataTable,
    requirements: &[ColumnRequirement],
    kind: Scope,
    derived: bool,
) -> Result<MetadataTable, QsipError> {
    let mut claimed: HashMap<&str, &str> = HashMap::new();
    for req in requirements {
        if let Some(other) = claimed.insert(req.required(), &req.default) {
            return Err(QsipError::InvalidData(format!(
                "The column '{}' is given for both '{}' and '{}' in the {} metadata",
                req.required(),
                other,
                req.default,
                kind
            )));
        }
    }

    let missing: Vec<MissingColumn> = requirements
        .iter()
        .filter(|req| !table.has_column(req.required()))
        .map(|req| MissingColumn {
            default: req.default.clone(),
            provided: req.provided.clone(),
        })
        .collect();

    if !missing.is_empty() {
        return Err(QsipError::MissingColumns(MissingColumnsReport {
            table: kind,
            derived,
            missing,
        }));
    }

    let renames: Vec<(String, String)> = requirements
        .iter()
        .filter_map(|req| {
            let provided = req.provided.as_deref()?;
            (provided != req.default).then(|| (provided.to_string(), req.default.clone()))
        })
        .collect();

    // Renames apply together, so a target is free if its current holder is
    // itself renamed away.
    for (provided, default) in &renames {
        let vacated = renames.iter().any(|(old, _)| old == default);
        if table.has_column(default) && !vacated {
            return Err(QsipError::InvalidData(format!(
                "Cannot rename '{}' to '{}': the {} metadata already has a column named '{}'",
                provided, default, kind, default
            )));
        }
    }

    if !renames.is_empty() {
        debug!("renaming {kind} metadata columns: {renames:?}");
    }
    table.rename_columns(&renames)
}
