use log::debug;

use crate::error::QsipError;
use crate::extract::extract_source_table;
use crate::mapping::{ColumnAliases, Scope};
use crate::table::MetadataTable;
use crate::validate::validate_and_rename;

/// Validated source and sample metadata using canonical column names.
#[derive(Debug, Clone)]
pub struct Reconciled {
    pub source: MetadataTable,
    pub sample: MetadataTable,
    /// True when `source` was extracted from the sample metadata.
    pub source_derived: bool,
}

impl Reconciled {
    pub fn into_pair(self) -> (MetadataTable, MetadataTable) {
        (self.source, self.sample)
    }
}

/// Prepare source and sample metadata for the qSIP2 engine.
///
/// When `source` is `None` it is extracted from `sample` by grouping on
/// `source_id_column`. Both tables are then checked against `mapping`,
/// source first, and their aliased columns renamed to canonical names. The
/// first table that fails stops the call.
pub fn reconcile(
    sample: &MetadataTable,
    source: Option<&MetadataTable>,
    source_id_column: &str,
    mapping: &ColumnAliases,
) -> Result<Reconciled, QsipError> {
    let extracted;
    let (source, source_derived) = match source {
        Some(table) => (table, false),
        None => {
            extracted = extract_source_table(sample, source_id_column)?;
            debug!(
                "no source metadata given; extracted {} sources using '{}'",
                extracted.height(),
                source_id_column
            );
            (&extracted, true)
        }
    };

    let source = validate_and_rename(
        source,
        &mapping.requirements(Scope::Source),
        Scope::Source,
        source_derived,
    )?;
    let sample = validate_and_rename(
        sample,
        &mapping.requirements(Scope::Sample),
        Scope::Sample,
        false,
    )?;

    Ok(Reconciled {
        source,
        sample,
        source_derived,
    })
}
