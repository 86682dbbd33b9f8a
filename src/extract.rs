//! Derivation of source-level metadata from sample-level metadata.
//!
//! Every sample names the source it was fractionated from. Grouping the
//! samples by that column, a column whose value never changes within a
//! source describes the source rather than the fraction, so it is kept in
//! the derived source table. Columns that vary inside any source are
//! sample-level and are dropped.

use log::{debug, warn};
use polars::prelude::*;

use crate::error::QsipError;
use crate::mapping::Scope;
use crate::schema::index;
use crate::table::MetadataTable;

/// Extract the source-level table from `sample`.
///
/// The result has one row per distinct value of `source_id_column` (first
/// appearance order), keyed by an `id` column holding those values. Samples
/// with no source id belong to no source and are ignored.
pub fn extract_source_table(
    sample: &MetadataTable,
    source_id_column: &str,
) -> Result<MetadataTable, QsipError> {
    if !sample.has_column(source_id_column) {
        return Err(QsipError::column_not_found(source_id_column, Scope::Sample));
    }

    let frame = sample.frame();
    let unassigned = frame.column(source_id_column)?.null_count();
    if unassigned > 0 {
        warn!("{unassigned} samples have no '{source_id_column}' value and are not assigned to a source");
    }

    let key = col(source_id_column);
    let assigned = frame.clone().lazy().filter(key.clone().is_not_null());

    let values: Vec<&Column> = frame
        .get_columns()
        .iter()
        .filter(|c| c.name().as_str() != source_id_column)
        .collect();

    // Missing floats arrive as NaN from pandas; they are not a value.
    let distinct: Vec<Expr> = values
        .iter()
        .map(|c| {
            let name = c.name().as_str();
            let column = if c.dtype().is_float() {
                col(name).fill_nan(lit(NULL))
            } else {
                col(name)
            };
            column.drop_nulls().n_unique().alias(name)
        })
        .collect();
    let counts = assigned
        .clone()
        .group_by_stable([key.clone()])
        .agg(distinct)
        .collect()?;

    let mut kept: Vec<&str> = Vec::new();
    let mut dropped: Vec<&str> = Vec::new();
    for column in &values {
        let name = column.name().as_str();
        if is_invariant(counts.column(name)?)? {
            kept.push(name);
        } else {
            dropped.push(name);
        }
    }

    // The grouping column becomes `id`; an unrelated column of that name
    // would collide with it.
    if source_id_column != index::ID {
        if let Some(pos) = kept.iter().position(|c| *c == index::ID) {
            warn!(
                "dropping source-level column '{}' from the extracted source metadata: \
                 the name is reserved for the source id",
                index::ID
            );
            kept.remove(pos);
        }
    }

    debug!(
        "extracted {} sources from {} samples; sample-level columns dropped: {:?}",
        counts.height(),
        frame.height(),
        dropped
    );

    let first_values: Vec<Expr> = kept.iter().map(|c| col(*c).first()).collect();
    let mut extracted = assigned.group_by_stable([key]).agg(first_values);
    if source_id_column != index::ID {
        extracted = extracted.rename([source_id_column], [index::ID], true);
    }

    MetadataTable::new(extracted.collect()?, index::ID)
}

/// True when every group holds exactly one distinct value.
fn is_invariant(distinct_counts: &Column) -> Result<bool, QsipError> {
    let counts = distinct_counts.cast(&DataType::UInt64)?;
    let invariant = counts.u64()?.into_iter().all(|n| n == Some(1));
    Ok(invariant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_metadata() -> MetadataTable {
        let df = df![
            "sample-id" => &["a", "b", "c", "d"],
            "source-id" => &["s1", "s2", "s1", "s2"],
            "sample-level-data" => &["w", "x", "y", "z"],
            "source-level-data" => &["x", "y", "x", "y"],
        ]
        .unwrap();
        MetadataTable::new(df, "sample-id").unwrap()
    }

    #[test]
    fn keeps_only_source_level_columns() {
        let extracted = extract_source_table(&sample_metadata(), "source-id").unwrap();

        let expected = df![
            "id" => &["s1", "s2"],
            "source-level-data" => &["x", "y"],
        ]
        .unwrap();

        assert_eq!(extracted.id_column(), "id");
        assert!(extracted.frame().equals(&expected));
    }

    #[test]
    fn missing_grouping_column_is_column_not_found() {
        let err = extract_source_table(&sample_metadata(), "source_mat_id").unwrap_err();

        match err {
            QsipError::ColumnNotFound { column, table } => {
                assert_eq!(column, "source_mat_id");
                assert_eq!(table, "sample");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn single_sample_sources_keep_every_column() {
        let df = df![
            "sample-id" => &["a", "b"],
            "source-id" => &["s1", "s2"],
            "density" => &["1.70", "1.72"],
        ]
        .unwrap();
        let table = MetadataTable::new(df, "sample-id").unwrap();

        let extracted = extract_source_table(&table, "source-id").unwrap();

        assert_eq!(extracted.column_names(), vec!["id", "sample-id", "density"]);
        assert_eq!(extracted.height(), 2);
    }

    #[test]
    fn columns_missing_within_a_source_are_dropped() {
        let df = df![
            "sample-id" => &["a", "b", "c", "d"],
            "source-id" => &["s1", "s1", "s2", "s2"],
            "isotope" => &[Some("13C"), None, Some("12C"), Some("12C")],
            "note" => &[None::<&str>, None, Some("x"), Some("x")],
        ]
        .unwrap();
        let table = MetadataTable::new(df, "sample-id").unwrap();

        let extracted = extract_source_table(&table, "source-id").unwrap();

        // a single null does not count as a second value; a source with no
        // value at all does not satisfy "exactly one"
        assert_eq!(extracted.column_names(), vec!["id", "isotope"]);
    }

    #[test]
    fn samples_without_source_are_ignored() {
        let df = df![
            "sample-id" => &["a", "b", "c"],
            "source-id" => &[Some("s1"), None, Some("s1")],
            "isotope" => &["13C", "12C", "13C"],
        ]
        .unwrap();
        let table = MetadataTable::new(df, "sample-id").unwrap();

        let extracted = extract_source_table(&table, "source-id").unwrap();

        assert_eq!(extracted.ids().unwrap(), vec!["s1"]);
        assert!(extracted.has_column("isotope"));
    }

    #[test]
    fn existing_id_column_does_not_collide() {
        let df = df![
            "sample-id" => &["a", "b"],
            "source-id" => &["s1", "s2"],
            "id" => &["x", "y"],
        ]
        .unwrap();
        let table = MetadataTable::new(df, "sample-id").unwrap();

        let extracted = extract_source_table(&table, "source-id").unwrap();

        assert_eq!(extracted.ids().unwrap(), vec!["s1", "s2"]);
        assert_eq!(extracted.column_names(), vec!["id", "sample-id"]);
    }

    #[test]
    fn nan_does_not_count_as_a_value() {
        let df = df![
            "sample-id" => &["a", "b", "c", "d"],
            "source-id" => &["s1", "s1", "s2", "s2"],
            "v" => &[1.0f64, f64::NAN, 2.0, 2.0],
            "w" => &[1.0f64, 1.5, 2.0, 2.0],
        ]
        .unwrap();
        let table = MetadataTable::new(df, "sample-id").unwrap();

        let extracted = extract_source_table(&table, "source-id").unwrap();

        assert_eq!(extracted.column_names(), vec!["id", "v"]);
        let v = extracted.frame().column("v").unwrap().f64().unwrap();
        assert_eq!(v.get(0), Some(1.0));
        assert_eq!(v.get(1), Some(2.0));
    }

    #[test]
    fn sources_keep_first_appearance_order() {
        let df = df![
            "sample-id" => &["a", "b", "c", "d", "e"],
            "source-id" => &["s3", "s1", "s3", "s2", "s1"],
            "isotope" => &["13C", "12C", "13C", "18O", "12C"],
        ]
        .unwrap();
        let table = MetadataTable::new(df, "sample-id").unwrap();

        let extracted = extract_source_table(&table, "source-id").unwrap();

        assert_eq!(extracted.ids().unwrap(), vec!["s3", "s1", "s2"]);
        let isotopes: Vec<Option<&str>> = extracted
            .frame()
            .column("isotope")
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(isotopes, vec![Some("13C"), Some("12C"), Some("18O")]);
    }
}
