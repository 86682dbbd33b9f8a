use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

use log::{debug, warn};
use polars::prelude::*;

use crate::error::QsipError;
use crate::schema::{directive, index};

/// A metadata table: a polars frame plus the name of its row-key column.
///
/// The row key is always the first column, holds strings, and is unique and
/// non-null.
#[derive(Debug, Clone)]
pub struct MetadataTable {
    id_column: String,
    frame: DataFrame,
}

impl MetadataTable {
    /// Wrap `frame`, using `id_column` as the row key.
    pub fn new(frame: DataFrame, id_column: &str) -> Result<Self, QsipError> {
        let ids = frame
            .column(id_column)
            .map_err(|_| QsipError::column_not_found(id_column, "input"))?
            .cast(&DataType::String)?;
        check_ids(&ids)?;

        let mut columns = Vec::with_capacity(frame.width());
        columns.push(ids);
        columns.extend(
            frame
                .get_columns()
                .iter()
                .filter(|c| c.name().as_str() != id_column)
                .cloned(),
        );

        Ok(Self {
            id_column: id_column.to_string(),
            frame: DataFrame::new(columns)?,
        })
    }

    /// Wrap `frame`, using its first column as the row key.
    pub fn from_frame(frame: DataFrame) -> Result<Self, QsipError> {
        let id_column = frame
            .get_column_names_str()
            .first()
            .map(|s| s.to_string())
            .ok_or_else(|| QsipError::InvalidData("Metadata has no columns".into()))?;
        Self::new(frame, &id_column)
    }

    pub fn id_column(&self) -> &str {
        &self.id_column
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    /// All column names, row key first.
    pub fn column_names(&self) -> Vec<&str> {
        self.frame.get_column_names_str()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.frame.schema().contains(name)
    }

    pub fn ids(&self) -> Result<Vec<String>, QsipError> {
        Ok(self
            .frame
            .column(&self.id_column)?
            .str()?
            .into_iter()
            .flatten()
            .map(str::to_string)
            .collect())
    }

    /// Rename columns `(old, new)`. The row-key name follows a rename of the
    /// key column.
    pub fn rename_columns(&self, renames: &[(String, String)]) -> Result<Self, QsipError> {
        if renames.is_empty() {
            return Ok(self.clone());
        }

        // Applied all at once: a column may take the name another one gives up.
        let columns: Vec<Column> = self
            .frame
            .get_columns()
            .iter()
            .map(|c| {
                let renamed = renames.iter().find(|(o, _)| o.as_str() == c.name().as_str());
                match renamed {
                    Some((_, new)) => c.clone().with_name(new.as_str().into()),
                    None => c.clone(),
                }
            })
            .collect();
        let frame = DataFrame::new(columns)?;

        let id_column = renames
            .iter()
            .find(|(o, _)| *o == self.id_column)
            .map(|(_, n)| n.clone())
            .unwrap_or_else(|| self.id_column.clone());

        Ok(Self { id_column, frame })
    }
}

fn check_ids(ids: &Column) -> Result<(), QsipError> {
    let nulls = ids.null_count();
    if nulls > 0 {
        return Err(QsipError::InvalidData(format!(
            "The id column '{}' has {} missing values. Every row needs an id.",
            ids.name(),
            nulls
        )));
    }

    let mut seen = HashSet::new();
    let mut duplicated: Vec<&str> = ids
        .str()?
        .into_iter()
        .flatten()
        .filter(|id| !seen.insert(*id))
        .collect();
    if !duplicated.is_empty() {
        duplicated.sort_unstable();
        duplicated.dedup();
        return Err(QsipError::InvalidData(format!(
            "The id column '{}' contains duplicate ids: {}",
            ids.name(),
            duplicated.join(", ")
        )));
    }

    Ok(())
}

// ── File I/O ────────────────────────────────────────────────────────────────

/// Read a metadata file with all columns as strings.
///
/// `.csv` files are comma-separated, anything else is read as TSV. Header
/// names and cell values are trimmed, empty cells become nulls, and rows
/// whose id starts with `#` (comments, `#q2:` directives) are skipped. The
/// first column is the row key.
pub fn read_metadata(path: impl AsRef<Path>) -> Result<MetadataTable, QsipError> {
    let path = path.as_ref();
    let separator = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => b',',
        _ => b'\t',
    };

    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0)) // all columns as String
        .map_parse_options(|opts| opts.with_separator(separator))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    let trimmed: Vec<String> = df
        .get_column_names_str()
        .iter()
        .map(|c| c.trim().to_string())
        .collect();
    df.set_column_names(trimmed.as_slice())?;

    let Some(id_header) = trimmed.first() else {
        return Err(QsipError::InvalidData(format!(
            "{} has no columns",
            path.display()
        )));
    };
    // Comment lines and directives such as `#q2:types` start with '#' in the
    // id column. A missing id is kept so the row-key check can report it.
    let data_row = col(id_header.as_str())
        .str()
        .strip_chars(lit(" \t\r\n"))
        .str()
        .starts_with(lit(directive::PREFIX))
        .not()
        .fill_null(lit(true));

    let cleaned: Vec<Expr> = trimmed
        .iter()
        .map(|c| {
            let stripped = col(c.as_str()).str().strip_chars(lit(" \t\r\n"));
            when(stripped.clone().eq(lit("")))
                .then(lit(NULL).cast(DataType::String))
                .otherwise(stripped)
                .alias(c.as_str())
        })
        .collect();

    let rows = df.height();
    let df = df
        .lazy()
        .filter(data_row)
        .with_columns(cleaned)
        .collect()?;
    if df.height() < rows {
        debug!(
            "skipped {} comment or directive rows in {}",
            rows - df.height(),
            path.display()
        );
    }

    let table = MetadataTable::from_frame(df)?;
    if !index::is_id_header(table.id_column()) {
        warn!(
            "first column '{}' of {} is not a recognised id header; using it as the row key",
            table.id_column(),
            path.display()
        );
    }
    Ok(table)
}

/// Write `table` as TSV, row key first.
pub fn write_metadata(table: &MetadataTable, path: impl AsRef<Path>) -> Result<(), QsipError> {
    let mut file = File::create(path.as_ref())?;
    let mut df = table.frame().clone();
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b'\t')
        .finish(&mut df)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_and_directive_rows_are_skipped() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("sample.tsv");
        std::fs::write(
            &path,
            "#SampleID\tsource_mat_id\n\
             #q2:types\tcategorical\n\
             F1\tS1\n\
             # fractions from the second run\t\n\
             F2\tS1\n",
        )
        .unwrap();

        let table = read_metadata(&path).unwrap();

        assert_eq!(table.id_column(), "#SampleID");
        assert_eq!(table.ids().unwrap(), vec!["F1", "F2"]);
    }

    #[test]
    fn new_moves_row_key_first() {
        let df = df![
            "isotope" => &["12C", "13C"],
            "source" => &["s1", "s2"],
        ]
        .unwrap();

        let table = MetadataTable::new(df, "source").unwrap();

        assert_eq!(table.id_column(), "source");
        assert_eq!(table.column_names(), vec!["source", "isotope"]);
        assert_eq!(table.ids().unwrap(), vec!["s1", "s2"]);
    }

    #[test]
    fn new_rejects_duplicate_ids() {
        let df = df![
            "id" => &["a", "b", "a"],
            "x" => &["1", "2", "3"],
        ]
        .unwrap();

        let err = MetadataTable::new(df, "id").unwrap_err();

        assert!(matches!(err, QsipError::InvalidData(_)));
        assert!(err.to_string().contains("duplicate ids: a"));
    }

    #[test]
    fn new_rejects_missing_ids() {
        let df = df![
            "id" => &[Some("a"), None],
            "x" => &["1", "2"],
        ]
        .unwrap();

        let err = MetadataTable::new(df, "id").unwrap_err();

        assert!(err.to_string().contains("1 missing values"));
    }

    #[test]
    fn new_reports_unknown_id_column() {
        let df = df!["x" => &["1"]].unwrap();

        let err = MetadataTable::new(df, "sample-id").unwrap_err();

        assert!(matches!(err, QsipError::ColumnNotFound { .. }));
    }

    #[test]
    fn numeric_ids_become_strings() {
        let df = df![
            "id" => &[1i64, 2, 3],
            "x" => &["a", "b", "c"],
        ]
        .unwrap();

        let table = MetadataTable::new(df, "id").unwrap();

        assert_eq!(table.ids().unwrap(), vec!["1", "2", "3"]);
    }

    #[test]
    fn renaming_the_key_moves_the_key_name() {
        let df = df![
            "source" => &["s1", "s2"],
            "iso" => &["12C", "13C"],
        ]
        .unwrap();
        let table = MetadataTable::from_frame(df).unwrap();

        let renamed = table
            .rename_columns(&[
                ("source".to_string(), "id".to_string()),
                ("iso".to_string(), "isotope".to_string()),
            ])
            .unwrap();

        assert_eq!(renamed.id_column(), "id");
        assert_eq!(renamed.column_names(), vec!["id", "isotope"]);
    }

    #[test]
    fn swapped_names_are_renamed_together() {
        let df = df![
            "id" => &["s1"],
            "a" => &["1"],
            "b" => &["2"],
        ]
        .unwrap();
        let table = MetadataTable::from_frame(df).unwrap();

        let renamed = table
            .rename_columns(&[
                ("a".to_string(), "b".to_string()),
                ("b".to_string(), "a".to_string()),
            ])
            .unwrap();

        assert_eq!(renamed.column_names(), vec!["id", "b", "a"]);
        assert_eq!(
            renamed.frame().column("a").unwrap().str().unwrap().get(0),
            Some("2")
        );
    }
}
