//! Tabular extractors (csv, parquet).
//!
//! Both formats load into a [`Table`] and render the way a pandas
//! `DataFrame.to_string()` does: a left-aligned row index followed by
//! right-aligned columns, two spaces apart, with missing cells as `NaN`.

use async_trait::async_trait;
use corpora_core::{ContentExtractor, ExtractError, ExtractedContent};
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::Field;
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::run_blocking;

/// Cell values read as missing, as pandas' default `na_values`.
const NA_VALUES: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

const MISSING: &str = "NaN";

/// An in-memory table of string cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    /// Column names
    pub columns: Vec<String>,
    /// Rows, each as wide as `columns`; `None` is a missing cell
    pub rows: Vec<Vec<Option<String>>>,
}

impl Table {
    /// Render as aligned text.
    #[must_use]
    pub fn render(&self) -> String {
        if self.rows.is_empty() {
            return format!(
                "Empty DataFrame\nColumns: [{}]\nIndex: []",
                self.columns.join(", ")
            );
        }

        let index_width = (self.rows.len() - 1).to_string().len();
        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, name)| {
                self.rows
                    .iter()
                    .map(|row| cell(row, i).chars().count())
                    .fold(name.chars().count(), usize::max)
            })
            .collect();

        let mut lines = Vec::with_capacity(self.rows.len() + 1);

        let mut header = " ".repeat(index_width);
        for (name, width) in self.columns.iter().zip(&widths) {
            header.push_str(&format!("  {name:>width$}"));
        }
        lines.push(header);

        for (index, row) in self.rows.iter().enumerate() {
            let mut line = format!("{index:<index_width$}");
            for (i, width) in widths.iter().enumerate() {
                line.push_str(&format!("  {:>width$}", cell(row, i)));
            }
            lines.push(line);
        }

        lines.join("\n")
    }
}

fn cell(row: &[Option<String>], i: usize) -> &str {
    row.get(i).and_then(Option::as_deref).unwrap_or(MISSING)
}

/// Make column names unique and fill in blank ones, as pandas does.
fn normalize_columns(raw: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut columns = Vec::new();

    for (i, name) in raw.into_iter().enumerate() {
        let name = if name.is_empty() {
            format!("Unnamed: {i}")
        } else {
            name
        };

        let count = seen.entry(name.clone()).or_insert(0);
        let unique = if *count == 0 {
            name
        } else {
            format!("{name}.{count}")
        };
        *count += 1;
        seen.entry(unique.clone()).or_insert(1);
        columns.push(unique);
    }

    columns
}

// ============================================================================
// CSV
// ============================================================================

/// Parse CSV bytes whose first row is the header.
fn read_csv(bytes: &[u8]) -> Result<Table, ExtractError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| ExtractError::Parse(format!("CSV error: {e}")))?
        .clone();
    if headers.is_empty() {
        return Err(ExtractError::Parse("No columns to parse from file".to_string()));
    }

    let columns = normalize_columns(headers.iter().map(str::to_string));
    let mut rows = Vec::new();

    for record in reader.records() {
        let record = record.map_err(|e| ExtractError::Parse(format!("CSV error: {e}")))?;
        if record.len() > columns.len() {
            let line = record.position().map_or(0, csv::Position::line);
            return Err(ExtractError::Parse(format!(
                "Error tokenizing data. Expected {} fields in line {}, saw {}",
                columns.len(),
                line,
                record.len()
            )));
        }

        let mut row: Vec<Option<String>> = record
            .iter()
            .map(|value| (!NA_VALUES.contains(&value)).then(|| value.to_string()))
            .collect();
        row.resize(columns.len(), None);
        rows.push(row);
    }

    Ok(Table { columns, rows })
}

/// Extractor for CSV files.
pub struct CsvExtractor;

impl CsvExtractor {
    /// Create a new CSV extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for CsvExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentExtractor for CsvExtractor {
    fn name(&self) -> &str {
        "csv"
    }

    fn extensions(&self) -> &[&str] {
        &["csv"]
    }

    async fn extract(&self, path: &Path) -> Result<ExtractedContent, ExtractError> {
        let bytes = tokio::fs::read(path).await?;
        let table = run_blocking(move || read_csv(&bytes)).await?;
        debug!("Read {} CSV row(s) from {:?}", table.rows.len(), path);
        Ok(ExtractedContent::from_text(table.render()))
    }
}

// ============================================================================
// Parquet
// ============================================================================

/// Read every row of a parquet file with the record API.
fn read_parquet(path: &Path) -> Result<Table, ExtractError> {
    let parquet_error = |e: parquet::errors::ParquetError| {
        ExtractError::Parse(format!("Parquet error: {e}"))
    };

    let file = File::open(path)?;
    let reader = SerializedFileReader::new(file).map_err(parquet_error)?;

    let columns = normalize_columns(
        reader
            .metadata()
            .file_metadata()
            .schema_descr()
            .root_schema()
            .get_fields()
            .iter()
            .map(|field| field.name().to_string()),
    );

    let mut rows = Vec::new();
    for row in reader.get_row_iter(None).map_err(parquet_error)? {
        let row = row.map_err(parquet_error)?;
        rows.push(
            row.get_column_iter()
                .map(|(_, field)| field_text(field))
                .collect(),
        );
    }

    Ok(Table { columns, rows })
}

fn field_text(field: &Field) -> Option<String> {
    match field {
        Field::Null => None,
        Field::Str(value) => Some(value.clone()),
        other => Some(other.to_string()),
    }
}

/// Extractor for Apache Parquet files.
pub struct ParquetExtractor;

impl ParquetExtractor {
    /// Create a new parquet extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for ParquetExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentExtractor for ParquetExtractor {
    fn name(&self) -> &str {
        "parquet"
    }

    fn extensions(&self) -> &[&str] {
        &["parquet"]
    }

    async fn extract(&self, path: &Path) -> Result<ExtractedContent, ExtractError> {
        let owned: PathBuf = path.to_path_buf();
        let table = run_blocking(move || read_parquet(&owned)).await?;
        debug!("Read {} parquet row(s) from {:?}", table.rows.len(), path);
        Ok(ExtractedContent::from_text(table.render()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn table(columns: &[&str], rows: &[&[Option<&str>]]) -> Table {
        Table {
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
            rows: rows
                .iter()
                .map(|row| row.iter().map(|v| v.map(str::to_string)).collect())
                .collect(),
        }
    }

    // ==================== Rendering ====================

    #[test]
    fn test_render_aligns_columns() {
        let t = table(
            &["name", "n"],
            &[&[Some("alice"), Some("1")], &[Some("bo"), Some("200")]],
        );
        assert_eq!(t.render(), "    name    n\n0  alice    1\n1     bo  200");
    }

    #[test]
    fn test_render_missing_as_nan() {
        let t = table(&["a", "b"], &[&[Some("x"), None]]);
        assert_eq!(t.render(), "   a    b\n0  x  NaN");
    }

    #[test]
    fn test_render_index_left_aligned() {
        let rows: Vec<&[Option<&str>]> = (0..11).map(|_| &[Some("v")][..]).collect();
        let rendered = table(&["c"], &rows).render();
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines[0], "    c");
        assert_eq!(lines[1], "0   v");
        assert_eq!(lines[11], "10  v");
    }

    #[test]
    fn test_render_empty_frame() {
        let t = table(&["a", "b"], &[]);
        assert_eq!(t.render(), "Empty DataFrame\nColumns: [a, b]\nIndex: []");
    }

    #[test]
    fn test_render_counts_chars_not_bytes() {
        let t = table(&["שם"], &[&[Some("אבג")]]);
        assert_eq!(t.render(), "    שם\n0  אבג");
    }

    #[test]
    fn test_normalize_columns() {
        let columns = normalize_columns(
            ["a", "", "a", "a", "b"].iter().map(|s| (*s).to_string()),
        );
        assert_eq!(columns, vec!["a", "Unnamed: 1", "a.1", "a.2", "b"]);
    }

    // ==================== CSV ====================

    #[test]
    fn test_read_csv_short_rows_padded() {
        let t = read_csv(b"a,b,c\n1,2,3\n4,5\n").unwrap();
        assert_eq!(t.columns, vec!["a", "b", "c"]);
        assert_eq!(t.rows[1], vec![Some("4".to_string()), Some("5".to_string()), None]);
    }

    #[test]
    fn test_read_csv_na_values() {
        let t = read_csv(b"a,b\nNA,\nnull,ok\n").unwrap();
        assert_eq!(t.rows[0], vec![None, None]);
        assert_eq!(t.rows[1], vec![None, Some("ok".to_string())]);
    }

    #[test]
    fn test_read_csv_quoted_fields() {
        let t = read_csv(b"name,quote\n\"Smith, J\",\"said \"\"hi\"\"\"\n").unwrap();
        assert_eq!(t.rows[0][0].as_deref(), Some("Smith, J"));
        assert_eq!(t.rows[0][1].as_deref(), Some("said \"hi\""));
    }

    #[test]
    fn test_read_csv_empty_input_fails() {
        let err = read_csv(b"").unwrap_err();
        assert!(err.to_string().contains("No columns to parse from file"));
    }

    #[test]
    fn test_read_csv_too_many_fields_fails() {
        let err = read_csv(b"a,b\n1,2\n3,4,5\n").unwrap_err();
        assert!(err.to_string().contains("Expected 2 fields in line 3, saw 3"));
    }

    #[tokio::test]
    async fn test_csv_extract_renders_table() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("data.csv");
        std::fs::write(&path, "city,pop\nHaifa,285000\nEilat,52000\n").unwrap();

        let content = CsvExtractor::new().extract(&path).await.unwrap();
        assert_eq!(
            content.text,
            "    city     pop\n0  Haifa  285000\n1  Eilat   52000"
        );
    }

    #[tokio::test]
    async fn test_csv_header_only() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("header.csv");
        std::fs::write(&path, "x,y\n").unwrap();

        let content = CsvExtractor::new().extract(&path).await.unwrap();
        assert_eq!(content.text, "Empty DataFrame\nColumns: [x, y]\nIndex: []");
    }

    // ==================== Parquet ====================

    fn write_parquet(path: &Path) {
        use parquet::data_type::{ByteArray, ByteArrayType, Int64Type};
        use parquet::file::properties::WriterProperties;
        use parquet::file::writer::SerializedFileWriter;
        use parquet::schema::parser::parse_message_type;
        use std::sync::Arc;

        let schema = Arc::new(
            parse_message_type(
                "message schema { REQUIRED INT64 id; OPTIONAL BYTE_ARRAY name (UTF8); }",
            )
            .unwrap(),
        );
        let props = Arc::new(WriterProperties::builder().build());
        let file = File::create(path).unwrap();

        let mut writer = SerializedFileWriter::new(file, schema, props).unwrap();
        let mut row_group = writer.next_row_group().unwrap();

        let mut id = row_group.next_column().unwrap().unwrap();
        id.typed::<Int64Type>()
            .write_batch(&[1, 2, 3], None, None)
            .unwrap();
        id.close().unwrap();

        let mut name = row_group.next_column().unwrap().unwrap();
        name.typed::<ByteArrayType>()
            .write_batch(
                &[ByteArray::from("alice"), ByteArray::from("bob")],
                Some(&[1, 0, 1]),
                None,
            )
            .unwrap();
        name.close().unwrap();

        row_group.close().unwrap();
        writer.close().unwrap();
    }

    #[test]
    fn test_read_parquet_rows() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("people.parquet");
        write_parquet(&path);

        let t = read_parquet(&path).unwrap();
        assert_eq!(t.columns, vec!["id", "name"]);
        assert_eq!(
            t.rows,
            vec![
                vec![Some("1".to_string()), Some("alice".to_string())],
                vec![Some("2".to_string()), None],
                vec![Some("3".to_string()), Some("bob".to_string())],
            ]
        );
    }

    #[tokio::test]
    async fn test_parquet_extract_renders_table() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("people.parquet");
        write_parquet(&path);

        let content = ParquetExtractor::new().extract(&path).await.unwrap();
        assert_eq!(
            content.text,
            "   id   name\n0   1  alice\n1   2    NaN\n2   3    bob"
        );
    }

    #[tokio::test]
    async fn test_parquet_invalid_file_fails() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("junk.parquet");
        std::fs::write(&path, b"PAR1 garbage").unwrap();

        let result = ParquetExtractor::new().extract(&path).await;
        assert!(matches!(result, Err(ExtractError::Parse(_))));
    }
}
