//! Delimited-text loading with per-field type inference.
//!
//! A file is read completely into memory, checked for unterminated
//! quoted fields, then parsed with the `csv` crate. The first record is
//! the header; every following record becomes one row of typed values.

use crate::config::JoinConfig;
use crate::error::{JoinError, Result};
use crate::models::Table;
use crate::value::Value;
use csv::{ReaderBuilder, StringRecord};
use std::path::Path;
use tracing::debug;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Read both inputs concurrently; the join only starts once both are loaded
pub async fn load_inputs(config: &JoinConfig) -> Result<(Table, Table)> {
    let delimiter = config.delimiter_byte()?;

    tokio::try_join!(
        load_table(&config.races_path, delimiter),
        load_table(&config.coords_path, delimiter),
    )
}

/// Load a single delimited file into a typed table
pub async fn load_table(path: &Path, delimiter: u8) -> Result<Table> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| JoinError::input_missing(path, e))?;

    debug!("Read {} bytes from {}", bytes.len(), path.display());
    parse_table(path, &bytes, delimiter)
}

/// Parse buffered delimited text; `path` is only used for error reporting
pub fn parse_table(path: &Path, bytes: &[u8], delimiter: u8) -> Result<Table> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    let shapes = scan_records(bytes, delimiter).map_err(|line| {
        JoinError::parse_malformed(path, line, "quoted field is never closed")
    })?;

    // The csv reader skips empty lines, so those are filled in from the scan
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut record = StringRecord::new();
    let mut shapes = shapes.into_iter();

    let header = match shapes.next() {
        None => {
            debug!("{} is empty", path.display());
            return Ok(Table::default());
        }
        Some(RecordShape::Blank) => Header::from_record(&StringRecord::from(vec![""])),
        Some(RecordShape::Fields) => {
            reader
                .read_record(&mut record)
                .map_err(|e| JoinError::from_csv(path, e))?;
            Header::from_record(&record)
        }
    };
    let mut table = Table::new(header.columns.clone());

    for shape in shapes {
        match shape {
            RecordShape::Blank => table.push_row(Vec::new()),
            RecordShape::Fields => {
                if !reader
                    .read_record(&mut record)
                    .map_err(|e| JoinError::from_csv(path, e))?
                {
                    break;
                }
                table.push_row(header.row_values(&record));
            }
        }
    }

    debug!(
        "Loaded {} rows x {} columns from {}",
        table.len(),
        table.columns().len(),
        path.display()
    );
    Ok(table)
}

/// Header with repeated column names folded together
///
/// A repeated name keeps the position of its first occurrence and the
/// value of its last.
struct Header {
    columns: Vec<String>,
    slots: Vec<usize>,
}

impl Header {
    fn from_record(record: &StringRecord) -> Self {
        let mut columns: Vec<String> = Vec::with_capacity(record.len());
        let mut slots = Vec::with_capacity(record.len());

        for name in record.iter() {
            let slot = match columns.iter().position(|c| c == name) {
                Some(existing) => existing,
                None => {
                    columns.push(name.to_string());
                    columns.len() - 1
                }
            };
            slots.push(slot);
        }

        Self { columns, slots }
    }

    fn row_values(&self, record: &StringRecord) -> Vec<Value> {
        let mut row = vec![Value::Null; self.columns.len()];
        for (raw_index, &slot) in self.slots.iter().enumerate() {
            row[slot] = Value::infer(record.get(raw_index).unwrap_or(""));
        }
        row
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordShape {
    /// An empty line; it reads as a row of nulls
    Blank,
    Fields,
}

/// Split the input into records the way the reader will, without decoding fields
///
/// Fails with the 1-based line on which a quoted field opened and was never
/// closed. A quote only opens a quoted field at the start of a field; stray
/// quotes inside unquoted text are literal. The final line terminator does
/// not start another record.
fn scan_records(bytes: &[u8], delimiter: u8) -> std::result::Result<Vec<RecordShape>, u64> {
    let mut shapes = Vec::new();
    let mut line = 1u64;
    let mut opened_on = 0u64;
    let mut in_quotes = false;
    let mut at_record_start = true;
    let mut at_field_start = true;
    let mut iter = bytes.iter().copied().peekable();

    while let Some(byte) = iter.next() {
        if in_quotes {
            match byte {
                b'"' if iter.peek() == Some(&b'"') => {
                    iter.next();
                }
                b'"' => in_quotes = false,
                b'\n' => line += 1,
                _ => {}
            }
            continue;
        }

        if byte == b'\n' || byte == b'\r' {
            if at_record_start {
                shapes.push(RecordShape::Blank);
            }
            if byte == b'\r' && iter.peek() == Some(&b'\n') {
                iter.next();
            }
            line += 1;
            at_record_start = true;
            at_field_start = true;
            continue;
        }

        if at_record_start {
            shapes.push(RecordShape::Fields);
            at_record_start = false;
        }

        match byte {
            b'"' if at_field_start => {
                in_quotes = true;
                opened_on = line;
                at_field_start = false;
            }
            b if b == delimiter => at_field_start = true,
            _ => at_field_start = false,
        }
    }

    if in_quotes {
        return Err(opened_on);
    }
    Ok(shapes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn parse(text: &str) -> Result<Table> {
        parse_table(Path::new("test.csv"), text.as_bytes(), b',')
    }

    #[test]
    fn test_header_and_typed_rows() {
        let table = parse("course,distance,turf,date\nTokyo,2000,true,2024-05-12\n").unwrap();
        assert_eq!(table.columns(), ["course", "distance", "turf", "date"]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(0, "course"), Some(&Value::from("Tokyo")));
        assert_eq!(table.get(0, "distance"), Some(&Value::Number(2000.0)));
        assert_eq!(table.get(0, "turf"), Some(&Value::Boolean(true)));
        assert!(matches!(table.get(0, "date"), Some(Value::Date(_))));
    }

    #[test]
    fn test_row_order_preserved() {
        let table = parse("n\n3\n1\n2").unwrap();
        let values: Vec<f64> = table.rows().iter().filter_map(|r| r[0].as_number()).collect();
        assert_eq!(values, vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn test_empty_fields_become_null() {
        let table = parse("a,b,c\n1,,3\n").unwrap();
        assert_eq!(table.get(0, "b"), Some(&Value::Null));
    }

    #[test]
    fn test_ragged_rows() {
        let table = parse("a,b,c\n1\n1,2,3,4\n").unwrap();
        assert_eq!(table.rows()[0], vec![Value::Number(1.0), Value::Null, Value::Null]);
        assert_eq!(table.rows()[1].len(), 3);
    }

    #[test]
    fn test_quoted_fields() {
        let table = parse("name,note\n\"Hanshin, Takarazuka\",\"say \"\"hi\"\"\"\n\"a\nb\",x\n").unwrap();
        assert_eq!(table.get(0, "name"), Some(&Value::from("Hanshin, Takarazuka")));
        assert_eq!(table.get(0, "note"), Some(&Value::from("say \"hi\"")));
        assert_eq!(table.get(1, "name"), Some(&Value::from("a\nb")));
    }

    #[test]
    fn test_duplicate_header_keeps_first_position_last_value() {
        let table = parse("a,b,a\n1,2,3\n").unwrap();
        assert_eq!(table.columns(), ["a", "b"]);
        assert_eq!(table.rows()[0], vec![Value::Number(3.0), Value::Number(2.0)]);
    }

    #[test]
    fn test_bom_and_crlf() {
        let table = parse("\u{feff}course,x\r\nTokyo,10\r\n").unwrap();
        assert_eq!(table.columns(), ["course", "x"]);
        assert_eq!(table.get(0, "x"), Some(&Value::Number(10.0)));
    }

    #[test]
    fn test_empty_input() {
        let table = parse("").unwrap();
        assert!(table.columns().is_empty());
        assert!(table.is_empty());
    }

    #[test]
    fn test_unterminated_quote_is_fatal() {
        let err = parse("a,b\n1,2\n3,\"open\n4,5\n").unwrap_err();
        match err {
            JoinError::ParseMalformed { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_blank_lines_become_null_rows() {
        let table = parse("course,distance\nTokyo,2000\n\nKyoto,1600\n").unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows()[1], vec![Value::Null, Value::Null]);
        assert_eq!(table.get(2, "course"), Some(&Value::from("Kyoto")));
    }

    #[test]
    fn test_only_final_terminator_is_dropped() {
        assert_eq!(parse("a\n1\n").unwrap().len(), 1);
        assert_eq!(parse("a\n1").unwrap().len(), 1);
        assert_eq!(parse("a\n1\n\n").unwrap().rows()[1], vec![Value::Null]);
        assert_eq!(parse("a\r\n1\r\n\r\n\r\n").unwrap().len(), 3);
    }

    #[test]
    fn test_blank_line_inside_quotes_is_data() {
        let table = parse("note,n\n\"a\n\nb\",1\n").unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(0, "note"), Some(&Value::from("a\n\nb")));
    }

    #[test]
    fn test_unterminated_quote_line_counts_blank_lines() {
        let err = parse("a\n\n\"open\n").unwrap_err();
        match err {
            JoinError::ParseMalformed { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_stray_quote_inside_field_is_literal() {
        let table = parse("h\n5'10\"\n").unwrap();
        assert_eq!(table.get(0, "h"), Some(&Value::from("5'10\"")));
    }

    #[test]
    fn test_invalid_utf8_is_fatal() {
        let err = parse_table(Path::new("bad.csv"), b"a\n\xff\xfe\n", b',').unwrap_err();
        assert!(matches!(err, JoinError::ParseMalformed { .. }));
    }

    #[test]
    fn test_tab_delimiter() {
        let table = parse_table(Path::new("t.tsv"), b"course\tx\nTokyo, Fuchu\t1\n", b'\t').unwrap();
        assert_eq!(table.get(0, "course"), Some(&Value::from("Tokyo, Fuchu")));
    }

    #[tokio::test]
    async fn test_load_table_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "name,x,y").unwrap();
        writeln!(file, "Tokyo,10,20").unwrap();

        let table = load_table(file.path(), b',').await.unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(0, "y"), Some(&Value::Number(20.0)));
    }

    #[tokio::test]
    async fn test_missing_file_is_input_missing() {
        let dir = TempDir::new().unwrap();
        let err = load_table(&dir.path().join("absent.csv"), b',')
            .await
            .unwrap_err();
        assert!(matches!(err, JoinError::InputMissing { .. }));
    }

    #[tokio::test]
    async fn test_load_inputs_fails_if_either_missing() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("races.csv"), "course\nTokyo\n").unwrap();

        let config = JoinConfig::from_data_dir(dir.path());
        let err = load_inputs(&config).await.unwrap_err();
        match err {
            JoinError::InputMissing { path, .. } => {
                assert_eq!(path, dir.path().join("racecourseCoords.csv"))
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
