//! Delimited-text serialization and output.
//!
//! The whole document is rendered into memory first and handed to the
//! sink in one write, so a failed run never leaves partial output behind.

use crate::config::OutputTarget;
use crate::error::{JoinError, Result};
use crate::models::Table;
use csv::{QuoteStyle, WriterBuilder};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

const BUFFER: &str = "in-memory buffer";

/// Render a table as delimited text
///
/// Header first, then one line per row. Fields holding the delimiter, a
/// quote or a line break are quoted with embedded quotes doubled; nulls
/// are empty. Lines are joined with `\n` and the last one is not
/// terminated. The header is derived from the rows, so a table without
/// rows (or without columns) renders as nothing.
pub fn format_table(table: &Table, delimiter: u8) -> Result<Vec<u8>> {
    if table.columns().is_empty() || table.is_empty() {
        debug!("No rows to render");
        return Ok(Vec::new());
    }

    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Necessary)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    let to_io = |e: csv::Error| JoinError::output(BUFFER, std::io::Error::from(e));

    writer.write_record(table.columns()).map_err(to_io)?;
    for row in table.rows() {
        writer
            .write_record(row.iter().map(|value| value.to_string()))
            .map_err(to_io)?;
    }

    let mut bytes = writer
        .into_inner()
        .map_err(|e| JoinError::output(BUFFER, e.into_error()))?;
    if bytes.last() == Some(&b'\n') {
        bytes.pop();
    }

    debug!("Formatted {} rows into {} bytes", table.len(), bytes.len());
    Ok(bytes)
}

/// Deliver rendered output to its destination
///
/// Standard output receives a single write. A file destination is written
/// to a temporary sibling and renamed over the target.
pub fn write_output<W: Write>(bytes: &[u8], target: &OutputTarget, stdout: &mut W) -> Result<()> {
    match target {
        OutputTarget::Stdout => {
            stdout
                .write_all(bytes)
                .and_then(|_| stdout.flush())
                .map_err(|e| JoinError::output(target.describe(), e))?;
        }
        OutputTarget::File(path) => write_file_atomically(path, bytes)?,
    }

    debug!("Wrote {} bytes to {}", bytes.len(), target.describe());
    Ok(())
}

fn write_file_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let describe = || path.display().to_string();
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    let mut temp = NamedTempFile::new_in(dir).map_err(|e| JoinError::output(describe(), e))?;
    temp.write_all(bytes)
        .and_then(|_| temp.flush())
        .map_err(|e| JoinError::output(describe(), e))?;
    temp.persist(path)
        .map_err(|e| JoinError::output(describe(), e.error))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use tempfile::TempDir;

    fn render(table: &Table) -> String {
        String::from_utf8(format_table(table, b',').unwrap()).unwrap()
    }

    #[test]
    fn test_header_and_rows_without_trailing_newline() {
        let mut table = Table::new(vec!["course".to_string(), "distance".to_string()]);
        table.push_row(vec![Value::from("Tokyo"), Value::Number(2000.0)]);
        table.push_row(vec![Value::from("Kyoto"), Value::Number(3200.0)]);

        assert_eq!(render(&table), "course,distance\nTokyo,2000\nKyoto,3200");
    }

    #[test]
    fn test_nulls_are_empty_fields() {
        let mut table = Table::new(vec!["a".to_string(), "b".to_string(), "c".to_string()]);
        table.push_row(vec![Value::Number(1.0), Value::Null, Value::Null]);

        assert_eq!(render(&table), "a,b,c\n1,,");
    }

    #[test]
    fn test_quoting_rules() {
        let mut table = Table::new(vec!["name".to_string(), "note".to_string()]);
        table.push_row(vec![
            Value::from("Hanshin, Takarazuka"),
            Value::from("say \"hi\""),
        ]);
        table.push_row(vec![Value::from("two\nlines"), Value::from("plain")]);

        assert_eq!(
            render(&table),
            "name,note\n\"Hanshin, Takarazuka\",\"say \"\"hi\"\"\"\n\"two\nlines\",plain"
        );
    }

    #[test]
    fn test_value_rendering() {
        let mut table = Table::new(vec![
            "n".to_string(),
            "b".to_string(),
            "d".to_string(),
            "big".to_string(),
        ]);
        table.push_row(vec![
            Value::Number(-0.5),
            Value::Boolean(false),
            Value::infer("2024-05-12T15:40+09:00"),
            Value::Number(1e21),
        ]);

        assert_eq!(render(&table), "n,b,d,big\n-0.5,false,2024-05-12T06:40Z,1e+21");
    }

    #[test]
    fn test_table_without_rows_renders_nothing() {
        let table = Table::new(vec!["course".to_string(), "course_x".to_string()]);
        assert_eq!(render(&table), "");
    }

    #[test]
    fn test_no_columns_renders_nothing() {
        assert!(format_table(&Table::default(), b',').unwrap().is_empty());
    }

    #[test]
    fn test_tab_delimiter_quotes_tabs_only() {
        let mut table = Table::new(vec!["course".to_string()]);
        table.push_row(vec![Value::from("Tokyo, Fuchu")]);
        table.push_row(vec![Value::from("a\tb")]);

        let out = String::from_utf8(format_table(&table, b'\t').unwrap()).unwrap();
        assert_eq!(out, "course\nTokyo, Fuchu\n\"a\tb\"");
    }

    #[test]
    fn test_write_output_to_writer() {
        let mut sink = Vec::new();
        write_output(b"a,b\n1,2", &OutputTarget::Stdout, &mut sink).unwrap();
        assert_eq!(sink, b"a,b\n1,2");
    }

    #[test]
    fn test_write_output_to_file_replaces_target() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("joined.csv");
        std::fs::write(&path, "old contents").unwrap();

        let mut unused = Vec::new();
        write_output(b"course\nTokyo", &OutputTarget::File(path.clone()), &mut unused).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "course\nTokyo");
        assert!(unused.is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_output_into_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope").join("joined.csv");

        let err = write_output(b"x", &OutputTarget::File(path), &mut Vec::new()).unwrap_err();
        assert!(matches!(err, JoinError::Output { .. }));
    }
}
