//! Flat-file loading for the one-shot ingest job.
//!
//! The extracts are Windows-1252 encoded CSVs; they are decoded up front
//! and held as header-keyed rows so the join step can mirror the extract's
//! own column names.

use std::collections::HashMap;
use std::path::Path;

use crate::error::PortalError;

/// One extract row, keyed by (possibly suffixed) column name.
pub type Row = HashMap<String, String>;

/// Read a Windows-1252 CSV extract into header-keyed rows.
/// A missing file is fatal for the whole run.
pub fn read_extract(path: &Path) -> Result<Vec<Row>, PortalError> {
    let bytes = std::fs::read(path)
        .map_err(|_| PortalError::MigrationFileMissing(path.display().to_string()))?;
    let (text, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);

    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| PortalError::MigrationFileInvalid(format!("{}: {}", path.display(), e)))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record
            .map_err(|e| PortalError::MigrationFileInvalid(format!("{}: {}", path.display(), e)))?;
        let mut row = Row::with_capacity(headers.len());
        for (i, header) in headers.iter().enumerate() {
            row.insert(
                header.clone(),
                record.get(i).unwrap_or("").trim().to_string(),
            );
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Left-join two extracts on the given key columns. Every left row is
/// kept; unmatched rows carry no right-side columns. Colliding column
/// names are disambiguated with `_x` (left) / `_y` (right) suffixes.
pub fn left_join(
    left: Vec<Row>,
    right: &[Row],
    left_key: &str,
    right_key: &str,
) -> Result<Vec<Row>, PortalError> {
    // Rows of an already-joined left side carry right-hand columns only
    // where they matched, so the key column counts as present if any row
    // has it. A row without the key is simply unmatched.
    if !left.is_empty() && !left.iter().any(|r| r.contains_key(left_key)) {
        return Err(PortalError::MigrationJoinKey(left_key.to_string()));
    }
    if !right.is_empty() && !right.iter().any(|r| r.contains_key(right_key)) {
        return Err(PortalError::MigrationJoinKey(right_key.to_string()));
    }

    let mut index: HashMap<&str, &Row> = HashMap::new();
    for row in right {
        if let Some(key) = row.get(right_key) {
            // First match wins; the extracts key these files uniquely.
            index.entry(key.as_str()).or_insert(row);
        }
    }

    let merged = left
        .into_iter()
        .map(|left_row| {
            let matched = left_row
                .get(left_key)
                .and_then(|key| index.get(key.as_str()).copied());
            match matched {
                Some(right_row) => merge_rows(left_row, right_row),
                None => left_row,
            }
        })
        .collect();
    Ok(merged)
}

fn merge_rows(left: Row, right: &Row) -> Row {
    let mut merged = Row::with_capacity(left.len() + right.len());
    for (name, value) in left {
        if right.contains_key(&name) {
            merged.insert(format!("{}_x", name), value);
        } else {
            merged.insert(name, value);
        }
    }
    for (name, value) in right {
        if merged.contains_key(&format!("{}_x", name)) {
            merged.insert(format!("{}_y", name), value.clone());
        } else {
            merged.insert(name.clone(), value.clone());
        }
    }
    merged
}

/// Fetch a column, preferring the left-suffixed name a join collision
/// would have produced.
pub fn field<'a>(row: &'a Row, name: &str) -> Option<&'a str> {
    row.get(&format!("{}_x", name))
        .or_else(|| row.get(name))
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_read_extract_decodes_windows_1252() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        // 0x93/0x94 are curly quotes in cp1252 and invalid UTF-8.
        file.write_all(b"Id,Description\n1,\x93quoted\x94 filing\n")
            .unwrap();
        file.flush().unwrap();

        let rows = read_extract(file.path()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["Id"], "1");
        assert_eq!(rows[0]["Description"], "\u{201c}quoted\u{201d} filing");
    }

    #[test]
    fn test_read_extract_missing_file_is_fatal() {
        let err = read_extract(Path::new("/nonexistent/oeb_data.csv")).unwrap_err();
        assert!(matches!(err, PortalError::MigrationFileMissing(_)));
    }

    #[test]
    fn test_left_join_keeps_unmatched_left_rows() {
        let left = vec![row(&[("Id", "1"), ("Link", "a")]), row(&[("Id", "2"), ("Link", "b")])];
        let right = vec![row(&[("id", "1"), ("num_pages", "12")])];

        let merged = left_join(left, &right, "Id", "id").unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0]["num_pages"], "12");
        assert!(merged[1].get("num_pages").is_none());
    }

    #[test]
    fn test_left_join_suffixes_colliding_columns() {
        let left = vec![row(&[("Id", "1"), ("Entity", "OEB")])];
        let right = vec![row(&[("id", "1"), ("Entity", "ONT")])];

        let merged = left_join(left, &right, "Id", "id").unwrap();
        assert_eq!(merged[0]["Entity_x"], "OEB");
        assert_eq!(merged[0]["Entity_y"], "ONT");
        assert!(merged[0].get("Entity").is_none());
        assert_eq!(field(&merged[0], "Entity"), Some("OEB"));
    }

    #[test]
    fn test_left_join_chains_when_first_left_row_was_unmatched() {
        // The first join leaves row Id=1 without meta columns, so the
        // second join's key only exists on the matched rows.
        let core = vec![row(&[("Id", "1")]), row(&[("Id", "2")])];
        let meta = vec![row(&[("id", "2"), ("num_pages", "3")])];
        let merged = left_join(core, &meta, "Id", "id").unwrap();

        let status = vec![row(&[("EntityDocumentsId", "2"), ("Status", "Filed")])];
        let merged = left_join(merged, &status, "id", "EntityDocumentsId").unwrap();

        assert_eq!(merged.len(), 2);
        assert!(merged[0].get("Status").is_none());
        assert_eq!(merged[1]["Status"], "Filed");
    }

    #[test]
    fn test_left_join_missing_key_is_fatal() {
        let left = vec![row(&[("Id", "1")])];
        let right = vec![row(&[("id", "1")])];

        let err = left_join(left, &right, "RecordId", "id").unwrap_err();
        match err {
            PortalError::MigrationJoinKey(col) => assert_eq!(col, "RecordId"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_field_falls_back_to_plain_name() {
        let r = row(&[("Link", "http://a")]);
        assert_eq!(field(&r, "Link"), Some("http://a"));
        assert_eq!(field(&r, "Missing"), None);
    }
}
