//! Tabular report generation for document listings and search results.
//!
//! Each report is written to a uniquely named temp file owned by the
//! returned [`Report`] handle: created here, streamed by the caller,
//! deleted when the handle drops. Concurrent exports therefore never
//! collide and temp space is always reclaimed.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use uuid::Uuid;

use crate::error::PortalError;
use crate::models::{Document, SearchHit};

/// Column order of the metadata export. Fixed and stable across calls.
pub const METADATA_COLUMNS: [&str; 12] = [
    "id",
    "Entity",
    "Link",
    "Case Number / Docket",
    "File Description",
    "File URL",
    "Document Type",
    "Issued Date",
    "Received Date",
    "Submitter",
    "Applicant",
    "Status",
];

/// Column order of the search-hit export.
pub const SEARCH_COLUMNS: [&str; 5] =
    ["URL", "Page Number", "Keyword", "Keyword Count", "Page Text"];

/// A generated report file. Owns its temp file; dropping the handle
/// removes the file from disk.
pub struct Report {
    file: NamedTempFile,
    download_name: String,
}

impl Report {
    /// Path of the report on disk, valid while the handle lives.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Filename offered to the client in the attachment header.
    pub fn download_name(&self) -> &str {
        &self.download_name
    }

    /// Read the report content and release the temp file.
    pub fn into_bytes(self) -> Result<Vec<u8>, PortalError> {
        let bytes = std::fs::read(self.file.path())?;
        Ok(bytes)
    }
}

fn write_report(csv_bytes: Vec<u8>) -> Result<Report, PortalError> {
    let mut file = NamedTempFile::new()?;
    file.write_all(&csv_bytes)?;
    file.flush()?;
    let download_name = format!("regdocs_report_{}.csv", Uuid::new_v4());
    Ok(Report {
        file,
        download_name,
    })
}

/// One row per document, metadata columns only.
pub fn metadata_report(documents: &[Document]) -> Result<Report, PortalError> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(METADATA_COLUMNS)?;
    for doc in documents {
        wtr.write_record([
            doc.id.to_string(),
            doc.entity.clone(),
            doc.link.clone(),
            doc.case_number.clone(),
            doc.filename_description.clone(),
            doc.file_url.clone(),
            doc.document_type.clone(),
            doc.issued_date.to_string(),
            doc.received_date.to_string(),
            doc.submitter.clone(),
            doc.applicant.clone(),
            doc.status.clone(),
        ])?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| PortalError::Export(e.to_string()))?;
    write_report(bytes)
}

/// One row per (page, keyword) hit, including the full page text.
pub fn search_report(hits: &[SearchHit]) -> Result<Report, PortalError> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(SEARCH_COLUMNS)?;
    for hit in hits {
        wtr.write_record([
            hit.url.clone(),
            hit.page_number.to_string(),
            hit.keyword.clone(),
            hit.occurrence_count.to_string(),
            hit.page_text.clone(),
        ])?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| PortalError::Export(e.to_string()))?;
    write_report(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn doc(id: i64, file_url: &str) -> Document {
        Document {
            id,
            entity: "OEB".to_string(),
            link: "http://example.org/case".to_string(),
            case_number: "EB-2024-0001".to_string(),
            filename_description: "Decision and Order".to_string(),
            file_url: file_url.to_string(),
            document_type: "Decision".to_string(),
            issued_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            received_date: NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
            submitter: "UNKN".to_string(),
            applicant: "UNKN".to_string(),
            status: "Issued".to_string(),
        }
    }

    fn read_rows(report: Report) -> Vec<Vec<String>> {
        let bytes = report.into_bytes().unwrap();
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(bytes.as_slice());
        rdr.records()
            .map(|r| r.unwrap().iter().map(|f| f.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_metadata_report_row_count_and_column_order() {
        let docs = vec![doc(1, "http://a"), doc(2, "http://b"), doc(3, "http://c")];
        let rows = read_rows(metadata_report(&docs).unwrap());

        assert_eq!(rows.len(), docs.len() + 1);
        assert_eq!(rows[0], METADATA_COLUMNS.to_vec());
        assert_eq!(rows[1][0], "1");
        assert_eq!(rows[3][5], "http://c");
        assert_eq!(rows[1][7], "2024-03-01");
    }

    #[test]
    fn test_metadata_report_empty_set_is_header_only() {
        let rows = read_rows(metadata_report(&[]).unwrap());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0], METADATA_COLUMNS.to_vec());
    }

    #[test]
    fn test_search_report_rows() {
        let hits = vec![SearchHit {
            url: "http://a/doc.pdf".to_string(),
            page_number: 4,
            keyword: "rate".to_string(),
            occurrence_count: 3,
            page_text: "Rate rate RATE, with a \"quoted\" phrase".to_string(),
        }];
        let rows = read_rows(search_report(&hits).unwrap());

        assert_eq!(rows[0], SEARCH_COLUMNS.to_vec());
        assert_eq!(
            rows[1],
            vec![
                "http://a/doc.pdf",
                "4",
                "rate",
                "3",
                "Rate rate RATE, with a \"quoted\" phrase",
            ]
        );
    }

    #[test]
    fn test_reports_get_distinct_files() {
        let a = metadata_report(&[]).unwrap();
        let b = metadata_report(&[]).unwrap();
        assert_ne!(a.path(), b.path());
        assert_ne!(a.download_name(), b.download_name());
        assert!(a.download_name().starts_with("regdocs_report_"));
        assert!(a.download_name().ends_with(".csv"));
    }

    #[test]
    fn test_temp_file_removed_when_handle_drops() {
        let report = metadata_report(&[doc(1, "http://a")]).unwrap();
        let path = report.path().to_path_buf();
        assert!(path.exists());
        drop(report);
        assert!(!path.exists());
    }

    #[test]
    fn test_into_bytes_releases_temp_file() {
        let report = metadata_report(&[]).unwrap();
        let path = report.path().to_path_buf();
        let bytes = report.into_bytes().unwrap();
        assert!(!bytes.is_empty());
        assert!(!path.exists());
    }
}
