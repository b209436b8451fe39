//! One-shot batch ingest: merge the three flat-file extracts into
//! document rows.
//!
//! Core records are left-joined with the document-meta and document-status
//! extracts, validated row by row, and inserted in a single transaction.
//! Rows that fail validation (unknown entity code, unparseable date,
//! missing file URL) are rejected with a reason and reported, not silently
//! dropped; the accepted remainder still commits.

pub mod loader;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use sqlx::PgPool;

use crate::error::PortalError;
use self::loader::{field, left_join, read_extract, Row};

/// Fixed extract filenames within the load directory.
pub struct IngestPaths {
    pub core: PathBuf,
    pub meta: PathBuf,
    pub status: PathBuf,
}

impl IngestPaths {
    pub fn from_dir(dir: &Path) -> Self {
        Self {
            core: dir.join("oeb_data.csv"),
            meta: dir.join("entity_doc_meta.csv"),
            status: dir.join("entity_doc_status.csv"),
        }
    }
}

/// A row the batch refused, with the CSV line it came from.
#[derive(Debug, Clone)]
pub struct RejectedRow {
    pub line: usize,
    pub reason: String,
}

/// Outcome of an ingest run.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub inserted: usize,
    pub rejected: Vec<RejectedRow>,
}

/// A validated document row ready for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDocument {
    pub entity: String,
    pub link: String,
    pub case_number: String,
    pub filename_description: String,
    pub file_url: String,
    pub document_type: String,
    pub issued_date: NaiveDate,
    pub received_date: NaiveDate,
    pub submitter: String,
    pub applicant: String,
    pub status: String,
}

/// Sentinel entity for the submitter/applicant columns the extracts lack.
const UNKNOWN_ENTITY: &str = "UNKN";

/// Accepted date spellings in the extracts.
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

fn parse_extract_date(raw: &str) -> Option<NaiveDate> {
    // Some extract tools append a midnight time component.
    let raw = raw.split_whitespace().next().unwrap_or("");
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Validate one merged row against the known entity codes.
/// Errors name the offending column so the rejection report is actionable.
pub fn build_document_row(
    row: &Row,
    known_entities: &HashSet<String>,
) -> Result<NewDocument, String> {
    let entity = field(row, "Entity")
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or("missing entity code")?;
    if !known_entities.contains(entity) {
        return Err(format!("unknown entity code: {}", entity));
    }
    if !known_entities.contains(UNKNOWN_ENTITY) {
        return Err(format!("sentinel entity {} not seeded", UNKNOWN_ENTITY));
    }

    let file_url = field(row, "FileURL")
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or("missing file URL")?;

    let issued_raw = field(row, "IssuedByDate").unwrap_or("");
    let issued_date = parse_extract_date(issued_raw)
        .ok_or_else(|| format!("unparseable IssuedByDate: {:?}", issued_raw))?;
    let received_raw = field(row, "ReceivedByRegulator Date").unwrap_or("");
    let received_date = parse_extract_date(received_raw)
        .ok_or_else(|| format!("unparseable ReceivedByRegulator Date: {:?}", received_raw))?;

    Ok(NewDocument {
        entity: entity.to_string(),
        link: field(row, "Link").unwrap_or("").to_string(),
        case_number: field(row, "CaseNumber").unwrap_or("").to_string(),
        filename_description: field(row, "Description").unwrap_or("").to_string(),
        file_url: file_url.to_string(),
        document_type: field(row, "DocumentType").unwrap_or("").to_string(),
        issued_date,
        received_date,
        submitter: UNKNOWN_ENTITY.to_string(),
        applicant: UNKNOWN_ENTITY.to_string(),
        status: field(row, "Status").unwrap_or("").to_string(),
    })
}

/// Load, join, validate and insert the extracts. Accepted rows commit in
/// one transaction; the report lists every rejection with its source line.
pub async fn run(pool: &PgPool, paths: &IngestPaths) -> Result<IngestReport, PortalError> {
    let core = read_extract(&paths.core)?;
    let meta = read_extract(&paths.meta)?;
    let status = read_extract(&paths.status)?;
    tracing::info!(
        core = core.len(),
        meta = meta.len(),
        status = status.len(),
        "loaded ingest extracts"
    );

    let merged = left_join(core, &meta, "Id", "id")?;
    let merged = left_join(merged, &status, "id", "EntityDocumentsId")?;

    let known_entities: HashSet<String> =
        sqlx::query_scalar::<_, String>("SELECT entity FROM entities")
            .fetch_all(pool)
            .await?
            .into_iter()
            .collect();

    let mut report = IngestReport::default();
    let mut accepted = Vec::with_capacity(merged.len());
    for (idx, row) in merged.iter().enumerate() {
        // Header is line 1, first data row line 2.
        let line = idx + 2;
        match build_document_row(row, &known_entities) {
            Ok(doc) => accepted.push(doc),
            Err(reason) => {
                tracing::warn!(line, %reason, "rejecting extract row");
                report.rejected.push(RejectedRow { line, reason });
            }
        }
    }

    let mut tx = pool.begin().await?;
    for doc in &accepted {
        sqlx::query(
            "INSERT INTO documents (entity, link, case_number, filename_description,
                 file_url, document_type, issued_date, received_date,
                 submitter, applicant, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(&doc.entity)
        .bind(&doc.link)
        .bind(&doc.case_number)
        .bind(&doc.filename_description)
        .bind(&doc.file_url)
        .bind(&doc.document_type)
        .bind(doc.issued_date)
        .bind(doc.received_date)
        .bind(&doc.submitter)
        .bind(&doc.applicant)
        .bind(&doc.status)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    report.inserted = accepted.len();

    tracing::info!(
        inserted = report.inserted,
        rejected = report.rejected.len(),
        "ingest run completed"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known() -> HashSet<String> {
        ["OEB", "UNKN"].iter().map(|s| s.to_string()).collect()
    }

    fn merged_row() -> Row {
        [
            ("Id", "17"),
            ("Entity_x", "OEB"),
            ("Entity_y", "ONT"),
            ("Link", "http://example.org/case/17"),
            ("CaseNumber", "EB-2024-0017"),
            ("Description", "Rate application"),
            ("FileURL", "http://example.org/files/17.pdf"),
            ("DocumentType", "Application"),
            ("IssuedByDate", "2024-02-14"),
            ("ReceivedByRegulator Date", "2024-02-15 00:00:00"),
            ("Status", "Filed"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn test_build_document_row_happy_path() {
        let doc = build_document_row(&merged_row(), &known()).unwrap();
        assert_eq!(doc.entity, "OEB");
        assert_eq!(doc.case_number, "EB-2024-0017");
        assert_eq!(doc.issued_date, NaiveDate::from_ymd_opt(2024, 2, 14).unwrap());
        // Time component from the extract is dropped, not an error.
        assert_eq!(doc.received_date, NaiveDate::from_ymd_opt(2024, 2, 15).unwrap());
        assert_eq!(doc.submitter, "UNKN");
        assert_eq!(doc.applicant, "UNKN");
        assert_eq!(doc.status, "Filed");
    }

    #[test]
    fn test_build_document_row_rejects_unknown_entity() {
        let mut row = merged_row();
        row.insert("Entity_x".to_string(), "NOPE".to_string());
        let reason = build_document_row(&row, &known()).unwrap_err();
        assert!(reason.contains("NOPE"));
    }

    #[test]
    fn test_build_document_row_rejects_bad_date() {
        let mut row = merged_row();
        row.insert("IssuedByDate".to_string(), "tomorrow".to_string());
        let reason = build_document_row(&row, &known()).unwrap_err();
        assert!(reason.contains("IssuedByDate"));
    }

    #[test]
    fn test_build_document_row_rejects_missing_file_url() {
        let mut row = merged_row();
        row.insert("FileURL".to_string(), "  ".to_string());
        let reason = build_document_row(&row, &known()).unwrap_err();
        assert!(reason.contains("file URL"));
    }

    #[test]
    fn test_parse_extract_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 2, 14).unwrap();
        assert_eq!(parse_extract_date("2024-02-14"), Some(expected));
        assert_eq!(parse_extract_date("2024/02/14"), Some(expected));
        assert_eq!(parse_extract_date("02/14/2024"), Some(expected));
        assert_eq!(parse_extract_date("2024-02-14 00:00:00"), Some(expected));
        assert_eq!(parse_extract_date(""), None);
        assert_eq!(parse_extract_date("nan"), None);
    }

    #[test]
    fn test_ingest_paths_fixed_names() {
        let paths = IngestPaths::from_dir(Path::new("/srv/load"));
        assert_eq!(paths.core, Path::new("/srv/load/oeb_data.csv"));
        assert_eq!(paths.meta, Path::new("/srv/load/entity_doc_meta.csv"));
        assert_eq!(paths.status, Path::new("/srv/load/entity_doc_status.csv"));
    }
}
