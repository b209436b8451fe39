use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A regulatory filing. Created by ingest, read-mostly afterward.
/// The entity, submitter and applicant columns hold entity codes; the
/// reference tables behind them are schema-only.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Document {
    pub id: i64,
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

/// One page of extracted document text. Related to `Document` only through
/// `url == documents.file_url` (weak join, no FK); a document with no page
/// rows is a valid state. `search_vector` is maintained by a database
/// trigger and never written by the application.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PageText {
    pub id: i64,
    pub url: String,
    pub page_number: i32,
    pub page_text: String,
}

/// One keyword hit on one page. Ephemeral: produced per query, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub url: String,
    pub page_number: i32,
    pub keyword: String,
    pub occurrence_count: i64,
    pub page_text: String,
}

/// Paginated document listing
#[derive(Debug, Serialize)]
pub struct DocumentPage {
    pub documents: Vec<Document>,
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
}

/// Full detail view of one document
#[derive(Debug, Serialize)]
pub struct DocumentDetail {
    pub record: Document,
    /// Other filings under the same case number, newest issued first
    pub related_docs: Vec<Document>,
    /// Page texts joined via file URL; may be empty
    pub pages: Vec<PageText>,
    pub is_favorite: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FavoriteRequest {
    pub user_id: i64,
}

#[derive(Debug, Serialize)]
pub struct FavoriteResponse {
    pub is_favorite: bool,
    pub message: String,
}
