use chrono::NaiveDate;
use sqlx::PgPool;

use super::{expand_hits, parse_entity_param};
use crate::error::PortalError;
use crate::models::{Document, PageText, SearchHit};

/// Which column the candidate document filter keys on.
/// Entity code and docket number are mutually exclusive selectors.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentSelector {
    Entity(String),
    Docket(String),
}

impl DocumentSelector {
    /// Build a selector from the raw form parameters. The entity value
    /// arrives as `code|label`; the docket is taken as-is.
    pub fn from_params(
        entity: Option<&str>,
        docket: Option<&str>,
    ) -> Result<Self, PortalError> {
        if let Some(code) = entity.and_then(parse_entity_param) {
            return Ok(DocumentSelector::Entity(code));
        }
        if let Some(docket) = docket.map(str::trim).filter(|d| !d.is_empty()) {
            return Ok(DocumentSelector::Docket(docket.to_string()));
        }
        Err(PortalError::InvalidQuery)
    }
}

/// A full search request: selector, date window, ordered keyword list.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub selector: DocumentSelector,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub keywords: Vec<String>,
}

/// Runs keyword searches against the page-text index, restricted to the
/// documents matched by an entity/docket + date-window filter.
pub struct SearchService {
    pool: PgPool,
}

impl SearchService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Candidate documents for a selector and date window.
    /// Docket listings are viewed newest first, entity listings in id order.
    pub async fn find_documents(
        &self,
        selector: &DocumentSelector,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<Vec<Document>, PortalError> {
        let documents = match selector {
            DocumentSelector::Entity(code) => {
                sqlx::query_as::<_, Document>(
                    "SELECT id, entity, link, case_number, filename_description, file_url,
                            document_type, issued_date, received_date, submitter, applicant, status
                     FROM documents
                     WHERE entity = $1 AND issued_date >= $2 AND issued_date <= $3
                     ORDER BY id",
                )
                .bind(code)
                .bind(date_from)
                .bind(date_to)
                .fetch_all(&self.pool)
                .await?
            }
            DocumentSelector::Docket(docket) => {
                sqlx::query_as::<_, Document>(
                    "SELECT id, entity, link, case_number, filename_description, file_url,
                            document_type, issued_date, received_date, submitter, applicant, status
                     FROM documents
                     WHERE case_number = $1 AND issued_date >= $2 AND issued_date <= $3
                     ORDER BY issued_date DESC, id",
                )
                .bind(docket)
                .bind(date_from)
                .bind(date_to)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(documents)
    }

    /// The URL universe the text search is restricted to: distinct file
    /// URLs of the candidate documents. Out-of-window documents never
    /// contribute a URL, even when they share one with an in-range row.
    async fn candidate_urls(
        &self,
        selector: &DocumentSelector,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<Vec<String>, PortalError> {
        let urls = match selector {
            DocumentSelector::Entity(code) => {
                sqlx::query_scalar::<_, String>(
                    "SELECT DISTINCT file_url FROM documents
                     WHERE entity = $1 AND issued_date >= $2 AND issued_date <= $3",
                )
                .bind(code)
                .bind(date_from)
                .bind(date_to)
                .fetch_all(&self.pool)
                .await?
            }
            DocumentSelector::Docket(docket) => {
                sqlx::query_scalar::<_, String>(
                    "SELECT DISTINCT file_url FROM documents
                     WHERE case_number = $1 AND issued_date >= $2 AND issued_date <= $3",
                )
                .bind(docket)
                .bind(date_from)
                .bind(date_to)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(urls)
    }

    /// Run the full search: one phrase query per non-blank keyword against
    /// the URL universe, then expand the matched pages into the
    /// hits × keywords cross product in encounter order.
    pub async fn run(&self, query: &SearchQuery) -> Result<Vec<SearchHit>, PortalError> {
        let urls = self
            .candidate_urls(&query.selector, query.date_from, query.date_to)
            .await?;
        tracing::debug!(
            universe = urls.len(),
            keywords = query.keywords.len(),
            "running keyword search"
        );

        let mut matched: Vec<PageText> = Vec::new();
        for kw in &query.keywords {
            if kw.trim().is_empty() {
                continue;
            }
            // Phrase match: all tokens of the keyword, contiguous and in
            // order. An empty universe still runs and matches nothing.
            let pages = sqlx::query_as::<_, PageText>(
                "SELECT id, url, page_number, page_text FROM page_texts
                 WHERE url = ANY($1)
                   AND search_vector @@ phraseto_tsquery('pg_catalog.english', $2)
                 ORDER BY id",
            )
            .bind(&urls)
            .bind(kw)
            .fetch_all(&self.pool)
            .await?;
            matched.extend(pages);
        }

        Ok(expand_hits(&matched, &query.keywords))
    }
}
