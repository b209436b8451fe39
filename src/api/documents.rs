use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;

use regdocs_backend::error::PortalError;
use regdocs_backend::models::{
    Document, DocumentDetail, DocumentPage, FavoriteRequest, FavoriteResponse, PageText,
};
use regdocs_backend::report;
use regdocs_backend::search::{DocumentSelector, SearchService};

use super::{csv_attachment, ApiResponse};
use crate::state::AppState;

const PAGE_SIZE: i64 = 20;

#[derive(Debug, Deserialize)]
pub struct EntityListParams {
    pub entity: String,
    pub issued_date_from: NaiveDate,
    pub issued_date_to: NaiveDate,
    #[serde(default = "default_page")]
    pub page: i64,
}

#[derive(Debug, Deserialize)]
pub struct DocketListParams {
    pub uose_docket: String,
    pub issued_date_from: NaiveDate,
    pub issued_date_to: NaiveDate,
    #[serde(default = "default_page")]
    pub page: i64,
}

#[derive(Debug, Deserialize)]
pub struct ExportParams {
    #[serde(default)]
    pub entity: Option<String>,
    #[serde(default)]
    pub uose_docket: Option<String>,
    pub issued_date_from: NaiveDate,
    pub issued_date_to: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct DetailParams {
    #[serde(default)]
    pub user_id: Option<i64>,
}

fn default_page() -> i64 {
    1
}

async fn list_page(
    state: &AppState,
    selector: DocumentSelector,
    date_from: NaiveDate,
    date_to: NaiveDate,
    page: i64,
) -> Result<DocumentPage, PortalError> {
    let page = page.max(1);
    let offset = (page - 1) * PAGE_SIZE;

    let (count_sql, page_sql) = match &selector {
        DocumentSelector::Entity(_) => (
            "SELECT COUNT(*) FROM documents
             WHERE entity = $1 AND issued_date >= $2 AND issued_date <= $3",
            "SELECT id, entity, link, case_number, filename_description, file_url,
                    document_type, issued_date, received_date, submitter, applicant, status
             FROM documents
             WHERE entity = $1 AND issued_date >= $2 AND issued_date <= $3
             ORDER BY id LIMIT $4 OFFSET $5",
        ),
        DocumentSelector::Docket(_) => (
            "SELECT COUNT(*) FROM documents
             WHERE case_number = $1 AND issued_date >= $2 AND issued_date <= $3",
            // Docket listings read newest first.
            "SELECT id, entity, link, case_number, filename_description, file_url,
                    document_type, issued_date, received_date, submitter, applicant, status
             FROM documents
             WHERE case_number = $1 AND issued_date >= $2 AND issued_date <= $3
             ORDER BY issued_date DESC, id LIMIT $4 OFFSET $5",
        ),
    };
    let key = match &selector {
        DocumentSelector::Entity(code) => code.clone(),
        DocumentSelector::Docket(docket) => docket.clone(),
    };

    let total: i64 = sqlx::query_scalar(count_sql)
        .bind(&key)
        .bind(date_from)
        .bind(date_to)
        .fetch_one(&state.db)
        .await?;

    let documents = sqlx::query_as::<_, Document>(page_sql)
        .bind(&key)
        .bind(date_from)
        .bind(date_to)
        .bind(PAGE_SIZE)
        .bind(offset)
        .fetch_all(&state.db)
        .await?;

    Ok(DocumentPage {
        documents,
        page,
        page_size: PAGE_SIZE,
        total,
    })
}

/// GET /api/documents - paginated listing for one entity
pub async fn list_documents(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EntityListParams>,
) -> Result<Json<ApiResponse<DocumentPage>>, PortalError> {
    let selector = DocumentSelector::from_params(Some(params.entity.as_str()), None)?;
    let page = list_page(
        &state,
        selector,
        params.issued_date_from,
        params.issued_date_to,
        params.page,
    )
    .await?;
    Ok(Json(ApiResponse::success(page)))
}

/// GET /api/dockets - paginated listing for one docket, newest issued first
pub async fn list_docket_documents(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DocketListParams>,
) -> Result<Json<ApiResponse<DocumentPage>>, PortalError> {
    let selector = DocumentSelector::from_params(None, Some(params.uose_docket.as_str()))?;
    let page = list_page(
        &state,
        selector,
        params.issued_date_from,
        params.issued_date_to,
        params.page,
    )
    .await?;
    Ok(Json(ApiResponse::success(page)))
}

/// GET /api/documents/:id - one document with its related filings,
/// page text and favorite flag
pub async fn document_detail(
    State(state): State<Arc<AppState>>,
    Path(doc_id): Path<i64>,
    Query(params): Query<DetailParams>,
) -> Result<Json<ApiResponse<DocumentDetail>>, PortalError> {
    let record = sqlx::query_as::<_, Document>(
        "SELECT id, entity, link, case_number, filename_description, file_url,
                document_type, issued_date, received_date, submitter, applicant, status
         FROM documents WHERE id = $1",
    )
    .bind(doc_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or(PortalError::NotFound(doc_id))?;

    let related_docs = sqlx::query_as::<_, Document>(
        "SELECT id, entity, link, case_number, filename_description, file_url,
                document_type, issued_date, received_date, submitter, applicant, status
         FROM documents
         WHERE case_number = $1 AND id <> $2
         ORDER BY issued_date DESC, id",
    )
    .bind(&record.case_number)
    .bind(doc_id)
    .fetch_all(&state.db)
    .await?;

    // Weak join on the file URL; no page rows is a valid state.
    let pages = sqlx::query_as::<_, PageText>(
        "SELECT id, url, page_number, page_text FROM page_texts
         WHERE url = $1 ORDER BY page_number",
    )
    .bind(record.file_url.trim())
    .fetch_all(&state.db)
    .await?;

    let is_favorite = match params.user_id {
        Some(user_id) => {
            sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM user_favorite_documents
                 WHERE user_id = $1 AND document_id = $2",
            )
            .bind(user_id)
            .bind(doc_id)
            .fetch_one(&state.db)
            .await?
                > 0
        }
        None => false,
    };

    Ok(Json(ApiResponse::success(DocumentDetail {
        record,
        related_docs,
        pages,
        is_favorite,
    })))
}

/// POST /api/documents/:id/favorite - toggle a favorite for a user.
/// Database failures on the write are reported in the envelope, never
/// propagated as a crash.
pub async fn toggle_favorite(
    State(state): State<Arc<AppState>>,
    Path(doc_id): Path<i64>,
    Json(req): Json<FavoriteRequest>,
) -> Result<Json<ApiResponse<FavoriteResponse>>, PortalError> {
    let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE id = $1")
        .bind(doc_id)
        .fetch_one(&state.db)
        .await?;
    if exists == 0 {
        return Err(PortalError::NotFound(doc_id));
    }

    let favorite_id: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM user_favorite_documents WHERE user_id = $1 AND document_id = $2",
    )
    .bind(req.user_id)
    .bind(doc_id)
    .fetch_optional(&state.db)
    .await?;

    let result = match favorite_id {
        Some(id) => sqlx::query("DELETE FROM user_favorite_documents WHERE id = $1")
            .bind(id)
            .execute(&state.db)
            .await
            .map(|_| FavoriteResponse {
                is_favorite: false,
                message: format!("Document {} removed from favorites", doc_id),
            }),
        None => sqlx::query(
            "INSERT INTO user_favorite_documents (user_id, document_id) VALUES ($1, $2)",
        )
        .bind(req.user_id)
        .bind(doc_id)
        .execute(&state.db)
        .await
        .map(|_| FavoriteResponse {
            is_favorite: true,
            message: format!("Document {} added to favorites", doc_id),
        }),
    };

    match result {
        Ok(response) => Ok(Json(ApiResponse::success(response))),
        Err(e) => {
            tracing::warn!("favorite toggle failed for document {}: {}", doc_id, e);
            Ok(Json(ApiResponse::error(&format!(
                "Error updating favorite: {}",
                e
            ))))
        }
    }
}

/// GET /api/documents/export - metadata CSV for an entity or docket filter
pub async fn export_documents(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ExportParams>,
) -> Result<Response, PortalError> {
    let selector =
        DocumentSelector::from_params(params.entity.as_deref(), params.uose_docket.as_deref())?;

    let service = SearchService::new(state.db.clone());
    let documents = service
        .find_documents(&selector, params.issued_date_from, params.issued_date_to)
        .await?;

    let report = report::metadata_report(&documents)?;
    csv_attachment(report)
}
