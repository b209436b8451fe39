use axum::{
    extract::{Query, State},
    response::Response,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use regdocs_backend::error::PortalError;
use regdocs_backend::models::SearchHit;
use regdocs_backend::report;
use regdocs_backend::search::{parse_keyword_list, DocumentSelector, SearchQuery, SearchService};

use super::{csv_attachment, ApiResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub entity: Option<String>,
    #[serde(default)]
    pub uose_docket: Option<String>,
    pub issued_date_from: NaiveDate,
    pub issued_date_to: NaiveDate,
    /// Pipe-delimited keyword list
    #[serde(default)]
    pub kw_list: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
    pub search_count: usize,
}

impl SearchParams {
    fn into_query(self) -> Result<SearchQuery, PortalError> {
        let selector =
            DocumentSelector::from_params(self.entity.as_deref(), self.uose_docket.as_deref())?;
        Ok(SearchQuery {
            selector,
            date_from: self.issued_date_from,
            date_to: self.issued_date_to,
            keywords: parse_keyword_list(&self.kw_list),
        })
    }
}

/// GET /api/search - keyword hits for an entity/docket + date window
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<ApiResponse<SearchResponse>>, PortalError> {
    let query = params.into_query()?;
    let service = SearchService::new(state.db.clone());
    let results = service.run(&query).await?;
    let search_count = results.len();
    Ok(Json(ApiResponse::success(SearchResponse {
        results,
        search_count,
    })))
}

/// GET /api/search/export - the same hits as a CSV attachment
pub async fn export_search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Response, PortalError> {
    let query = params.into_query()?;
    let service = SearchService::new(state.db.clone());
    let hits = service.run(&query).await?;

    let report = report::search_report(&hits)?;
    csv_attachment(report)
}
