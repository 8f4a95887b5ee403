//! Report endpoints.

use std::time::Duration;

use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    middleware::from_fn_with_state,
    routing::{delete, get, patch, post},
};
use tower_http::timeout::TimeoutLayer;
use civicwatch_common::{AppError, AppResult, IdGenerator, generate_storage_key};
use civicwatch_core::{CreateReportInput, Page, QueryService};
use civicwatch_db::entities::{
    report,
    report::{Category, MediaAttachment, MediaType, Severity},
    report_history,
};
use serde::{Deserialize, Serialize};

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    rate_limit::{RateLimiterState, rate_limit_write_middleware},
    response::ApiResponse,
};

use super::RouterConfig;

/// Public view of a report.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: &'static str,
    pub severity: &'static str,
    pub status: &'static str,
    pub latitude: f64,
    pub longitude: f64,
    pub location_name: String,
    pub media: Vec<MediaAttachment>,
    pub user_id: String,
    pub upvote_count: i32,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_m: Option<f64>,
}

impl From<&report::Model> for ReportResponse {
    fn from(model: &report::Model) -> Self {
        Self {
            id: model.id.clone(),
            title: model.title.clone(),
            description: model.description.clone(),
            category: model.category.as_str(),
            severity: model.severity.as_str(),
            status: model.status.as_str(),
            latitude: model.latitude,
            longitude: model.longitude,
            location_name: model.location_name.clone(),
            media: model.attachments(),
            user_id: model.user_id.clone(),
            upvote_count: model.upvote_count,
            created_at: model.created_at.to_rfc3339(),
            updated_at: model.updated_at.map(|t| t.to_rfc3339()),
            distance_m: None,
        }
    }
}

/// One entry of a report's status history.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntryResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub updated_by: String,
    pub created_at: String,
}

impl From<&report_history::Model> for HistoryEntryResponse {
    fn from(model: &report_history::Model) -> Self {
        Self {
            status: model.status.as_str(),
            notes: model.notes.clone(),
            updated_by: model.updated_by.clone(),
            created_at: model.created_at.to_rfc3339(),
        }
    }
}

/// Report detail: the report plus its full history.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDetailResponse {
    #[serde(flatten)]
    pub report: ReportResponse,
    pub history: Vec<HistoryEntryResponse>,
}

/// A page of reports.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPageResponse {
    pub reports: Vec<ReportResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Page-number pagination parameters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageParams {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl PageParams {
    /// Resolve to (limit, offset, page).
    fn resolve(&self) -> (u64, u64, u64) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = QueryService::clamp_limit(self.per_page);
        (limit, QueryService::page_offset(page, limit), page)
    }
}

fn page_response(page: Page<report::Model>, page_no: u64) -> ReportPageResponse {
    ReportPageResponse {
        reports: page.items.iter().map(ReportResponse::from).collect(),
        total: page.total,
        page: page_no,
        per_page: page.limit,
    }
}

/// Create a report from a multipart form: text fields plus media files.
async fn create_report(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<ApiResponse<ReportResponse>> {
    let mut title = None;
    let mut description = None;
    let mut category = None;
    let mut severity = None;
    let mut lat = None;
    let mut lng = None;
    let mut location_name = None;
    let mut media: Vec<MediaAttachment> = Vec::new();

    let id_gen = IdGenerator::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "title" => title = Some(text_field(field).await?),
            "description" => description = Some(text_field(field).await?),
            "category" => {
                let text = text_field(field).await?;
                category = Some(
                    Category::parse(&text)
                        .ok_or_else(|| AppError::Validation(format!("Unknown category: {text}")))?,
                );
            }
            "severity" => {
                let text = text_field(field).await?;
                severity = Some(
                    Severity::parse(&text)
                        .ok_or_else(|| AppError::Validation(format!("Unknown severity: {text}")))?,
                );
            }
            "lat" => lat = Some(float_field(field, "lat").await?),
            "lng" => lng = Some(float_field(field, "lng").await?),
            "locationName" => location_name = Some(text_field(field).await?),
            "media" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .map(ToString::to_string)
                    .unwrap_or_default();
                let media_type = MediaType::from_content_type(&content_type).ok_or_else(|| {
                    AppError::Validation(format!("Unsupported media type: {content_type}"))
                })?;

                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                if data.len() as u64 > state.max_upload_bytes {
                    return Err(AppError::Validation(format!(
                        "File exceeds the {} byte upload limit",
                        state.max_upload_bytes
                    )));
                }

                let key = generate_storage_key(&id_gen.generate(), &file_name);
                let uploaded = state.media_store.upload(&key, &data, &content_type).await?;
                media.push(MediaAttachment {
                    media_type,
                    url: uploaded.url,
                });
            }
            _ => {}
        }
    }

    let input = CreateReportInput {
        title: title.ok_or_else(|| AppError::Validation("Missing field: title".to_string()))?,
        description: description
            .ok_or_else(|| AppError::Validation("Missing field: description".to_string()))?,
        category: category
            .ok_or_else(|| AppError::Validation("Missing field: category".to_string()))?,
        severity: severity
            .ok_or_else(|| AppError::Validation("Missing field: severity".to_string()))?,
        latitude: lat.ok_or_else(|| AppError::Validation("Missing field: lat".to_string()))?,
        longitude: lng.ok_or_else(|| AppError::Validation("Missing field: lng".to_string()))?,
        location_name: location_name
            .ok_or_else(|| AppError::Validation("Missing field: locationName".to_string()))?,
        media,
    };

    let created = state.report_service.create(&user, input).await?;
    Ok(ApiResponse::created(ReportResponse::from(&created)).with_message("Report created"))
}

async fn text_field(field: axum::extract::multipart::Field<'_>) -> AppResult<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))
}

async fn float_field(field: axum::extract::multipart::Field<'_>, name: &str) -> AppResult<f64> {
    let text = text_field(field).await?;
    text.trim()
        .parse::<f64>()
        .map_err(|_| AppError::Validation(format!("Invalid number for {name}: {text}")))
}

/// List the authenticated user's reports.
async fn my_reports(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> AppResult<ApiResponse<ReportPageResponse>> {
    let (limit, offset, page_no) = params.resolve();
    let page = state.query_service.list_owned(&user, limit, offset).await?;
    Ok(ApiResponse::ok(page_response(page, page_no)))
}

/// Nearby query parameters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyParams {
    pub lat: f64,
    pub lng: f64,
    /// Search radius in meters.
    pub radius: f64,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

/// List reports near a point, nearest first.
async fn nearby_reports(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Query(params): Query<NearbyParams>,
) -> AppResult<ApiResponse<ReportPageResponse>> {
    let page_no = params.page.unwrap_or(1).max(1);
    let limit = QueryService::clamp_limit(params.per_page);
    let offset = QueryService::page_offset(page_no, limit);

    let page = state
        .query_service
        .list_nearby(params.lat, params.lng, params.radius, limit, offset)
        .await?;

    let reports = page
        .items
        .iter()
        .map(|item| {
            let mut resp = ReportResponse::from(&item.report);
            resp.distance_m = Some(item.distance_m);
            resp
        })
        .collect();

    Ok(ApiResponse::ok(ReportPageResponse {
        reports,
        total: page.total,
        page: page_no,
        per_page: page.limit,
    }))
}

/// Get one report with its status history.
async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<ReportDetailResponse>> {
    let (report, history) = state.report_service.get(&id).await?;

    Ok(ApiResponse::ok(ReportDetailResponse {
        report: ReportResponse::from(&report),
        history: history.iter().map(HistoryEntryResponse::from).collect(),
    }))
}

/// Upvote toggle response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpvoteResponse {
    pub upvoted: bool,
    pub upvote_count: i32,
}

/// Toggle the authenticated user's upvote on a report.
async fn toggle_upvote(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<UpvoteResponse>> {
    let outcome = state.report_service.toggle_upvote(&user, &id).await?;

    Ok(ApiResponse::ok(UpvoteResponse {
        upvoted: outcome.upvoted,
        upvote_count: outcome.report.upvote_count,
    }))
}

/// Delete a report (owner or admin).
async fn delete_report(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.report_service.delete(&user, &id).await?;
    Ok(ApiResponse::message("Report deleted"))
}

pub fn router(limiter: RateLimiterState, cfg: &RouterConfig) -> Router<AppState> {
    // Media uploads get a longer timeout and a raised body cap.
    let uploads = Router::new()
        .route("/", post(create_report))
        .route_layer(from_fn_with_state(
            limiter.clone(),
            rate_limit_write_middleware,
        ))
        .layer(TimeoutLayer::new(Duration::from_secs(cfg.upload_timeout_secs)))
        .layer(DefaultBodyLimit::max(cfg.max_body_bytes));

    let writes = Router::new()
        .route("/{id}", delete(delete_report))
        .route("/{id}/upvote", patch(toggle_upvote))
        .route_layer(from_fn_with_state(limiter, rate_limit_write_middleware));

    let reads = Router::new()
        .route("/mine", get(my_reports))
        .route("/nearby", get(nearby_reports))
        .route("/{id}", get(get_report));

    let standard = writes
        .merge(reads)
        .layer(TimeoutLayer::new(Duration::from_secs(
            cfg.request_timeout_secs,
        )));

    uploads.merge(standard)
}
