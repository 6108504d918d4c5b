//! HTTP handler functions for the address map API.

use actix_web::error::{InternalError, JsonPayloadError, QueryPayloadError};
use actix_web::{HttpRequest, HttpResponse, web};
use address_map_address_models::AddressField;
use address_map_analysis_models::{
    AnalysisParams, DEFAULT_BIN_WIDTH_KM, DEFAULT_DISTANCE_THRESHOLD_KM,
    DEFAULT_REFERENCE_ADDRESS,
};
use address_map_database::{lock, queries};
use address_map_ingest::IngestError;
use address_map_server_models::{
    AnalysisQueryParams, ApiAnalysis, ApiError, ApiHealth, ApiQuery, SubmitAddressRequest,
    points_collection,
};

use crate::AppState;

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/queries`
///
/// Lists stored entries with their parsed components, newest first.
pub async fn list_queries(state: web::Data<AppState>) -> HttpResponse {
    let result = lock(&state.db).and_then(|conn| queries::list_query_details(&conn));

    match result {
        Ok(details) => {
            let entries: Vec<ApiQuery> = details.into_iter().map(ApiQuery::from).collect();
            HttpResponse::Ok().json(entries)
        }
        Err(e) => {
            log::error!("Failed to list queries: {e}");
            HttpResponse::InternalServerError().json(ApiError::new("Failed to list queries"))
        }
    }
}

/// `POST /api/queries`
///
/// Stores, geocodes and parses a free-text address.
#[allow(clippy::future_not_send)]
pub async fn submit_query(
    state: web::Data<AppState>,
    body: web::Json<SubmitAddressRequest>,
) -> HttpResponse {
    let result = address_map_ingest::submit_address(
        &state.db,
        state.geocoder.as_ref(),
        state.parser.as_ref(),
        &body.address,
    )
    .await;

    match result {
        Ok(detail) => HttpResponse::Created().json(ApiQuery::from(detail)),
        Err(IngestError::EmptyAddress) => {
            HttpResponse::BadRequest().json(ApiError::new("Address must not be empty"))
        }
        Err(e) => {
            log::error!("Failed to submit address: {e}");
            HttpResponse::InternalServerError().json(ApiError::new("Failed to submit address"))
        }
    }
}

/// `DELETE /api/queries/{id}`
pub async fn delete_query(state: web::Data<AppState>, path: web::Path<i64>) -> HttpResponse {
    let id = path.into_inner();
    let result = lock(&state.db).and_then(|conn| queries::delete_query(&conn, id));

    match result {
        Ok(true) => HttpResponse::NoContent().finish(),
        Ok(false) => HttpResponse::NotFound().json(ApiError::new(format!("No entry with ID {id}"))),
        Err(e) => {
            log::error!("Failed to delete query {id}: {e}");
            HttpResponse::InternalServerError().json(ApiError::new("Failed to delete entry"))
        }
    }
}

/// `GET /api/points`
///
/// Returns entries that are both geocoded and parsed as a `GeoJSON`
/// `FeatureCollection`.
pub async fn points(state: web::Data<AppState>) -> HttpResponse {
    let result = lock(&state.db).and_then(|conn| queries::list_queries(&conn));

    match result {
        Ok(rows) => {
            HttpResponse::Ok().json(points_collection(rows.iter().filter(|row| row.processed)))
        }
        Err(e) => {
            log::error!("Failed to load points: {e}");
            HttpResponse::InternalServerError().json(ApiError::new("Failed to load points"))
        }
    }
}

/// `GET /api/analysis`
///
/// Runs the field frequency and distance analysis over every stored entry.
#[allow(clippy::future_not_send)]
pub async fn analysis(
    state: web::Data<AppState>,
    params: web::Query<AnalysisQueryParams>,
) -> HttpResponse {
    let params = params.into_inner();

    let fields = match params.fields.as_deref().map(parse_fields) {
        Some(Ok(fields)) if !fields.is_empty() => fields,
        Some(Err(message)) => return HttpResponse::BadRequest().json(ApiError::new(message)),
        _ => AddressField::ANALYZED.to_vec(),
    };

    let reference_address = params
        .reference_address
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .unwrap_or_else(|| DEFAULT_REFERENCE_ADDRESS.to_string());

    let analysis_params = AnalysisParams {
        threshold_km: params
            .distance_threshold
            .unwrap_or(DEFAULT_DISTANCE_THRESHOLD_KM),
        bin_width_km: params.bin_width.unwrap_or(DEFAULT_BIN_WIDTH_KM),
        fields,
    };

    let result = address_map_ingest::analyze_stored(
        &state.db,
        state.geocoder.as_ref(),
        &reference_address,
        &analysis_params,
    )
    .await;

    match result {
        Ok(report) => HttpResponse::Ok().json(ApiAnalysis {
            report,
            reference_address,
            bin_width: analysis_params.bin_width_km,
            fields: analysis_params.fields,
            fields_available: AddressField::ALL.to_vec(),
            default_field: AddressField::DEFAULT_CHART,
        }),
        Err(IngestError::Analysis(e)) => HttpResponse::BadRequest().json(ApiError::new(e.to_string())),
        Err(e) => {
            log::error!("Failed to run analysis: {e}");
            HttpResponse::InternalServerError().json(ApiError::new("Failed to run analysis"))
        }
    }
}

/// Turns a malformed query string into a JSON `400`.
pub fn bad_query(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let body = ApiError::new(format!("Invalid query parameters: {err}"));
    InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
}

/// Turns a malformed JSON body into a JSON `400`.
pub fn bad_json(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let body = ApiError::new(format!("Invalid request body: {err}"));
    InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
}

/// Parses a comma-separated field list, ignoring blank entries.
fn parse_fields(s: &str) -> Result<Vec<AddressField>, String> {
    s.split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(|f| {
            f.parse::<AddressField>()
                .map_err(|_| format!("Unknown address field: {f:?}"))
        })
        .collect()
}
