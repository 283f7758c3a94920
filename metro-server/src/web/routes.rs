//! HTTP route handlers.
//!
//! Handlers are thin: they parse identifiers, take the write lock for
//! mutations and hand over to the network managers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::domain::{
    DomainError, LineId, MetroLine, Station, StationId, Suspension, SuspensionId, Trip,
    parse_clock_time,
};
use crate::network::{
    LineDetails, LineManager, LinePatch, LineSummary, NetworkError, NewLine, NewStation,
    NewSuspension, StationDirectory, StationPatch, SuspensionDetails, SuspensionManager,
    SuspensionRequest, Timetable, all_line_details, line_details, line_summaries,
};
use crate::store::{MemoryStore, StoreError};

use super::dto::*;
use super::state::AppState;

type ApiResult<T> = Result<Json<T>, AppError>;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/stations", get(list_stations).post(create_station))
        .route("/api/stations/search", get(search_stations))
        .route("/api/stations/marker/:marker", get(stations_by_marker))
        .route(
            "/api/stations/:id",
            get(get_station).put(update_station).delete(delete_station),
        )
        .route("/api/stations/:id/lines", get(lines_for_station))
        .route("/api/stations/:id/suspensions", get(suspensions_for_station))
        .route("/api/lines", get(list_lines).post(create_line))
        .route("/api/lines/summaries", get(summaries))
        .route("/api/lines/details", get(all_details))
        .route("/api/lines/regenerate", post(regenerate_all))
        .route("/api/lines/trips", delete(clear_all_trips))
        .route(
            "/api/lines/:id",
            get(get_line).put(update_line).delete(delete_line),
        )
        .route("/api/lines/:id/active", put(set_line_active))
        .route("/api/lines/:id/details", get(details))
        .route("/api/lines/:id/stations", get(stations_for_line).post(add_station))
        .route("/api/lines/:id/stations/insert", post(insert_station))
        .route(
            "/api/lines/:id/stations/:station",
            get(station_on_line).delete(remove_station),
        )
        .route("/api/lines/:id/stations/:station/trips", get(station_trips))
        .route("/api/lines/:id/trips", get(line_trips))
        .route(
            "/api/lines/:id/suspensions",
            get(line_suspensions)
                .post(suspend_line)
                .delete(delete_line_suspensions),
        )
        .route("/api/lines/:id/reconcile", post(reconcile_line))
        .route("/api/trips", get(all_trips))
        .route("/api/trips/search", get(search_trips))
        .route("/api/suspensions", get(list_suspensions).post(create_suspension))
        .route("/api/suspensions/reconcile", post(reconcile_all))
        .route(
            "/api/suspensions/:id",
            get(get_suspension).delete(delete_suspension),
        )
        .route("/api/suspensions/:id/resolve", post(resolve_suspension))
        .route("/api/suspensions/:id/extend", post(extend_suspension))
        .route("/api/suspensions/:id/details", put(update_suspension_details))
        .route("/api/suspensions/:id/stations", post(add_suspension_stations))
        .route(
            "/api/suspensions/:id/stations/:station",
            delete(remove_suspension_station),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

fn stations(state: &AppState) -> StationDirectory<'_, MemoryStore> {
    StationDirectory::new(state.store.as_ref())
}

fn lines(state: &AppState) -> LineManager<'_, MemoryStore> {
    LineManager::new(state.store.as_ref(), state.config.as_ref())
}

fn timetable(state: &AppState) -> Timetable<'_, MemoryStore> {
    Timetable::new(state.store.as_ref(), state.config.as_ref())
}

fn suspensions(state: &AppState) -> SuspensionManager<'_, MemoryStore> {
    SuspensionManager::new(state.store.as_ref())
}

fn line_id(raw: &str) -> Result<LineId, AppError> {
    Ok(LineId::parse(raw).map_err(DomainError::from)?)
}

fn station_id(raw: &str) -> Result<StationId, AppError> {
    Ok(StationId::parse(raw).map_err(DomainError::from)?)
}

// Stations

async fn list_stations(State(state): State<AppState>) -> ApiResult<Vec<Station>> {
    Ok(Json(stations(&state).list_stations()?))
}

async fn create_station(
    State(state): State<AppState>,
    Json(req): Json<NewStation>,
) -> Result<(StatusCode, Json<Station>), AppError> {
    let _guard = state.write_lock().await;
    let station = stations(&state).create_station(req)?;
    state.persist();
    Ok((StatusCode::CREATED, Json(station)))
}

async fn search_stations(
    State(state): State<AppState>,
    Query(query): Query<StationSearchQuery>,
) -> ApiResult<Vec<Station>> {
    Ok(Json(stations(&state).search_stations(&query.q)?))
}

async fn stations_by_marker(
    State(state): State<AppState>,
    Path(marker): Path<String>,
) -> ApiResult<Vec<Station>> {
    Ok(Json(stations(&state).stations_by_marker(&marker)?))
}

async fn get_station(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Station> {
    Ok(Json(stations(&state).get_station(&station_id(&id)?)?))
}

async fn update_station(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<StationPatch>,
) -> ApiResult<Station> {
    let id = station_id(&id)?;
    let _guard = state.write_lock().await;
    let station = stations(&state).update_station(&id, patch)?;
    state.persist();
    Ok(Json(station))
}

async fn delete_station(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = station_id(&id)?;
    let _guard = state.write_lock().await;
    stations(&state).delete_station(&id)?;
    state.persist();
    Ok(StatusCode::NO_CONTENT)
}

async fn lines_for_station(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<MetroLine>> {
    Ok(Json(stations(&state).lines_for_station(&station_id(&id)?)?))
}

async fn suspensions_for_station(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<Suspension>> {
    Ok(Json(suspensions(&state).suspensions_by_station(&station_id(&id)?)?))
}

// Lines

async fn list_lines(
    State(state): State<AppState>,
    Query(query): Query<ActiveQuery>,
) -> ApiResult<Vec<MetroLine>> {
    let manager = lines(&state);
    let found = match query.active {
        Some(active) => manager.lines_by_active(active)?,
        None => manager.list_lines()?,
    };
    Ok(Json(found))
}

async fn create_line(
    State(state): State<AppState>,
    Json(req): Json<NewLine>,
) -> Result<(StatusCode, Json<MetroLine>), AppError> {
    let _guard = state.write_lock().await;
    let line = lines(&state).create_line(req)?;
    state.persist();
    Ok((StatusCode::CREATED, Json(line)))
}

async fn summaries(State(state): State<AppState>) -> ApiResult<Vec<LineSummary>> {
    Ok(Json(line_summaries(state.store.as_ref())?))
}

async fn all_details(State(state): State<AppState>) -> ApiResult<Vec<LineDetails>> {
    Ok(Json(all_line_details(state.store.as_ref())?))
}

async fn regenerate_all(
    State(state): State<AppState>,
    body: Option<Json<RegenerateRequest>>,
) -> ApiResult<CountResponse> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let last = match req.last_departure.as_deref() {
        Some(text) => parse_clock_time(text)?,
        None => state.config.last_departure,
    };
    let _guard = state.write_lock().await;
    let count = timetable(&state).regenerate_all(last)?;
    Ok(Json(CountResponse { count }))
}

async fn clear_all_trips(State(state): State<AppState>) -> ApiResult<CountResponse> {
    let _guard = state.write_lock().await;
    let count = timetable(&state).clear_all_trips()?;
    Ok(Json(CountResponse { count }))
}

async fn get_line(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<MetroLine> {
    Ok(Json(lines(&state).get_line(&line_id(&id)?)?))
}

async fn update_line(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<LinePatch>,
) -> ApiResult<MetroLine> {
    let id = line_id(&id)?;
    let _guard = state.write_lock().await;
    let line = lines(&state).update_line(&id, patch)?;
    state.persist();
    Ok(Json(line))
}

async fn delete_line(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = line_id(&id)?;
    let _guard = state.write_lock().await;
    lines(&state).delete_line(&id)?;
    state.persist();
    Ok(StatusCode::NO_CONTENT)
}

async fn set_line_active(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SetActiveRequest>,
) -> ApiResult<MetroLine> {
    let id = line_id(&id)?;
    let _guard = state.write_lock().await;
    let line = lines(&state).set_line_active(&id, req.is_active)?;
    state.persist();
    Ok(Json(line))
}

async fn details(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<LineDetails> {
    Ok(Json(line_details(state.store.as_ref(), &line_id(&id)?)?))
}

async fn stations_for_line(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<Station>> {
    Ok(Json(lines(&state).stations_for_line(&line_id(&id)?)?))
}

async fn add_station(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<StationRequest>,
) -> ApiResult<MetroLine> {
    let id = line_id(&id)?;
    let _guard = state.write_lock().await;
    let line = lines(&state).add_station(&id, &req.station_id)?;
    state.persist();
    Ok(Json(line))
}

async fn insert_station(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<InsertStationRequest>,
) -> ApiResult<MetroLine> {
    let id = line_id(&id)?;
    let _guard = state.write_lock().await;
    let line = lines(&state).insert_station_at(&id, &req.station_id, req.position)?;
    state.persist();
    Ok(Json(line))
}

async fn station_on_line(
    State(state): State<AppState>,
    Path((id, station)): Path<(String, String)>,
) -> ApiResult<Station> {
    Ok(Json(lines(&state).station_on_line(&line_id(&id)?, &station_id(&station)?)?))
}

async fn remove_station(
    State(state): State<AppState>,
    Path((id, station)): Path<(String, String)>,
) -> ApiResult<MetroLine> {
    let (id, station) = (line_id(&id)?, station_id(&station)?);
    let _guard = state.write_lock().await;
    let line = lines(&state).remove_station(&id, &station)?;
    state.persist();
    Ok(Json(line))
}

async fn station_trips(
    State(state): State<AppState>,
    Path((id, station)): Path<(String, String)>,
) -> ApiResult<Vec<Trip>> {
    let (id, station) = (line_id(&id)?, station_id(&station)?);
    Ok(Json(timetable(&state).trips_for_station_in_line(&id, &station)?))
}

async fn line_trips(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Vec<Trip>> {
    Ok(Json(timetable(&state).trips_for_line(&line_id(&id)?)?))
}

async fn line_suspensions(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ActiveQuery>,
) -> ApiResult<Vec<Suspension>> {
    Ok(Json(suspensions(&state).suspensions_by_line(&line_id(&id)?, query.active)?))
}

async fn suspend_line(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SuspensionRequest>,
) -> Result<(StatusCode, Json<Suspension>), AppError> {
    let id = line_id(&id)?;
    let _guard = state.write_lock().await;
    let suspension = suspensions(&state).suspend_line(&id, req)?;
    state.persist();
    Ok((StatusCode::CREATED, Json(suspension)))
}

async fn delete_line_suspensions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<CountResponse> {
    let id = line_id(&id)?;
    let _guard = state.write_lock().await;
    let count = suspensions(&state).delete_all_suspensions_by_line(&id)?;
    state.persist();
    Ok(Json(CountResponse { count }))
}

async fn reconcile_line(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<MetroLine> {
    let id = line_id(&id)?;
    let _guard = state.write_lock().await;
    suspensions(&state).reconcile_line(&id)?;
    state.persist();
    Ok(Json(lines(&state).get_line(&id)?))
}

// Trips

async fn all_trips(State(state): State<AppState>) -> ApiResult<Vec<Trip>> {
    Ok(Json(timetable(&state).all_trips()?))
}

async fn search_trips(
    State(state): State<AppState>,
    Query(query): Query<TripSearchQuery>,
) -> ApiResult<Vec<Trip>> {
    let found = timetable(&state).search_trips(&query.from, &query.to, query.time.as_deref())?;
    Ok(Json(found))
}

// Suspensions

async fn list_suspensions(
    State(state): State<AppState>,
    Query(query): Query<ActiveQuery>,
) -> ApiResult<Vec<Suspension>> {
    let manager = suspensions(&state);
    let found = match query.active {
        Some(active) => manager.suspensions_by_active(active)?,
        None => manager.list_suspensions()?,
    };
    Ok(Json(found))
}

async fn create_suspension(
    State(state): State<AppState>,
    Json(req): Json<NewSuspension>,
) -> Result<(StatusCode, Json<Suspension>), AppError> {
    let _guard = state.write_lock().await;
    let suspension = suspensions(&state).create_suspension(req)?;
    state.persist();
    Ok((StatusCode::CREATED, Json(suspension)))
}

async fn reconcile_all(State(state): State<AppState>) -> ApiResult<CountResponse> {
    let _guard = state.write_lock().await;
    let count = suspensions(&state).reconcile_all()?;
    state.persist();
    Ok(Json(CountResponse { count }))
}

async fn get_suspension(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Suspension> {
    Ok(Json(suspensions(&state).get_suspension(&SuspensionId::new(id))?))
}

async fn delete_suspension(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let _guard = state.write_lock().await;
    suspensions(&state).delete_suspension(&SuspensionId::new(id))?;
    state.persist();
    Ok(StatusCode::NO_CONTENT)
}

async fn resolve_suspension(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Suspension> {
    let _guard = state.write_lock().await;
    let suspension = suspensions(&state).resolve_suspension(&SuspensionId::new(id))?;
    state.persist();
    Ok(Json(suspension))
}

async fn extend_suspension(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ExtendRequest>,
) -> ApiResult<Suspension> {
    let _guard = state.write_lock().await;
    let suspension =
        suspensions(&state).extend_suspension(&SuspensionId::new(id), req.additional_hours)?;
    state.persist();
    Ok(Json(suspension))
}

async fn update_suspension_details(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SuspensionDetails>,
) -> ApiResult<Suspension> {
    let _guard = state.write_lock().await;
    let suspension = suspensions(&state).update_suspension_details(&SuspensionId::new(id), req)?;
    state.persist();
    Ok(Json(suspension))
}

async fn add_suspension_stations(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<StationsRequest>,
) -> ApiResult<Suspension> {
    let _guard = state.write_lock().await;
    let suspension =
        suspensions(&state).add_stations_to_suspension(&SuspensionId::new(id), req.station_ids)?;
    state.persist();
    Ok(Json(suspension))
}

async fn remove_suspension_station(
    State(state): State<AppState>,
    Path((id, station)): Path<(String, String)>,
) -> ApiResult<Suspension> {
    let station = station_id(&station)?;
    let _guard = state.write_lock().await;
    let suspension =
        suspensions(&state).remove_station_from_suspension(&SuspensionId::new(id), &station)?;
    state.persist();
    Ok(Json(suspension))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String },
    Conflict { message: String },
    Internal { message: String },
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        AppError::BadRequest {
            message: e.to_string(),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Internal {
            message: e.to_string(),
        }
    }
}

impl From<NetworkError> for AppError {
    fn from(e: NetworkError) -> Self {
        let message = e.to_string();
        if e.is_not_found() {
            return AppError::NotFound { message };
        }
        match e {
            NetworkError::SuspensionResolved(_)
            | NetworkError::DuplicateLine(_)
            | NetworkError::DuplicateStation(_) => AppError::Conflict { message },
            NetworkError::EndTimeOutOfRange { .. } => AppError::BadRequest { message },
            _ => AppError::Internal { message },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
            AppError::Conflict { message } => (StatusCode::CONFLICT, message),
            AppError::Internal { message } => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        if status.is_server_error() {
            error!(%status, %message, "Request failed");
        } else {
            warn!(%status, %message, "Request rejected");
        }

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}
