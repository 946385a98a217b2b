use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde::Deserialize;
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_database::RestClient;
use shared_models::error::AppError;

use crate::models::{QueueEntry, QueueEntryEdits, StartVisitForm};
use crate::services::{
    resolve_location, ActiveEntriesCache, ConceptDefaults, LookupProvider, QueueTransitionEngine,
    RemoteLookupService, VisitService,
};

/// Shared per-process state: one client and one active-entries cache.
#[derive(Clone)]
pub struct VisitQueueState {
    pub config: Arc<AppConfig>,
    pub client: Arc<RestClient>,
    pub cache: Arc<ActiveEntriesCache>,
}

impl VisitQueueState {
    pub fn new(config: Arc<AppConfig>) -> Self {
        let client = Arc::new(RestClient::new(&config));
        let cache = Arc::new(ActiveEntriesCache::new(client.clone()));
        Self { config, client, cache }
    }

    pub fn lookups(&self) -> RemoteLookupService {
        RemoteLookupService::new(self.client.clone(), self.config.clone())
    }

    pub fn engine(&self) -> QueueTransitionEngine {
        QueueTransitionEngine::new(
            self.client.clone(),
            ConceptDefaults::from_provider(&self.lookups()),
            self.cache.clone(),
        )
    }

    pub fn visits(&self) -> VisitService {
        VisitService::new(self.client.clone(), self.cache.clone())
    }
}

// ==============================================================================
// REQUEST BODIES & QUERIES
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct LocationQuery {
    pub location: Option<String>,
    pub session_location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TransitionBody {
    pub queue_entry: QueueEntry,
    #[serde(default)]
    pub edits: QueueEntryEdits,
}

#[derive(Debug, Default, Deserialize)]
pub struct StartVisitBody {
    #[serde(default)]
    pub form: StartVisitForm,
    pub session_location: Option<String>,
}

async fn resolved_location(
    lookups: &RemoteLookupService,
    query: &LocationQuery,
    token: &str,
) -> Result<Option<String>, AppError> {
    let chosen = resolve_location(query.location.as_deref(), query.session_location.as_deref(), &[]);
    if chosen.is_some() {
        return Ok(chosen);
    }

    let available = lookups.list_locations(token).await?;
    Ok(resolve_location(None, None, &available))
}

// ==============================================================================
// LOOKUP HANDLERS
// ==============================================================================

pub async fn list_statuses(
    State(state): State<Arc<VisitQueueState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let lookups = state.lookups();
    let statuses = lookups.list_statuses(auth.token()).await?;

    Ok(Json(json!({
        "statuses": statuses,
        "default_status": lookups.default_status(),
    })))
}

pub async fn list_priorities(
    State(state): State<Arc<VisitQueueState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let lookups = state.lookups();
    let priorities = lookups.list_priorities(auth.token()).await?;

    Ok(Json(json!({
        "priorities": priorities,
        "default_priority": lookups.default_priority(),
    })))
}

pub async fn list_services(
    State(state): State<Arc<VisitQueueState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<LocationQuery>,
) -> Result<Json<Value>, AppError> {
    let lookups = state.lookups();
    let location = resolved_location(&lookups, &query, auth.token()).await?;

    let services = match location.as_deref() {
        Some(location) => lookups.list_services(location, auth.token()).await?,
        None => Vec::new(),
    };

    Ok(Json(json!({
        "location": location,
        "services": services,
    })))
}

pub async fn list_locations(
    State(state): State<Arc<VisitQueueState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<LocationQuery>,
) -> Result<Json<Value>, AppError> {
    let locations = state.lookups().list_locations(auth.token()).await?;
    let selected = resolve_location(
        query.location.as_deref(),
        query.session_location.as_deref(),
        &locations,
    );

    Ok(Json(json!({
        "locations": locations,
        "selected": selected,
    })))
}

pub async fn list_visit_types(
    State(state): State<Arc<VisitQueueState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let visit_types = state.lookups().list_visit_types(auth.token()).await?;

    Ok(Json(json!({ "visit_types": visit_types })))
}

// ==============================================================================
// QUEUE ENTRY HANDLERS
// ==============================================================================

pub async fn get_active_queue_entries(
    State(state): State<Arc<VisitQueueState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let entries = state.cache.active_entries(auth.token()).await?;

    Ok(Json(json!({
        "entries": entries,
        "total": entries.len(),
    })))
}

pub async fn transition_queue_entry(
    State(state): State<Arc<VisitQueueState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(body): Json<TransitionBody>,
) -> Result<Json<Value>, AppError> {
    let outcome = state
        .engine()
        .submit(&body.queue_entry, &body.edits, auth.token())
        .await?;

    Ok(Json(json!({
        "committed": outcome.is_committed(),
        "notifications": outcome.notifications(),
    })))
}

// ==============================================================================
// VISIT HANDLERS
// ==============================================================================

pub async fn get_visit_state(
    State(state): State<Arc<VisitQueueState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(patient_uuid): Path<String>,
) -> Result<Json<Value>, AppError> {
    let lifecycle = state.visits().load_lifecycle(&patient_uuid, auth.token()).await?;

    Ok(Json(json!({
        "patient_uuid": lifecycle.patient_uuid(),
        "state": lifecycle.state(),
        "can_start": lifecycle.can_start(),
        "can_end": lifecycle.can_end(),
        "visit": lifecycle.visit(),
    })))
}

pub async fn start_visit(
    State(state): State<Arc<VisitQueueState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(patient_uuid): Path<String>,
    Json(body): Json<StartVisitBody>,
) -> Result<Json<Value>, AppError> {
    let visits = state.visits();
    let mut lifecycle = visits.load_lifecycle(&patient_uuid, auth.token()).await?;

    let mut form = body.form;
    if form.location_uuid.as_deref().map_or(true, |l| l.trim().is_empty()) {
        let query = LocationQuery { location: None, session_location: body.session_location };
        form.location_uuid = resolved_location(&state.lookups(), &query, auth.token()).await?;
    }

    let change = visits.start_visit(&mut lifecycle, &form, auth.token()).await?;

    Ok(Json(json!({
        "state": lifecycle.state(),
        "visit": change.visit,
        "notifications": change.notifications("Visit started", "Active Visit"),
    })))
}

pub async fn end_visit(
    State(state): State<Arc<VisitQueueState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(patient_uuid): Path<String>,
) -> Result<Json<Value>, AppError> {
    let visits = state.visits();
    let mut lifecycle = visits.load_lifecycle(&patient_uuid, auth.token()).await?;

    let change = visits.end_visit(&mut lifecycle, auth.token()).await?;

    Ok(Json(json!({
        "state": lifecycle.state(),
        "visit": change.visit,
        "notifications": change.notifications("Visit ended", "Visit ended successfully"),
    })))
}
