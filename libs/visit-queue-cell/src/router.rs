use std::sync::Arc;
use axum::{
    Router,
    routing::{get, post},
};

use shared_config::AppConfig;

use crate::handlers::{
    end_visit, get_active_queue_entries, get_visit_state, list_locations, list_priorities,
    list_services, list_statuses, list_visit_types, start_visit, transition_queue_entry,
    VisitQueueState,
};

pub fn create_visit_queue_router(config: Arc<AppConfig>) -> Router {
    let state = Arc::new(VisitQueueState::new(config));

    let lookup_routes = Router::new()
        .route("/statuses", get(list_statuses))
        .route("/priorities", get(list_priorities))
        .route("/services", get(list_services))
        .route("/locations", get(list_locations))
        .route("/visit-types", get(list_visit_types));

    let queue_routes = Router::new()
        .route("/active", get(get_active_queue_entries))
        .route("/transition", post(transition_queue_entry));

    let visit_routes = Router::new()
        .route("/{patient_uuid}/visit", get(get_visit_state))
        .route("/{patient_uuid}/visit/start", post(start_visit))
        .route("/{patient_uuid}/visit/end", post(end_visit));

    Router::new()
        .nest("/lookups", lookup_routes)
        .nest("/queue-entries", queue_routes)
        .nest("/patients", visit_routes)
        .with_state(state)
}
