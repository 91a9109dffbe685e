use axum::{
    response::IntoResponse,
    routing::{get, on},
    Json, Router,
};
use demurrage::database::Database;
use model::{
    company::Company, demurrage::WeeklyDemurrage, stop_event::StopEvent, vehicle::Vehicle,
};
use serde_json::json;

pub mod company;
pub mod tracking;
pub mod vehicles;

use crate::{
    common::{route_not_found, schema, METHOD_FILTER_ALL},
    WebState,
};

pub fn routes<D: Database>(state: WebState<D>) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .nest_service("/company", company::routes(state.clone()))
        .nest_service("/vehicles", vehicles::routes(state.clone()))
        .nest_service("/tracking", tracking::routes(state))
        .nest_service("/schema", schema_routes())
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

fn schema_routes() -> Router {
    Router::new()
        .route("/company", get(schema::<Company>))
        .route("/vehicle", get(schema::<Vehicle>))
        .route("/stop-event", get(schema::<StopEvent>))
        .route("/weekly-demurrage", get(schema::<WeeklyDemurrage>))
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

async fn ping() -> impl IntoResponse {
    Json(json!({
        "success": true,
        "data": "pong!"
    }))
}
