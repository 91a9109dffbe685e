use axum::{
    extract::{Path, Query, State},
    routing::{get, on, patch, post, put},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use chrono::{DateTime, Utc};
use demurrage::database::Database;
use model::{
    demurrage::{Week, WeeklyDemurrage},
    stop_event::StopEvent,
    tracking::{
        ActiveStopEvent, Annotations, ClosedStopEvent, EndTracking, InvoiceFlags,
        StartTracking, WeekReport,
    },
    WithId,
};
use serde::Deserialize;
use utility::{id::Id, serde::date_time};

use crate::{
    common::{route_not_found, ApiResponse, ApiResult, RouteErrorResponse, METHOD_FILTER_ALL},
    middleware::auth::Authenticated,
    WebState,
};

pub(crate) fn routes<D: Database>(state: WebState<D>) -> Router {
    Router::new()
        .route("/start", post(start_tracking::<D>))
        .route("/end", post(end_tracking::<D>))
        .route("/active", get(get_active::<D>))
        .route("/events", get(get_events::<D>))
        .route("/events/:id", patch(annotate_event::<D>))
        .route("/demurrage/:week", get(get_week_report::<D>))
        .route("/weekly", get(get_weekly::<D>))
        .route("/weekly/:week/invoice", put(set_invoice_flags::<D>))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

async fn start_tracking<D: Database>(
    State(WebState { client }): State<WebState<D>>,
    Authenticated(caller): Authenticated,
    WithRejection(Json(request), _): WithRejection<Json<StartTracking>, RouteErrorResponse>,
) -> ApiResult<WithId<StopEvent>> {
    Ok(ApiResponse::ok(client.start_tracking(&caller, request, Utc::now()).await?).json())
}

async fn end_tracking<D: Database>(
    State(WebState { client }): State<WebState<D>>,
    Authenticated(caller): Authenticated,
    WithRejection(Json(request), _): WithRejection<Json<EndTracking>, RouteErrorResponse>,
) -> ApiResult<ClosedStopEvent> {
    Ok(ApiResponse::ok(client.end_tracking(&caller, request, Utc::now()).await?).json())
}

async fn get_active<D: Database>(
    State(WebState { client }): State<WebState<D>>,
    Authenticated(caller): Authenticated,
) -> ApiResult<Option<ActiveStopEvent>> {
    Ok(ApiResponse::ok(client.get_active(&caller, Utc::now()).await?).json())
}

#[derive(Debug, Deserialize)]
pub(crate) struct EventsQuery {
    #[serde(default, deserialize_with = "date_time::deserialize_utc_option")]
    start: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "date_time::deserialize_utc_option")]
    end: Option<DateTime<Utc>>,
}

async fn get_events<D: Database>(
    State(WebState { client }): State<WebState<D>>,
    Authenticated(caller): Authenticated,
    WithRejection(Query(query), _): WithRejection<Query<EventsQuery>, RouteErrorResponse>,
) -> ApiResult<Vec<WithId<StopEvent>>> {
    Ok(ApiResponse::ok(client.get_events(&caller, query.start, query.end).await?).json())
}

async fn annotate_event<D: Database>(
    State(WebState { client }): State<WebState<D>>,
    Authenticated(caller): Authenticated,
    WithRejection(Path(id), _): WithRejection<Path<Id<StopEvent>>, RouteErrorResponse>,
    WithRejection(Json(annotations), _): WithRejection<Json<Annotations>, RouteErrorResponse>,
) -> ApiResult<WithId<StopEvent>> {
    Ok(ApiResponse::ok(client.annotate_event(&caller, &id, annotations).await?).json())
}

async fn get_week_report<D: Database>(
    State(WebState { client }): State<WebState<D>>,
    Authenticated(caller): Authenticated,
    WithRejection(Path(week), _): WithRejection<Path<Week>, RouteErrorResponse>,
) -> ApiResult<WeekReport> {
    Ok(ApiResponse::ok(client.get_week_report(&caller, week).await?).json())
}

async fn get_weekly<D: Database>(
    State(WebState { client }): State<WebState<D>>,
    Authenticated(caller): Authenticated,
) -> ApiResult<Vec<WeeklyDemurrage>> {
    Ok(ApiResponse::ok(client.get_weekly(&caller).await?).json())
}

async fn set_invoice_flags<D: Database>(
    State(WebState { client }): State<WebState<D>>,
    Authenticated(caller): Authenticated,
    WithRejection(Path(week), _): WithRejection<Path<Week>, RouteErrorResponse>,
    WithRejection(Json(flags), _): WithRejection<Json<InvoiceFlags>, RouteErrorResponse>,
) -> ApiResult<WeeklyDemurrage> {
    Ok(ApiResponse::ok(client.set_invoice_flags(&caller, week, flags).await?).json())
}
