use axum::{
    extract::{Path, State},
    routing::{get, on},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use demurrage::{client::NewVehicle, database::Database};
use model::{vehicle::Vehicle, WithId};
use utility::id::Id;

use crate::{
    common::{route_not_found, ApiResponse, ApiResult, RouteErrorResponse, METHOD_FILTER_ALL},
    middleware::auth::Authenticated,
    WebState,
};

pub(crate) fn routes<D: Database>(state: WebState<D>) -> Router {
    Router::new()
        .route("/", get(get_vehicles::<D>).post(add_vehicle::<D>))
        .route("/:id", get(get_vehicle::<D>))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

async fn get_vehicles<D: Database>(
    State(WebState { client }): State<WebState<D>>,
    Authenticated(caller): Authenticated,
) -> ApiResult<Vec<WithId<Vehicle>>> {
    Ok(ApiResponse::ok(client.get_vehicles(&caller).await?).json())
}

async fn get_vehicle<D: Database>(
    State(WebState { client }): State<WebState<D>>,
    Authenticated(caller): Authenticated,
    WithRejection(Path(id), _): WithRejection<Path<Id<Vehicle>>, RouteErrorResponse>,
) -> ApiResult<WithId<Vehicle>> {
    Ok(ApiResponse::ok(client.get_vehicle(&caller, &id).await?).json())
}

async fn add_vehicle<D: Database>(
    State(WebState { client }): State<WebState<D>>,
    Authenticated(caller): Authenticated,
    WithRejection(Json(vehicle), _): WithRejection<Json<NewVehicle>, RouteErrorResponse>,
) -> ApiResult<WithId<Vehicle>> {
    Ok(ApiResponse::ok(client.add_vehicle(&caller, vehicle).await?).json())
}
