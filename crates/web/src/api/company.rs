use axum::{
    extract::State,
    routing::{get, on},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use demurrage::{client::CompanyUpdate, database::Database};
use model::{company::Company, WithId};

use crate::{
    common::{route_not_found, ApiResponse, ApiResult, RouteErrorResponse, METHOD_FILTER_ALL},
    middleware::auth::Authenticated,
    WebState,
};

pub(crate) fn routes<D: Database>(state: WebState<D>) -> Router {
    Router::new()
        .route("/", get(get_company::<D>).put(update_company::<D>))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

async fn get_company<D: Database>(
    State(WebState { client }): State<WebState<D>>,
    Authenticated(caller): Authenticated,
) -> ApiResult<WithId<Company>> {
    Ok(ApiResponse::ok(client.get_company(&caller).await?).json())
}

async fn update_company<D: Database>(
    State(WebState { client }): State<WebState<D>>,
    Authenticated(caller): Authenticated,
    WithRejection(Json(update), _): WithRejection<Json<CompanyUpdate>, RouteErrorResponse>,
) -> ApiResult<WithId<Company>> {
    Ok(ApiResponse::ok(client.update_company(&caller, update).await?).json())
}
