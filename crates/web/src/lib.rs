pub use crate::common::RouteResult;

use axum::Router;
use demurrage::{client::Client, database::Database};
use tokio::net::{TcpListener, ToSocketAddrs};
use tower_http::trace::TraceLayer;

pub mod api;
pub mod common;
pub mod middleware;

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

#[derive(Clone)]
pub struct WebState<D>
where
    D: Database,
{
    pub client: Client<D>,
}

impl<D: Database> WebState<D> {
    pub fn new(database: D) -> Self {
        Self {
            client: Client::new(database),
        }
    }
}

pub fn app<D: Database>(state: WebState<D>) -> Router {
    Router::new()
        .nest_service("/api", api::routes(state))
        .fallback(common::route_not_found)
        .layer(TraceLayer::new_for_http())
}

pub async fn start_web_server<D, A>(state: WebState<D>, address: A) -> std::io::Result<()>
where
    D: Database,
    A: ToSocketAddrs,
{
    let listener = TcpListener::bind(address).await?;
    log::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app(state).into_make_service()).await?;

    Ok(())
}
