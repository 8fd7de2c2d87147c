use std::{
    env,
    net::{Ipv6Addr, SocketAddr},
};

use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

mod auth;
mod bookings;
mod context;
mod docs;
mod errors;
pub mod logging;
mod rooms;
mod schemas;
mod serialized;

pub use context::ServerContext;

/// The default port the server will listen on.
pub const DEFAULT_PORT: u16 = 8000;

pub type Router = axum::Router<ServerContext>;

/// Starts the slotbook server
pub async fn run_server(context: ServerContext) {
    let port = env::var("SLOTBOOK_SERVER_PORT")
        .map(|x| x.parse::<u16>().expect("Port must be a number"))
        .unwrap_or(DEFAULT_PORT);

    let addr: SocketAddr = (Ipv6Addr::UNSPECIFIED, port).into();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let root_router = Router::new()
        .nest("/auth", auth::auth_router())
        .nest("/user", auth::user_router())
        .nest("/rooms", rooms::router().merge(bookings::room_router()))
        .nest("/bookings", bookings::router())
        .merge(rooms::root_router())
        .merge(bookings::root_router())
        .route("/api.json", get(docs::docs))
        .layer(cors)
        .with_state(context);

    let listener = TcpListener::bind(&addr).await.expect("listens on address");

    log::info!("Listening on port {}", port);

    axum::serve(listener, root_router.into_make_service())
        .await
        .expect("server runs");
}
