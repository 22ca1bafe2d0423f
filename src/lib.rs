use std::net::SocketAddr;

pub mod adapters;
pub mod app;
pub mod config;
pub mod identity;
pub mod ports;
pub mod push;
pub mod records;
pub mod schedule;
pub mod state;
pub mod store;

mod assets;

pub use identity::generate_hmac_secret;
pub use push::generate_vapid_credentials;

pub async fn serve(addr: SocketAddr, config: config::AppConfig) {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app::app(config))
        .await
        .expect("server error");
}
