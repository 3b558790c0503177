//! HTTP transport for the Memoria store.
//!
//! Handlers are thin: they decode the request, run the store call on Tokio's
//! blocking pool, and map `MemoryError` onto status codes.

pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

pub use error::{ApiError, ServerError};
pub use extract::{ApiJson, ApiQuery};
pub use routes::router;
pub use state::AppState;

use log::info;
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Bind `addr` and serve the router until the task is cancelled or the
/// listener fails.
pub async fn serve(state: AppState, addr: &str) -> Result<(), ServerError> {
    let addr: SocketAddr = addr
        .parse()
        .map_err(|err| ServerError::InvalidBind(format!("{addr}: {err}")))?;
    let listener = TcpListener::bind(addr).await?;
    info!("memoria http listening (addr={})", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}
