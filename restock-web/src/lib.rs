//! Public reporting page: look a store up by id and record that its last
//! copy was taken.
//!
//! - `GET /?store=<id>` shows the store with a report button
//! - `POST /report` (form field `store`) records the report
//!
//! Every failure renders inline with a manual store-id form.

mod error;
mod routes;
mod state;

pub use error::WebError;
pub use routes::router;
pub use state::AppState;

use tokio::net::TcpListener;
use tracing::info;

/// Bind `addr` and serve until ctrl-c.
pub async fn serve(addr: &str, state: AppState) -> Result<(), WebError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| WebError::Bind {
            addr: addr.to_owned(),
            source,
        })?;
    info!(%addr, "serving restock page");

    tokio::select! {
        result = axum::serve(listener, router(state)) => result.map_err(WebError::Serve),
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            Ok(())
        }
    }
}
