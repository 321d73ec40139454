//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → request.rs (assign/propagate request ID)
//!     → server.rs (Axum router, token check, merge)
//!     → response.rs (YAML body, or error → status + message)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use response::AppError;
pub use server::{AppState, HttpServer, ServerError};
