//! Web layer for the metro network.
//!
//! A JSON HTTP surface over the network operations. Mutating requests are
//! serialised through [`AppState`]; reads run concurrently.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::AppState;
