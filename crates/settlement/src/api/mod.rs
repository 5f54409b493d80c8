//! HTTP API for reward settlement and valuation

pub mod handlers;
pub mod models;
pub mod routes;

pub use handlers::RewardsApiState;
pub use routes::{create_api_state, create_router};
