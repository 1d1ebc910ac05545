mod auth;
mod catalog;
pub mod dto;
mod organizations;
mod projects;
pub mod response;
mod router;
mod stats;
mod users;
pub mod validation;

pub use router::{AppState, create_router};
pub use stats::build_snapshot;
