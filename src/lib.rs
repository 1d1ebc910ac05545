//! # Devdir
//!
//! A community directory server for student developer projects, usable both
//! as a standalone binary and as a library.
//!
//! ## Library Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::path::PathBuf;
//! use devdir::auth::TokenGenerator;
//! use devdir::config::ServerConfig;
//! use devdir::github::GithubClient;
//! use devdir::server::{AppState, create_router};
//! use devdir::store::SqliteStore;
//!
//! let config = ServerConfig::default();
//! let store = SqliteStore::new(config.db_path()).unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState {
//!     store: Arc::new(store),
//!     github: GithubClient::new(config.github_api_url.clone()),
//!     tokens: TokenGenerator::new(),
//!     allowed_domains: config.allowed_domains.clone(),
//! });
//! let router = create_router(state);
//! // Serve with axum...
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod github;
pub mod server;
pub mod store;
pub mod types;
