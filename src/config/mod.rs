mod server;

pub use server::{DEFAULT_ALLOWED_DOMAINS, ServerConfig};
