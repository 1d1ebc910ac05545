use std::net::SocketAddr;
use std::path::PathBuf;

use crate::github::DEFAULT_API_URL;

pub const DEFAULT_ALLOWED_DOMAINS: &[&str] = &["@tec.mx", "@exatec.mx"];

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Email domain suffixes that admit a GitHub account into the community.
    pub allowed_domains: Vec<String>,
    /// GitHub API base URL. Overridable for tests and proxies.
    pub github_api_url: String,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("devdir.db")
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
            allowed_domains: DEFAULT_ALLOWED_DOMAINS
                .iter()
                .map(|d| d.to_string())
                .collect(),
            github_api_url: DEFAULT_API_URL.to_string(),
        }
    }
}
