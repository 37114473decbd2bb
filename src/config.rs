use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_SERVER_URL: &str = "http://plantuml.com/plantuml";

/// Resolved runtime configuration, built from the command line.
#[derive(Debug, Clone)]
pub struct PreviewConfig {
    pub input: PathBuf,
    pub host: IpAddr,
    pub port: u16,
    pub server_url: Url,
    pub coalesce_window: Duration,
}

impl PreviewConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Parse a port argument, falling back to the default for anything that is
/// not a plain `u16`.
pub fn resolve_port(raw: Option<&str>) -> u16 {
    match raw.map(str::trim) {
        None => DEFAULT_PORT,
        Some(value) => value.parse::<u16>().unwrap_or_else(|_| {
            tracing::debug!(value, "unusable port, falling back to {}", DEFAULT_PORT);
            DEFAULT_PORT
        }),
    }
}

pub fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}
