use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PreviewError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read diagram source {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Encoding error: {0}")]
    Encode(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Render service returned {status} for {url}")]
    RenderStatus {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("Invalid render server URL: {0}")]
    InvalidServerUrl(String),

    #[error("Failed to watch {}: {source}", .path.display())]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: warp::Error,
    },
}

impl PreviewError {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        PreviewError::Config(msg.into())
    }

    pub fn read<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        PreviewError::Read {
            path: path.into(),
            source,
        }
    }

    pub fn watch<P: Into<PathBuf>>(path: P, source: notify::Error) -> Self {
        PreviewError::Watch {
            path: path.into(),
            source,
        }
    }

    pub fn bind(addr: SocketAddr, source: warp::Error) -> Self {
        PreviewError::Bind { addr, source }
    }

    pub fn invalid_server_url<S: Into<String>>(url: S) -> Self {
        PreviewError::InvalidServerUrl(url.into())
    }

    /// Runtime failures drop the current trigger; everything else stops startup.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PreviewError::Read { .. }
                | PreviewError::Encode(_)
                | PreviewError::Network(_)
                | PreviewError::RenderStatus { .. }
        )
    }
}

/// Result type alias for preview operations
pub type PreviewResult<T> = Result<T, PreviewError>;
