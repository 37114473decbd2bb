use clap::Parser;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::config::{self, PreviewConfig};
use crate::error::{PreviewError, PreviewResult};

#[derive(Parser, Debug)]
#[command(
    name = "plantuml-preview",
    about = "Watch a PlantUML file and preview it live in the browser",
    version
)]
pub struct Cli {
    /// Diagram file to watch and render
    #[arg(long)]
    pub input: PathBuf,

    /// Port for the preview server (falls back to 8000 when not a valid port)
    #[arg(long, allow_hyphen_values = true)]
    pub port: Option<String>,

    /// Interface for the preview server
    #[arg(long, default_value_t = config::default_host())]
    pub host: IpAddr,

    /// Base URL of the PlantUML rendering service
    #[arg(long, default_value = config::DEFAULT_SERVER_URL)]
    pub server: Url,

    /// Wait this long after a change before rendering, folding further changes in
    #[arg(long, default_value = "0")]
    pub coalesce_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Enable verbose logging
    #[arg(long)]
    pub verbose: bool,
}

impl Cli {
    pub fn get_port(&self) -> u16 {
        config::resolve_port(self.port.as_deref())
    }

    /// Validate CLI configuration and return appropriate error if invalid
    pub fn validate(&self) -> PreviewResult<()> {
        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(PreviewError::config(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    self.log_level
                )));
            }
        }

        if self.input.as_os_str().is_empty() {
            return Err(PreviewError::config("Missing required parameter: --input"));
        }

        if self.server.cannot_be_a_base() {
            return Err(PreviewError::invalid_server_url(self.server.as_str()));
        }

        Ok(())
    }

    /// Get log level as tracing::Level
    pub fn get_tracing_level(&self) -> tracing::Level {
        if self.verbose {
            return tracing::Level::DEBUG;
        }
        match self.log_level.as_str() {
            "trace" => tracing::Level::TRACE,
            "debug" => tracing::Level::DEBUG,
            "info" => tracing::Level::INFO,
            "warn" => tracing::Level::WARN,
            "error" => tracing::Level::ERROR,
            _ => tracing::Level::INFO,
        }
    }

    pub fn into_config(self) -> PreviewResult<PreviewConfig> {
        self.validate()?;
        let port = self.get_port();
        Ok(PreviewConfig {
            input: self.input,
            host: self.host,
            port,
            server_url: self.server,
            coalesce_window: Duration::from_millis(self.coalesce_ms),
        })
    }
}
