//! Retouch application composition root
//!
//! Wires configuration, the transform gateway and the editor session together.

pub mod session;

use retouch_common::{Config, LogFormat};
use retouch_gateway::{Gateway, GatewayConfig};
use tracing_subscriber::EnvFilter;

pub use session::{ActiveTool, EditorSession, ExportedArtifact, SessionSnapshot, SnapshotSender};

/// Install the global tracing subscriber
pub fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.rust_log.as_str()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match config.log_format {
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Create an editor session backed by the configured transform provider
pub fn create_session(gateway_config: GatewayConfig) -> Result<EditorSession, anyhow::Error> {
    tracing::info!(config = ?gateway_config, "Creating transform gateway");
    let gateway = Gateway::from_config(gateway_config)?;
    Ok(EditorSession::new(gateway))
}
