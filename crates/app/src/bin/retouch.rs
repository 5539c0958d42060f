// Retouch - command-line driver: upload, run one operation, export

use std::path::PathBuf;

use clap::Parser;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{error, info};

use retouch_common::config::Config;
use retouch_domain::{Hotspot, OperationKind};
use retouch_app::SessionSnapshot;
use retouch_gateway::{CancelHandle, GatewayConfig};

#[derive(Debug, Parser)]
#[command(name = "retouch", version, about = "Apply a generative edit to a photo")]
struct Cli {
    /// Image to upload
    #[arg(long)]
    input: PathBuf,

    /// Operation: edit, filter, adjustment, 3d_view, background_removal, restore, group_restore, animate
    operation: OperationKind,

    /// Instruction text for edit, filter, adjustment and animate
    #[arg(long)]
    prompt: Option<String>,

    /// Hotspot x in image pixels (edit only)
    #[arg(long, requires = "y")]
    x: Option<u32>,

    /// Hotspot y in image pixels (edit only)
    #[arg(long, requires = "x")]
    y: Option<u32>,

    /// Directory to write the result to (defaults to EXPORT_DIR)
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env()?;
    retouch_app::init_tracing(&config);

    let gateway_config = GatewayConfig::from_env().map_err(|e| {
        error!("Failed to load gateway configuration: {}", e);
        e
    })?;

    let mut session = retouch_app::create_session(gateway_config)?;
    session.upload_path(&cli.input)?;

    if let (Some(x), Some(y)) = (cli.x, cli.y) {
        session.set_hotspot(Hotspot::new(x, y))?;
    }

    let (cancel, signal) = CancelHandle::new();
    tokio::spawn(async move {
        shutdown_signal().await;
        cancel.cancel();
    });

    let (tx, mut rx) = mpsc::unbounded_channel::<SessionSnapshot>();
    let printer = tokio::spawn(async move {
        let mut last: Option<String> = None;
        while let Some(snapshot) = rx.recv().await {
            if let Some(message) = snapshot.progress {
                if last.as_ref() != Some(&message) {
                    println!("{}", message);
                    last = Some(message);
                }
            }
        }
    });

    info!(operation = %cli.operation, input = %cli.input.display(), "Applying operation");

    let result = session
        .apply_with(cli.operation, cli.prompt.as_deref(), Some(&tx), signal)
        .await;
    drop(tx);
    let _ = printer.await;

    if let Err(e) = result {
        error!(error_code = e.error_code(), "Operation failed: {}", e);
        anyhow::bail!(session.last_error().unwrap_or("Operation failed").to_string());
    }

    let output_dir = cli.output_dir.unwrap_or(config.export_dir);
    let path = session.export_to_dir(&output_dir)?;

    println!("{}", path.display());
    info!("Done");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal, cancelling operation");
        },
        _ = terminate => {
            info!("Received terminate signal, cancelling operation");
        },
    }
}
