use anyhow::Result;
use clap::Parser;
use image3d_relay::app::App;
use image3d_relay::config::{Config, GenerationMode};
use image3d_relay::routes;
use image3d_relay::state::AppState;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "image3d-relay")]
#[command(about = "Relay images to a 3D generation provider")]
struct CliArgs {
    /// Address to listen on; overrides RELAY_BIND.
    #[arg(long)]
    bind: Option<String>,

    /// `blocking` waits for the model, `async` returns a task id; overrides RELAY_MODE.
    #[arg(long, value_parser = parse_mode_arg)]
    mode: Option<GenerationMode>,

    /// Serve the sample model without touching storage or the provider.
    #[arg(long)]
    dry_run: bool,
}

impl CliArgs {
    /// Flags expressed as the configuration keys they replace.
    fn overrides(&self) -> Vec<(&'static str, String)> {
        let mut overrides = Vec::new();
        if let Some(bind) = &self.bind {
            overrides.push(("RELAY_BIND", bind.clone()));
        }
        if let Some(mode) = self.mode {
            overrides.push(("RELAY_MODE", mode.as_str().to_string()));
        }
        if self.dry_run {
            overrides.push(("DRY_RUN", "true".to_string()));
        }
        overrides
    }
}

fn parse_mode_arg(input: &str) -> std::result::Result<GenerationMode, String> {
    input.parse().map_err(|e| format!("{}", e))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "image3d_relay=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = CliArgs::parse();

    let config = match Config::from_env_with(&args.overrides()) {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Starting image3d-relay v{} ({} mode, provider {})",
        env!("CARGO_PKG_VERSION"),
        config.mode,
        config.provider.kind
    );

    let app = match App::new(&config).await {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    let bind_address = config.bind_address.clone();
    let state = Arc::new(AppState {
        config: Arc::new(config),
        app,
    });
    let router = routes::build(state);

    let listener = TcpListener::bind(&bind_address).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{parse_mode_arg, CliArgs};
    use clap::Parser;
    use image3d_relay::config::GenerationMode;

    #[test]
    fn test_flags_become_config_overrides() {
        let args = CliArgs::parse_from(["image3d-relay", "--dry-run", "--mode", "blocking"]);
        assert_eq!(
            args.overrides(),
            vec![
                ("RELAY_MODE", "blocking".to_string()),
                ("DRY_RUN", "true".to_string()),
            ]
        );

        let args = CliArgs::parse_from(["image3d-relay"]);
        assert!(args.overrides().is_empty());
    }

    #[test]
    fn test_parse_mode_arg() {
        assert_eq!(parse_mode_arg("blocking").unwrap(), GenerationMode::Blocking);
        assert_eq!(parse_mode_arg("async").unwrap(), GenerationMode::Async);
        assert!(parse_mode_arg("later").is_err());
    }
}
