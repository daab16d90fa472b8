use clap::Parser;
use std::sync::Arc;
use std::time::Duration;

use deathwatch::config::default_signals;
use deathwatch::lifecycle::{ResourceRegistry, ShutdownCoordinator, Sig};
use deathwatch::{DeathConfig, DeathError, Resource, TracingLogger};

#[derive(Parser)]
#[command(name = "deathwatch")]
#[command(about = "Wait for a shutdown signal, then close resources within a deadline")]
struct Cli {
    /// Teardown budget in milliseconds.
    #[arg(long, env = "TIMEOUT_MS", default_value = "10000")]
    timeout_ms: u64,

    /// Signals that start shutdown (repeatable), e.g. SIGTERM, int, hup.
    #[arg(long = "signal", default_values_t = default_signals())]
    signals: Vec<Sig>,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Trigger shutdown manually after this many milliseconds.
    #[arg(long)]
    self_destruct_ms: Option<u64>,

    /// How long the demo "flush" resource takes to close.
    #[arg(long, default_value = "200")]
    slow_close_ms: u64,

    /// Add a demo resource whose close fails.
    #[arg(long)]
    fail_close: bool,

    /// Print the teardown report as JSON on stdout.
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn config(&self) -> anyhow::Result<DeathConfig> {
        let config = DeathConfig {
            timeout: Duration::from_millis(self.timeout_ms),
            signals: self.signals.clone(),
            log_level: self.log_level.clone(),
        };
        config.validate()?;
        Ok(config)
    }
}

async fn demo_resources(cli: &Cli, registry: &ResourceRegistry) {
    let slow = Duration::from_millis(cli.slow_close_ms);
    registry
        .register(
            Resource::from_fn("flush", move |cancel| async move {
                tokio::select! {
                    _ = tokio::time::sleep(slow) => Ok(()),
                    _ = cancel.cancelled() => Err(anyhow::anyhow!("flush cut short")),
                }
            })
            .with_origin("demo"),
        )
        .await;

    registry
        .register(Resource::from_fn("listener", |_cancel| async { Ok(()) }).with_origin("demo"))
        .await;

    if cli.fail_close {
        registry
            .register(
                Resource::from_fn("journal", |_cancel| async {
                    Err(anyhow::anyhow!("journal is read-only"))
                })
                .with_origin("demo"),
            )
            .await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.config()?;

    tracing_subscriber::fmt()
        .with_env_filter(&config.log_level)
        .with_writer(std::io::stderr)
        .init();

    let mut coordinator = ShutdownCoordinator::from_config(&config)?;
    coordinator.set_logger(TracingLogger);

    let registry = Arc::new(ResourceRegistry::new());
    demo_resources(&cli, &registry).await;

    if let Some(ms) = cli.self_destruct_ms {
        let handle = coordinator.handle();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            handle.request_shutdown();
        });
    }

    let resources = registry.count().await;
    tracing::info!(
        signals = ?config.signals,
        timeout_ms = cli.timeout_ms,
        resources,
        "Waiting for shutdown..."
    );

    let result = coordinator.wait_for_shutdown_registered(&registry).await;

    let report = match &result {
        Ok(report) => Some(report),
        Err(e) => e.report(),
    };
    if cli.json {
        if let Some(report) = report {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
    }

    match result {
        Ok(report) => {
            tracing::info!(closed = report.closed, "Shutdown complete");
            Ok(())
        }
        Err(DeathError::Teardown(report)) => {
            tracing::error!("{}", report);
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}
