//! Process entry point: acquires the single-instance lock, loads
//! configuration, wires a [`WorldRegistry`] and [`Coordinator`] together,
//! and blocks the main thread running the AMQP broker until the process
//! is killed or the broker hits a fatal transport error.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use shipnetsim_core::broker::instance_lock::ProcessLock;
use shipnetsim_core::broker::BrokerServer;
use shipnetsim_core::config::{self, Settings};
use shipnetsim_core::coordinator::Coordinator;
use shipnetsim_core::world::WorldRegistry;

#[derive(Parser, Debug)]
#[command(name = "shipnetsim-server")]
#[command(about = "Maritime simulation broker server")]
#[command(version)]
struct CliArgs {
    /// AMQP broker hostname to attach to.
    #[arg(long, default_value = "localhost")]
    hostname: String,

    /// AMQP broker port.
    #[arg(long, default_value_t = config::defaults::DEFAULT_PORT)]
    port: u16,

    /// Path to a TOML settings file. Overrides SHIPNETSIM_CONFIG and the
    /// current directory's shipnetsim.toml.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    let settings = Settings::load(args.config.as_deref());
    let output_dir = settings.resolved_output_dir();
    config::init(settings);

    let _lock = ProcessLock::acquire(&output_dir)?;

    tracing::info!(hostname = %args.hostname, port = args.port, "starting shipnetsim-server");

    let registry = Arc::new(WorldRegistry::new());
    let (coordinator, events_rx) = Coordinator::new(registry);
    let coordinator = Arc::new(coordinator);

    let broker = BrokerServer::new(coordinator, events_rx);
    broker.run(&args.hostname, args.port)
}
