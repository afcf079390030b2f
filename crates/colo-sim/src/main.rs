mod events;
mod scenario;
mod sim;

use std::path::PathBuf;

use clap::Parser;
use colo_routing::TransformerConfig;
use events::{emit, emit_changes, EventStarted, EventStep, EventSummary};
use scenario::Scenario;
use sim::Simulation;

#[derive(Parser)]
#[command(
    name = "colo-sim",
    about = "Replay relay pool and destination changes through the co-location rewriter"
)]
struct Cli {
    /// Scenario file (JSON).
    #[arg(long)]
    scenario: PathBuf,

    /// Co-location prefix length. Overrides the scenario and COLO_PREFIX_LEN.
    #[arg(long)]
    prefix_len: Option<u8>,

    /// Relays use host networking: match on the exact host address.
    #[arg(long)]
    host_network: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let scenario = Scenario::load(&cli.scenario)?;
    let mut config = scenario.config.clone().unwrap_or_else(TransformerConfig::new);
    if let Some(len) = cli.prefix_len {
        config = config.prefix_len(len);
    }
    if cli.host_network {
        config = config.host_network(true);
    }
    let resolved = scenario.resolve()?;
    let sim = Simulation::new(&resolved.pool, &resolved.destination, &config)?;

    eprintln!("colo-sim v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("Scenario: {}", cli.scenario.display());
    eprintln!();

    emit(&EventStarted::new(
        &cli.scenario.display().to_string(),
        sim.transformer().policy(),
        resolved.destination.leaves().len(),
        resolved.actions.len(),
    ));

    let (mut relay_changes, mut output_changes) = emit_changes(0, &sim.drain());
    for (index, action) in resolved.actions.iter().enumerate() {
        let step = index + 1;
        let (applied, changes) = sim.apply(action);
        emit(&EventStep {
            event: "step",
            step,
            action: action.describe(),
            applied,
        });
        let (relays, outputs) = emit_changes(step, &changes);
        relay_changes += relays;
        output_changes += outputs;
    }

    emit(&EventSummary {
        event: "summary",
        steps: resolved.actions.len(),
        relay_changes,
        output_changes,
    });

    Ok(())
}
