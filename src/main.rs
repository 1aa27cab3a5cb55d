use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use fleetwise::client::HttpModelClient;
use fleetwise::flow::FlowRegistry;
use fleetwise::flows::alerts::AlertsInput;
use fleetwise::flows::clearance::ClearanceInput;
use fleetwise::flows::ranking::RankingInput;
use fleetwise::flows::simulation::SimulationInput;

#[derive(Parser, Debug)]
#[command(
    name = "fleetwise",
    version,
    about = "AI-assisted induction planning flows for a metro rail fleet"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate predictive maintenance alerts from component conditions
    Alerts(FlowArgs),
    /// Rank trains for nightly induction
    Rank(FlowArgs),
    /// Project schedule impact for a what-if scenario
    Simulate(FlowArgs),
    /// Estimate fitness-certificate clearance probability
    Clearance(FlowArgs),
    /// List the registered flows and their input fields
    Flows,
}

#[derive(Parser, Debug)]
struct FlowArgs {
    /// Path to the input JSON document (`-` reads stdin)
    #[arg(long, value_name = "PATH")]
    input: PathBuf,

    /// Output path for the result JSON (stdout when omitted)
    #[arg(long, value_name = "PATH")]
    out: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let registry = FlowRegistry::standard();

    match cli.command {
        Commands::Flows => {
            for flow in registry.iter() {
                let inputs: Vec<&str> = flow
                    .input_schema()
                    .fields()
                    .iter()
                    .map(|field| field.name())
                    .collect();
                println!("{}  inputs: [{}]", flow.name(), inputs.join(", "));
            }
            Ok(())
        }
        Commands::Alerts(args) => {
            let input: AlertsInput = load_input(&args.input)?;
            let client = HttpModelClient::from_env().context("configure model client")?;
            let alerts = registry
                .generate_predictive_alerts(&client, &input)
                .context("generate predictive alerts")?;
            write_output(&alerts, args.out.as_deref())
        }
        Commands::Rank(args) => {
            let input: RankingInput = load_input(&args.input)?;
            let client = HttpModelClient::from_env().context("configure model client")?;
            let ranking = registry
                .rank_trains_for_induction(&client, &input)
                .context("rank trains for induction")?;
            write_output(&ranking, args.out.as_deref())
        }
        Commands::Simulate(args) => {
            let input: SimulationInput = load_input(&args.input)?;
            let client = HttpModelClient::from_env().context("configure model client")?;
            let projection = registry
                .run_what_if_simulation(&client, &input)
                .context("run what-if simulation")?;
            write_output(&projection, args.out.as_deref())
        }
        Commands::Clearance(args) => {
            let input: ClearanceInput = load_input(&args.input)?;
            let client = HttpModelClient::from_env().context("configure model client")?;
            let clearance = registry
                .predict_certificate_clearance(&client, &input)
                .context("predict certificate clearance")?;
            write_output(&clearance, args.out.as_deref())
        }
    }
}

fn load_input<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = if path.as_os_str() == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("read stdin")?;
        buffer
    } else {
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?
    };
    serde_json::from_str(&raw).with_context(|| format!("parse input JSON from {}", path.display()))
}

fn write_output<T: Serialize>(value: &T, out: Option<&Path>) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("serialize output")?;
    match out {
        Some(path) => fs::write(path, rendered + "\n")
            .with_context(|| format!("write {}", path.display()))?,
        None => println!("{rendered}"),
    }
    Ok(())
}
