//! Entanglement Entropy Demo
//!
//! Tracks the entanglement entropy of a bipartition after every layer of a
//! variational circuit, with the state split over several pieces.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use qshard_demos::circuits::{bell_with_callbacks, variational};
use qshard_demos::{log_filter, print_header, print_result, print_section, print_success};
use qshard_ir::QubitId;
use qshard_sim::{Callback, Precision, SimConfig, Simulator, Stacked};

#[derive(Parser, Debug)]
#[command(name = "demo-entropy")]
#[command(about = "Entanglement entropy along a variational circuit")]
struct Args {
    /// Number of qubits
    #[arg(short = 'n', long, default_value = "8")]
    qubits: u32,

    /// Number of ansatz layers
    #[arg(short, long, default_value = "6")]
    layers: usize,

    /// Rotation angle scale
    #[arg(short, long, default_value = "0.7")]
    theta: f64,

    /// Number of pieces (power of two)
    #[arg(short, long, default_value = "4")]
    pieces: usize,

    /// Amplitude precision (single, double)
    #[arg(long, default_value = "double")]
    precision: Precision,

    /// Qubits kept in the subsystem; defaults to the first half
    #[arg(short, long, value_delimiter = ',')]
    subsystem: Vec<u32>,

    /// YAML configuration file, overriding --pieces and --precision
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase log verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_filter(args.verbose)))
        .with_target(false)
        .init();

    let config = match &args.config {
        Some(path) => SimConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => SimConfig::new()
            .with_pieces(args.pieces)
            .with_precision(args.precision),
    };
    let sim = Simulator::new(config)?;

    print_header("Entanglement Entropy Demo");

    print_section("Bell Pair");
    let bell_entropy = Arc::new(Callback::entanglement_entropy([QubitId(0)]));
    let mut bell = bell_with_callbacks(&bell_entropy)?;
    Simulator::new(SimConfig::new())?.execute(&mut bell, None)?;
    for (i, label) in ["initial", "after H", "after CNOT"].iter().enumerate() {
        print_result(label, format!("{:.4}", bell_entropy.scalar(i)?));
    }

    print_section("Problem Setup");
    let entropy = if args.subsystem.is_empty() {
        Callback::entanglement_entropy((0..args.qubits.div_ceil(2)).map(QubitId))
    } else {
        Callback::entanglement_entropy(args.subsystem.iter().copied().map(QubitId))
    };
    let entropy = Arc::new(entropy);
    let mut circuit = variational(args.qubits, args.layers, args.theta, Some(&entropy))?;

    let partition = sim.plan(&circuit)?;
    print_result("Qubits", args.qubits);
    print_result("Layers", args.layers);
    print_result("Gates", circuit.num_gates());
    print_result("Depth", circuit.depth());
    print_result("Precision", sim.config().precision());
    print_result("Pieces", partition.num_pieces());
    print_result("Global qubits", format!("{:?}", partition.global()));
    print_result("Subsystem", format!("{:?}", entropy.subsystem().unwrap_or(&[])));

    print_section("Execution");
    let result = sim.execute(&mut circuit, None)?;
    info!(norm = result.state().norm_sqr(), "final state");

    let Stacked::Scalars(values) = entropy.stacked(..)? else {
        anyhow::bail!("entropy callback returned matrices");
    };
    for (layer, s) in values.iter().enumerate() {
        let bar = "█".repeat((s * 10.0).round().max(0.0) as usize);
        print_result(&format!("Layer {}", layer + 1), format!("{s:.4} {bar}"));
    }

    println!();
    print_success("Entropy trajectory complete");
    Ok(())
}
