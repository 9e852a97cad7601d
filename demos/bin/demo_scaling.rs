//! Piece Scaling Demo
//!
//! Runs one circuit with the state split over 1, 2, 4, ... pieces, checks
//! every run against the single-piece state and reports wall-clock time.

use std::time::Instant;

use clap::Parser;
use num_complex::Complex64;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use qshard_demos::circuits::variational;
use qshard_demos::{
    create_progress_bar, log_filter, print_header, print_result, print_section, print_success,
};
use qshard_sim::{PolicyKind, SimConfig, Simulator};

#[derive(Parser, Debug)]
#[command(name = "demo-scaling")]
#[command(about = "Compare execution across piece counts")]
struct Args {
    /// Number of qubits
    #[arg(short = 'n', long, default_value = "16")]
    qubits: u32,

    /// Number of ansatz layers
    #[arg(short, long, default_value = "4")]
    layers: usize,

    /// Largest piece count to try
    #[arg(short, long, default_value = "16")]
    max_pieces: usize,

    /// Pick global qubits by gate usage instead of the highest indices
    #[arg(long)]
    least_touched: bool,

    /// Run pieces sequentially
    #[arg(long)]
    sequential: bool,

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

    print_header("Piece Scaling Demo");

    let circuit = variational(args.qubits, args.layers, 0.9, None)?;
    print_section("Problem Setup");
    print_result("Qubits", args.qubits);
    print_result("Gates", circuit.num_gates());
    print_result("Amplitudes", 1u64 << args.qubits);

    let policy = if args.least_touched {
        PolicyKind::LeastTouched
    } else {
        PolicyKind::Highest
    };
    let piece_counts: Vec<usize> = std::iter::successors(Some(1usize), |p| p.checked_mul(2))
        .take_while(|&p| p <= args.max_pieces && p.trailing_zeros() <= args.qubits)
        .collect();

    print_section("Running");
    let pb = create_progress_bar(piece_counts.len() as u64, "Simulating...");
    let mut reference: Option<Vec<Complex64>> = None;
    let mut rows = Vec::new();
    for &pieces in &piece_counts {
        let sim = Simulator::new(
            SimConfig::new()
                .with_pieces(pieces)
                .with_global_policy(policy)
                .with_parallel(!args.sequential),
        )?;
        let global = sim.plan(&circuit)?.global().to_vec();
        let mut run = circuit.clone();

        let start = Instant::now();
        let state = sim.execute(&mut run, None)?.into_state().to_complex64();
        let elapsed = start.elapsed();
        debug!(pieces, ?global, ?elapsed, "run finished");

        let deviation = reference.as_ref().map_or(0.0, |expected| {
            state
                .iter()
                .zip(expected)
                .map(|(a, b)| (a - b).norm())
                .fold(0.0, f64::max)
        });
        if reference.is_none() {
            reference = Some(state);
        }
        if deviation > 1e-8 {
            anyhow::bail!("{pieces} pieces deviate from the single-piece state by {deviation:e}");
        }
        rows.push((pieces, global, elapsed, deviation));
        pb.inc(1);
    }
    pb.finish_with_message("Done");

    print_section("Results");
    for (pieces, global, elapsed, deviation) in rows {
        print_result(
            &format!("{pieces:>3} pieces"),
            format!(
                "{:>9.3} ms  global {global:?}  max deviation {deviation:.2e}",
                elapsed.as_secs_f64() * 1e3
            ),
        );
    }

    println!();
    print_success("All piece counts agree with the single-piece state");
    Ok(())
}
