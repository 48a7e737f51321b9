//! RSU Attack Simulator CLI
//!
//! Runs the attack simulation engine against a synthetic RSU grid or an RSU
//! snapshot file and reports what happened to the network.
use clap::Parser;
use colored::*;
use rsu_trust_sim::attack_sim::AttackMetrics;
use rsu_trust_sim::{
    AttackSimulationEngine, InMemoryLedger, OptionsUpdate, Rsu, SimulationOptions, SimulationStats,
};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Grid pitch in degrees (~0.9 km at mid latitudes)
const GRID_SPACING_DEG: f64 = 0.008;

#[derive(Parser, Debug)]
#[command(name = "attack_simulator")]
#[command(about = "V2X roadside-unit attack simulation and trust scoring")]
struct Args {
    /// JSON array of RSU records; a synthetic grid is used when omitted
    #[arg(long)]
    rsus: Option<PathBuf>,

    /// Number of RSUs in the synthetic grid
    #[arg(long, default_value_t = 25)]
    count: usize,

    /// Grid centre latitude
    #[arg(long, default_value_t = 40.7128)]
    lat: f64,

    /// Grid centre longitude
    #[arg(long, default_value_t = -74.0060, allow_hyphen_values = true)]
    lng: f64,

    /// JSON options file (camelCase fields)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Attack frequency in percent (1-30)
    #[arg(long)]
    frequency: Option<f64>,

    /// Attacker skill level (20-90)
    #[arg(long)]
    skill: Option<f64>,

    /// Network defense level (30-90)
    #[arg(long)]
    defense: Option<f64>,

    /// Disable topology degradation and propagation
    #[arg(long)]
    no_network_effects: bool,

    /// Seed a few demo attacks on start
    #[arg(long)]
    demo: bool,

    /// Run time in seconds
    #[arg(long, short = 'd', default_value_t = 10)]
    duration: u64,

    /// RNG seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// Only print the final summary
    #[arg(long, short = 'q')]
    quiet: bool,

    /// Print final stats as JSON instead of the table
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut options = match &args.config {
        Some(path) => match SimulationOptions::from_json_file(path) {
            Ok(options) => options,
            Err(e) => {
                eprintln!("{} {}", "✗".red(), e);
                process::exit(1);
            }
        },
        None => SimulationOptions::default(),
    };
    options.merge(&OptionsUpdate {
        attack_frequency: args.frequency,
        attacker_skill_level: args.skill,
        defense_level: args.defense,
        enable_network_effects: args.no_network_effects.then_some(false),
        seed_demo_attacks: args.demo.then_some(true),
        ..Default::default()
    });

    let rsus = match &args.rsus {
        Some(path) => load_rsus(path)?,
        None => synthetic_grid(args.count, args.lat, args.lng),
    };

    print_banner(&options, rsus.len(), args.duration);

    let engine = AttackSimulationEngine::new(options, args.seed);
    let ledger = InMemoryLedger::new();
    engine.set_ledger(Arc::new(ledger.clone()));

    if !args.quiet && !args.json {
        engine.on_attack_generated(|event| {
            let outcome = if event.mitigated {
                "MITIGATED".green().bold()
            } else if event.success {
                "SUCCESS".red().bold()
            } else {
                "FAILED".yellow()
            };
            let detected = if event.detected { "detected".cyan() } else { "undetected".dimmed() };
            println!(
                "  {} {:<32} {:<28} → {:<8} {} {} ({} nodes)",
                "⚡".yellow(),
                event.attack.name.bright_white(),
                event.attacker_profile,
                event.target_id.bright_yellow(),
                outcome,
                detected,
                event.affected_nodes.len(),
            );
        });
    }

    engine.start(rsus)?;
    tokio::time::sleep(Duration::from_secs(args.duration)).await;
    engine.stop();

    let stats = engine.stats();
    let history = engine.attack_history();
    info!(ledger_entries = ledger.len(), chain_valid = ledger.verify_chain(), "run finished");

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    print_stats(&stats);
    print_metrics(&AttackMetrics::from_events(&history));
    println!(
        "  Ledger entries:    {} ({})",
        ledger.len().to_string().bright_white(),
        if ledger.verify_chain() { "chain intact".green() } else { "chain broken".red() }
    );
    println!();

    Ok(())
}

fn load_rsus(path: &Path) -> Result<Vec<Rsu>, Box<dyn std::error::Error + Send + Sync>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    Ok(serde_json::from_str(&raw)?)
}

/// Square-ish grid of RSUs centred on (lat, lng)
fn synthetic_grid(count: usize, lat: f64, lng: f64) -> Vec<Rsu> {
    let side = (count as f64).sqrt().ceil().max(1.0) as usize;
    let offset = (side as f64 - 1.0) / 2.0;

    (0..count)
        .map(|i| {
            let row = (i / side) as f64 - offset;
            let col = (i % side) as f64 - offset;
            Rsu::new(
                format!("RSU-{:03}", i + 1),
                lat + row * GRID_SPACING_DEG,
                lng + col * GRID_SPACING_DEG,
            )
        })
        .collect()
}

fn print_banner(options: &SimulationOptions, rsu_count: usize, duration: u64) {
    println!();
    println!("{}", "═══════════════════════════════════════".red().bold());
    println!("{}", "    RSU Attack Simulator               ".red().bold());
    println!("{}", "═══════════════════════════════════════".red().bold());
    println!();
    println!("  RSUs:              {}", rsu_count.to_string().bright_white());
    println!("  Attack frequency:  {}%", options.attack_frequency.to_string().bright_white());
    println!("  Attacker skill:    {}", options.attacker_skill_level.to_string().bright_white());
    println!("  Defense level:     {}", options.defense_level.to_string().bright_white());
    println!("  Tick interval:     {} ms", options.interval().as_millis().to_string().bright_white());
    println!("  Duration:          {} seconds", duration.to_string().bright_white());
    println!();
}

fn print_stats(stats: &SimulationStats) {
    println!();
    println!("{}", "═══════════════════════════════════════".green());
    println!("{}", "   Simulation Completed                ".green().bold());
    println!("{}", "═══════════════════════════════════════".green());
    println!();
    println!("  Attacks attempted: {}", stats.attacks_attempted.to_string().bright_white());
    println!(
        "  Successful:        {} ({:.1}%)",
        stats.attacks_successful.to_string().bright_white(),
        stats.success_rate() * 100.0
    );
    println!(
        "  Detected:          {} ({:.1}%)",
        stats.attacks_detected.to_string().bright_white(),
        stats.detection_rate() * 100.0
    );
    println!("  Mitigated:         {}", stats.attacks_mitigated.to_string().bright_white());
    println!("  RSUs compromised:  {}", stats.rsus_compromised.to_string().bright_yellow());
    println!("  RSUs quarantined:  {}", stats.rsus_quarantined.to_string().bright_red());
    println!("  Trust updates:     {}", stats.trust_updates.to_string().bright_white());
    println!("  Blockchain txs:    {}", stats.blockchain_txs.to_string().bright_white());
    println!("  Network degraded:  {:.1}%", stats.network_degradation * 100.0);
}

fn print_metrics(metrics: &AttackMetrics) {
    if metrics.total.attempted == 0 {
        return;
    }

    println!();
    println!("{}", "  By attack vector:".bold());
    for (name, breakdown) in &metrics.by_vector {
        println!(
            "    {:<32} {:>4} attempts  {:>5.1}% success  {:>5.1}% detected",
            name,
            breakdown.attempted,
            breakdown.success_rate() * 100.0,
            breakdown.detection_rate() * 100.0
        );
    }
    println!("{}", "  By attacker:".bold());
    for (name, breakdown) in &metrics.by_attacker {
        println!(
            "    {:<32} {:>4} attempts  {:>5.1}% success",
            name,
            breakdown.attempted,
            breakdown.success_rate() * 100.0
        );
    }
    if let Some((name, rate)) = metrics.most_effective_vector() {
        println!("  Most effective:    {} ({:.1}%)", name.bright_red(), rate * 100.0);
    }
    println!();
}
