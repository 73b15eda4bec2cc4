use alm_importer::{extract, load, AnalysisConfig, TrialFlag};
use std::env;
use std::error::Error;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <session.nwb> [config.toml]", args[0]);
        std::process::exit(1);
    }

    // Load the session file
    let session = load(&args[1])?;
    let config = match args.get(2) {
        Some(path) => AnalysisConfig::load(path)?,
        None => AnalysisConfig::default(),
    };

    // Print basic session information
    println!("Session start: {}", session.session_start_time());
    println!("Number of trials: {}", session.num_trials());
    println!("Number of units: {}", session.num_units());

    for flag in TrialFlag::ALL {
        println!("  {:<12} {} trials", flag.name(), session.trials(flag).len());
    }

    // List the first few trials
    println!("\nTrials:");
    for (i, record) in session.trial_table().iter().enumerate().take(5) {
        println!(
            "  {}: start {:.4}  pole out {:.4}  lick stop {:.4}  {:?} {:?}",
            i,
            record.start_time,
            record.pole_out_time,
            record.lick_stop_time,
            record.direction,
            record.outcome
        );
    }
    if session.num_trials() > 5 {
        println!("  ... and {} more", session.num_trials() - 5);
    }

    // Feature matrices for downstream modeling
    let extraction = extract(&session, &config)?;
    println!("\nGood trials: {}", extraction.trials.len());
    println!(
        "Pole-out features: {} trials x {} units",
        extraction.pole_out.num_trials(),
        extraction.pole_out.num_units()
    );
    println!(
        "Movement features: {} trials x {} units",
        extraction.movement.num_trials(),
        extraction.movement.num_units()
    );

    Ok(())
}
