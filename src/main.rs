//! credit-engine CLI
//!
//! Drive the encrypted credit lifecycle from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Scripted walkthrough of one position's lifecycle
//! credit-engine demo
//!
//! # Random portfolio through a full lifecycle pass
//! credit-engine simulate --managers 8 --positions 5 --seed 42
//!
//! # Machine-readable report
//! credit-engine simulate --format json
//! ```

use credit_engine::core::actor::{ActorId, Role};
use credit_engine::core::cipher::InputProof;
use credit_engine::core::position::PositionId;
use credit_engine::engine::store::CreditEngine;
use credit_engine::simulation::oracle_sim::SimulatedOracle;
use credit_engine::simulation::scenario::{run_scenario, PortfolioConfig};
use std::process;

fn print_usage() {
    eprintln!(
        r#"credit-engine — encrypted credit position lifecycle engine

USAGE:
    credit-engine <COMMAND> [OPTIONS]

COMMANDS:
    demo        Walk one position through open, draw, review,
                rebalance and liquidation
    simulate    Run a random portfolio through a full lifecycle pass
    help        Show this message

OPTIONS (simulate):
    --managers <N>     Number of borrowing managers (default: 5)
    --positions <N>    Positions per manager (default: 4)
    --distressed <F>   Share of positions opened distressed (default: 0.3)
    --seed <N>         Seed for a reproducible run
    --format <FORMAT>  Output format: text (default) or json

EXAMPLES:
    credit-engine demo
    credit-engine simulate --managers 8 --positions 5 --seed 42
    credit-engine simulate --distressed 0.5 --format json"#
    );
}

fn cmd_demo() {
    let governor = ActorId::new("GOV");
    let council = ActorId::new("COUNCIL");
    let liquidator = ActorId::new("LIQUIDATOR-1");
    let acme = ActorId::new("ACME-TREASURY");
    let mut engine = CreditEngine::new(governor.clone(), council);
    let oracle = SimulatedOracle::new();

    let mut run = || -> Result<(), credit_engine::core::error::EngineError> {
        engine.grant_role(&governor, liquidator.clone(), Role::Liquidator)?;

        // A healthy position: open, draw, review.
        let healthy = PositionId::new("ACME-01");
        engine.open_position(
            &acme,
            healthy.clone(),
            None,
            credit_engine::simulation::scenario::demo_inputs(800, 0, 400),
        )?;
        engine.draw_credit(&acme, &healthy, 150, &InputProof::for_value(150))?;
        let request = engine.request_review(&acme, &healthy)?;
        oracle.answer(&mut engine, request)?;
        println!("--- Healthy position after review ---");
        println!(
            "{}",
            serde_json::to_string_pretty(&engine.review_summary(&healthy)?)
                .unwrap_or_default()
        );

        // A distressed one: review condemns it, liquidation clears it.
        let distressed = PositionId::new("ACME-02");
        engine.open_position(
            &acme,
            distressed.clone(),
            None,
            credit_engine::simulation::scenario::demo_inputs(100, 200, 250),
        )?;
        let request = engine.request_review(&acme, &distressed)?;
        oracle.answer(&mut engine, request)?;
        engine.initiate_rebalance(&acme, &distressed)?;
        engine.start_liquidation(&liquidator, &distressed, false)?;
        engine.complete_liquidation(
            &liquidator,
            &distressed,
            100,
            &InputProof::for_value(100),
            200,
            &InputProof::for_value(200),
        )?;
        println!("--- Distressed position after liquidation ---");
        println!(
            "{}",
            serde_json::to_string_pretty(&engine.position_summary(&distressed)?)
                .unwrap_or_default()
        );

        println!("--- Pool ---");
        println!(
            "{}",
            serde_json::to_string_pretty(&engine.pool_summary()).unwrap_or_default()
        );
        println!("--- Manager ---");
        println!(
            "{}",
            serde_json::to_string_pretty(&engine.manager_summary(&acme)?).unwrap_or_default()
        );
        Ok(())
    };

    if let Err(e) = run() {
        eprintln!("demo failed: {}", e);
        process::exit(1);
    }
}

fn cmd_simulate(args: &[String]) {
    let mut config = PortfolioConfig::default();
    let mut format = "text".to_string();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--managers" => {
                i += 1;
                config.manager_count = args
                    .get(i)
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(|| {
                        eprintln!("--managers requires a number");
                        process::exit(1);
                    });
            }
            "--positions" => {
                i += 1;
                config.positions_per_manager = args
                    .get(i)
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(|| {
                        eprintln!("--positions requires a number");
                        process::exit(1);
                    });
            }
            "--distressed" => {
                i += 1;
                config.distressed_share = args
                    .get(i)
                    .and_then(|s| s.parse().ok())
                    .filter(|f| (0.0..=1.0).contains(f))
                    .unwrap_or_else(|| {
                        eprintln!("--distressed requires a fraction between 0 and 1");
                        process::exit(1);
                    });
            }
            "--seed" => {
                i += 1;
                config.seed = Some(args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(
                    || {
                        eprintln!("--seed requires a number");
                        process::exit(1);
                    },
                ));
            }
            "--format" => {
                i += 1;
                format = args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--format requires 'text' or 'json'");
                    process::exit(1);
                });
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    match run_scenario(&config) {
        Ok((engine, report)) => {
            if format == "json" {
                #[derive(serde::Serialize)]
                struct SimulateOutput {
                    report: credit_engine::simulation::scenario::ScenarioReport,
                    pool: credit_engine::engine::store::PoolSummary,
                }
                let output = SimulateOutput {
                    report,
                    pool: engine.pool_summary(),
                };
                match serde_json::to_string_pretty(&output) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        eprintln!("Error serializing report: {}", e);
                        process::exit(1);
                    }
                }
            } else {
                println!("{}", report);
                let pool = engine.pool_summary();
                println!("\nPool");
                println!("  Opened:      {}", pool.opened);
                println!("  Active:      {}", pool.active);
                println!("  Liquidated:  {}", pool.liquidated);
                println!("  Closed:      {}", pool.closed);
            }
        }
        Err(e) => {
            eprintln!("simulation failed: {}", e);
            process::exit(1);
        }
    }
}

fn main() {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = args[1].as_str();
    let rest = &args[2..];

    match command {
        "demo" => cmd_demo(),
        "simulate" => cmd_simulate(rest),
        "help" | "--help" | "-h" => print_usage(),
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            process::exit(1);
        }
    }
}
