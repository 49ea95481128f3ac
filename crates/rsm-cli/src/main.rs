//! `rsm-cli` – mission controller shell
//!
//! 1. Loads `~/.rsm/config.toml`, writing defaults on first run.
//! 2. Starts the control loop on a Tokio runtime.
//! 3. Drops the operator into a slash-command REPL.
//! 4. Intercepts **Ctrl-C** to assert an emergency stop on the bus and exit.

mod config;
mod repl;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use colored::Colorize;
use rsm_additions::SimActuator;
use rsm_middleware::{EventBus, Topic};
use rsm_runtime::{MissionController, spawn_control_loop};
use rsm_types::{Event, EventPayload, InterruptSignal};
use tracing::{error, info, warn};

fn main() {
    let _tracing = rsm_runtime::init_tracing("rsm");

    print_banner();

    let cfg = match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => {
            let cfg = config::Config::default();
            match config::save(&cfg) {
                Ok(()) => println!(
                    "  {} Default config written to {}",
                    "✓".green().bold(),
                    config::config_path().display().to_string().bold()
                ),
                Err(e) => println!("{}: {}", "Error saving config".red(), e),
            }
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            config::Config::default()
        }
    };
    let controller_config = cfg.to_controller_config();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to start Tokio runtime");
            std::process::exit(1);
        }
    };

    let bus = EventBus::new(controller_config.bus_capacity);
    let joint = Box::new(SimActuator::new(controller_config.sensor_joint_id.clone()));
    let controller = match MissionController::new(&controller_config, bus.clone(), joint) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "controller setup failed");
            std::process::exit(1);
        }
    };

    let shutdown = Arc::new(AtomicBool::new(false));

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    let shutdown_ctrlc = Arc::clone(&shutdown);
    let bus_ctrlc = bus.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – asserting emergency stop …".yellow().bold());
        let stop = Event::new(
            "rsm-cli",
            EventPayload::Interrupt(InterruptSignal::EmergencyStopAsserted),
        );
        match bus_ctrlc.publish_to(Topic::SystemAlerts, stop) {
            Ok(_) => println!("{}", "  ✓ EmergencyStop published to Event Bus.".green()),
            Err(e) => println!("{}: {}", "  EmergencyStop publish failed".red(), e),
        }
        println!("{}", "  Press Enter to exit.".dimmed());
        shutdown_ctrlc.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; emergency stop on Ctrl-C will not be available");
    }

    let (handle, task) = {
        let _entered = runtime.enter();
        spawn_control_loop(
            controller,
            controller_config.tick_period(),
            Arc::clone(&shutdown),
        )
    };

    println!();
    println!("  Type {} for a list of commands.\n", "/help".bold().cyan());

    repl::run(&runtime, &handle, &bus, Arc::clone(&shutdown));

    shutdown.store(true, Ordering::SeqCst);
    drop(handle);
    match runtime.block_on(task) {
        Ok(controller) => info!(status = %controller.status(), "controller stopped"),
        Err(e) => error!(error = %e, "control loop task failed"),
    }
}

fn print_banner() {
    println!();
    println!("{}", r#"   ___  ___ __  __ "#.bold().cyan());
    println!("{}", r#"  | _ \/ __|  \/  |"#.bold().cyan());
    println!("{}", r#"  |   /\__ \ |\/| |"#.bold().cyan());
    println!("{}", r#"  |_|_\|___/_|  |_|"#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "RSM".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Robot Mission Controller");
    println!();
}
