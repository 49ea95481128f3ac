//! REPL – operator shell for the mission controller.
//!
//! Mode commands and toggles go through the [`ControllerHandle`]; safety
//! signals (`/estop`, `/teleop`, …) are published on the `SystemAlerts`
//! topic exactly as an external e-stop button or joystick would send them.

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use colored::Colorize;
use rsm_middleware::{EventBus, Topic};
use rsm_runtime::{ControllerHandle, ServiceRequest};
use rsm_types::{Event, EventPayload, InterruptSignal, ModeCommand, Pose, ServiceResponse};
use tokio::runtime::Runtime;

use crate::config::parse_policy;

/// Event source for everything the shell publishes.
pub const SOURCE: &str = "rsm-cli::repl";

/// One parsed shell line.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    Help,
    Service(ServiceRequest),
    Signal(InterruptSignal),
    Quit,
}

/// Parse a slash-command. The error is the text shown to the operator.
pub fn parse_command(line: &str) -> Result<ReplCommand, String> {
    let line = line.trim();
    let (head, arg) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };

    let command = match head {
        "/help" => ReplCommand::Help,
        "/explore" => ReplCommand::Service(ServiceRequest::Command(ModeCommand::StartExploration)),
        "/stop-explore" => {
            ReplCommand::Service(ServiceRequest::Command(ModeCommand::StopExploration))
        }
        "/waypoints" => ReplCommand::Service(ServiceRequest::SetWaypoints(parse_waypoints(arg)?)),
        "/follow" => {
            ReplCommand::Service(ServiceRequest::Command(ModeCommand::StartWaypointFollowing))
        }
        "/stop-follow" => {
            ReplCommand::Service(ServiceRequest::Command(ModeCommand::StopWaypointFollowing))
        }
        "/estop" => ReplCommand::Signal(InterruptSignal::EmergencyStopAsserted),
        "/clear-estop" => ReplCommand::Signal(InterruptSignal::EmergencyStopCleared),
        "/teleop" => ReplCommand::Signal(InterruptSignal::TeleoperationEngaged),
        "/release-teleop" => ReplCommand::Signal(InterruptSignal::TeleoperationDisengaged),
        "/resume" => ReplCommand::Service(ServiceRequest::Resume),
        "/reverse" => match arg {
            "on" => ReplCommand::Service(ServiceRequest::SetReverseMode(true)),
            "off" => ReplCommand::Service(ServiceRequest::SetReverseMode(false)),
            _ => return Err("usage: /reverse on|off".to_string()),
        },
        "/reset-sensor" => ReplCommand::Service(ServiceRequest::ResetSensorPose),
        "/mode" => match parse_policy(arg) {
            Some(policy) => ReplCommand::Service(ServiceRequest::SetExplorationMode(policy)),
            None => return Err("usage: /mode complete|interrupt".to_string()),
        },
        "/status" => ReplCommand::Service(ServiceRequest::Status),
        "/quit" | "/exit" => ReplCommand::Quit,
        other => return Err(format!("Unknown command '{other}'")),
    };
    Ok(command)
}

/// `"1,2; 3.5,-1"` → two poses. An empty argument clears the queue.
pub fn parse_waypoints(arg: &str) -> Result<Vec<Pose>, String> {
    arg.split(';')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (x, y) = pair
                .split_once(',')
                .ok_or_else(|| format!("waypoint '{pair}' must be x,y"))?;
            let x: f64 = x.trim().parse().map_err(|_| format!("bad x in '{pair}'"))?;
            let y: f64 = y.trim().parse().map_err(|_| format!("bad y in '{pair}'"))?;
            Ok(Pose::from_xy(x, y))
        })
        .collect()
}

/// Entry point for the interactive REPL.
///
/// `shutdown` is polled each iteration; when set the REPL exits cleanly.
pub fn run(runtime: &Runtime, handle: &ControllerHandle, bus: &EventBus, shutdown: Arc<AtomicBool>) {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        print!("{} ", "rsm>".bold().cyan());
        stdout.flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        }

        if line.trim().is_empty() {
            continue;
        }

        match parse_command(&line) {
            Ok(ReplCommand::Help) => cmd_help(),
            Ok(ReplCommand::Service(request)) => {
                match runtime.block_on(handle.call(request)) {
                    Ok(response) => print_response(&response),
                    Err(e) => {
                        println!("{}: {}", "Controller unavailable".red(), e);
                        break;
                    }
                }
            }
            Ok(ReplCommand::Signal(signal)) => {
                let event = Event::new(SOURCE, EventPayload::Interrupt(signal));
                match bus.publish_to(Topic::SystemAlerts, event) {
                    Ok(_) => {
                        println!("{} {:?}", "→ signal".dimmed(), signal);
                        // Alerts are served before service calls, so this
                        // status already reflects the signal.
                        if let Ok(status) = runtime.block_on(handle.status()) {
                            print_response(&status);
                        }
                    }
                    Err(e) => println!("{}: {}", "Publish failed".red(), e),
                }
            }
            Ok(ReplCommand::Quit) => {
                println!("{}", "Goodbye.".green());
                shutdown.store(true, Ordering::SeqCst);
                break;
            }
            Err(message) => {
                println!(
                    "{} Type {} for available commands.",
                    message.red(),
                    "/help".bold()
                );
            }
        }
    }
}

fn print_response(response: &ServiceResponse) {
    if response.success {
        println!("{} {}", "✓".green().bold(), response.message);
    } else {
        println!("{} {}", "✗".red().bold(), response.message.yellow());
    }
}

fn cmd_help() {
    println!();
    println!("{}", "Mission Controller Commands".bold().underline());
    let rows = [
        ("/explore", "start frontier exploration"),
        ("/stop-explore", "stop exploration"),
        ("/waypoints x,y;x,y", "replace the waypoint queue"),
        ("/follow", "start (or pause/unpause) waypoint following"),
        ("/stop-follow", "stop waypoint following"),
        ("/estop", "assert emergency stop"),
        ("/clear-estop", "clear the emergency stop signal"),
        ("/teleop", "hand control to the operator"),
        ("/release-teleop", "end teleoperation and resume"),
        ("/resume", "resume after an emergency stop"),
        ("/reverse on|off", "toggle reverse driving"),
        ("/reset-sensor", "drive the sensor joint home"),
        ("/mode complete|interrupt", "exploration goal policy"),
        ("/status", "controller summary"),
        ("/quit  /exit", "exit the shell"),
    ];
    for (command, what) in rows {
        println!("  {} {}", format!("{command:<26}").bold().cyan(), what);
    }
    println!();
}
