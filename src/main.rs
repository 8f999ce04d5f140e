//! # mps_db - Entry Point
//! src/main.rs
//!
//! Parsea la CLI, inicializa el logging y ejecuta el subcomando.

use clap::Parser;
use mps_db::commands;
use mps_db::config::Config;
use mps_db::logging;

fn main() {
    let config = Config::parse();

    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = logging::init_logging(&config.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();

    if let Err(e) = commands::run(&config, &mut handle) {
        eprintln!("mps_db: {}", e);
        std::process::exit(1);
    }
}
