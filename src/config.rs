//! # Configuración de la CLI
//! src/config.rs
//!
//! Argumentos de línea de comandos y variables de entorno de `mps_db`.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./mps_db --db jobData/mps.db report
//! ./mps_db class pede
//! ./mps_db report --json
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! MPS_DB=/afs/campaign/mps.db MPS_LOG=debug ./mps_db events
//! ```

use crate::logging::LOG_LEVELS;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Configuración de `mps_db`
#[derive(Debug, Clone, Parser)]
#[command(name = "mps_db")]
#[command(about = "Inspecciona y reescribe la base de datos de jobs de una campaña mille/pede")]
#[command(version = "0.1.0")]
pub struct Config {
    /// Ruta al archivo de la base de datos
    #[arg(long, default_value = "mps.db", env = "MPS_DB", global = true)]
    pub db: PathBuf,

    /// Nivel de logging (off, error, warn, info, debug, trace)
    #[arg(long = "log-level", default_value = "warn", env = "MPS_LOG", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Operaciones disponibles
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Imprime header, jobs y totales
    Report {
        /// Imprime sólo los totales en JSON
        #[arg(long)]
        json: bool,
    },

    /// Imprime la clase de batch de una etapa (mille o pede)
    Class { stage: String },

    /// Imprime el total de eventos de los jobs seriales
    Events,

    /// Carga y vuelve a guardar (renumera jobs, refresca header, crea respaldo)
    Rewrite,
}

impl Config {
    /// Valida la configuración
    ///
    /// Retorna errores si hay valores inválidos
    pub fn validate(&self) -> Result<(), String> {
        if self.db.as_os_str().is_empty() {
            return Err("Database path must not be empty".to_string());
        }

        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(format!(
                "Log level must be one of {}",
                LOG_LEVELS.join(", ")
            ));
        }

        Ok(())
    }
}
