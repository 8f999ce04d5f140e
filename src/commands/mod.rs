//! # Comandos de la CLI
//! src/commands/mod.rs
//!
//! Cada subcomando carga la base de datos indicada por `--db` y escribe su
//! resultado en el writer recibido (stdout en `main`).
//!
//! - **report**: header, tabla de jobs y totales (o totales en JSON)
//! - **class**: clase de batch para mille o pede
//! - **events**: total de eventos de los jobs seriales
//! - **rewrite**: guarda de nuevo la base de datos, con respaldo

use crate::config::{Command, Config};
use crate::jobs::{DbError, JobDatabase, Result};
use std::io::Write;
use tracing::debug;

/// Ejecuta el subcomando de `config`
pub fn run<W: Write>(config: &Config, out: &mut W) -> Result<()> {
    debug!(command = ?config.command, db = %config.db.display(), "running command");

    let stdout_err = |e: std::io::Error| DbError::io("<stdout>", e);
    let mut db = JobDatabase::load(&config.db)?;

    match &config.command {
        Command::Report { json: false } => db.report(out).map_err(stdout_err)?,
        Command::Report { json: true } => {
            let summary = serde_json::to_string_pretty(&db.summary()).map_err(|e| {
                DbError::io("<stdout>", std::io::Error::new(std::io::ErrorKind::Other, e))
            })?;
            writeln!(out, "{}", summary).map_err(stdout_err)?;
        }
        Command::Class { stage } => {
            let class = db.get_class(stage)?;
            writeln!(out, "{}", class).map_err(stdout_err)?;
        }
        Command::Events => {
            writeln!(out, "{}", db.total_events()).map_err(stdout_err)?;
        }
        Command::Rewrite => {
            db.save(&config.db)?;
            writeln!(out, "{} jobs written to {}", db.len(), config.db.display())
                .map_err(stdout_err)?;
        }
    }

    Ok(())
}
