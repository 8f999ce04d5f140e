//! # Logging
//! src/logging.rs
//!
//! Inicializa `tracing-subscriber` con salida compacta a stderr, para que
//! stdout quede libre para el reporte.

use tracing_subscriber::EnvFilter;

/// Niveles aceptados por `--log-level`
pub const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

/// Construye el filtro a partir del nivel base
pub fn build_env_filter(level: &str) -> Result<EnvFilter, String> {
    let level = level.to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        return Err(format!("Unknown log level '{}'", level));
    }

    EnvFilter::try_new(format!("mps_db={}", level))
        .map_err(|e| format!("Invalid tracing filter '{}': {}", level, e))
}

/// Instala el subscriber global
///
/// Si ya hay uno instalado (por ejemplo en tests) no hace nada.
pub fn init_logging(level: &str) -> Result<(), String> {
    let filter = build_env_filter(level)?;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();

    tracing::trace!("Logging initialized: level={}", level);
    Ok(())
}
