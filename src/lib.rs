//! # mps_db
//! src/lib.rs
//!
//! Base de datos en texto plano (mps.db) para campañas de alineamiento
//! con jobs mille seriales y un job de merge opcional.
//!
//! ## Arquitectura
//!
//! - `jobs`: registros, header, carga/guardado y reporte
//! - `config`: argumentos CLI y variables de entorno
//! - `commands`: subcomandos de la CLI
//! - `logging`: inicialización de tracing
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use mps_db::jobs::JobDatabase;
//!
//! let mut db = JobDatabase::load("mps.db").expect("load mps.db");
//! if let Some(job) = db.get_mut(0) {
//!     job.status = "SUBMIT".to_string();
//! }
//! db.save("mps.db").expect("save mps.db");
//! ```

pub mod commands;
pub mod config;
pub mod jobs;
pub mod logging;

#[cfg(test)]
mod test_util;
