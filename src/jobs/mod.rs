//! # Base de Datos de Jobs (mps.db)
//!
//! Registro en texto plano de los jobs mille y del job de merge de una
//! campaña de alineamiento.
//!
//! ## Formato
//!
//! - 17 líneas de header en orden fijo
//! - una línea por job: `NNN:dir:id:status:retries:runtime:nevt:host:incr:remark:sp1:sp2:sp3`

pub mod error;
pub mod header;
pub mod report;
pub mod storage;
pub mod types;

pub use error::{DbError, Result};
pub use header::DbHeader;
pub use report::Summary;
pub use storage::JobDatabase;
pub use types::{JobRecord, Stage, MERGE_JOB_PREFIX};
