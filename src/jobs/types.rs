//! # Registro de un Job
//! src/jobs/types.rs
//!
//! Representa una fila del cuerpo de mps.db: un job mille o el job de merge.

use crate::jobs::error::{parse_field, DbError, Result};
use std::fmt;
use std::str::FromStr;

/// Prefijo reservado del directorio del job de merge
pub const MERGE_JOB_PREFIX: &str = "jobm";

/// Número de campos de una línea del cuerpo (incluyendo el índice)
pub const RECORD_FIELD_COUNT: usize = 13;

/// Estado inicial de un job recién creado
pub const DEFAULT_STATUS: &str = "SETUP";

/// Un job de la campaña
///
/// `status` se mantiene como texto opaco ("SETUP", "SUBMIT", "RUN", "DONE",
/// "FAIL", ...); no se valida.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    /// Número del job (1-based)
    pub index: u32,

    /// Nombre del directorio del job (no la ruta completa)
    pub dir: String,

    /// ID asignado por el scheduler (LSF/HTCondor)
    pub id: String,

    /// Estado del job
    pub status: String,

    /// Número de reintentos
    pub retries: u32,

    /// Tiempo de CPU acumulado (segundos)
    pub runtime: u64,

    /// Eventos procesados
    pub nevt: u64,

    /// Host o comentario libre
    pub host: String,

    /// Incremento de CPU desde el último chequeo
    pub incr: i64,

    /// Comentario
    pub remark: String,

    /// Campo libre
    pub sp1: String,

    /// Peso para pede
    pub sp2: String,

    /// Nombre dado por el usuario al crear la campaña
    pub sp3: String,
}

impl JobRecord {
    /// Crea un job nuevo en estado SETUP, sin CPU ni eventos
    pub fn new(index: u32, dir: impl Into<String>) -> Self {
        Self {
            index,
            dir: dir.into(),
            id: String::new(),
            status: DEFAULT_STATUS.to_string(),
            retries: 0,
            runtime: 0,
            nevt: 0,
            host: String::new(),
            incr: 0,
            remark: String::new(),
            sp1: String::new(),
            sp2: String::new(),
            sp3: String::new(),
        }
    }

    /// Construye un job a partir de los 13 valores posicionales
    ///
    /// Orden: index, dir, id, status, retries, runtime, nevt, host, incr,
    /// remark, sp1, sp2, sp3. El `id` se conserva tal cual; el resto de
    /// campos de texto se recortan.
    pub fn from_fields(fields: &[&str]) -> Result<Self> {
        if fields.len() != RECORD_FIELD_COUNT {
            return Err(DbError::FieldCount {
                expected: RECORD_FIELD_COUNT,
                found: fields.len(),
            });
        }

        Ok(Self {
            index: parse_field(fields[0], "index")?,
            dir: fields[1].trim().to_string(),
            id: fields[2].to_string(),
            status: fields[3].trim().to_string(),
            retries: parse_field(fields[4], "retries")?,
            runtime: parse_field(fields[5], "runtime")?,
            nevt: parse_field(fields[6], "nevt")?,
            host: fields[7].trim().to_string(),
            incr: parse_field(fields[8], "incr")?,
            remark: fields[9].trim().to_string(),
            sp1: fields[10].trim().to_string(),
            sp2: fields[11].trim().to_string(),
            sp3: fields[12].trim().to_string(),
        })
    }

    /// Verifica si es el job de merge
    pub fn is_merge_job(&self) -> bool {
        self.dir.starts_with(MERGE_JOB_PREFIX)
    }

    /// Línea canónica para el archivo, sin el índice
    ///
    /// # Ejemplo
    /// ```
    /// use mps_db::jobs::JobRecord;
    ///
    /// let job = JobRecord::new(1, "job001");
    /// assert_eq!(job.serialize(), "job001::SETUP:0:0:0::0::::\n");
    /// ```
    pub fn serialize(&self) -> String {
        format!(
            "{}:{}:{}:{}:{}:{}:{}:{}:{}:{}:{}:{}\n",
            self.dir,
            self.id,
            self.status,
            self.retries,
            self.runtime,
            self.nevt,
            self.host,
            self.incr,
            self.remark,
            self.sp1,
            self.sp2,
            self.sp3
        )
    }

    /// Verifica que los campos de texto se puedan escribir y volver a leer
    ///
    /// `position` es el número de línea (1-based) que tendrá el job al
    /// guardarse; sólo se usa en el error.
    pub fn check_fields(&self, position: usize) -> Result<()> {
        let text_fields = [
            ("dir", &self.dir),
            ("id", &self.id),
            ("status", &self.status),
            ("host", &self.host),
            ("remark", &self.remark),
            ("sp1", &self.sp1),
            ("sp2", &self.sp2),
            ("sp3", &self.sp3),
        ];

        for (field, value) in text_fields {
            if value.contains([':', '\n', '\r']) {
                return Err(DbError::InvalidField {
                    position,
                    field,
                    value: value.clone(),
                });
            }
        }
        Ok(())
    }

    /// Línea de ancho fijo para el reporte
    pub fn describe(&self) -> String {
        let number = if self.is_merge_job() {
            "MMM".to_string()
        } else {
            format!("{:03}", self.index)
        };

        format!(
            "{}  {:>6}  {:>9}  {:>6}  {:>3}  {:>5}  {:>8}  {:>8}  {:>5}  {}",
            number,
            self.dir,
            self.id,
            self.status,
            self.retries,
            self.runtime,
            self.nevt,
            self.host,
            self.sp2,
            self.sp3
        )
    }
}

/// Etapa de la campaña para la que se pide la clase de batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Jobs seriales
    Mille,

    /// Job de alineamiento
    Pede,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Mille => "mille",
            Stage::Pede => "pede",
        }
    }
}

impl FromStr for Stage {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mille" => Ok(Stage::Mille),
            "pede" => Ok(Stage::Pede),
            other => Err(DbError::Configuration(format!(
                "Know class only for 'mille' or 'pede', not '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
