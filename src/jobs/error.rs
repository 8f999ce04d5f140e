//! # Errores de la Base de Datos de Jobs
//! src/jobs/error.rs
//!
//! Taxonomía de errores que puede devolver `JobDatabase`. Ningún error
//! termina el proceso: todos se propagan al llamador.

use std::path::PathBuf;
use thiserror::Error;

/// Errores posibles al manipular un mps.db
#[derive(Debug, Error)]
pub enum DbError {
    /// El archivo a cargar no existe
    #[error(
        "No {} found. Make sure you are in a campaign directory and that the campaign is set up.",
        .path.display()
    )]
    FileNotFound { path: PathBuf },

    /// Cualquier otro fallo de I/O sobre el archivo
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Un campo entero no pudo parsearse (o falta una línea del header)
    #[error("line {line}: cannot parse field '{field}' from '{value}'")]
    Parse {
        line: usize,
        field: &'static str,
        value: String,
    },

    /// Una línea del cuerpo no tiene exactamente 13 campos
    #[error("line {line}: expected 13 ':'-separated fields, found {found}: '{content}'")]
    MalformedLine {
        line: usize,
        found: usize,
        content: String,
    },

    /// Se intentó construir un JobRecord con un número incorrecto de valores
    #[error("a job record needs {expected} fields, got {found}")]
    FieldCount { expected: usize, found: usize },

    /// Un campo de texto de un job no podría volver a leerse del archivo
    #[error("job {position}: field '{field}' must not contain ':' or line breaks: '{value}'")]
    InvalidField {
        position: usize,
        field: &'static str,
        value: String,
    },

    /// Clase de batch mal formada o etapa desconocida
    #[error("configuration error: {0}")]
    Configuration(String),

    /// `pop()` sobre una base de datos sin jobs
    #[error("cannot pop from an empty job database")]
    EmptyCollection,
}

impl DbError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DbError::Io {
            path: path.into(),
            source,
        }
    }

    /// Fija el número de línea en errores de parseo construidos sin contexto
    pub(crate) fn at_line(self, line: usize) -> Self {
        match self {
            DbError::Parse { field, value, .. } => DbError::Parse { line, field, value },
            other => other,
        }
    }
}

/// Parsea un campo entero, tolerando espacios alrededor
pub(crate) fn parse_field<T: std::str::FromStr>(raw: &str, field: &'static str) -> Result<T> {
    raw.trim().parse::<T>().map_err(|_| DbError::Parse {
        line: 0,
        field,
        value: raw.to_string(),
    })
}

pub type Result<T> = std::result::Result<T, DbError>;
