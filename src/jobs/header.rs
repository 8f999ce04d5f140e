//! # Header de mps.db
//! src/jobs/header.rs
//!
//! Las primeras 17 líneas del archivo, en orden fijo. Sólo el versionado,
//! los timestamps y los campos spare se regeneran al escribir.

use crate::jobs::error::{parse_field, DbError, Result};
use std::io::{BufRead, Lines, Write};
use std::path::Path;

/// Número de líneas del header
pub const HEADER_LINES: usize = 17;

/// Versión de esquema que se escribe en cada guardado
pub const SCHEMA_VERSION: &str = "mps database schema 3.2";

/// Marcador de los campos spare tras un guardado
pub const UNUSED_MARKER: &str = "-- unused --";

/// Nombres de los campos del header, en orden de archivo
pub const HEADER_FIELDS: [&str; HEADER_LINES] = [
    "header",
    "batchScript",
    "cfgTemplate",
    "infiList",
    "classInf",
    "addFiles",
    "driver",
    "mergeScript",
    "mssDir",
    "updateTime",
    "updateTimeHuman",
    "elapsedTime",
    "mssDirPool",
    "pedeMem",
    "spare1",
    "spare2",
    "spare3",
];

/// Metadatos generales de la campaña
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DbHeader {
    /// Información de versión
    pub header: String,

    /// Script base del job serial
    pub batch_script: String,

    /// Template del archivo cfg
    pub cfg_template: String,

    /// Lista de archivos de entrada
    pub infi_list: String,

    /// Clase de batch; puede ser `clase` o `claseMille:clasePede`
    pub class_inf: String,

    /// Nombre del job para el envío
    pub add_files: String,

    /// Indica si se prevé un job de merge
    pub driver: String,

    /// Script base del job de merge
    pub merge_script: String,

    /// Directorio de mass storage
    pub mss_dir: String,

    /// Última actualización (segundos desde 1970); 0 = nunca escrito
    pub update_time: i64,

    /// Última actualización, legible
    pub update_time_human: String,

    /// Segundos desde la actualización anterior
    pub elapsed_time: i64,

    /// Pool para `mss_dir`
    pub mss_dir_pool: String,

    /// Memoria asignada a pede
    pub pede_mem: i64,

    pub spare1: String,
    pub spare2: String,
    pub spare3: String,
}

impl DbHeader {
    /// Lee las 17 líneas del header desde el inicio de `lines`
    ///
    /// `path` sólo se usa para contextualizar errores de I/O.
    pub fn read_from<R: BufRead>(lines: &mut Lines<R>, path: &Path) -> Result<Self> {
        let mut raw: Vec<String> = Vec::with_capacity(HEADER_LINES);

        for (i, &field) in HEADER_FIELDS.iter().enumerate() {
            match lines.next() {
                Some(Ok(line)) => raw.push(line),
                Some(Err(e)) => return Err(DbError::io(path, e)),
                None => {
                    return Err(DbError::Parse {
                        line: i + 1,
                        field,
                        value: String::new(),
                    })
                }
            }
        }

        let int = |pos: usize| -> Result<i64> {
            parse_field(&raw[pos], HEADER_FIELDS[pos]).map_err(|e| e.at_line(pos + 1))
        };

        Ok(Self {
            header: raw[0].trim().to_string(),
            batch_script: raw[1].clone(),
            cfg_template: raw[2].clone(),
            infi_list: raw[3].clone(),
            class_inf: raw[4].clone(),
            add_files: raw[5].clone(),
            driver: raw[6].clone(),
            merge_script: raw[7].clone(),
            mss_dir: raw[8].clone(),
            update_time: int(9)?,
            update_time_human: raw[10].clone(),
            elapsed_time: int(11)?,
            mss_dir_pool: raw[12].clone(),
            pede_mem: int(13)?,
            spare1: raw[14].clone(),
            spare2: raw[15].clone(),
            spare3: raw[16].clone(),
        })
    }

    /// Escribe las 17 líneas en orden
    pub fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        for line in self.lines() {
            writeln!(out, "{}", line)?;
        }
        Ok(())
    }

    /// Valores del header como texto, en orden de archivo
    pub fn lines(&self) -> [String; HEADER_LINES] {
        [
            self.header.clone(),
            self.batch_script.clone(),
            self.cfg_template.clone(),
            self.infi_list.clone(),
            self.class_inf.clone(),
            self.add_files.clone(),
            self.driver.clone(),
            self.merge_script.clone(),
            self.mss_dir.clone(),
            self.update_time.to_string(),
            self.update_time_human.clone(),
            self.elapsed_time.to_string(),
            self.mss_dir_pool.clone(),
            self.pede_mem.to_string(),
            self.spare1.clone(),
            self.spare2.clone(),
            self.spare3.clone(),
        ]
    }

    /// Regenera los campos que cambian en cada escritura
    ///
    /// `now` en segundos desde 1970; `now_human` es su versión legible.
    pub fn refresh(&mut self, now: i64, now_human: String) {
        self.header = SCHEMA_VERSION.to_string();
        self.elapsed_time = if self.update_time == 0 {
            0
        } else {
            now - self.update_time
        };
        self.update_time = now;
        self.update_time_human = now_human;
        self.spare1 = UNUSED_MARKER.to_string();
        self.spare2 = UNUSED_MARKER.to_string();
        self.spare3 = UNUSED_MARKER.to_string();
    }
}
