//! # Utilidades de Tests
//! src/test_util.rs
//!
//! Helpers compartidos por los tests unitarios que escriben mps.db en el
//! directorio temporal del sistema.

use crate::jobs::storage::sibling_path;
use std::fs;
use std::path::{Path, PathBuf};

/// Ruta única en el directorio temporal
pub(crate) fn unique_temp_path(name: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut p = std::env::temp_dir();
    p.push(format!("{}_{}_{}.db", name, std::process::id(), nanos));
    p
}

/// Borra el archivo, su respaldo y un posible temporal
pub(crate) fn cleanup(path: &Path) {
    let _ = fs::remove_file(path);
    let _ = fs::remove_file(sibling_path(path, "~"));
    let _ = fs::remove_file(sibling_path(path, ".tmp"));
}

/// Header de 17 líneas con `class_inf` en la línea 5 y enteros en 0
pub(crate) fn campaign_header(class_inf: &str) -> String {
    format!("v1\ns.sh\nt.cfg\n\n{}\n\n\n\n\n0\n\n0\n\n0\n\n\n\n", class_inf)
}

/// Escribe un mps.db con el header de `campaign_header` y `body`
pub(crate) fn write_campaign(path: &Path, class_inf: &str, body: &str) {
    fs::write(path, format!("{}{}", campaign_header(class_inf), body)).unwrap();
}
