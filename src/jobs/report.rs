//! # Reporte de la Base de Datos
//! src/jobs/report.rs
//!
//! Imprime el header, la tabla de jobs y los totales, al estilo del
//! printout clásico de mps.db.

use crate::jobs::storage::JobDatabase;
use serde::Serialize;
use std::io::{self, Write};

/// Totales de la campaña (sólo jobs seriales)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub n_jobs: usize,
    pub total_events: u64,
    pub total_cpu: u64,
    pub mean_cpu_per_event: f64,
}

impl JobDatabase {
    /// Calcula los totales
    pub fn summary(&self) -> Summary {
        Summary {
            n_jobs: self.n_jobs(),
            total_events: self.total_events(),
            total_cpu: self.total_cpu(),
            mean_cpu_per_event: self.mean_cpu_per_event(),
        }
    }

    /// Escribe el reporte completo en `out`
    pub fn report<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let h = self.header();

        writeln!(out, "\n=== mps database printout ===\n")?;
        writeln!(out, "{}", h.header)?;
        writeln!(out, "Script:\t\t{}", h.batch_script)?;
        writeln!(out, "cfg:\t\t{}", h.cfg_template)?;
        writeln!(out, "files:\t\t{}", h.infi_list)?;
        writeln!(out, "class:\t\t{}", h.class_inf)?;
        writeln!(out, "name:\t\t{}", h.add_files)?;
        writeln!(out, "driver:\t\t{}", h.driver)?;
        writeln!(out, "mergeScript:\t{}", h.merge_script)?;
        writeln!(out, "mssDir:\t\t{}", h.mss_dir)?;
        writeln!(out, "updateTime:\t{}", h.update_time_human)?;
        writeln!(out, "elapsed:\t{}", h.elapsed_time)?;
        writeln!(out, "mssDirPool:\t{}", h.mss_dir_pool)?;
        writeln!(out, "pedeMem:\t{}\n", h.pede_mem)?;

        writeln!(
            out,
            "###     dir      jobid    stat  try  rtime      nevt  remark   weight  name"
        )?;
        writeln!(out, "{}", "-".repeat(78))?;
        for job in self.records() {
            writeln!(out, "{}", job.describe())?;
        }

        let summary = self.summary();
        writeln!(out, "{}", "-".repeat(78))?;
        writeln!(out, "\t\t\t\t\tEvent total:\t{}", summary.total_events)?;
        writeln!(out, "\t\t\t\t\tCPU total:\t{} s", summary.total_cpu)?;
        writeln!(
            out,
            "\t\t\t\t\tMean CPU/event:\t{:?} s",
            summary.mean_cpu_per_event
        )?;

        Ok(())
    }

    /// Imprime el reporte en stdout
    pub fn print_report(&self) -> io::Result<()> {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        self.report(&mut handle)
    }
}
