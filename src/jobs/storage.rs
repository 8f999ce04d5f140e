//! # Persistencia de la Base de Datos de Jobs
//! src/jobs/storage.rs
//!
//! `JobDatabase` carga un mps.db completo en memoria, deja que las
//! herramientas externas modifiquen los jobs y lo vuelve a escribir entero,
//! respaldando antes la versión anterior como `mps.db~`.
//!
//! No hay locking: se asume un único escritor por archivo.

use crate::jobs::error::{DbError, Result};
use crate::jobs::header::{DbHeader, HEADER_LINES};
use crate::jobs::types::{JobRecord, Stage, RECORD_FIELD_COUNT};
use chrono::Local;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Base de datos de una campaña
#[derive(Debug, Clone, Default)]
pub struct JobDatabase {
    /// Header de 17 líneas
    header: DbHeader,

    /// Jobs en orden de archivo
    jobs: Vec<JobRecord>,

    /// Número de jobs seriales (sin contar el de merge)
    n_jobs: usize,

    /// Archivo del que se cargó o al que se guardó por última vez
    path: Option<PathBuf>,
}

impl JobDatabase {
    /// Crea una base de datos vacía que nunca ha sido escrita
    pub fn with_header(header: DbHeader) -> Self {
        Self {
            header,
            ..Self::default()
        }
    }

    /// Carga header y jobs desde el archivo
    ///
    /// Cualquier error aborta la carga completa.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading job database");

        let file = File::open(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => DbError::FileNotFound {
                path: path.to_path_buf(),
            },
            _ => DbError::io(path, e),
        })?;

        let mut lines = BufReader::new(file).lines();
        let header = DbHeader::read_from(&mut lines, path)?;

        let mut db = Self {
            header,
            jobs: Vec::new(),
            n_jobs: 0,
            path: Some(path.to_path_buf()),
        };

        for (offset, line) in lines.enumerate() {
            let line_no = HEADER_LINES + offset + 1;
            let line = line.map_err(|e| DbError::io(path, e))?;
            let job = Self::parse_job_line(&line, line_no)?;
            db.push_job(job);
        }

        info!(
            path = %path.display(),
            jobs = db.jobs.len(),
            serial_jobs = db.n_jobs,
            "job database loaded"
        );
        Ok(db)
    }

    /// Convierte una línea del cuerpo en un job nuevo
    fn parse_job_line(line: &str, line_no: usize) -> Result<JobRecord> {
        let parts: Vec<&str> = line.split(':').collect();
        if parts.len() != RECORD_FIELD_COUNT {
            warn!(line = line_no, fields = parts.len(), "malformed job line");
            return Err(DbError::MalformedLine {
                line: line_no,
                found: parts.len(),
                content: line.to_string(),
            });
        }

        JobRecord::from_fields(&parts).map_err(|e| e.at_line(line_no))
    }

    fn push_job(&mut self, job: JobRecord) {
        if !job.is_merge_job() {
            self.n_jobs += 1;
        }
        self.jobs.push(job);
    }

    /// Guarda la base de datos en `path`
    ///
    /// Regenera versión y timestamps del header, respalda el archivo
    /// existente y reescribe todo renumerando los jobs por posición.
    /// Si algo falla, el estado en memoria queda como estaba.
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref().to_path_buf();

        for (i, job) in self.jobs.iter().enumerate() {
            job.check_fields(i + 1)?;
        }

        let now = Local::now();
        let mut header = self.header.clone();
        header.refresh(
            now.timestamp(),
            now.format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
        );

        backup_file(&path)?;

        // Escribir a un archivo temporal y renombrar
        let temp_path = sibling_path(&path, ".tmp");
        if let Err(e) = self.write_file(&header, &temp_path) {
            let _ = fs::remove_file(&temp_path);
            return Err(DbError::io(&temp_path, e));
        }

        if let Ok(meta) = fs::metadata(&path) {
            if let Err(e) = fs::set_permissions(&temp_path, meta.permissions()) {
                let _ = fs::remove_file(&temp_path);
                return Err(DbError::io(&temp_path, e));
            }
        }
        if let Err(e) = fs::rename(&temp_path, &path) {
            let _ = fs::remove_file(&temp_path);
            return Err(DbError::io(&path, e));
        }

        info!(
            path = %path.display(),
            jobs = self.jobs.len(),
            elapsed = header.elapsed_time,
            "job database saved"
        );
        self.header = header;
        self.path = Some(path);
        Ok(())
    }

    fn write_file(&self, header: &DbHeader, path: &Path) -> std::io::Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        header.write_to(&mut writer)?;
        for (i, job) in self.jobs.iter().enumerate() {
            write!(writer, "{:03}:{}", i + 1, job.serialize())?;
        }

        writer.flush()
    }

    /// Si el archivo de la base de datos existe, lo copia como `<archivo>~`
    ///
    /// Conserva los permisos. Devuelve la ruta del respaldo si se creó.
    pub fn backup(&self) -> Result<Option<PathBuf>> {
        match self.path.as_deref() {
            Some(path) => backup_file(path),
            None => Ok(None),
        }
    }

    /// Agrega un job al final
    pub fn append(&mut self, job: JobRecord) {
        self.push_job(job);
    }

    /// Quita y devuelve el último job
    pub fn pop(&mut self) -> Result<JobRecord> {
        let job = self.jobs.pop().ok_or(DbError::EmptyCollection)?;
        if !job.is_merge_job() {
            self.n_jobs = self.n_jobs.saturating_sub(1);
        }
        Ok(job)
    }

    /// Clase de batch para `stage` ("mille" o "pede")
    ///
    /// # Ejemplo
    /// ```
    /// use mps_db::jobs::{DbHeader, JobDatabase};
    ///
    /// let header = DbHeader {
    ///     class_inf: "cmscaf1nd:cmscafspec1nw".to_string(),
    ///     ..DbHeader::default()
    /// };
    /// let db = JobDatabase::with_header(header);
    /// assert_eq!(db.get_class("mille").unwrap(), "cmscaf1nd");
    /// assert_eq!(db.get_class("pede").unwrap(), "cmscafspec1nw");
    /// assert!(db.get_class("merge").is_err());
    /// ```
    pub fn get_class(&self, stage: &str) -> Result<String> {
        let classes = self.classes()?;
        let stage: Stage = stage.parse()?;
        Ok(Self::pick_class(&classes, stage))
    }

    /// Igual que `get_class` con la etapa ya tipada
    pub fn class_for(&self, stage: Stage) -> Result<String> {
        let classes = self.classes()?;
        Ok(Self::pick_class(&classes, stage))
    }

    fn classes(&self) -> Result<Vec<&str>> {
        let classes: Vec<&str> = self.header.class_inf.split(':').collect();
        if classes.len() > 2 {
            return Err(DbError::Configuration(format!(
                "class must be of the form 'class' or 'classMille:classPede', but is '{}'",
                self.header.class_inf
            )));
        }
        Ok(classes)
    }

    fn pick_class(classes: &[&str], stage: Stage) -> String {
        match stage {
            Stage::Mille => classes[0].to_string(),
            Stage::Pede => classes[classes.len() - 1].to_string(),
        }
    }

    /// Suma de eventos de los jobs seriales
    pub fn total_events(&self) -> u64 {
        self.serial_jobs().map(|job| job.nevt).sum()
    }

    /// Suma de CPU de los jobs seriales
    pub fn total_cpu(&self) -> u64 {
        self.serial_jobs().map(|job| job.runtime).sum()
    }

    /// CPU media por evento; 0 si no hay eventos
    pub fn mean_cpu_per_event(&self) -> f64 {
        let events = self.total_events();
        if events == 0 {
            return 0.0;
        }
        self.total_cpu() as f64 / events as f64
    }

    fn serial_jobs(&self) -> impl Iterator<Item = &JobRecord> {
        self.jobs.iter().filter(|job| !job.is_merge_job())
    }

    /// El job de merge, si existe
    pub fn merge_job(&self) -> Option<&JobRecord> {
        self.jobs.iter().find(|job| job.is_merge_job())
    }

    // ==================== Accessors ====================

    pub fn header(&self) -> &DbHeader {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut DbHeader {
        &mut self.header
    }

    pub fn records(&self) -> &[JobRecord] {
        &self.jobs
    }

    pub fn records_mut(&mut self) -> &mut [JobRecord] {
        &mut self.jobs
    }

    pub fn get(&self, position: usize) -> Option<&JobRecord> {
        self.jobs.get(position)
    }

    pub fn get_mut(&mut self, position: usize) -> Option<&mut JobRecord> {
        self.jobs.get_mut(position)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Número de jobs seriales
    pub fn n_jobs(&self) -> usize {
        self.n_jobs
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    // Listas por campo, derivadas en cada llamada

    pub fn record_indices(&self) -> Vec<u32> {
        self.jobs.iter().map(|job| job.index).collect()
    }

    pub fn job_dirs(&self) -> Vec<&str> {
        self.jobs.iter().map(|job| job.dir.as_str()).collect()
    }

    pub fn job_ids(&self) -> Vec<&str> {
        self.jobs.iter().map(|job| job.id.as_str()).collect()
    }

    pub fn job_statuses(&self) -> Vec<&str> {
        self.jobs.iter().map(|job| job.status.as_str()).collect()
    }

    pub fn job_runtimes(&self) -> Vec<u64> {
        self.jobs.iter().map(|job| job.runtime).collect()
    }

    pub fn job_nevts(&self) -> Vec<u64> {
        self.jobs.iter().map(|job| job.nevt).collect()
    }
}

/// Copia `path` a `<path>~` si existe
fn backup_file(path: &Path) -> Result<Option<PathBuf>> {
    if !path.exists() {
        return Ok(None);
    }

    let backup = sibling_path(path, "~");
    fs::copy(path, &backup).map_err(|e| DbError::io(&backup, e))?;
    debug!(backup = %backup.display(), "backed up job database");
    Ok(Some(backup))
}

/// `path` con `suffix` agregado al nombre del archivo
pub(crate) fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::header::{SCHEMA_VERSION, UNUSED_MARKER};
    use crate::test_util::{cleanup, unique_temp_path, write_campaign};

    fn write_db(path: &Path, body: &str) {
        write_campaign(path, "classA", body);
    }

    fn job(index: u32, dir: &str, nevt: u64, runtime: u64) -> JobRecord {
        let mut job = JobRecord::new(index, dir);
        job.nevt = nevt;
        job.runtime = runtime;
        job
    }

    // ==================== Load ====================

    #[test]
    fn test_load_header_and_jobs() {
        let path = unique_temp_path("test_load_header_and_jobs");
        write_db(
            &path,
            "001:job001:111:DONE:0:50:100:lxb:0::::\n\
             002:jobm:222:SETUP:0:0:0::0::::\n",
        );

        let db = JobDatabase::load(&path).unwrap();
        assert_eq!(db.header().header, "v1");
        assert_eq!(db.header().class_inf, "classA");
        assert_eq!(db.len(), 2);
        assert_eq!(db.n_jobs(), 1);
        assert_eq!(db.get(0).unwrap().dir, "job001");
        assert!(db.get(1).unwrap().is_merge_job());
        assert_eq!(db.path(), Some(path.as_path()));

        cleanup(&path);
    }

    #[test]
    fn test_load_header_only() {
        let path = unique_temp_path("test_load_header_only");
        write_db(&path, "");

        let db = JobDatabase::load(&path).unwrap();
        assert!(db.is_empty());
        assert_eq!(db.n_jobs(), 0);
        assert_eq!(db.total_events(), 0);

        cleanup(&path);
    }

    #[test]
    fn test_load_missing_file() {
        let path = unique_temp_path("test_load_missing_file");
        let err = JobDatabase::load(&path).unwrap_err();
        assert!(matches!(err, DbError::FileNotFound { .. }));
        assert!(err.to_string().contains("campaign"));
    }

    #[test]
    fn test_load_malformed_line() {
        let path = unique_temp_path("test_load_malformed_line");
        write_db(&path, "001:job001:111:DONE:0:50\n");

        let err = JobDatabase::load(&path).unwrap_err();
        match err {
            DbError::MalformedLine { line, found, .. } => {
                assert_eq!(line, 18);
                assert_eq!(found, 6);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        cleanup(&path);
    }

    #[test]
    fn test_load_non_numeric_body_field() {
        let path = unique_temp_path("test_load_non_numeric_body_field");
        write_db(
            &path,
            "001:job001:111:DONE:0:50:100:lxb:0::::\n\
             002:job002:112:DONE:x:50:100:lxb:0::::\n",
        );

        let err = JobDatabase::load(&path).unwrap_err();
        assert!(matches!(
            err,
            DbError::Parse {
                line: 19,
                field: "retries",
                ..
            }
        ));

        cleanup(&path);
    }

    #[test]
    fn test_load_builds_fresh_record_per_line() {
        let path = unique_temp_path("test_load_builds_fresh_record_per_line");
        write_db(
            &path,
            "001:job001:1:DONE:0:10:1:a:0::::\n\
             002:job002:2:RUN:0:20:2:b:0::::\n\
             003:job003:3:FAIL:2:30:3:c:0::::\n",
        );

        let db = JobDatabase::load(&path).unwrap();
        assert_eq!(db.job_dirs(), vec!["job001", "job002", "job003"]);
        assert_eq!(db.job_statuses(), vec!["DONE", "RUN", "FAIL"]);
        assert_eq!(db.job_runtimes(), vec![10, 20, 30]);

        cleanup(&path);
    }

    // ==================== Totals ====================

    #[test]
    fn test_totals_exclude_merge_job() {
        let mut db = JobDatabase::default();
        db.append(job(1, "job001", 100, 50));
        db.append(job(2, "jobm", 0, 0));

        assert_eq!(db.total_events(), 100);
        assert_eq!(db.total_cpu(), 50);
        assert_eq!(db.mean_cpu_per_event(), 0.5);
    }

    #[test]
    fn test_totals_merge_only() {
        let mut db = JobDatabase::default();
        db.append(job(0, "jobm", 500, 70));

        assert_eq!(db.total_events(), 0);
        assert_eq!(db.total_cpu(), 0);
        assert_eq!(db.mean_cpu_per_event(), 0.0);
    }

    #[test]
    fn test_mean_cpu_zero_events() {
        let mut db = JobDatabase::default();
        db.append(job(1, "job001", 0, 300));
        assert_eq!(db.mean_cpu_per_event(), 0.0);
    }

    // ==================== Class ====================

    fn db_with_class(class_inf: &str) -> JobDatabase {
        JobDatabase::with_header(DbHeader {
            class_inf: class_inf.to_string(),
            ..DbHeader::default()
        })
    }

    #[test]
    fn test_get_class_single() {
        let db = db_with_class("cmscaf1nd");
        assert_eq!(db.get_class("mille").unwrap(), "cmscaf1nd");
        assert_eq!(db.get_class("pede").unwrap(), "cmscaf1nd");
    }

    #[test]
    fn test_get_class_split() {
        let db = db_with_class("cmscaf1nd:cmscafspec1nw");
        assert_eq!(db.get_class("mille").unwrap(), "cmscaf1nd");
        assert_eq!(db.get_class("pede").unwrap(), "cmscafspec1nw");
        assert_eq!(db.class_for(Stage::Pede).unwrap(), "cmscafspec1nw");
    }

    #[test]
    fn test_get_class_too_many_parts() {
        let db = db_with_class("a:b:c");
        assert!(matches!(
            db.get_class("mille"),
            Err(DbError::Configuration(_))
        ));
        assert!(matches!(
            db.class_for(Stage::Pede),
            Err(DbError::Configuration(_))
        ));
    }

    #[test]
    fn test_get_class_unknown_stage() {
        let db = db_with_class("cmscaf1nd");
        assert!(matches!(
            db.get_class("merge"),
            Err(DbError::Configuration(_))
        ));
    }

    // ==================== Append / Pop ====================

    #[test]
    fn test_pop_empty() {
        let mut db = JobDatabase::default();
        assert!(matches!(db.pop(), Err(DbError::EmptyCollection)));
    }

    #[test]
    fn test_append_then_pop_returns_same_job() {
        let mut db = JobDatabase::default();
        let mut record = job(4, "job004", 12, 3);
        record.remark = "retry".to_string();

        db.append(record.clone());
        assert_eq!(db.n_jobs(), 1);

        let popped = db.pop().unwrap();
        assert_eq!(popped, record);
        assert!(db.is_empty());
        assert_eq!(db.n_jobs(), 0);
    }

    #[test]
    fn test_merge_job_not_counted() {
        let mut db = JobDatabase::default();
        db.append(job(1, "job001", 1, 1));
        db.append(job(2, "jobm", 0, 0));
        assert_eq!(db.n_jobs(), 1);
        assert_eq!(db.merge_job().unwrap().dir, "jobm");

        db.pop().unwrap();
        assert_eq!(db.n_jobs(), 1);
        assert!(db.merge_job().is_none());
    }

    // ==================== Save / Backup ====================

    #[test]
    fn test_save_renumbers_jobs() {
        let path = unique_temp_path("test_save_renumbers_jobs");
        let mut db = JobDatabase::default();
        db.append(job(7, "job007", 1, 1));
        db.append(job(3, "job003", 2, 2));
        db.append(job(0, "jobm", 0, 0));
        db.save(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let body: Vec<&str> = content.lines().skip(HEADER_LINES).collect();
        assert_eq!(body.len(), 3);
        assert!(body[0].starts_with("001:job007:"));
        assert!(body[1].starts_with("002:job003:"));
        assert!(body[2].starts_with("003:jobm:"));

        let reloaded = JobDatabase::load(&path).unwrap();
        assert_eq!(reloaded.record_indices(), vec![1, 2, 3]);

        cleanup(&path);
    }

    #[test]
    fn test_save_refreshes_header() {
        let path = unique_temp_path("test_save_refreshes_header");
        let mut db = JobDatabase::default();
        db.save(&path).unwrap();

        let header = db.header();
        assert_eq!(header.header, SCHEMA_VERSION);
        assert!(header.update_time > 0);
        assert_eq!(header.elapsed_time, 0);
        assert!(!header.update_time_human.is_empty());
        assert_eq!(header.spare1, UNUSED_MARKER);

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), HEADER_LINES);
        assert_eq!(content.lines().next(), Some(SCHEMA_VERSION));

        cleanup(&path);
    }

    #[test]
    fn test_save_elapsed_since_previous_update() {
        let path = unique_temp_path("test_save_elapsed_since_previous_update");
        let now = Local::now().timestamp();
        let mut db = JobDatabase::with_header(DbHeader {
            update_time: now - 100,
            ..DbHeader::default()
        });
        db.save(&path).unwrap();

        assert!(db.header().elapsed_time >= 100);
        assert!(db.header().update_time >= now);

        cleanup(&path);
    }

    #[test]
    fn test_backup_without_file() {
        let db = JobDatabase::default();
        assert!(db.backup().unwrap().is_none());
    }

    #[test]
    fn test_save_creates_backup_of_previous_version() {
        let path = unique_temp_path("test_save_creates_backup_of_previous_version");
        write_db(&path, "001:job001:111:DONE:0:50:100:lxb:0::::\n");
        let original = fs::read_to_string(&path).unwrap();

        let mut db = JobDatabase::load(&path).unwrap();
        db.get_mut(0).unwrap().status = "OK".to_string();
        db.save(&path).unwrap();

        let backup = fs::read_to_string(sibling_path(&path, "~")).unwrap();
        assert_eq!(backup, original);

        let current = fs::read_to_string(&path).unwrap();
        assert!(current.contains("001:job001:111:OK:"));
        assert!(!sibling_path(&path, ".tmp").exists());

        cleanup(&path);
    }

    #[test]
    fn test_failed_save_leaves_state_untouched() {
        let mut dir = unique_temp_path("test_failed_save_leaves_state_untouched");
        dir.set_extension("missing");
        let path = dir.join("mps.db");

        let mut db = JobDatabase::with_header(DbHeader {
            update_time: 1000,
            ..DbHeader::default()
        });
        db.append(job(1, "job001", 1, 1));
        let before = db.header().clone();

        assert!(matches!(db.save(&path), Err(DbError::Io { .. })));
        assert_eq!(db.header(), &before);
        assert!(db.path().is_none());
        assert!(!dir.exists());
    }

    #[test]
    fn test_save_rejects_field_with_separator() {
        let path = unique_temp_path("test_save_rejects_field_with_separator");
        let mut db = JobDatabase::default();
        db.append(job(1, "job001", 1, 1));
        let mut bad = job(2, "job002", 1, 1);
        bad.remark = "a:b".to_string();
        db.append(bad);
        let before = db.header().clone();

        match db.save(&path) {
            Err(DbError::InvalidField {
                position,
                field,
                value,
            }) => {
                assert_eq!(position, 2);
                assert_eq!(field, "remark");
                assert_eq!(value, "a:b");
            }
            other => panic!("expected invalid field, got {:?}", other),
        }
        assert!(!path.exists());
        assert!(!sibling_path(&path, ".tmp").exists());
        assert_eq!(db.header(), &before);

        cleanup(&path);
    }

    #[test]
    fn test_save_to_other_path_backs_up_target() {
        let source = unique_temp_path("test_save_to_other_path_source");
        let target = unique_temp_path("test_save_to_other_path_target");
        write_db(&source, "001:job001:111:DONE:0:50:100:lxb:0::::\n");
        write_db(&target, "001:old001:999:FAIL:3:1:1:x:0::::\n");
        let old_target = fs::read_to_string(&target).unwrap();

        let mut db = JobDatabase::load(&source).unwrap();
        db.save(&target).unwrap();

        assert_eq!(
            fs::read_to_string(sibling_path(&target, "~")).unwrap(),
            old_target
        );
        assert!(!sibling_path(&source, "~").exists());
        assert_eq!(db.path(), Some(target.as_path()));
        assert!(fs::read_to_string(&target)
            .unwrap()
            .contains("001:job001:111:DONE:"));

        cleanup(&source);
        cleanup(&target);
    }

    #[cfg(unix)]
    #[test]
    fn test_backup_preserves_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let path = unique_temp_path("test_backup_preserves_permissions");
        write_db(&path, "");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();

        let db = JobDatabase::load(&path).unwrap();
        let backup = db.backup().unwrap().unwrap();
        let mode = fs::metadata(&backup).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);

        cleanup(&path);
    }

    #[test]
    fn test_sibling_path() {
        assert_eq!(
            sibling_path(Path::new("/tmp/mps.db"), "~"),
            PathBuf::from("/tmp/mps.db~")
        );
    }
}
