use std::path::PathBuf;

use chrono::Duration;

/// Default retention window for audited ledger entries.
pub const DEFAULT_RETENTION_DAYS: i64 = 7;

/// Configuration for one cron-managed job.
///
/// Loaded externally (CLI flags or a config file) and handed to the
/// coordinator for the duration of one invocation.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Name of the compute job. At most one live job with this name may
    /// exist at a time.
    pub job_name: String,

    /// Root directory for this job in the object store. The ledger and any
    /// published assets live under it by default.
    pub job_root: String,

    /// Local asset bundle uploaded at the start of every run, if configured.
    pub asset_file: Option<PathBuf>,

    /// Object-store destination for the asset bundle.
    pub asset_object: Option<String>,

    /// Per-job enable flag. A disabled job ends the run cleanly without
    /// submitting anything.
    pub enabled: bool,

    /// Global kill switch covering every job managed by this deployment.
    pub disable_all: bool,

    /// Force a run even when disabled. Intended for operator intervention.
    pub force_run: bool,

    /// Extra object-store directories created before each run.
    pub extra_directories: Vec<String>,

    /// Days an audited ledger entry is kept before it becomes eligible for
    /// deletion.
    pub retention_days: i64,

    /// Override for the ledger document path. Defaults to
    /// `{job_root}/jobs.json`.
    pub ledger_path: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            job_name: String::new(),
            job_root: String::new(),
            asset_file: None,
            asset_object: None,
            enabled: true,
            disable_all: false,
            force_run: false,
            extra_directories: Vec::new(),
            retention_days: DEFAULT_RETENTION_DAYS,
            ledger_path: None,
        }
    }
}

impl RunConfig {
    pub fn new(job_name: impl Into<String>, job_root: impl Into<String>) -> Self {
        Self {
            job_name: job_name.into(),
            job_root: job_root.into(),
            ..Default::default()
        }
    }

    pub fn with_asset(
        mut self,
        local: impl Into<PathBuf>,
        remote: impl Into<String>,
    ) -> Self {
        self.asset_file = Some(local.into());
        self.asset_object = Some(remote.into());
        self
    }

    pub fn with_extra_directory(mut self, dir: impl Into<String>) -> Self {
        self.extra_directories.push(dir.into());
        self
    }

    pub fn with_retention_days(mut self, days: i64) -> Self {
        self.retention_days = days;
        self
    }

    pub fn with_ledger_path(mut self, path: impl Into<String>) -> Self {
        self.ledger_path = Some(path.into());
        self
    }

    /// Resolved path of the ledger document.
    pub fn ledger_path(&self) -> String {
        match &self.ledger_path {
            Some(path) => path.clone(),
            None => format!("{}/jobs.json", self.job_root),
        }
    }

    /// Retention window as a duration.
    pub fn retention(&self) -> Duration {
        Duration::days(self.retention_days)
    }

    /// Whether this invocation should proceed past the disable check.
    pub fn run_allowed(&self) -> bool {
        self.force_run || (self.enabled && !self.disable_all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let cfg = RunConfig::new("gc", "/admin/stor/gc");
        assert_eq!(cfg.job_name, "gc");
        assert_eq!(cfg.job_root, "/admin/stor/gc");
        assert!(cfg.enabled);
        assert!(!cfg.disable_all);
        assert!(!cfg.force_run);
        assert!(cfg.extra_directories.is_empty());
        assert_eq!(cfg.retention_days, DEFAULT_RETENTION_DAYS);
    }

    #[test]
    fn default_ledger_path_under_job_root() {
        let cfg = RunConfig::new("gc", "/admin/stor/gc");
        assert_eq!(cfg.ledger_path(), "/admin/stor/gc/jobs.json");
    }

    #[test]
    fn ledger_path_override_wins() {
        let cfg = RunConfig::new("gc", "/admin/stor/gc").with_ledger_path("/admin/stor/ledger.json");
        assert_eq!(cfg.ledger_path(), "/admin/stor/ledger.json");
    }

    #[test]
    fn retention_override() {
        let cfg = RunConfig::new("gc", "/admin/stor/gc").with_retention_days(30);
        assert_eq!(cfg.retention(), Duration::days(30));
    }

    #[test]
    fn run_allowed_respects_switches() {
        let mut cfg = RunConfig::new("gc", "/admin/stor/gc");
        assert!(cfg.run_allowed());

        cfg.enabled = false;
        assert!(!cfg.run_allowed());

        cfg.enabled = true;
        cfg.disable_all = true;
        assert!(!cfg.run_allowed());
    }

    #[test]
    fn force_run_overrides_disable() {
        let mut cfg = RunConfig::new("gc", "/admin/stor/gc");
        cfg.enabled = false;
        cfg.disable_all = true;
        cfg.force_run = true;
        assert!(cfg.run_allowed());
    }

    #[test]
    fn with_asset_sets_both_sides() {
        let cfg = RunConfig::new("gc", "/admin/stor/gc")
            .with_asset("/var/tmp/gc.tar.gz", "/admin/stor/gc/assets/gc.tar.gz");
        assert_eq!(cfg.asset_file.as_deref(), Some(std::path::Path::new("/var/tmp/gc.tar.gz")));
        assert_eq!(cfg.asset_object.as_deref(), Some("/admin/stor/gc/assets/gc.tar.gz"));
    }

    #[test]
    fn extra_directories_accumulate() {
        let cfg = RunConfig::new("gc", "/admin/stor/gc")
            .with_extra_directory("/admin/stor/gc/done")
            .with_extra_directory("/admin/stor/gc/do");
        assert_eq!(cfg.extra_directories.len(), 2);
    }
}
