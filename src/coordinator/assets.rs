//! Object-store directory setup and asset bundle publication.

use crate::config::RunConfig;
use crate::error::{CronError, Result};
use crate::remote::{ObjectStore, PutOptions};

/// Replication factor for published asset objects.
const ASSET_REPLICATION: u32 = 2;

/// The directories one run needs, deduplicated and sorted lexicographically
/// so parents sharing a prefix are created before their children.
pub fn directory_plan(config: &RunConfig) -> Vec<String> {
    let mut dirs = config.extra_directories.clone();
    dirs.push(config.job_root.clone());
    if let Some(asset) = &config.asset_object {
        if let Some(parent) = parent_dir(asset) {
            dirs.push(parent);
        }
    }
    dirs.sort();
    dirs.dedup();
    dirs
}

fn parent_dir(path: &str) -> Option<String> {
    path.rsplit_once('/')
        .map(|(parent, _)| parent.to_string())
        .filter(|parent| !parent.is_empty())
}

/// Create every directory the run needs. Creation is idempotent; any
/// failure is fatal.
pub async fn setup_directories(store: &dyn ObjectStore, config: &RunConfig) -> Result<()> {
    for dir in directory_plan(config) {
        store.ensure_directory(&dir).await?;
    }
    Ok(())
}

/// Upload the local asset bundle to its object-store destination.
///
/// Runs unconditionally on every invocation; there is no skip-if-unchanged
/// optimization and the store's last-writer-wins semantics apply. A missing
/// or non-regular local file is fatal. No-op when no asset is configured.
pub async fn publish_asset(store: &dyn ObjectStore, config: &RunConfig) -> Result<()> {
    let (local, remote) = match (&config.asset_file, &config.asset_object) {
        (Some(local), Some(remote)) => (local, remote),
        _ => return Ok(()),
    };

    let meta = tokio::fs::metadata(local).await?;
    if !meta.is_file() {
        return Err(CronError::Validation(format!(
            "asset path {} is not a regular file",
            local.display()
        )));
    }

    let bytes = tokio::fs::read(local).await?;
    tracing::info!(
        local = %local.display(),
        remote = %remote,
        size = bytes.len(),
        "Publishing asset bundle"
    );
    store
        .put_object(
            remote,
            bytes,
            PutOptions {
                size_hint: Some(meta.len()),
                replication: Some(ASSET_REPLICATION),
            },
        )
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_includes_job_root_and_asset_parent() {
        let config = RunConfig::new("gc", "/admin/stor/gc")
            .with_asset("/var/tmp/gc.tar.gz", "/admin/stor/gc/assets/gc.tar.gz");
        let plan = directory_plan(&config);
        assert_eq!(
            plan,
            vec![
                "/admin/stor/gc".to_string(),
                "/admin/stor/gc/assets".to_string(),
            ]
        );
    }

    #[test]
    fn plan_is_sorted_and_deduplicated() {
        let config = RunConfig::new("gc", "/admin/stor/gc")
            .with_extra_directory("/admin/stor/gc/done")
            .with_extra_directory("/admin/stor/gc")
            .with_extra_directory("/admin/stor/gc/do");
        let plan = directory_plan(&config);
        assert_eq!(
            plan,
            vec![
                "/admin/stor/gc".to_string(),
                "/admin/stor/gc/do".to_string(),
                "/admin/stor/gc/done".to_string(),
            ]
        );
    }

    #[test]
    fn parent_dir_of_rooted_path() {
        assert_eq!(parent_dir("/a/b/c"), Some("/a/b".to_string()));
        assert_eq!(parent_dir("/top"), None);
        assert_eq!(parent_dir("bare"), None);
    }
}
