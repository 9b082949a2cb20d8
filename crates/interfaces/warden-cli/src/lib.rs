pub mod commands;
pub mod server;
pub mod show;
pub mod tenants;

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use clap::ValueEnum;
use warden_core::{SystemClock, TenantCategory};
use warden_infra::{FileTenantRegistry, JsonRpcClient};
use warden_persistence::RedbStore;
use warden_pipeline::{RpcRemoteFetcher, SyncEngine};

#[derive(ValueEnum, Clone, Debug, Copy, PartialEq, Eq)]
pub enum CliCategory {
    ProductOnly,
    FullService,
}

impl From<CliCategory> for TenantCategory {
    fn from(c: CliCategory) -> Self {
        match c {
            CliCategory::ProductOnly => TenantCategory::ProductOnly,
            CliCategory::FullService => TenantCategory::FullService,
        }
    }
}

/// Platform data directory, used when `--data-dir` is not given.
pub fn default_data_dir() -> Result<Utf8PathBuf> {
    let dirs = warden_infra::tenants::project_dirs()?;
    Utf8PathBuf::from_path_buf(dirs.data_dir().to_path_buf())
        .map_err(|p| anyhow!("data directory {} is not valid UTF-8", p.display()))
}

/// Wires the engine to the HTTP client, the tenant file and the local store.
pub fn build_engine(
    api_url: &str,
    registry: FileTenantRegistry,
    data_dir: &Utf8Path,
) -> Result<SyncEngine> {
    let client = JsonRpcClient::new(api_url).context("Failed to build HTTP client")?;
    let store = RedbStore::open_in(data_dir)
        .with_context(|| format!("Failed to open local store in {data_dir}"))?;
    Ok(SyncEngine::new(
        Arc::new(registry),
        Arc::new(RpcRemoteFetcher::new(client)),
        store,
        Arc::new(SystemClock),
    ))
}
