//! File-backed tenant registry (`tenants.json`).

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use warden_core::Tenant;

const QUALIFIER: &str = "com";
const ORG: &str = "warden";
const APP: &str = "warden";

#[derive(Debug, thiserror::Error)]
pub enum TenantStoreError {
    #[error("could not determine config directory")]
    NoConfigDir,
    #[error("tenant {0} already exists")]
    Duplicate(String),
    #[error("tenant {0} not found")]
    NotFound(String),
    #[error("invalid tenant id {0:?}")]
    InvalidId(String),
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("tenants file is malformed: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Default data and config directories for this user.
pub fn project_dirs() -> Result<ProjectDirs, TenantStoreError> {
    ProjectDirs::from(QUALIFIER, ORG, APP).ok_or(TenantStoreError::NoConfigDir)
}

/// Tenants persisted as a pretty-printed JSON array. Every mutation rewrites the
/// whole file atomically.
#[derive(Debug, Clone)]
pub struct FileTenantRegistry {
    path: PathBuf,
}

impl FileTenantRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Registry in the platform config directory.
    pub fn default_location() -> Result<Self, TenantStoreError> {
        let dirs = project_dirs()?;
        Ok(Self::new(
            dirs.config_dir().join(warden_config::TENANTS_FILENAME),
        ))
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(warden_config::TENANTS_FILENAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Vec<Tenant>, TenantStoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path).map_err(|source| TenantStoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, tenants: &[Tenant]) -> Result<(), TenantStoreError> {
        let json = serde_json::to_string_pretty(tenants)?;
        atomic_write(&self.path, json.as_bytes())
    }

    pub fn find(&self, id: &str) -> Result<Option<Tenant>, TenantStoreError> {
        Ok(self.load()?.into_iter().find(|t| t.id == id))
    }

    pub fn add(&self, tenant: Tenant) -> Result<(), TenantStoreError> {
        if tenant.id.trim().is_empty() || tenant.id.contains('\0') {
            return Err(TenantStoreError::InvalidId(tenant.id));
        }
        let mut tenants = self.load()?;
        if tenants.iter().any(|t| t.id == tenant.id) {
            return Err(TenantStoreError::Duplicate(tenant.id));
        }
        tenants.push(tenant);
        self.save(&tenants)
    }

    pub fn remove(&self, id: &str) -> Result<bool, TenantStoreError> {
        let mut tenants = self.load()?;
        let before = tenants.len();
        tenants.retain(|t| t.id != id);
        if tenants.len() == before {
            return Ok(false);
        }
        self.save(&tenants)?;
        Ok(true)
    }

    pub fn set_active(&self, id: &str, active: bool) -> Result<(), TenantStoreError> {
        let mut tenants = self.load()?;
        let tenant = tenants
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| TenantStoreError::NotFound(id.to_string()))?;
        tenant.active = active;
        self.save(&tenants)
    }
}

fn atomic_write(path: &Path, contents: &[u8]) -> Result<(), TenantStoreError> {
    let io_err = |p: &Path| {
        let p = p.to_path_buf();
        move |source| TenantStoreError::Io { path: p, source }
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(io_err(parent))?;
        }
    }

    let tmp_path = {
        let mut name = path.as_os_str().to_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    };

    let mut file = fs::File::create(&tmp_path).map_err(io_err(&tmp_path))?;
    file.write_all(contents).map_err(io_err(&tmp_path))?;
    file.sync_all().map_err(io_err(&tmp_path))?;
    drop(file);

    match fs::rename(&tmp_path, path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            fs::remove_file(path).ok();
            fs::rename(&tmp_path, path).map_err(io_err(path))
        }
        Err(e) => {
            fs::remove_file(&tmp_path).ok();
            Err(TenantStoreError::Io {
                path: path.to_path_buf(),
                source: e,
            })
        }
    }
}
