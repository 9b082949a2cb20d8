use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use redb::{Database, ReadableTable, TableDefinition};
use warden_core::{
    AccountRecord, CompanyRecord, CustomGroupRecord, EndpointRecord, Entity,
    InstallationLinkRecord, LicenseRecord, MergePattern, NetworkNodeRecord, Operation,
    PackageRecord, PolicyRecord, QuarantineItemRecord, ScanTaskRecord,
};

use crate::api::{CheckpointStore, DbState, MergeStats, OperationCheckpoint, CURRENT_SCHEMA};
use crate::codec::{decode_row, decode_timestamp, encode_row, encode_timestamp};
use crate::maintenance::quarantine_corrupt_file;
use crate::row_key::RowKey;
use crate::StorageError;

const META: TableDefinition<&str, &str> = TableDefinition::new("meta");
const SYNC_CHECKPOINT: TableDefinition<&str, i64> = TableDefinition::new("sync_checkpoint");
const OPERATION_CHECKPOINT: TableDefinition<&[u8], i64> =
    TableDefinition::new("operation_checkpoint");

const META_FORMAT_KEY: &str = "format";
const META_FORMAT_VALUE: &str = "warden-redb";
const META_SCHEMA_VERSION: &str = "schema_version";
const META_CREATED_AT: &str = "created_at";

type RowTable = TableDefinition<'static, &'static [u8], &'static [u8]>;

fn entity_table<E: Entity>() -> RowTable {
    TableDefinition::new(E::TABLE)
}

/// redb-backed local store: checkpoints plus one table per entity category.
///
/// redb allows a single `Database` handle per file and process, so callers
/// share one `RedbStore` (it is cheap to clone).
#[derive(Clone)]
pub struct RedbStore {
    path: Utf8PathBuf,
    db: Arc<Database>,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").field("path", &self.path).finish()
    }
}

impl RedbStore {
    fn is_corrupt_open_error(err: &redb::DatabaseError) -> bool {
        match err {
            redb::DatabaseError::Storage(storage) => match storage {
                redb::StorageError::Corrupted(_) => true,
                redb::StorageError::Io(ioe) => matches!(
                    ioe.kind(),
                    std::io::ErrorKind::InvalidData | std::io::ErrorKind::UnexpectedEof
                ),
                _ => false,
            },
            _ => false,
        }
    }

    pub fn path_in(dir: &Utf8Path) -> Utf8PathBuf {
        dir.join(warden_config::STORE_FILENAME)
    }

    /// Opens `path`, creating the file and its tables on first use. A file that
    /// is not a valid store is moved aside and reported as `Corrupt`.
    pub fn open(path: &Utf8Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            if !parent.as_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db = if path.exists() {
            match Database::open(path.as_std_path()) {
                Ok(db) => db,
                Err(redb::DatabaseError::DatabaseAlreadyOpen) => {
                    return Err(StorageError::DatabaseAlreadyOpen);
                }
                Err(e) if Self::is_corrupt_open_error(&e) => {
                    let _ = quarantine_corrupt_file(path);
                    return Err(StorageError::Corrupt);
                }
                Err(e) => return Err(e.into()),
            }
        } else {
            Database::create(path.as_std_path())?
        };

        if let Err(e) = Self::ensure_schema(&db) {
            drop(db);
            if matches!(e, StorageError::Corrupt) {
                let _ = quarantine_corrupt_file(path);
            }
            return Err(e);
        }

        Ok(Self {
            path: path.to_path_buf(),
            db: Arc::new(db),
        })
    }

    pub fn open_in(dir: &Utf8Path) -> Result<Self, StorageError> {
        Self::open(&Self::path_in(dir))
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Inspects a store file without keeping it open.
    pub fn validate(path: &Utf8Path) -> Result<DbState, StorageError> {
        if !path.exists() {
            return Ok(DbState::Missing);
        }

        match Database::open(path.as_std_path()) {
            Ok(db) => match Self::ensure_schema(&db) {
                Ok(()) => Ok(DbState::Valid),
                Err(StorageError::NewerSchema { found, supported }) => {
                    Ok(DbState::NewerSchema { found, supported })
                }
                Err(StorageError::DatabaseAlreadyOpen) => Ok(DbState::Busy),
                Err(StorageError::Corrupt) => {
                    drop(db);
                    let _ = quarantine_corrupt_file(path);
                    Ok(DbState::Corrupt)
                }
                Err(e) => Err(e),
            },
            Err(redb::DatabaseError::DatabaseAlreadyOpen) => Ok(DbState::Busy),
            Err(e) if Self::is_corrupt_open_error(&e) => {
                let _ = quarantine_corrupt_file(path);
                Ok(DbState::Corrupt)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn ensure_schema(db: &Database) -> Result<(), StorageError> {
        // Create tables and required meta keys on first open.
        let write_tx = db.begin_write()?;
        {
            let mut meta = write_tx.open_table(META)?;
            let format: Option<String> = meta.get(META_FORMAT_KEY)?.map(|g| g.value().to_string());
            if format.is_none() {
                let schema_version = CURRENT_SCHEMA.to_string();
                let created_at = Utc::now().to_rfc3339();
                meta.insert(META_FORMAT_KEY, META_FORMAT_VALUE)?;
                meta.insert(META_SCHEMA_VERSION, schema_version.as_str())?;
                meta.insert(META_CREATED_AT, created_at.as_str())?;
            } else if format.as_deref() != Some(META_FORMAT_VALUE) {
                return Err(StorageError::Corrupt);
            }
        }
        let _ = write_tx.open_table(SYNC_CHECKPOINT)?;
        let _ = write_tx.open_table(OPERATION_CHECKPOINT)?;
        let _ = write_tx.open_table(entity_table::<EndpointRecord>())?;
        let _ = write_tx.open_table(entity_table::<AccountRecord>())?;
        let _ = write_tx.open_table(entity_table::<CompanyRecord>())?;
        let _ = write_tx.open_table(entity_table::<PolicyRecord>())?;
        let _ = write_tx.open_table(entity_table::<LicenseRecord>())?;
        let _ = write_tx.open_table(entity_table::<PackageRecord>())?;
        let _ = write_tx.open_table(entity_table::<InstallationLinkRecord>())?;
        let _ = write_tx.open_table(entity_table::<QuarantineItemRecord>())?;
        let _ = write_tx.open_table(entity_table::<NetworkNodeRecord>())?;
        let _ = write_tx.open_table(entity_table::<ScanTaskRecord>())?;
        let _ = write_tx.open_table(entity_table::<CustomGroupRecord>())?;
        write_tx.commit()?;

        let read_tx = db.begin_read()?;
        let meta = read_tx.open_table(META)?;
        let schema_version = meta
            .get(META_SCHEMA_VERSION)?
            .and_then(|g| g.value().parse::<u32>().ok())
            .unwrap_or(0);
        if schema_version == 0 {
            return Err(StorageError::Corrupt);
        }
        if schema_version > CURRENT_SCHEMA {
            return Err(StorageError::NewerSchema {
                found: schema_version,
                supported: CURRENT_SCHEMA,
            });
        }
        if schema_version != CURRENT_SCHEMA {
            return Err(StorageError::Corrupt);
        }
        Ok(())
    }

    /// Merges `rows` into the table of `E` for `tenant_id` in a single write
    /// transaction; any error leaves the table as it was.
    ///
    /// Rows whose content (ignoring `updated_at`) matches what is stored are not
    /// rewritten. With [`MergePattern::Tombstone`] every live row of the tenant
    /// that is absent from `rows` is marked deleted; its other columns are kept.
    pub fn apply<E: Entity>(
        &self,
        tenant_id: &str,
        rows: Vec<E>,
        pattern: MergePattern,
    ) -> Result<MergeStats, StorageError> {
        self.apply_listing(tenant_id, rows, &[], pattern)
    }

    /// Like [`RedbStore::apply`], but `also_listed` names ids the remote listed
    /// without a usable row. Tombstoning leaves those rows alone; ids that
    /// cannot form a key are ignored.
    pub fn apply_listing<E: Entity>(
        &self,
        tenant_id: &str,
        rows: Vec<E>,
        also_listed: &[String],
        pattern: MergePattern,
    ) -> Result<MergeStats, StorageError> {
        let (start, end) = RowKey::range_for_tenant(tenant_id)?;
        let mut stats = MergeStats::default();

        let write_tx = self.db.begin_write()?;
        {
            let mut table = write_tx.open_table(entity_table::<E>())?;

            let mut existing: HashMap<Vec<u8>, Vec<u8>> = HashMap::new();
            for row in table.range(start.as_slice()..end.as_slice())? {
                let (k, v) = row?;
                existing.insert(k.value().to_vec(), v.value().to_vec());
            }

            let mut listed: HashSet<Vec<u8>> = also_listed
                .iter()
                .filter_map(|id| RowKey::new(tenant_id, id).to_bytes().ok())
                .collect();
            for mut row in rows {
                if row.tenant_id() != tenant_id {
                    return Err(StorageError::InvalidKey(row.tenant_id().to_string()));
                }
                let key = RowKey::new(tenant_id, row.remote_id()).to_bytes()?;
                row.set_deleted(false);

                match existing.get(&key) {
                    Some(prev_bytes) => {
                        let previous: E = decode_row(prev_bytes)?;
                        row.carry_forward(&previous);
                        let stamp = row.meta().updated_at;
                        row.meta_mut().updated_at = previous.meta().updated_at;
                        if encode_row(&row)? == *prev_bytes {
                            stats.unchanged += 1;
                        } else {
                            row.meta_mut().updated_at = stamp;
                            table.insert(key.as_slice(), encode_row(&row)?.as_slice())?;
                            stats.updated += 1;
                        }
                    }
                    None => {
                        table.insert(key.as_slice(), encode_row(&row)?.as_slice())?;
                        stats.inserted += 1;
                    }
                }
                // Later duplicates of the same id compare against this write.
                existing.insert(key.clone(), encode_row(&row)?);
                listed.insert(key);
            }

            if pattern == MergePattern::Tombstone {
                for (key, bytes) in &existing {
                    if listed.contains(key) {
                        continue;
                    }
                    let mut row: E = decode_row(bytes)?;
                    if row.is_deleted() {
                        continue;
                    }
                    row.set_deleted(true);
                    table.insert(key.as_slice(), encode_row(&row)?.as_slice())?;
                    stats.tombstoned += 1;
                }
            }
        }
        write_tx.commit()?;

        tracing::debug!(
            table = E::TABLE,
            tenant = tenant_id,
            inserted = stats.inserted,
            updated = stats.updated,
            unchanged = stats.unchanged,
            tombstoned = stats.tombstoned,
            "rows merged"
        );
        Ok(stats)
    }

    /// All rows of the tenant, ordered by remote id.
    pub fn list<E: Entity>(
        &self,
        tenant_id: &str,
        include_deleted: bool,
    ) -> Result<Vec<E>, StorageError> {
        let (start, end) = RowKey::range_for_tenant(tenant_id)?;
        let read_tx = self.db.begin_read()?;
        let table = read_tx.open_table(entity_table::<E>())?;

        let mut out = Vec::new();
        for row in table.range(start.as_slice()..end.as_slice())? {
            let (_, v) = row?;
            let row: E = decode_row(v.value())?;
            if include_deleted || !row.is_deleted() {
                out.push(row);
            }
        }
        Ok(out)
    }

    pub fn get<E: Entity>(&self, tenant_id: &str, remote_id: &str) -> Result<Option<E>, StorageError> {
        let key = RowKey::new(tenant_id, remote_id).to_bytes()?;
        let read_tx = self.db.begin_read()?;
        let table = read_tx.open_table(entity_table::<E>())?;
        let row = match table.get(key.as_slice())? {
            Some(guard) => Some(decode_row(guard.value())?),
            None => None,
        };
        Ok(row)
    }

    /// Physically deletes a row. Only for categories with an explicit remote
    /// delete; everything else is tombstoned by [`RedbStore::apply`].
    pub fn remove<E: Entity>(&self, tenant_id: &str, remote_id: &str) -> Result<bool, StorageError> {
        let key = RowKey::new(tenant_id, remote_id).to_bytes()?;
        let write_tx = self.db.begin_write()?;
        let removed = {
            let mut table = write_tx.open_table(entity_table::<E>())?;
            let removed = table.remove(key.as_slice())?.is_some();
            removed
        };
        write_tx.commit()?;
        Ok(removed)
    }
}

impl CheckpointStore for RedbStore {
    fn global_checkpoint(&self, tenant_id: &str) -> Result<Option<DateTime<Utc>>, StorageError> {
        RowKey::validate_component(tenant_id)?;
        let read_tx = self.db.begin_read()?;
        let table = read_tx.open_table(SYNC_CHECKPOINT)?;
        let millis = table.get(tenant_id)?.map(|g| g.value());
        millis.map(decode_timestamp).transpose()
    }

    fn set_global_checkpoint(&self, tenant_id: &str, at: DateTime<Utc>) -> Result<(), StorageError> {
        RowKey::validate_component(tenant_id)?;
        let write_tx = self.db.begin_write()?;
        {
            let mut table = write_tx.open_table(SYNC_CHECKPOINT)?;
            table.insert(tenant_id, encode_timestamp(at))?;
        }
        write_tx.commit()?;
        Ok(())
    }

    fn operation_checkpoint(
        &self,
        tenant_id: &str,
        operation: Operation,
    ) -> Result<Option<DateTime<Utc>>, StorageError> {
        let key = RowKey::new(tenant_id, operation.name()).to_bytes()?;
        let read_tx = self.db.begin_read()?;
        let table = read_tx.open_table(OPERATION_CHECKPOINT)?;
        let millis = table.get(key.as_slice())?.map(|g| g.value());
        millis.map(decode_timestamp).transpose()
    }

    fn set_operation_checkpoint(
        &self,
        tenant_id: &str,
        operation: Operation,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let key = RowKey::new(tenant_id, operation.name()).to_bytes()?;
        let write_tx = self.db.begin_write()?;
        {
            let mut table = write_tx.open_table(OPERATION_CHECKPOINT)?;
            table.insert(key.as_slice(), encode_timestamp(at))?;
        }
        write_tx.commit()?;
        Ok(())
    }

    fn operation_checkpoints(&self, tenant_id: &str) -> Result<Vec<OperationCheckpoint>, StorageError> {
        let (start, end) = RowKey::range_for_tenant(tenant_id)?;
        let read_tx = self.db.begin_read()?;
        let table = read_tx.open_table(OPERATION_CHECKPOINT)?;

        let mut out = Vec::new();
        for row in table.range(start.as_slice()..end.as_slice())? {
            let (k, v) = row?;
            let Some(name) = RowKey::id_from_prefixed_key(&start, k.value()) else {
                continue;
            };
            let Ok(operation) = name.parse::<Operation>() else {
                tracing::debug!(operation = name, "ignoring checkpoint of unknown operation");
                continue;
            };
            out.push(OperationCheckpoint {
                operation,
                last_sync: decode_timestamp(v.value())?,
            });
        }
        out.sort_by_key(|c| c.operation);
        Ok(out)
    }

    fn clear_history(&self, tenant_id: &str) -> Result<(), StorageError> {
        let (start, end) = RowKey::range_for_tenant(tenant_id)?;
        let write_tx = self.db.begin_write()?;
        {
            let mut global = write_tx.open_table(SYNC_CHECKPOINT)?;
            let _ = global.remove(tenant_id)?;

            let mut ops = write_tx.open_table(OPERATION_CHECKPOINT)?;
            let mut keys = Vec::new();
            for row in ops.range(start.as_slice()..end.as_slice())? {
                let (k, _) = row?;
                keys.push(k.value().to_vec());
            }
            for k in keys {
                let _ = ops.remove(k.as_slice())?;
            }
        }
        write_tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use warden_core::{JsonBlob, RecordMeta};

    fn store() -> (tempfile::TempDir, RedbStore) {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let store = RedbStore::open_in(&root).unwrap();
        (dir, store)
    }

    fn group(tenant: &str, id: &str, name: &str, at: DateTime<Utc>) -> CustomGroupRecord {
        CustomGroupRecord {
            meta: RecordMeta::new(tenant, id, at),
            name: name.into(),
            parent_id: None,
        }
    }

    #[test]
    fn upsert_keeps_first_seen_and_counts() {
        let (_dir, store) = store();
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        let t1 = t0 + chrono::TimeDelta::hours(1);

        let stats = store
            .apply("t1", vec![group("t1", "g1", "Sales", t0)], MergePattern::Upsert)
            .unwrap();
        assert_eq!(stats.inserted, 1);

        let stats = store
            .apply("t1", vec![group("t1", "g1", "Sales EU", t1)], MergePattern::Upsert)
            .unwrap();
        assert_eq!(stats.updated, 1);

        let row: CustomGroupRecord = store.get("t1", "g1").unwrap().unwrap();
        assert_eq!(row.name, "Sales EU");
        assert_eq!(row.meta.first_seen_at, t0);
        assert_eq!(row.meta.updated_at, t1);
    }

    #[test]
    fn unchanged_rows_are_not_restamped() {
        let (_dir, store) = store();
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        store
            .apply("t1", vec![group("t1", "g1", "Sales", t0)], MergePattern::Upsert)
            .unwrap();
        let later = t0 + chrono::TimeDelta::hours(5);
        let stats = store
            .apply("t1", vec![group("t1", "g1", "Sales", later)], MergePattern::Upsert)
            .unwrap();
        assert_eq!(stats.unchanged, 1);
        let row: CustomGroupRecord = store.get("t1", "g1").unwrap().unwrap();
        assert_eq!(row.meta.updated_at, t0);
    }

    #[test]
    fn tenants_are_isolated() {
        let (_dir, store) = store();
        let now = Utc::now();
        store
            .apply("t1", vec![group("t1", "g1", "A", now)], MergePattern::Upsert)
            .unwrap();
        store
            .apply("t10", vec![group("t10", "g1", "B", now)], MergePattern::Upsert)
            .unwrap();
        let rows: Vec<CustomGroupRecord> = store.list("t1", true).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "A");
    }

    #[test]
    fn foreign_tenant_row_aborts_whole_batch() {
        let (_dir, store) = store();
        let now = Utc::now();
        let err = store
            .apply(
                "t1",
                vec![group("t1", "g1", "A", now), group("t2", "g2", "B", now)],
                MergePattern::Upsert,
            )
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
        let rows: Vec<CustomGroupRecord> = store.list("t1", true).unwrap();
        assert!(rows.is_empty(), "rolled back");
    }

    #[test]
    fn remove_deletes_row_outright() {
        let (_dir, store) = store();
        store
            .apply(
                "t1",
                vec![group("t1", "g1", "A", Utc::now())],
                MergePattern::Upsert,
            )
            .unwrap();
        assert!(store.remove::<CustomGroupRecord>("t1", "g1").unwrap());
        assert!(!store.remove::<CustomGroupRecord>("t1", "g1").unwrap());
        assert!(store.get::<CustomGroupRecord>("t1", "g1").unwrap().is_none());
    }

    #[test]
    fn listed_ids_without_rows_escape_tombstoning() {
        let (_dir, store) = store();
        let now = Utc::now();
        store
            .apply(
                "t1",
                vec![group("t1", "g1", "A", now), group("t1", "g2", "B", now)],
                MergePattern::Tombstone,
            )
            .unwrap();

        let stats = store
            .apply_listing(
                "t1",
                vec![group("t1", "g1", "A", now)],
                &["g2".to_string(), "bad\0id".to_string()],
                MergePattern::Tombstone,
            )
            .unwrap();
        assert_eq!(stats.tombstoned, 0);
        let kept: CustomGroupRecord = store.get("t1", "g2").unwrap().unwrap();
        assert!(!kept.is_deleted());

        let stats = store
            .apply("t1", vec![group("t1", "g1", "A", now)], MergePattern::Tombstone)
            .unwrap();
        assert_eq!(stats.tombstoned, 1);
    }

    #[test]
    fn json_columns_survive_storage() {
        let (_dir, store) = store();
        let settings = serde_json::json!({"firewall": {"enabled": true, "rules": [1, null]}});
        let policy = PolicyRecord {
            meta: RecordMeta::new("t1", "p1", Utc::now()),
            name: "Default".into(),
            created_by: None,
            last_modified: None,
            settings: JsonBlob::encode(&settings),
        };
        store
            .apply("t1", vec![policy], MergePattern::Upsert)
            .unwrap();
        let back: PolicyRecord = store.get("t1", "p1").unwrap().unwrap();
        assert_eq!(back.settings.decode().unwrap(), settings);
    }
}
