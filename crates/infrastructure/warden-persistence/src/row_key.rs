use crate::StorageError;

pub const ROW_KEY_SEPARATOR: u8 = 0;

/// Composite `(tenant_id, id)` key. The separator keeps one tenant's rows in a
/// contiguous range so they can be scanned without touching other tenants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowKey<'a> {
    pub tenant_id: &'a str,
    pub id: &'a str,
}

impl<'a> RowKey<'a> {
    pub fn new(tenant_id: &'a str, id: &'a str) -> Self {
        Self { tenant_id, id }
    }

    pub fn validate_component(part: &str) -> Result<(), StorageError> {
        if part.is_empty() || part.as_bytes().contains(&ROW_KEY_SEPARATOR) {
            return Err(StorageError::InvalidKey(part.to_string()));
        }
        Ok(())
    }

    pub fn to_bytes(self) -> Result<Vec<u8>, StorageError> {
        Self::validate_component(self.tenant_id)?;
        Self::validate_component(self.id)?;
        let mut key = Vec::with_capacity(self.tenant_id.len() + 1 + self.id.len());
        key.extend_from_slice(self.tenant_id.as_bytes());
        key.push(ROW_KEY_SEPARATOR);
        key.extend_from_slice(self.id.as_bytes());
        Ok(key)
    }

    /// Half-open byte range covering every key of `tenant_id`.
    pub fn range_for_tenant(tenant_id: &str) -> Result<(Vec<u8>, Vec<u8>), StorageError> {
        Self::validate_component(tenant_id)?;
        let mut start = Vec::with_capacity(tenant_id.len() + 1);
        start.extend_from_slice(tenant_id.as_bytes());
        start.push(ROW_KEY_SEPARATOR);
        let mut end = start.clone();
        if let Some(last) = end.last_mut() {
            *last = ROW_KEY_SEPARATOR + 1;
        }
        Ok((start, end))
    }

    pub fn id_from_prefixed_key<'k>(prefix: &[u8], full_key: &'k [u8]) -> Option<&'k str> {
        let id_bytes = full_key.strip_prefix(prefix)?;
        std::str::from_utf8(id_bytes).ok()
    }
}
