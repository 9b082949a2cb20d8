use chrono::{DateTime, Utc};
use warden_core::Entity;

use crate::StorageError;

pub fn encode_row<E: Entity>(row: &E) -> Result<Vec<u8>, StorageError> {
    Ok(serde_json::to_vec(row)?)
}

pub fn decode_row<E: Entity>(bytes: &[u8]) -> Result<E, StorageError> {
    Ok(serde_json::from_slice(bytes)?)
}

pub fn encode_timestamp(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub fn decode_timestamp(millis: i64) -> Result<DateTime<Utc>, StorageError> {
    DateTime::from_timestamp_millis(millis).ok_or(StorageError::Corrupt)
}
