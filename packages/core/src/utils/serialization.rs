// Сериализация записей для хранилищ (bincode)

use serde::{Deserialize, Serialize};

use crate::error::{Result, SessionError};

pub fn to_bytes<T: Serialize>(data: &T) -> Result<Vec<u8>> {
    bincode::serialize(data)
        .map_err(|e| SessionError::Serialization(format!("Serialization failed: {}", e)))
}

pub fn from_bytes<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T> {
    bincode::deserialize(bytes)
        .map_err(|e| SessionError::Serialization(format!("Deserialization failed: {}", e)))
}
