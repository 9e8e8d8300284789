//! Prekeys и bundle
//!
//! Получатель публикует bundle заранее, чтобы инициатор мог начать сессию,
//! пока получатель offline:
//! - identity key
//! - signed prekey + XEdDSA подпись identity key
//! - (опционально) одноразовый prekey

use serde::{Deserialize, Serialize};

use crate::crypto::keys::{KeyPair, PublicKey};
use crate::error::Result;
use crate::utils::serialization::{from_bytes, to_bytes};

/// Одноразовый prekey, удаляется после первого успешного использования
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreKeyRecord {
    id: u32,
    key_pair: KeyPair,
}

impl PreKeyRecord {
    pub fn new(id: u32, key_pair: KeyPair) -> Self {
        Self { id, key_pair }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn key_pair(&self) -> &KeyPair {
        &self.key_pair
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        to_bytes(self)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        from_bytes(bytes)
    }
}

/// Среднесрочный prekey, подписанный identity key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedPreKeyRecord {
    id: u32,
    /// Время создания, миллисекунды Unix
    timestamp: u64,
    key_pair: KeyPair,
    #[serde(with = "serde_bytes")]
    signature: Vec<u8>,
}

impl SignedPreKeyRecord {
    pub fn new(id: u32, timestamp: u64, key_pair: KeyPair, signature: Vec<u8>) -> Self {
        Self {
            id,
            timestamp,
            key_pair,
            signature,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn key_pair(&self) -> &KeyPair {
        &self.key_pair
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        to_bytes(self)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        from_bytes(bytes)
    }
}

/// Публичный bundle получателя
///
/// Signed prekey опционален только потому, что старые (v2) bundle его не несли;
/// такой bundle будет отвергнут при обработке.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreKeyBundle {
    pub pre_key_id: Option<u32>,
    pub pre_key_public: Option<PublicKey>,
    pub signed_pre_key_id: u32,
    pub signed_pre_key_public: Option<PublicKey>,
    #[serde(with = "serde_bytes")]
    pub signed_pre_key_signature: Vec<u8>,
    pub identity_key: PublicKey,
}

impl PreKeyBundle {
    pub fn new(
        pre_key: Option<(u32, PublicKey)>,
        signed_pre_key_id: u32,
        signed_pre_key_public: PublicKey,
        signed_pre_key_signature: Vec<u8>,
        identity_key: PublicKey,
    ) -> Self {
        Self {
            pre_key_id: pre_key.map(|(id, _)| id),
            pre_key_public: pre_key.map(|(_, key)| key),
            signed_pre_key_id,
            signed_pre_key_public: Some(signed_pre_key_public),
            signed_pre_key_signature,
            identity_key,
        }
    }
}
