//! Хранилища протокола
//!
//! Ядро не знает, где лежат ключи и сессии: всё идёт через эти trait'ы.
//! Для тестов и non-persistent клиентов есть in-memory реализации в [`memory`].

pub mod memory;

use crate::crypto::keys::{KeyPair, PublicKey};
use crate::error::Result;
use crate::protocol::address::{ProtocolAddress, UserId};
use crate::state::prekey::{PreKeyRecord, SignedPreKeyRecord};
use crate::state::session_record::SessionRecord;

pub use memory::{
    InMemoryIdentityKeyStore, InMemoryPreKeyStore, InMemoryProtocolStore, InMemorySessionStore,
    InMemorySignedPreKeyStore,
};

/// Направление, в котором используется identity key собеседника
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Sending,
    Receiving,
}

pub trait IdentityKeyStore {
    /// Наша долгосрочная identity пара
    fn identity_key_pair(&self) -> Result<KeyPair>;

    /// Решение о доверии ключу собеседника; политика на стороне приложения
    fn is_trusted_identity(
        &self,
        address: &ProtocolAddress,
        identity_key: &PublicKey,
        direction: Direction,
    ) -> Result<bool>;
}

pub trait PreKeyStore {
    fn load_pre_key(&self, pre_key_id: u32) -> Result<Option<PreKeyRecord>>;
    fn store_pre_key(&mut self, pre_key_id: u32, record: &PreKeyRecord) -> Result<()>;
    fn contains_pre_key(&self, pre_key_id: u32) -> Result<bool>;
    fn remove_pre_key(&mut self, pre_key_id: u32) -> Result<()>;
}

pub trait SignedPreKeyStore {
    fn load_signed_pre_key(&self, signed_pre_key_id: u32) -> Result<Option<SignedPreKeyRecord>>;
    fn load_signed_pre_keys(&self) -> Result<Vec<SignedPreKeyRecord>>;
    fn store_signed_pre_key(&mut self, signed_pre_key_id: u32, record: &SignedPreKeyRecord) -> Result<()>;
    fn contains_signed_pre_key(&self, signed_pre_key_id: u32) -> Result<bool>;
    fn remove_signed_pre_key(&mut self, signed_pre_key_id: u32) -> Result<()>;
}

pub trait SessionStore {
    /// Копия записи; изменения не видны хранилищу до `store_session`
    fn load_session(&self, address: &ProtocolAddress) -> Result<Option<SessionRecord>>;
    fn store_session(&mut self, address: &ProtocolAddress, record: &SessionRecord) -> Result<()>;
    fn contains_session(&self, address: &ProtocolAddress) -> Result<bool>;
    fn delete_session(&mut self, address: &ProtocolAddress) -> Result<()>;
    /// Удалить сессии со всеми устройствами пользователя
    fn delete_all_sessions(&mut self, user_id: &UserId) -> Result<()>;
}

/// Всё, что нужно SessionBuilder и SessionCipher
pub trait ProtocolStore: IdentityKeyStore + PreKeyStore + SignedPreKeyStore + SessionStore {}

impl<T> ProtocolStore for T where T: IdentityKeyStore + PreKeyStore + SignedPreKeyStore + SessionStore {}
