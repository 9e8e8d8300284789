// In-memory хранилища для тестов и non-persistent клиентов

use std::collections::{HashMap, HashSet};
use tracing::trace;

use crate::crypto::keys::{KeyPair, PublicKey};
use crate::error::Result;
use crate::protocol::address::{ProtocolAddress, UserId};
use crate::state::prekey::{PreKeyRecord, SignedPreKeyRecord};
use crate::state::session_record::SessionRecord;
use crate::storage::{
    Direction, IdentityKeyStore, PreKeyStore, SessionStore, SignedPreKeyStore,
};

/// Identity хранилище: доверяет всем ключам, кроме явно отозванных
#[derive(Debug, Clone)]
pub struct InMemoryIdentityKeyStore {
    identity_key_pair: KeyPair,
    untrusted: HashSet<PublicKey>,
}

impl InMemoryIdentityKeyStore {
    pub fn new(identity_key_pair: KeyPair) -> Self {
        Self {
            identity_key_pair,
            untrusted: HashSet::new(),
        }
    }

    pub fn distrust(&mut self, identity_key: PublicKey) {
        self.untrusted.insert(identity_key);
    }

    pub fn trust(&mut self, identity_key: &PublicKey) {
        self.untrusted.remove(identity_key);
    }
}

impl IdentityKeyStore for InMemoryIdentityKeyStore {
    fn identity_key_pair(&self) -> Result<KeyPair> {
        Ok(self.identity_key_pair.clone())
    }

    fn is_trusted_identity(
        &self,
        _address: &ProtocolAddress,
        identity_key: &PublicKey,
        _direction: Direction,
    ) -> Result<bool> {
        Ok(!self.untrusted.contains(identity_key))
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryPreKeyStore {
    pre_keys: HashMap<u32, PreKeyRecord>,
}

impl InMemoryPreKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreKeyStore for InMemoryPreKeyStore {
    fn load_pre_key(&self, pre_key_id: u32) -> Result<Option<PreKeyRecord>> {
        Ok(self.pre_keys.get(&pre_key_id).cloned())
    }

    fn store_pre_key(&mut self, pre_key_id: u32, record: &PreKeyRecord) -> Result<()> {
        self.pre_keys.insert(pre_key_id, record.clone());
        Ok(())
    }

    fn contains_pre_key(&self, pre_key_id: u32) -> Result<bool> {
        Ok(self.pre_keys.contains_key(&pre_key_id))
    }

    fn remove_pre_key(&mut self, pre_key_id: u32) -> Result<()> {
        trace!(target: "storage", pre_key_id = %pre_key_id, "Removing one-time prekey");
        self.pre_keys.remove(&pre_key_id);
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemorySignedPreKeyStore {
    signed_pre_keys: HashMap<u32, SignedPreKeyRecord>,
}

impl InMemorySignedPreKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SignedPreKeyStore for InMemorySignedPreKeyStore {
    fn load_signed_pre_key(&self, signed_pre_key_id: u32) -> Result<Option<SignedPreKeyRecord>> {
        Ok(self.signed_pre_keys.get(&signed_pre_key_id).cloned())
    }

    fn load_signed_pre_keys(&self) -> Result<Vec<SignedPreKeyRecord>> {
        let mut records: Vec<_> = self.signed_pre_keys.values().cloned().collect();
        records.sort_by_key(|record| record.id());
        Ok(records)
    }

    fn store_signed_pre_key(&mut self, signed_pre_key_id: u32, record: &SignedPreKeyRecord) -> Result<()> {
        self.signed_pre_keys.insert(signed_pre_key_id, record.clone());
        Ok(())
    }

    fn contains_signed_pre_key(&self, signed_pre_key_id: u32) -> Result<bool> {
        Ok(self.signed_pre_keys.contains_key(&signed_pre_key_id))
    }

    fn remove_signed_pre_key(&mut self, signed_pre_key_id: u32) -> Result<()> {
        self.signed_pre_keys.remove(&signed_pre_key_id);
        Ok(())
    }
}

/// Сессии хранятся сериализованными, как в настоящем persistent хранилище
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    sessions: HashMap<ProtocolAddress, Vec<u8>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn load_session(&self, address: &ProtocolAddress) -> Result<Option<SessionRecord>> {
        self.sessions
            .get(address)
            .map(|bytes| SessionRecord::deserialize(bytes))
            .transpose()
    }

    fn store_session(&mut self, address: &ProtocolAddress, record: &SessionRecord) -> Result<()> {
        let bytes = record.serialize()?;
        trace!(target: "storage", address = %address, size = %bytes.len(), "Storing session");
        self.sessions.insert(*address, bytes);
        Ok(())
    }

    fn contains_session(&self, address: &ProtocolAddress) -> Result<bool> {
        Ok(self.sessions.contains_key(address))
    }

    fn delete_session(&mut self, address: &ProtocolAddress) -> Result<()> {
        self.sessions.remove(address);
        Ok(())
    }

    fn delete_all_sessions(&mut self, user_id: &UserId) -> Result<()> {
        self.sessions.retain(|address, _| address.user_id() != user_id);
        Ok(())
    }
}

/// Все четыре хранилища вместе
#[derive(Debug, Clone)]
pub struct InMemoryProtocolStore {
    pub identity_store: InMemoryIdentityKeyStore,
    pub pre_key_store: InMemoryPreKeyStore,
    pub signed_pre_key_store: InMemorySignedPreKeyStore,
    pub session_store: InMemorySessionStore,
}

impl InMemoryProtocolStore {
    pub fn new(identity_key_pair: KeyPair) -> Self {
        Self {
            identity_store: InMemoryIdentityKeyStore::new(identity_key_pair),
            pre_key_store: InMemoryPreKeyStore::new(),
            signed_pre_key_store: InMemorySignedPreKeyStore::new(),
            session_store: InMemorySessionStore::new(),
        }
    }
}

impl IdentityKeyStore for InMemoryProtocolStore {
    fn identity_key_pair(&self) -> Result<KeyPair> {
        self.identity_store.identity_key_pair()
    }

    fn is_trusted_identity(
        &self,
        address: &ProtocolAddress,
        identity_key: &PublicKey,
        direction: Direction,
    ) -> Result<bool> {
        self.identity_store
            .is_trusted_identity(address, identity_key, direction)
    }
}

impl PreKeyStore for InMemoryProtocolStore {
    fn load_pre_key(&self, pre_key_id: u32) -> Result<Option<PreKeyRecord>> {
        self.pre_key_store.load_pre_key(pre_key_id)
    }

    fn store_pre_key(&mut self, pre_key_id: u32, record: &PreKeyRecord) -> Result<()> {
        self.pre_key_store.store_pre_key(pre_key_id, record)
    }

    fn contains_pre_key(&self, pre_key_id: u32) -> Result<bool> {
        self.pre_key_store.contains_pre_key(pre_key_id)
    }

    fn remove_pre_key(&mut self, pre_key_id: u32) -> Result<()> {
        self.pre_key_store.remove_pre_key(pre_key_id)
    }
}

impl SignedPreKeyStore for InMemoryProtocolStore {
    fn load_signed_pre_key(&self, signed_pre_key_id: u32) -> Result<Option<SignedPreKeyRecord>> {
        self.signed_pre_key_store.load_signed_pre_key(signed_pre_key_id)
    }

    fn load_signed_pre_keys(&self) -> Result<Vec<SignedPreKeyRecord>> {
        self.signed_pre_key_store.load_signed_pre_keys()
    }

    fn store_signed_pre_key(&mut self, signed_pre_key_id: u32, record: &SignedPreKeyRecord) -> Result<()> {
        self.signed_pre_key_store
            .store_signed_pre_key(signed_pre_key_id, record)
    }

    fn contains_signed_pre_key(&self, signed_pre_key_id: u32) -> Result<bool> {
        self.signed_pre_key_store
            .contains_signed_pre_key(signed_pre_key_id)
    }

    fn remove_signed_pre_key(&mut self, signed_pre_key_id: u32) -> Result<()> {
        self.signed_pre_key_store
            .remove_signed_pre_key(signed_pre_key_id)
    }
}

impl SessionStore for InMemoryProtocolStore {
    fn load_session(&self, address: &ProtocolAddress) -> Result<Option<SessionRecord>> {
        self.session_store.load_session(address)
    }

    fn store_session(&mut self, address: &ProtocolAddress, record: &SessionRecord) -> Result<()> {
        self.session_store.store_session(address, record)
    }

    fn contains_session(&self, address: &ProtocolAddress) -> Result<bool> {
        self.session_store.contains_session(address)
    }

    fn delete_session(&mut self, address: &ProtocolAddress) -> Result<()> {
        self.session_store.delete_session(address)
    }

    fn delete_all_sessions(&mut self, user_id: &UserId) -> Result<()> {
        self.session_store.delete_all_sessions(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::kdf::Kdf;
    use crate::crypto::keys::PrivateKey;
    use crate::crypto::ratchet::RootKey;
    use crate::protocol::address::DeviceId;
    use crate::state::session_state::SessionState;

    fn key_pair(n: u8) -> KeyPair {
        KeyPair::new(PublicKey::from([n; 32]), PrivateKey::from([n; 32]))
    }

    fn address(n: u8) -> ProtocolAddress {
        ProtocolAddress::new(UserId::new(PublicKey::from([n; 32])), DeviceId::random())
    }

    #[test]
    fn test_session_store_returns_copies() {
        let mut store = InMemorySessionStore::new();
        let bob = address(2);
        let state = SessionState::new(3, PublicKey::from([1; 32]), PublicKey::from([2; 32]), RootKey::new(Kdf::V3, [0; 32]));

        store.store_session(&bob, &SessionRecord::new(state)).unwrap();
        let mut loaded = store.load_session(&bob).unwrap().unwrap();
        loaded.archive_current_state();

        let reloaded = store.load_session(&bob).unwrap().unwrap();
        assert!(reloaded.session_state().is_some(), "store must not observe unsaved changes");
        assert!(store.load_session(&address(3)).unwrap().is_none());
    }

    #[test]
    fn test_delete_all_sessions_for_user() {
        let mut store = InMemorySessionStore::new();
        let phone = address(2);
        let laptop = ProtocolAddress::new(*phone.user_id(), DeviceId::random());
        let other = address(3);
        for addr in [&phone, &laptop, &other] {
            store.store_session(addr, &SessionRecord::new_fresh()).unwrap();
        }

        store.delete_all_sessions(phone.user_id()).unwrap();
        assert!(!store.contains_session(&phone).unwrap());
        assert!(!store.contains_session(&laptop).unwrap());
        assert!(store.contains_session(&other).unwrap());
    }

    #[test]
    fn test_pre_key_stores() {
        let mut store = InMemoryProtocolStore::new(key_pair(1));
        store.store_pre_key(7, &PreKeyRecord::new(7, key_pair(7))).unwrap();
        store
            .store_signed_pre_key(9, &SignedPreKeyRecord::new(9, 0, key_pair(9), vec![0; 64]))
            .unwrap();
        store
            .store_signed_pre_key(8, &SignedPreKeyRecord::new(8, 0, key_pair(8), vec![0; 64]))
            .unwrap();

        assert!(store.contains_pre_key(7).unwrap());
        store.remove_pre_key(7).unwrap();
        assert!(store.load_pre_key(7).unwrap().is_none());

        let ids: Vec<u32> = store.load_signed_pre_keys().unwrap().iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec![8, 9]);
    }

    #[test]
    fn test_identity_trust() {
        let mut store = InMemoryIdentityKeyStore::new(key_pair(1));
        let bob = address(2);
        assert!(store.is_trusted_identity(&bob, bob.identity_key(), Direction::Sending).unwrap());

        store.distrust(*bob.identity_key());
        assert!(!store.is_trusted_identity(&bob, bob.identity_key(), Direction::Receiving).unwrap());

        store.trust(bob.identity_key());
        assert!(store.is_trusted_identity(&bob, bob.identity_key(), Direction::Receiving).unwrap());
    }
}
