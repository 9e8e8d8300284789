//! Общие помощники для интеграционных тестов

#![allow(dead_code)]

use construct_session::crypto::handshake::x3dh::{
    initialize_alice_session, initialize_bob_session, AliceParameters, BobParameters,
};
use construct_session::{
    ClassicSuiteProvider, CiphertextMessage, CryptoProvider, DeviceId, IdentityKeyStore,
    InMemoryProtocolStore, PreKeyBundle, PreKeyRecord, ProtocolAddress, SessionRecord,
    SessionStore, SignedPreKeyRecord, SignedPreKeyStore, PreKeyStore, UserId,
};
use tracing_subscriber::EnvFilter;

/// Одна сторона разговора: её хранилище и адрес, по которому её видит собеседник
pub struct Party {
    pub store: InMemoryProtocolStore,
    pub address: ProtocolAddress,
    next_pre_key_id: u32,
}

impl Party {
    pub fn new() -> Self {
        init_tracing();
        let identity = ClassicSuiteProvider::generate_key_pair().unwrap();
        let address = ProtocolAddress::new(UserId::new(identity.public_key), DeviceId::random());
        Self {
            store: InMemoryProtocolStore::new(identity),
            address,
            next_pre_key_id: 1,
        }
    }

    /// Сгенерировать и сохранить prekeys, вернуть публичный bundle
    pub fn create_bundle(&mut self, with_one_time: bool) -> PreKeyBundle {
        let identity = self.store.identity_key_pair().unwrap();
        let signed_pre_key_id = self.next_pre_key_id;
        let pre_key_id = self.next_pre_key_id + 1;
        self.next_pre_key_id += 2;

        let signed = ClassicSuiteProvider::generate_key_pair().unwrap();
        let signature =
            ClassicSuiteProvider::sign(&identity.private_key, signed.public_key.as_bytes()).unwrap();
        self.store
            .store_signed_pre_key(
                signed_pre_key_id,
                &SignedPreKeyRecord::new(signed_pre_key_id, 1_700_000_000_000, signed.clone(), signature.clone()),
            )
            .unwrap();

        let one_time = if with_one_time {
            let pair = ClassicSuiteProvider::generate_key_pair().unwrap();
            self.store
                .store_pre_key(pre_key_id, &PreKeyRecord::new(pre_key_id, pair.clone()))
                .unwrap();
            Some((pre_key_id, pair.public_key))
        } else {
            None
        };

        PreKeyBundle::new(one_time, signed_pre_key_id, signed.public_key, signature, identity.public_key)
    }

    pub fn record_for(&self, peer: &Party) -> Option<SessionRecord> {
        self.store.load_session(&peer.address).unwrap()
    }

    pub fn session_bytes_for(&self, peer: &Party) -> Option<Vec<u8>> {
        self.record_for(peer).map(|record| record.serialize().unwrap())
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Установить сессии напрямую через X3DH, без prekey сообщений
pub fn initialize_sessions(alice: &mut Party, bob: &mut Party) {
    let alice_identity = alice.store.identity_key_pair().unwrap();
    let bob_identity = bob.store.identity_key_pair().unwrap();
    let alice_base = ClassicSuiteProvider::generate_key_pair().unwrap();
    let bob_base = ClassicSuiteProvider::generate_key_pair().unwrap();

    let alice_state = initialize_alice_session::<ClassicSuiteProvider>(&AliceParameters {
        our_identity_key: alice_identity.clone(),
        our_base_key: alice_base.clone(),
        their_identity_key: bob_identity.public_key,
        their_signed_pre_key: bob_base.public_key,
        their_one_time_pre_key: None,
        their_ratchet_key: bob_base.public_key,
    })
    .unwrap();
    let bob_state = initialize_bob_session::<ClassicSuiteProvider>(&BobParameters {
        our_identity_key: bob_identity,
        our_signed_pre_key: bob_base.clone(),
        our_one_time_pre_key: None,
        our_ratchet_key: bob_base,
        their_identity_key: alice_identity.public_key,
        their_base_key: alice_base.public_key,
    })
    .unwrap();

    alice
        .store
        .store_session(&bob.address, &SessionRecord::new(alice_state))
        .unwrap();
    bob.store
        .store_session(&alice.address, &SessionRecord::new(bob_state))
        .unwrap();
}

/// Отправить через "транспорт": тип + байты, разбор на стороне получателя
pub fn transmit(message: &CiphertextMessage) -> CiphertextMessage {
    CiphertextMessage::from_bytes(message.message_type(), message.serialize()).unwrap()
}

/// Обе стороны сейчас используют одну и ту же инкарнацию сессии
pub fn is_session_id_equal(alice: &Party, bob: &Party) -> bool {
    let alice_base = alice
        .record_for(bob)
        .and_then(|record| record.session_state().and_then(|s| s.alice_base_key().copied()));
    let bob_base = bob
        .record_for(alice)
        .and_then(|record| record.session_state().and_then(|s| s.alice_base_key().copied()));
    alice_base.is_some() && alice_base == bob_base
}
