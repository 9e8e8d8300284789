//! SessionBuilder: создание сессий
//!
//! Две точки входа:
//! - [`SessionBuilder::process_pre_key_bundle`]: мы инициатор, у нас есть bundle
//!   собеседника; новое состояние становится текущим и помечается
//!   pending prekey до первого ответа.
//! - [`SessionBuilder::process_pre_key_message`]: мы получатель первого
//!   сообщения; вызывается из SessionCipher над копией записи.

use std::marker::PhantomData;
use tracing::{debug, info};

use crate::crypto::handshake::x3dh::{
    initialize_alice_session, initialize_bob_session, AliceParameters, BobParameters,
};
use crate::crypto::provider::CryptoProvider;
use crate::crypto::suites::classic::ClassicSuiteProvider;
use crate::error::{Result, SessionError};
use crate::protocol::address::ProtocolAddress;
use crate::protocol::messages::PreKeySignalMessage;
use crate::state::prekey::PreKeyBundle;
use crate::state::session_record::SessionRecord;
use crate::state::session_state::PendingPreKey;
use crate::storage::{Direction, ProtocolStore};

pub struct SessionBuilder<'a, S: ProtocolStore, P: CryptoProvider = ClassicSuiteProvider> {
    store: &'a mut S,
    remote_address: ProtocolAddress,
    _provider: PhantomData<P>,
}

impl<'a, S: ProtocolStore> SessionBuilder<'a, S> {
    pub fn new(store: &'a mut S, remote_address: ProtocolAddress) -> Self {
        Self::with_provider(store, remote_address)
    }
}

impl<'a, S: ProtocolStore, P: CryptoProvider> SessionBuilder<'a, S, P> {
    pub fn with_provider(store: &'a mut S, remote_address: ProtocolAddress) -> Self {
        Self {
            store,
            remote_address,
            _provider: PhantomData,
        }
    }

    /// Начать сессию по bundle собеседника (мы Alice)
    pub fn process_pre_key_bundle(&mut self, bundle: &PreKeyBundle) -> Result<()> {
        info!(
            target: "crypto::builder",
            address = %self.remote_address,
            signed_pre_key_id = %bundle.signed_pre_key_id,
            "Processing prekey bundle"
        );

        if &bundle.identity_key != self.remote_address.identity_key() {
            return Err(SessionError::InvalidKey(
                "bundle identity does not match the address".to_string(),
            ));
        }

        if !self.store.is_trusted_identity(
            &self.remote_address,
            &bundle.identity_key,
            Direction::Sending,
        )? {
            return Err(SessionError::UntrustedIdentity(self.remote_address.to_string()));
        }

        let their_signed_pre_key = bundle
            .signed_pre_key_public
            .ok_or_else(|| SessionError::InvalidKey("No signed prekey".to_string()))?;

        if !P::verify(
            &bundle.identity_key,
            their_signed_pre_key.as_bytes(),
            &bundle.signed_pre_key_signature,
        ) {
            debug!(target: "crypto::builder", "Signed prekey signature verification failed");
            return Err(SessionError::InvalidKey(
                "Invalid signature on signed prekey".to_string(),
            ));
        }

        let one_time = match (bundle.pre_key_id, bundle.pre_key_public) {
            (Some(id), Some(key)) => Some((id, key)),
            (None, None) => None,
            _ => {
                return Err(SessionError::InvalidKey(
                    "one-time prekey id and key must come together".to_string(),
                ))
            }
        };

        let our_base_key = P::generate_key_pair()?;
        let mut state = initialize_alice_session::<P>(&AliceParameters {
            our_identity_key: self.store.identity_key_pair()?,
            our_base_key: our_base_key.clone(),
            their_identity_key: bundle.identity_key,
            their_signed_pre_key,
            their_one_time_pre_key: one_time.map(|(_, key)| key),
            their_ratchet_key: their_signed_pre_key,
        })?;

        state.set_pending_pre_key(PendingPreKey {
            pre_key_id: one_time.map(|(id, _)| id),
            signed_pre_key_id: bundle.signed_pre_key_id,
            base_key: our_base_key.public_key,
        });
        state.set_alice_base_key(our_base_key.public_key);

        let mut record = self
            .store
            .load_session(&self.remote_address)?
            .unwrap_or_else(SessionRecord::new_fresh);
        record.promote_state(state);
        self.store.store_session(&self.remote_address, &record)?;

        debug!(
            target: "crypto::builder",
            one_time_pre_key = one_time.is_some(),
            archived_states = %record.previous_session_states().len(),
            "Initiator session stored"
        );
        Ok(())
    }

    /// Построить состояние получателя из PreKeySignalMessage (мы Bob)
    ///
    /// Меняет только переданную запись. Возвращает id одноразового prekey,
    /// который нужно удалить после успешной расшифровки.
    pub fn process_pre_key_message(
        &mut self,
        record: &mut SessionRecord,
        message: &PreKeySignalMessage,
    ) -> Result<Option<u32>> {
        let their_identity_key = *self.remote_address.identity_key();
        if !self.store.is_trusted_identity(
            &self.remote_address,
            &their_identity_key,
            Direction::Receiving,
        )? {
            return Err(SessionError::UntrustedIdentity(self.remote_address.to_string()));
        }

        if record.has_session_state(message.message_version(), message.base_key()) {
            debug!(
                target: "crypto::builder",
                base_key = %message.base_key().to_hex(),
                "Session for this base key already exists"
            );
            return Ok(None);
        }

        let signed_pre_key = self
            .store
            .load_signed_pre_key(message.signed_pre_key_id())?
            .ok_or(SessionError::InvalidKeyId(message.signed_pre_key_id()))?;

        let one_time_pre_key = match message.pre_key_id() {
            Some(id) => Some(
                self.store
                    .load_pre_key(id)?
                    .ok_or(SessionError::InvalidKeyId(id))?
                    .key_pair()
                    .clone(),
            ),
            None => None,
        };

        let state = initialize_bob_session::<P>(&BobParameters {
            our_identity_key: self.store.identity_key_pair()?,
            our_signed_pre_key: signed_pre_key.key_pair().clone(),
            our_one_time_pre_key: one_time_pre_key,
            our_ratchet_key: signed_pre_key.key_pair().clone(),
            their_identity_key,
            their_base_key: *message.base_key(),
        })?;

        record.promote_state(state);

        info!(
            target: "crypto::builder",
            address = %self.remote_address,
            pre_key_id = ?message.pre_key_id(),
            signed_pre_key_id = %message.signed_pre_key_id(),
            "Responder session created"
        );
        Ok(message.pre_key_id())
    }
}
