//! SessionCipher: шифрование и расшифровка для одного адреса
//!
//! ```text
//! encrypt ──► load record ──► encrypt_state(current) ──► trust? ──► store
//!
//! decrypt(PreKeySignalMessage)
//!   └─► load record ──► SessionBuilder::process_pre_key_message
//!         └─► decrypt_with_record ──► callback ──► store ──► remove one-time prekey
//!
//! decrypt(SignalMessage)
//!   └─► load record ──► decrypt_with_record ──► trust? ──► callback ──► store
//!
//! decrypt_with_record: копия текущего состояния, затем копии архивных
//! по порядку; успешное архивное состояние становится текущим.
//! ```
//!
//! Пока запись не сохранена, хранилища не меняются: любая ошибка
//! (включая ошибку callback) оставляет их в исходном состоянии.

use std::marker::PhantomData;
use tracing::{debug, info, warn};

use crate::crypto::keys::PublicKey;
use crate::crypto::messaging::double_ratchet::{decrypt_state, encrypt_state};
use crate::crypto::provider::CryptoProvider;
use crate::crypto::session_builder::SessionBuilder;
use crate::crypto::suites::classic::ClassicSuiteProvider;
use crate::error::{Result, SessionError};
use crate::protocol::address::ProtocolAddress;
use crate::protocol::messages::{CiphertextMessage, PreKeySignalMessage, SignalMessage};
use crate::state::session_record::SessionRecord;
use crate::storage::{Direction, ProtocolStore};

pub struct SessionCipher<'a, S: ProtocolStore, P: CryptoProvider = ClassicSuiteProvider> {
    store: &'a mut S,
    remote_address: ProtocolAddress,
    _provider: PhantomData<P>,
}

impl<'a, S: ProtocolStore> SessionCipher<'a, S> {
    pub fn new(store: &'a mut S, remote_address: ProtocolAddress) -> Self {
        Self::with_provider(store, remote_address)
    }
}

impl<'a, S: ProtocolStore, P: CryptoProvider> SessionCipher<'a, S, P> {
    pub fn with_provider(store: &'a mut S, remote_address: ProtocolAddress) -> Self {
        Self {
            store,
            remote_address,
            _provider: PhantomData,
        }
    }

    pub fn remote_address(&self) -> &ProtocolAddress {
        &self.remote_address
    }

    /// Зашифровать plaintext на текущей сессии
    pub fn encrypt(&mut self, plaintext: &[u8]) -> Result<CiphertextMessage> {
        let mut record = self
            .store
            .load_session(&self.remote_address)?
            .ok_or_else(|| SessionError::NoSession(self.remote_address.to_string()))?;
        let state = record
            .session_state_mut()
            .ok_or_else(|| SessionError::NoSession(self.remote_address.to_string()))?;

        let message = encrypt_state(state, plaintext)?;

        let remote_identity = *state.remote_identity_key();
        if !self.store.is_trusted_identity(
            &self.remote_address,
            &remote_identity,
            Direction::Sending,
        )? {
            warn!(
                target: "crypto::session",
                address = %self.remote_address,
                "Identity no longer trusted, refusing to send"
            );
            return Err(SessionError::UntrustedIdentity(self.remote_address.to_string()));
        }

        self.store.store_session(&self.remote_address, &record)?;
        Ok(message)
    }

    /// Расшифровать сообщение любого типа
    pub fn decrypt(&mut self, message: &CiphertextMessage) -> Result<Vec<u8>> {
        match message {
            CiphertextMessage::PreKey(message) => self.decrypt_pre_key_message(message),
            CiphertextMessage::Whisper(message) => self.decrypt_message(message),
        }
    }

    pub fn decrypt_pre_key_message(&mut self, message: &PreKeySignalMessage) -> Result<Vec<u8>> {
        self.decrypt_pre_key_message_with_callback(message, |_| Ok(()))
    }

    /// Как [`Self::decrypt_pre_key_message`], но отдаёт plaintext в callback до
    /// сохранения сессии; ошибка callback отменяет всю операцию
    pub fn decrypt_pre_key_message_with_callback<F>(
        &mut self,
        message: &PreKeySignalMessage,
        callback: F,
    ) -> Result<Vec<u8>>
    where
        F: FnOnce(&[u8]) -> Result<()>,
    {
        info!(
            target: "crypto::session",
            address = %self.remote_address,
            "Decrypting prekey message"
        );

        let mut record = self
            .store
            .load_session(&self.remote_address)?
            .unwrap_or_else(SessionRecord::new_fresh);

        let pre_key_to_remove = SessionBuilder::<S, P>::with_provider(
            &mut *self.store,
            self.remote_address,
        )
        .process_pre_key_message(&mut record, message)?;

        let plaintext = self.decrypt_with_record(&mut record, message.message())?;
        callback(&plaintext)?;

        self.store.store_session(&self.remote_address, &record)?;
        if let Some(pre_key_id) = pre_key_to_remove {
            self.store.remove_pre_key(pre_key_id)?;
        }
        Ok(plaintext)
    }

    pub fn decrypt_message(&mut self, message: &SignalMessage) -> Result<Vec<u8>> {
        self.decrypt_message_with_callback(message, |_| Ok(()))
    }

    /// Как [`Self::decrypt_message`], но отдаёт plaintext в callback до
    /// сохранения сессии; ошибка callback отменяет всю операцию
    pub fn decrypt_message_with_callback<F>(
        &mut self,
        message: &SignalMessage,
        callback: F,
    ) -> Result<Vec<u8>>
    where
        F: FnOnce(&[u8]) -> Result<()>,
    {
        let mut record = self
            .store
            .load_session(&self.remote_address)?
            .ok_or_else(|| SessionError::NoSession(self.remote_address.to_string()))?;

        let plaintext = self.decrypt_with_record(&mut record, message)?;

        let remote_identity = record
            .session_state()
            .map(|state| *state.remote_identity_key())
            .ok_or_else(|| SessionError::NoSession(self.remote_address.to_string()))?;
        if !self.store.is_trusted_identity(
            &self.remote_address,
            &remote_identity,
            Direction::Receiving,
        )? {
            return Err(SessionError::UntrustedIdentity(self.remote_address.to_string()));
        }

        callback(&plaintext)?;
        self.store.store_session(&self.remote_address, &record)?;
        Ok(plaintext)
    }

    fn decrypt_with_record(
        &self,
        record: &mut SessionRecord,
        message: &SignalMessage,
    ) -> Result<Vec<u8>> {
        let mut errors = Vec::new();

        if let Some(current) = record.session_state() {
            let mut state = current.clone();
            match decrypt_state::<P>(&mut state, message) {
                Ok(plaintext) => {
                    record.set_session_state(state);
                    return Ok(plaintext);
                }
                Err(SessionError::InvalidMessage(reason)) => errors.push(reason),
                Err(e) => return Err(e),
            }
        }

        let previous_count = record.previous_session_states().len();
        for index in 0..previous_count {
            let Some(previous) = record.previous_session_state(index) else {
                break;
            };
            let mut state = previous.clone();
            match decrypt_state::<P>(&mut state, message) {
                Ok(plaintext) => {
                    debug!(
                        target: "crypto::session",
                        archived_index = %index,
                        "Decrypted with archived state, promoting it"
                    );
                    record.promote_old_session(index, state);
                    return Ok(plaintext);
                }
                Err(SessionError::InvalidMessage(reason)) => errors.push(reason),
                Err(e) => return Err(e),
            }
        }

        if errors.is_empty() {
            return Err(SessionError::NoSession(self.remote_address.to_string()));
        }

        debug!(
            target: "crypto::session",
            attempts = %errors.len(),
            "No session state could decrypt the message"
        );
        Err(SessionError::InvalidMessage(format!(
            "No valid sessions: {}",
            errors.join("; ")
        )))
    }

    /// Версия текущей сессии
    pub fn session_version(&self) -> Result<u8> {
        let record = self
            .store
            .load_session(&self.remote_address)?
            .ok_or_else(|| SessionError::NoSession(self.remote_address.to_string()))?;
        record
            .session_state()
            .map(|state| state.session_version())
            .ok_or_else(|| SessionError::NoSession(self.remote_address.to_string()))
    }

    pub fn remote_identity_key(&self) -> Result<Option<PublicKey>> {
        Ok(self
            .store
            .load_session(&self.remote_address)?
            .and_then(|record| record.session_state().map(|state| *state.remote_identity_key())))
    }
}
