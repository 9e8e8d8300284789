//! Double Ratchet над одним SessionState
//!
//! ## Шифрование
//! ```text
//! sender ChainKey(n) ──► MessageKeys(n) ──► AES-256-CBC + HMAC ──► SignalMessage
//!        │                                                           │
//!        ▼                                             pending_pre_key? ──► PreKeySignalMessage
//! sender ChainKey(n+1)
//! ```
//!
//! ## Расшифровка
//! ```text
//! ratchet key известен? ── да ──► receiver ChainKey
//!        │
//!        нет ──► DH ratchet step:
//!                  (root', recv) = root.create_chain(their, our)
//!                  our' = новая пара
//!                  (root'', send) = root'.create_chain(their, our')
//!
//! counter < index ──► сохранённый ключ или DuplicateMessage
//! counter ≥ index ──► сохранить пропущенные ключи, продвинуть цепочку
//!
//! verify MAC ──► decrypt ──► clear pending_pre_key
//! ```
//!
//! Функции мутируют переданное состояние; вызывающий код работает с копией
//! и сохраняет её только после успеха.

use tracing::{debug, trace};

use crate::config::Config;
use crate::crypto::cipher::{aes_256_cbc_decrypt, aes_256_cbc_encrypt};
use crate::crypto::keys::PublicKey;
use crate::crypto::provider::CryptoProvider;
use crate::crypto::ratchet::{ChainKey, MessageKeys};
use crate::error::{Result, SessionError};
use crate::protocol::messages::{CiphertextMessage, PreKeySignalMessage, SignalMessage};
use crate::state::session_state::SessionState;

/// Зашифровать сообщение на текущей sender chain и продвинуть её
pub fn encrypt_state(state: &mut SessionState, plaintext: &[u8]) -> Result<CiphertextMessage> {
    let chain_key = state
        .sender_chain_key()
        .cloned()
        .ok_or_else(|| SessionError::InvalidState("session has no sender chain".to_string()))?;
    let ratchet_key = state
        .sender_ratchet_key()
        .copied()
        .ok_or_else(|| SessionError::InvalidState("session has no sender chain".to_string()))?;

    trace!(
        target: "crypto::double_ratchet",
        plaintext_len = %plaintext.len(),
        chain_index = %chain_key.index(),
        "Encrypting message"
    );

    let message_keys = chain_key.message_keys()?;
    let ciphertext = aes_256_cbc_encrypt(message_keys.cipher_key(), message_keys.iv(), plaintext);

    let version = state.session_version();
    let message = SignalMessage::new(
        version,
        message_keys.mac_key(),
        ratchet_key,
        chain_key.index(),
        state.previous_counter(),
        ciphertext,
        state.local_identity_key(),
        state.remote_identity_key(),
    )?;

    let outgoing = match state.pending_pre_key() {
        Some(pending) => {
            debug!(
                target: "crypto::double_ratchet",
                pre_key_id = ?pending.pre_key_id,
                signed_pre_key_id = %pending.signed_pre_key_id,
                "Wrapping message as PreKeySignalMessage"
            );
            CiphertextMessage::PreKey(PreKeySignalMessage::new(
                version,
                pending.pre_key_id,
                pending.signed_pre_key_id,
                pending.base_key,
                message,
            ))
        }
        None => CiphertextMessage::Whisper(message),
    };

    state.set_sender_chain_key(chain_key.next_chain_key()?);
    Ok(outgoing)
}

/// Расшифровать сообщение в рамках одного состояния
pub fn decrypt_state<P: CryptoProvider>(
    state: &mut SessionState,
    message: &SignalMessage,
) -> Result<Vec<u8>> {
    if !state.has_sender_chain() {
        return Err(SessionError::InvalidMessage("Uninitialized session".to_string()));
    }

    if message.message_version() != state.session_version() {
        return Err(SessionError::InvalidMessage(format!(
            "Message version {}, but session version {}",
            message.message_version(),
            state.session_version()
        )));
    }

    debug!(
        target: "crypto::double_ratchet",
        counter = %message.counter(),
        previous_counter = %message.previous_counter(),
        "Decrypting message"
    );

    let their_ratchet_key = *message.sender_ratchet_key();
    let chain_key = get_or_create_chain_key::<P>(state, message)?;
    let message_keys =
        get_or_create_message_keys(state, &their_ratchet_key, &chain_key, message.counter())?;

    let mac_valid = message.verify_mac(
        state.remote_identity_key(),
        state.local_identity_key(),
        message_keys.mac_key(),
    )?;
    if !mac_valid {
        debug!(target: "crypto::double_ratchet", "MAC verification failed");
        return Err(SessionError::InvalidMessage("Bad MAC".to_string()));
    }

    let plaintext = aes_256_cbc_decrypt(message_keys.cipher_key(), message_keys.iv(), message.body())
        .map_err(|e| SessionError::InvalidMessage(e.to_string()))?;

    state.clear_pending_pre_key();
    debug!(target: "crypto::double_ratchet", "Decryption successful");
    Ok(plaintext)
}

fn get_or_create_chain_key<P: CryptoProvider>(
    state: &mut SessionState,
    message: &SignalMessage,
) -> Result<ChainKey> {
    let their_ratchet_key = message.sender_ratchet_key();
    if let Some(chain_key) = state.receiver_chain_key(their_ratchet_key) {
        return Ok(chain_key.clone());
    }

    debug!(
        target: "crypto::double_ratchet",
        their_ratchet_key = %their_ratchet_key.to_hex(),
        "Performing DH ratchet"
    );

    store_previous_chain_keys(state, message.previous_counter())?;

    let root_key = state.root_key().clone();
    let our_ratchet_key = state
        .sender_ratchet_key_pair()
        .cloned()
        .ok_or_else(|| SessionError::InvalidMessage("Uninitialized session".to_string()))?;
    let (receiver_root, receiver_chain) =
        root_key.create_chain::<P>(their_ratchet_key, &our_ratchet_key)?;

    let our_new_ratchet_key = P::generate_key_pair()?;
    let (sender_root, sender_chain) =
        receiver_root.create_chain::<P>(their_ratchet_key, &our_new_ratchet_key)?;

    let sent_on_previous_chain = state.sender_chain_key().map(|c| c.index()).unwrap_or(0);

    state.set_root_key(sender_root);
    state.add_receiver_chain(*their_ratchet_key, receiver_chain.clone());
    state.set_previous_counter(sent_on_previous_chain);
    state.set_sender_chain(our_new_ratchet_key, sender_chain);

    trace!(
        target: "crypto::double_ratchet",
        previous_counter = %sent_on_previous_chain,
        receiver_chains = %state.receiver_chain_count(),
        "DH ratchet complete"
    );
    Ok(receiver_chain)
}

/// Перед сменой ratchet key сохранить ключи, которые собеседник успел
/// отправить на своей прошлой цепочке (`previous_counter` штук)
fn store_previous_chain_keys(state: &mut SessionState, previous_counter: u32) -> Result<()> {
    let Some(latest) = state.latest_receiver_ratchet_key().copied() else {
        return Ok(());
    };
    let Some(mut chain_key) = state.receiver_chain_key(&latest).cloned() else {
        return Ok(());
    };
    if previous_counter <= chain_key.index() {
        return Ok(());
    }
    if previous_counter - chain_key.index() > Config::global().max_future_messages {
        debug!(
            target: "crypto::double_ratchet",
            previous_counter = %previous_counter,
            chain_index = %chain_key.index(),
            "Previous chain gap too large, not storing its keys"
        );
        return Ok(());
    }

    while chain_key.index() < previous_counter {
        state.set_message_keys(&latest, chain_key.message_keys()?);
        chain_key = chain_key.next_chain_key()?;
    }
    state.set_receiver_chain_key(&latest, chain_key);
    Ok(())
}

fn get_or_create_message_keys(
    state: &mut SessionState,
    their_ratchet_key: &PublicKey,
    chain_key: &ChainKey,
    counter: u32,
) -> Result<MessageKeys> {
    if chain_key.index() > counter {
        return state
            .remove_message_keys(their_ratchet_key, counter)
            .ok_or(SessionError::DuplicateMessage {
                index: chain_key.index(),
                counter,
            });
    }

    let max_future = Config::global().max_future_messages;
    if counter - chain_key.index() > max_future {
        return Err(SessionError::InvalidMessage(format!(
            "Over {} messages into the future",
            max_future
        )));
    }

    let mut chain_key = chain_key.clone();
    while chain_key.index() < counter {
        state.set_message_keys(their_ratchet_key, chain_key.message_keys()?);
        chain_key = chain_key.next_chain_key()?;
    }

    state.set_receiver_chain_key(their_ratchet_key, chain_key.next_chain_key()?);
    chain_key.message_keys()
}
