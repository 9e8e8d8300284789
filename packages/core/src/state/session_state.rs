//! Состояние одной инкарнации Double Ratchet сессии
//!
//! ```text
//! SessionState
//! ├── version, local/remote identity, alice_base_key
//! ├── root_key
//! ├── sender_chain ─────── (our ratchet key pair, ChainKey)
//! ├── receiver_chains ──── [(their ratchet key, ChainKey, skipped MessageKeys)] ≤ 5
//! ├── previous_counter
//! ├── pending_pre_key ──── пока собеседник не ответил
//! └── pending_key_exchange (legacy handshake)
//! ```
//!
//! Лимиты (receiver chains и пропущенные ключи) берутся из [`Config`],
//! при переполнении выбрасываются самые старые элементы.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::trace;

use crate::config::Config;
use crate::crypto::keys::{KeyPair, PublicKey};
use crate::crypto::ratchet::{ChainKey, MessageKeys, RootKey};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SenderChain {
    ratchet_key_pair: KeyPair,
    chain_key: ChainKey,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ReceiverChain {
    sender_ratchet_key: PublicKey,
    chain_key: ChainKey,
    message_keys: VecDeque<MessageKeys>,
}

/// Начальный prekey материал, который инициатор прикладывает к сообщениям до ответа
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPreKey {
    pub pre_key_id: Option<u32>,
    pub signed_pre_key_id: u32,
    pub base_key: PublicKey,
}

/// Материал legacy обмена ключами
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingKeyExchange {
    pub sequence: u32,
    pub local_base_key: KeyPair,
    pub local_ratchet_key: KeyPair,
    pub local_identity_key: KeyPair,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    version: u8,
    local_identity_key: PublicKey,
    remote_identity_key: PublicKey,
    root_key: RootKey,
    previous_counter: u32,
    sender_chain: Option<SenderChain>,
    receiver_chains: VecDeque<ReceiverChain>,
    pending_key_exchange: Option<PendingKeyExchange>,
    pending_pre_key: Option<PendingPreKey>,
    alice_base_key: Option<PublicKey>,
}

impl SessionState {
    pub fn new(
        version: u8,
        local_identity_key: PublicKey,
        remote_identity_key: PublicKey,
        root_key: RootKey,
    ) -> Self {
        Self {
            version,
            local_identity_key,
            remote_identity_key,
            root_key,
            previous_counter: 0,
            sender_chain: None,
            receiver_chains: VecDeque::new(),
            pending_key_exchange: None,
            pending_pre_key: None,
            alice_base_key: None,
        }
    }

    pub fn session_version(&self) -> u8 {
        // 0 встречается только в очень старых записях и означает v2
        if self.version == 0 {
            2
        } else {
            self.version
        }
    }

    pub fn local_identity_key(&self) -> &PublicKey {
        &self.local_identity_key
    }

    pub fn remote_identity_key(&self) -> &PublicKey {
        &self.remote_identity_key
    }

    pub fn alice_base_key(&self) -> Option<&PublicKey> {
        self.alice_base_key.as_ref()
    }

    pub fn set_alice_base_key(&mut self, base_key: PublicKey) {
        self.alice_base_key = Some(base_key);
    }

    pub fn root_key(&self) -> &RootKey {
        &self.root_key
    }

    pub fn set_root_key(&mut self, root_key: RootKey) {
        self.root_key = root_key;
    }

    pub fn previous_counter(&self) -> u32 {
        self.previous_counter
    }

    pub fn set_previous_counter(&mut self, previous_counter: u32) {
        self.previous_counter = previous_counter;
    }

    // ============================================
    // SENDER CHAIN
    // ============================================

    pub fn has_sender_chain(&self) -> bool {
        self.sender_chain.is_some()
    }

    pub fn sender_ratchet_key(&self) -> Option<&PublicKey> {
        self.sender_chain
            .as_ref()
            .map(|chain| &chain.ratchet_key_pair.public_key)
    }

    pub fn sender_ratchet_key_pair(&self) -> Option<&KeyPair> {
        self.sender_chain.as_ref().map(|chain| &chain.ratchet_key_pair)
    }

    pub fn sender_chain_key(&self) -> Option<&ChainKey> {
        self.sender_chain.as_ref().map(|chain| &chain.chain_key)
    }

    pub fn set_sender_chain(&mut self, ratchet_key_pair: KeyPair, chain_key: ChainKey) {
        self.sender_chain = Some(SenderChain {
            ratchet_key_pair,
            chain_key,
        });
    }

    /// Возвращает false, если sender chain ещё нет
    pub fn set_sender_chain_key(&mut self, chain_key: ChainKey) -> bool {
        match self.sender_chain.as_mut() {
            Some(chain) => {
                chain.chain_key = chain_key;
                true
            }
            None => false,
        }
    }

    // ============================================
    // RECEIVER CHAINS
    // ============================================

    fn receiver_chain(&self, sender_ratchet_key: &PublicKey) -> Option<&ReceiverChain> {
        self.receiver_chains
            .iter()
            .find(|chain| &chain.sender_ratchet_key == sender_ratchet_key)
    }

    fn receiver_chain_mut(&mut self, sender_ratchet_key: &PublicKey) -> Option<&mut ReceiverChain> {
        self.receiver_chains
            .iter_mut()
            .find(|chain| &chain.sender_ratchet_key == sender_ratchet_key)
    }

    pub fn has_receiver_chain(&self, sender_ratchet_key: &PublicKey) -> bool {
        self.receiver_chain(sender_ratchet_key).is_some()
    }

    pub fn receiver_chain_key(&self, sender_ratchet_key: &PublicKey) -> Option<&ChainKey> {
        self.receiver_chain(sender_ratchet_key)
            .map(|chain| &chain.chain_key)
    }

    pub fn receiver_chain_count(&self) -> usize {
        self.receiver_chains.len()
    }

    /// Ratchet key самой свежей receiver chain
    pub fn latest_receiver_ratchet_key(&self) -> Option<&PublicKey> {
        self.receiver_chains
            .back()
            .map(|chain| &chain.sender_ratchet_key)
    }

    pub fn add_receiver_chain(&mut self, sender_ratchet_key: PublicKey, chain_key: ChainKey) {
        self.receiver_chains.push_back(ReceiverChain {
            sender_ratchet_key,
            chain_key,
            message_keys: VecDeque::new(),
        });

        let limit = Config::global().max_receiver_chains;
        while self.receiver_chains.len() > limit {
            if let Some(evicted) = self.receiver_chains.pop_front() {
                trace!(
                    target: "crypto::double_ratchet",
                    ratchet_key = %evicted.sender_ratchet_key.to_hex(),
                    "Evicted oldest receiver chain"
                );
            }
        }
    }

    /// Возвращает false, если цепочки с таким ratchet key нет
    pub fn set_receiver_chain_key(&mut self, sender_ratchet_key: &PublicKey, chain_key: ChainKey) -> bool {
        match self.receiver_chain_mut(sender_ratchet_key) {
            Some(chain) => {
                chain.chain_key = chain_key;
                true
            }
            None => false,
        }
    }

    // ============================================
    // SKIPPED MESSAGE KEYS
    // ============================================

    pub fn has_message_keys(&self, sender_ratchet_key: &PublicKey, counter: u32) -> bool {
        self.receiver_chain(sender_ratchet_key)
            .map(|chain| chain.message_keys.iter().any(|keys| keys.counter() == counter))
            .unwrap_or(false)
    }

    /// Извлечь сохранённые ключи; повторно они уже не найдутся
    pub fn remove_message_keys(
        &mut self,
        sender_ratchet_key: &PublicKey,
        counter: u32,
    ) -> Option<MessageKeys> {
        let chain = self.receiver_chain_mut(sender_ratchet_key)?;
        let position = chain
            .message_keys
            .iter()
            .position(|keys| keys.counter() == counter)?;
        chain.message_keys.remove(position)
    }

    pub fn set_message_keys(&mut self, sender_ratchet_key: &PublicKey, message_keys: MessageKeys) -> bool {
        let limit = Config::global().max_message_keys;
        match self.receiver_chain_mut(sender_ratchet_key) {
            Some(chain) => {
                chain.message_keys.push_back(message_keys);
                while chain.message_keys.len() > limit {
                    chain.message_keys.pop_front();
                }
                true
            }
            None => false,
        }
    }

    pub fn message_keys_count(&self, sender_ratchet_key: &PublicKey) -> usize {
        self.receiver_chain(sender_ratchet_key)
            .map(|chain| chain.message_keys.len())
            .unwrap_or(0)
    }

    // ============================================
    // PENDING PREKEY / KEY EXCHANGE
    // ============================================

    pub fn set_pending_pre_key(&mut self, pending: PendingPreKey) {
        self.pending_pre_key = Some(pending);
    }

    pub fn pending_pre_key(&self) -> Option<&PendingPreKey> {
        self.pending_pre_key.as_ref()
    }

    pub fn has_pending_pre_key(&self) -> bool {
        self.pending_pre_key.is_some()
    }

    pub fn clear_pending_pre_key(&mut self) {
        self.pending_pre_key = None;
    }

    pub fn set_pending_key_exchange(&mut self, pending: PendingKeyExchange) {
        self.pending_key_exchange = Some(pending);
    }

    pub fn pending_key_exchange(&self) -> Option<&PendingKeyExchange> {
        self.pending_key_exchange.as_ref()
    }

    pub fn has_pending_key_exchange(&self) -> bool {
        self.pending_key_exchange.is_some()
    }

    pub fn clear_pending_key_exchange(&mut self) {
        self.pending_key_exchange = None;
    }
}
