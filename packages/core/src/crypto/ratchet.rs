//! Ключи Double Ratchet
//!
//! ```text
//!              DH(their ratchet, our ratchet)
//!                          │
//!   RootKey ──HKDF("WhisperRatchet")──► RootKey'
//!                          │
//!                          └──► ChainKey(index 0)
//!
//!   ChainKey(n) ──HMAC(0x02)──► ChainKey(n+1)
//!        │
//!        └──HMAC(0x01)──HKDF("WhisperMessageKeys")──► MessageKeys(n)
//!                                                     cipher 32 ‖ mac 32 ‖ iv 16
//! ```

use hmac::Mac;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::kdf::{HmacSha256, Kdf};
use crate::crypto::keys::{KeyPair, PublicKey};
use crate::crypto::provider::CryptoProvider;
use crate::error::{Result, SessionError};

const MESSAGE_KEY_SEED: u8 = 0x01;
const CHAIN_KEY_SEED: u8 = 0x02;

const ROOT_KEY_INFO: &[u8] = b"WhisperRatchet";
const MESSAGE_KEYS_INFO: &[u8] = b"WhisperMessageKeys";

/// Ключи одного сообщения
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct MessageKeys {
    cipher_key: [u8; 32],
    mac_key: [u8; 32],
    iv: [u8; 16],
    counter: u32,
}

impl MessageKeys {
    pub fn new(cipher_key: [u8; 32], mac_key: [u8; 32], iv: [u8; 16], counter: u32) -> Self {
        Self {
            cipher_key,
            mac_key,
            iv,
            counter,
        }
    }

    pub fn cipher_key(&self) -> &[u8; 32] {
        &self.cipher_key
    }

    pub fn mac_key(&self) -> &[u8; 32] {
        &self.mac_key
    }

    pub fn iv(&self) -> &[u8; 16] {
        &self.iv
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }
}

impl fmt::Debug for MessageKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageKeys")
            .field("counter", &self.counter)
            .finish_non_exhaustive()
    }
}

/// Ключ симметричной цепочки с индексом следующего сообщения
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainKey {
    kdf: Kdf,
    key: [u8; 32],
    index: u32,
}

impl ChainKey {
    pub fn new(kdf: Kdf, key: [u8; 32], index: u32) -> Self {
        Self { kdf, key, index }
    }

    pub fn key(&self) -> &[u8; 32] {
        &self.key
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn next_chain_key(&self) -> Result<ChainKey> {
        let index = self
            .index
            .checked_add(1)
            .ok_or_else(|| SessionError::InvalidState("chain index overflow".to_string()))?;
        Ok(ChainKey {
            kdf: self.kdf,
            key: self.base_material(CHAIN_KEY_SEED)?,
            index,
        })
    }

    pub fn message_keys(&self) -> Result<MessageKeys> {
        let input = self.base_material(MESSAGE_KEY_SEED)?;
        let okm = self.kdf.derive_secrets(&input, None, MESSAGE_KEYS_INFO, 80)?;

        let mut cipher_key = [0u8; 32];
        let mut mac_key = [0u8; 32];
        let mut iv = [0u8; 16];
        cipher_key.copy_from_slice(&okm[..32]);
        mac_key.copy_from_slice(&okm[32..64]);
        iv.copy_from_slice(&okm[64..80]);

        Ok(MessageKeys::new(cipher_key, mac_key, iv, self.index))
    }

    fn base_material(&self, seed: u8) -> Result<[u8; 32]> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.key)
            .map_err(crate::error::CryptoError::from)?;
        mac.update(&[seed]);
        let mut output = [0u8; 32];
        output.copy_from_slice(&mac.finalize().into_bytes());
        Ok(output)
    }
}

impl fmt::Debug for ChainKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainKey")
            .field("kdf", &self.kdf)
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

/// Корневой ключ, продвигается на каждом DH шаге
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootKey {
    kdf: Kdf,
    key: [u8; 32],
}

impl RootKey {
    pub fn new(kdf: Kdf, key: [u8; 32]) -> Self {
        Self { kdf, key }
    }

    pub fn key(&self) -> &[u8; 32] {
        &self.key
    }

    pub fn kdf(&self) -> Kdf {
        self.kdf
    }

    /// DH ratchet шаг: новый RootKey и новая цепочка с индексом 0
    pub fn create_chain<P: CryptoProvider>(
        &self,
        their_ratchet_key: &PublicKey,
        our_ratchet_key: &KeyPair,
    ) -> Result<(RootKey, ChainKey)> {
        let shared_secret = P::agree(&our_ratchet_key.private_key, their_ratchet_key)?;
        let okm = self
            .kdf
            .derive_secrets(&shared_secret, Some(&self.key), ROOT_KEY_INFO, 64)?;

        let mut root = [0u8; 32];
        let mut chain = [0u8; 32];
        root.copy_from_slice(&okm[..32]);
        chain.copy_from_slice(&okm[32..64]);

        Ok((RootKey::new(self.kdf, root), ChainKey::new(self.kdf, chain, 0)))
    }
}

impl fmt::Debug for RootKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootKey")
            .field("kdf", &self.kdf)
            .finish_non_exhaustive()
    }
}
