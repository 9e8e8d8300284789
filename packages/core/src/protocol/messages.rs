//! Сообщения сессионного протокола
//!
//! ## SignalMessage
//! ```text
//! ┌─────────┬──────────────┬─────────┬──────────────┬────────────┬───────┐
//! │ version │ ratchet key  │ counter │ prev counter │ ciphertext │  MAC  │
//! │   1B    │     32B      │ varint  │    varint    │    N×16B   │  8B   │
//! └─────────┴──────────────┴─────────┴──────────────┴────────────┴───────┘
//! version = (message version << 4) | current version
//! MAC = HMAC-SHA256(mac_key, sender IK ‖ receiver IK ‖ всё до MAC)[..8]
//! ```
//!
//! ## PreKeySignalMessage
//! ```text
//! ┌─────────┬───────┬────────────┬───────────────┬──────────┬───────────────────┐
//! │ version │ flags │ prekey id? │ signed pk id  │ base key │ SignalMessage ... │
//! │   1B    │  1B   │   varint   │    varint     │   32B    │                   │
//! └─────────┴───────┴────────────┴───────────────┴──────────┴───────────────────┘
//! flags bit 0: присутствует one-time prekey id
//! ```

use hmac::Mac;
use subtle::ConstantTimeEq;

use crate::config::Config;
use crate::crypto::kdf::HmacSha256;
use crate::crypto::keys::{PublicKey, KEY_LENGTH};
use crate::error::{CryptoError, Result, SessionError};
use crate::protocol::wire::{write_varint, ByteReader};

const FLAG_HAS_PRE_KEY_ID: u8 = 0x01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CiphertextMessageType {
    Whisper = 2,
    PreKey = 3,
}

fn version_byte(message_version: u8) -> u8 {
    (message_version << 4) | Config::global().current_version
}

/// Версия из старшего полубайта; новее текущей или старше неё отвергается
fn check_version(byte: u8) -> Result<u8> {
    let version = byte >> 4;
    let current = Config::global().current_version;
    if version > current {
        return Err(SessionError::InvalidVersion(version));
    }
    if version < current {
        return Err(SessionError::LegacyMessage(version));
    }
    Ok(version)
}

/// Обычное сообщение установленной сессии
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalMessage {
    message_version: u8,
    sender_ratchet_key: PublicKey,
    counter: u32,
    previous_counter: u32,
    ciphertext: Vec<u8>,
    serialized: Vec<u8>,
}

impl SignalMessage {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        message_version: u8,
        mac_key: &[u8; 32],
        sender_ratchet_key: PublicKey,
        counter: u32,
        previous_counter: u32,
        ciphertext: Vec<u8>,
        sender_identity_key: &PublicKey,
        receiver_identity_key: &PublicKey,
    ) -> Result<Self> {
        let mut serialized = Vec::with_capacity(1 + KEY_LENGTH + 10 + ciphertext.len() + 8);
        serialized.push(version_byte(message_version));
        serialized.extend_from_slice(sender_ratchet_key.as_bytes());
        write_varint(&mut serialized, counter);
        write_varint(&mut serialized, previous_counter);
        serialized.extend_from_slice(&ciphertext);

        let mac = Self::compute_mac(
            sender_identity_key,
            receiver_identity_key,
            mac_key,
            &serialized,
        )?;
        serialized.extend_from_slice(&mac);

        Ok(Self {
            message_version,
            sender_ratchet_key,
            counter,
            previous_counter,
            ciphertext,
            serialized,
        })
    }

    pub fn message_version(&self) -> u8 {
        self.message_version
    }

    pub fn sender_ratchet_key(&self) -> &PublicKey {
        &self.sender_ratchet_key
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn previous_counter(&self) -> u32 {
        self.previous_counter
    }

    pub fn body(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn serialized(&self) -> &[u8] {
        &self.serialized
    }

    /// Проверить MAC за константное время
    pub fn verify_mac(
        &self,
        sender_identity_key: &PublicKey,
        receiver_identity_key: &PublicKey,
        mac_key: &[u8; 32],
    ) -> Result<bool> {
        let mac_length = Config::global().mac_length;
        let split = self.serialized.len() - mac_length;
        let (content, their_mac) = self.serialized.split_at(split);

        let our_mac =
            Self::compute_mac(sender_identity_key, receiver_identity_key, mac_key, content)?;
        Ok(bool::from(our_mac.ct_eq(their_mac)))
    }

    fn compute_mac(
        sender_identity_key: &PublicKey,
        receiver_identity_key: &PublicKey,
        mac_key: &[u8; 32],
        content: &[u8],
    ) -> Result<Vec<u8>> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(mac_key).map_err(CryptoError::from)?;
        mac.update(sender_identity_key.as_bytes());
        mac.update(receiver_identity_key.as_bytes());
        mac.update(content);
        let full = mac.finalize().into_bytes();
        Ok(full[..Config::global().mac_length].to_vec())
    }
}

impl TryFrom<&[u8]> for SignalMessage {
    type Error = SessionError;

    fn try_from(data: &[u8]) -> Result<Self> {
        let mac_length = Config::global().mac_length;
        if data.is_empty() {
            return Err(SessionError::InvalidMessage("empty message".to_string()));
        }
        let message_version = check_version(data[0])?;

        if data.len() < 1 + KEY_LENGTH + 2 + mac_length {
            return Err(SessionError::InvalidMessage(format!(
                "message too short: {} bytes",
                data.len()
            )));
        }

        let mut reader = ByteReader::new(&data[1..data.len() - mac_length]);
        let sender_ratchet_key = reader
            .read_public_key()
            .map_err(|e| SessionError::InvalidMessage(e.to_string()))?;
        let counter = reader.read_varint()?;
        let previous_counter = reader.read_varint()?;
        let ciphertext = reader.remaining().to_vec();

        Ok(Self {
            message_version,
            sender_ratchet_key,
            counter,
            previous_counter,
            ciphertext,
            serialized: data.to_vec(),
        })
    }
}

/// Первое сообщение инициатора: несёт материал для X3DH на стороне получателя
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreKeySignalMessage {
    message_version: u8,
    pre_key_id: Option<u32>,
    signed_pre_key_id: u32,
    base_key: PublicKey,
    message: SignalMessage,
    serialized: Vec<u8>,
}

impl PreKeySignalMessage {
    pub fn new(
        message_version: u8,
        pre_key_id: Option<u32>,
        signed_pre_key_id: u32,
        base_key: PublicKey,
        message: SignalMessage,
    ) -> Self {
        let mut serialized =
            Vec::with_capacity(2 + 10 + KEY_LENGTH + message.serialized().len());
        serialized.push(version_byte(message_version));
        match pre_key_id {
            Some(id) => {
                serialized.push(FLAG_HAS_PRE_KEY_ID);
                write_varint(&mut serialized, id);
            }
            None => serialized.push(0),
        }
        write_varint(&mut serialized, signed_pre_key_id);
        serialized.extend_from_slice(base_key.as_bytes());
        serialized.extend_from_slice(message.serialized());

        Self {
            message_version,
            pre_key_id,
            signed_pre_key_id,
            base_key,
            message,
            serialized,
        }
    }

    pub fn message_version(&self) -> u8 {
        self.message_version
    }

    pub fn pre_key_id(&self) -> Option<u32> {
        self.pre_key_id
    }

    pub fn signed_pre_key_id(&self) -> u32 {
        self.signed_pre_key_id
    }

    pub fn base_key(&self) -> &PublicKey {
        &self.base_key
    }

    pub fn message(&self) -> &SignalMessage {
        &self.message
    }

    pub fn serialized(&self) -> &[u8] {
        &self.serialized
    }
}

impl TryFrom<&[u8]> for PreKeySignalMessage {
    type Error = SessionError;

    fn try_from(data: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(data);
        let message_version = check_version(reader.read_u8()?)?;

        let flags = reader.read_u8()?;
        if flags & !FLAG_HAS_PRE_KEY_ID != 0 {
            return Err(SessionError::InvalidMessage(format!("unknown flags: {:#04x}", flags)));
        }
        let pre_key_id = if flags & FLAG_HAS_PRE_KEY_ID != 0 {
            Some(reader.read_varint()?)
        } else {
            None
        };
        let signed_pre_key_id = reader.read_varint()?;
        let base_key = reader
            .read_public_key()
            .map_err(|e| SessionError::InvalidMessage(e.to_string()))?;
        let message = SignalMessage::try_from(reader.remaining())?;

        Ok(Self {
            message_version,
            pre_key_id,
            signed_pre_key_id,
            base_key,
            message,
            serialized: data.to_vec(),
        })
    }
}

/// Исходящее сообщение, тип определяет способ расшифровки у получателя
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CiphertextMessage {
    Whisper(SignalMessage),
    PreKey(PreKeySignalMessage),
}

impl CiphertextMessage {
    pub fn message_type(&self) -> CiphertextMessageType {
        match self {
            CiphertextMessage::Whisper(_) => CiphertextMessageType::Whisper,
            CiphertextMessage::PreKey(_) => CiphertextMessageType::PreKey,
        }
    }

    pub fn serialize(&self) -> &[u8] {
        match self {
            CiphertextMessage::Whisper(message) => message.serialized(),
            CiphertextMessage::PreKey(message) => message.serialized(),
        }
    }

    /// Разобрать байты по типу, пришедшему из транспорта
    pub fn from_bytes(message_type: CiphertextMessageType, data: &[u8]) -> Result<Self> {
        Ok(match message_type {
            CiphertextMessageType::Whisper => CiphertextMessage::Whisper(data.try_into()?),
            CiphertextMessageType::PreKey => CiphertextMessage::PreKey(data.try_into()?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAC_KEY: [u8; 32] = [0x5A; 32];

    fn identities() -> (PublicKey, PublicKey) {
        (PublicKey::from([0x01; 32]), PublicKey::from([0x02; 32]))
    }

    fn sample_message(counter: u32) -> SignalMessage {
        let (sender, receiver) = identities();
        SignalMessage::new(
            3,
            &MAC_KEY,
            PublicKey::from([0x77; 32]),
            counter,
            4,
            vec![0xCC; 32],
            &sender,
            &receiver,
        )
        .unwrap()
    }

    #[test]
    fn test_signal_message_layout() {
        let message = sample_message(300);
        let bytes = message.serialized();

        assert_eq!(bytes[0], 0x33);
        assert_eq!(&bytes[1..33], &[0x77; 32]);
        assert_eq!(&bytes[33..35], &[0xAC, 0x02]);
        assert_eq!(bytes[35], 4);
        assert_eq!(bytes.len(), 1 + 32 + 2 + 1 + 32 + 8);

        let parsed = SignalMessage::try_from(bytes).unwrap();
        assert_eq!(parsed, message);
        assert_eq!(parsed.counter(), 300);
        assert_eq!(parsed.previous_counter(), 4);
    }

    #[test]
    fn test_mac_binds_identities_and_content() {
        let (sender, receiver) = identities();
        let message = sample_message(1);
        assert!(message.verify_mac(&sender, &receiver, &MAC_KEY).unwrap());
        assert!(!message.verify_mac(&receiver, &sender, &MAC_KEY).unwrap());
        assert!(!message.verify_mac(&sender, &receiver, &[0u8; 32]).unwrap());

        let mut tampered = message.serialized().to_vec();
        tampered[40] ^= 0x01;
        let tampered = SignalMessage::try_from(tampered.as_slice()).unwrap();
        assert!(!tampered.verify_mac(&sender, &receiver, &MAC_KEY).unwrap());
    }

    #[test]
    fn test_version_gating() {
        let mut bytes = sample_message(1).serialized().to_vec();

        bytes[0] = 0x43;
        assert!(matches!(
            SignalMessage::try_from(bytes.as_slice()),
            Err(SessionError::InvalidVersion(4))
        ));

        bytes[0] = 0x23;
        assert!(matches!(
            SignalMessage::try_from(bytes.as_slice()),
            Err(SessionError::LegacyMessage(2))
        ));
    }

    #[test]
    fn test_short_message_rejected() {
        let bytes = sample_message(1).serialized()[..20].to_vec();
        assert!(matches!(
            SignalMessage::try_from(bytes.as_slice()),
            Err(SessionError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_pre_key_message_with_and_without_one_time_key() {
        let inner = sample_message(0);
        let base_key = PublicKey::from([0x09; 32]);

        let with_id = PreKeySignalMessage::new(3, Some(31337), 7, base_key, inner.clone());
        let parsed = PreKeySignalMessage::try_from(with_id.serialized()).unwrap();
        assert_eq!(parsed.pre_key_id(), Some(31337));
        assert_eq!(parsed.signed_pre_key_id(), 7);
        assert_eq!(parsed.base_key(), &base_key);
        assert_eq!(parsed.message(), &inner);

        let without_id = PreKeySignalMessage::new(3, None, 7, base_key, inner);
        let parsed = PreKeySignalMessage::try_from(without_id.serialized()).unwrap();
        assert_eq!(parsed.pre_key_id(), None);
        assert_eq!(without_id.serialized().len() + 3, with_id.serialized().len());
    }

    #[test]
    fn test_pre_key_message_version_gating() {
        let message = PreKeySignalMessage::new(3, None, 1, PublicKey::from([0x09; 32]), sample_message(0));
        let mut bytes = message.serialized().to_vec();
        bytes[0] = 0x53;
        assert!(matches!(
            PreKeySignalMessage::try_from(bytes.as_slice()),
            Err(SessionError::InvalidVersion(5))
        ));
        bytes[0] = 0x13;
        assert!(matches!(
            PreKeySignalMessage::try_from(bytes.as_slice()),
            Err(SessionError::LegacyMessage(1))
        ));
    }

    #[test]
    fn test_ciphertext_message_type() {
        let whisper = CiphertextMessage::Whisper(sample_message(0));
        assert_eq!(whisper.message_type(), CiphertextMessageType::Whisper);
        assert_eq!(whisper.message_type() as u8, 2);

        let parsed = CiphertextMessage::from_bytes(CiphertextMessageType::Whisper, whisper.serialize()).unwrap();
        assert_eq!(parsed, whisper);
    }
}
