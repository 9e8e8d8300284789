//! Адресация собеседников
//!
//! Адрес привязан к identity key: `UserId` это и есть публичный identity key
//! пользователя, `DeviceId` идентифицирует конкретное устройство.
//! Текстовая форма: `<hex identity key>:<device uuid>`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::crypto::keys::PublicKey;
use crate::error::{Result, SessionError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(PublicKey);

impl UserId {
    pub fn new(identity_key: PublicKey) -> Self {
        Self(identity_key)
    }

    pub fn identity_key(&self) -> &PublicKey {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_hex())
    }
}

impl FromStr for UserId {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = hex::decode(s)
            .map_err(|e| SessionError::InvalidKey(format!("identity key is not hex: {}", e)))?;
        Ok(Self(PublicKey::from_bytes(&bytes)?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId(Uuid);

impl DeviceId {
    pub fn new(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DeviceId {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| SessionError::InvalidAddress(format!("bad device id '{}': {}", s, e)))
    }
}

/// Адрес удалённой стороны: пользователь + устройство
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProtocolAddress {
    user_id: UserId,
    device_id: DeviceId,
}

impl ProtocolAddress {
    pub fn new(user_id: UserId, device_id: DeviceId) -> Self {
        Self { user_id, device_id }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    pub fn identity_key(&self) -> &PublicKey {
        self.user_id.identity_key()
    }
}

impl fmt::Display for ProtocolAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.user_id, self.device_id)
    }
}

impl FromStr for ProtocolAddress {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self> {
        let (user, device) = s
            .split_once(':')
            .ok_or_else(|| SessionError::InvalidAddress(format!("missing ':' in '{}'", s)))?;
        Ok(Self::new(user.parse()?, device.parse()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_address() -> ProtocolAddress {
        ProtocolAddress::new(UserId::new(PublicKey::from([0xAB; 32])), DeviceId::random())
    }

    #[test]
    fn test_display_parse() {
        let address = sample_address();
        let rendered = address.to_string();
        assert!(rendered.starts_with(&"ab".repeat(32)));

        let parsed: ProtocolAddress = rendered.parse().unwrap();
        assert_eq!(parsed, address);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            "no-separator".parse::<ProtocolAddress>(),
            Err(SessionError::InvalidAddress(_))
        ));

        let bad_device = format!("{}:not-a-uuid", "ab".repeat(32));
        assert!(matches!(
            bad_device.parse::<ProtocolAddress>(),
            Err(SessionError::InvalidAddress(_))
        ));

        let short_key = format!("abcd:{}", Uuid::new_v4());
        assert!(matches!(
            short_key.parse::<ProtocolAddress>(),
            Err(SessionError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_random_devices_differ() {
        assert_ne!(DeviceId::random(), DeviceId::random());
    }
}
