//! HKDF с версионным разделением доменов
//!
//! - `Kdf::V3`: стандартный RFC 5869 HKDF-SHA256 (счётчик блоков с 1)
//! - `Kdf::V2`: legacy вариант, счётчик блоков начинается с 0
//!
//! Версия берётся из SessionState и хранится вместе с RootKey / ChainKey,
//! так что десериализованные legacy состояния продолжают выводить те же ключи.

use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::{CryptoError, Result, SessionError};

pub type HmacSha256 = Hmac<Sha256>;

const HASH_OUTPUT_SIZE: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Kdf {
    V2,
    V3,
}

impl Kdf {
    pub fn for_version(version: u8) -> Result<Self> {
        match version {
            2 => Ok(Kdf::V2),
            3 => Ok(Kdf::V3),
            other => Err(SessionError::InvalidVersion(other)),
        }
    }

    /// Вывести `output_len` байт из `ikm`; `salt = None` означает 32 нулевых байта
    pub fn derive_secrets(
        &self,
        ikm: &[u8],
        salt: Option<&[u8]>,
        info: &[u8],
        output_len: usize,
    ) -> std::result::Result<Vec<u8>, CryptoError> {
        match self {
            Kdf::V3 => {
                let hkdf = Hkdf::<Sha256>::new(salt, ikm);
                let mut okm = vec![0u8; output_len];
                hkdf.expand(info, &mut okm)?;
                Ok(okm)
            }
            Kdf::V2 => {
                let prk = extract(salt.unwrap_or(&[0u8; HASH_OUTPUT_SIZE]), ikm)?;
                expand(&prk, info, output_len, 0)
            }
        }
    }
}

fn extract(salt: &[u8], ikm: &[u8]) -> std::result::Result<Vec<u8>, CryptoError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(salt)?;
    mac.update(ikm);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn expand(
    prk: &[u8],
    info: &[u8],
    output_len: usize,
    start_offset: u8,
) -> std::result::Result<Vec<u8>, CryptoError> {
    let iterations = (output_len + HASH_OUTPUT_SIZE - 1) / HASH_OUTPUT_SIZE;
    if iterations > 255 {
        return Err(CryptoError::KeyDerivationError(format!(
            "output too long: {}",
            output_len
        )));
    }

    let mut okm = Vec::with_capacity(output_len);
    let mut mixin: Vec<u8> = Vec::new();
    for i in 0..iterations {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(prk)?;
        mac.update(&mixin);
        mac.update(info);
        mac.update(&[start_offset.wrapping_add(i as u8)]);
        mixin = mac.finalize().into_bytes().to_vec();

        let remaining = output_len - okm.len();
        okm.extend_from_slice(&mixin[..remaining.min(HASH_OUTPUT_SIZE)]);
    }
    Ok(okm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_v3_matches_rfc5869_case_1() {
        let ikm = [0x0bu8; 22];
        let salt = hex::decode("000102030405060708090a0b0c").unwrap();
        let info = hex::decode("f0f1f2f3f4f5f6f7f8f9").unwrap();

        let okm = Kdf::V3.derive_secrets(&ikm, Some(&salt), &info, 42).unwrap();
        assert_eq!(
            hex::encode(okm),
            "3cb25f25faacd57a90434f64d0362f2a2d2d0a90cf1a5a4c5db02d56ecc4c5bf34007208d5b887185865"
        );
    }

    #[test]
    fn test_v3_manual_expand_agrees_with_hkdf_crate() {
        let prk = extract(&[0u8; 32], b"input").unwrap();
        let manual = expand(&prk, b"WhisperText", 64, 1).unwrap();
        let library = Kdf::V3.derive_secrets(b"input", None, b"WhisperText", 64).unwrap();
        assert_eq!(manual, library);
    }

    #[test]
    fn test_v2_and_v3_are_domain_separated() {
        let v2 = Kdf::V2.derive_secrets(b"secret", None, b"WhisperRatchet", 64).unwrap();
        let v3 = Kdf::V3.derive_secrets(b"secret", None, b"WhisperRatchet", 64).unwrap();
        assert_eq!(v2.len(), 64);
        assert_ne!(v2, v3);
    }

    #[test]
    fn test_for_version() {
        assert_eq!(Kdf::for_version(2).unwrap(), Kdf::V2);
        assert_eq!(Kdf::for_version(3).unwrap(), Kdf::V3);
        assert!(matches!(Kdf::for_version(4), Err(SessionError::InvalidVersion(4))));
    }
}
