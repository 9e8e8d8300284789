//! XEdDSA: подписи Ed25519 на ключах X25519
//!
//! Identity key один и тот же для DH в X3DH и для подписи signed prekey,
//! поэтому подпись считается напрямую от приватного ключа X25519.
//!
//! <https://signal.org/docs/specifications/xeddsa/>
//!
//! Знаковый бит Edwards-точки A хранится в старшем бите последнего байта
//! подписи. При подписи он всегда 0 (A нормализуется), при проверке читается
//! из подписи, так что порча любого бита подписи приводит к отказу.

use curve25519_dalek::constants::ED25519_BASEPOINT_TABLE;
use curve25519_dalek::scalar::clamp_integer;
use curve25519_dalek::{EdwardsPoint, MontgomeryPoint, Scalar};
use rand::rngs::OsRng;
use rand_core::RngCore;
use sha2::{Digest, Sha512};
use subtle::ConstantTimeEq;

use crate::crypto::keys::{PrivateKey, PublicKey};
use crate::error::CryptoError;

pub const SIGNATURE_LENGTH: usize = 64;

/// hash1 префикс: 0xFE затем 31 × 0xFF
const HASH_1_PREFIX: [u8; 32] = {
    let mut prefix = [0xFFu8; 32];
    prefix[0] = 0xFE;
    prefix
};

fn sha512(parts: &[&[u8]]) -> [u8; 64] {
    let mut hasher = Sha512::new();
    for part in parts {
        hasher.update(part);
    }
    let mut digest = [0u8; 64];
    digest.copy_from_slice(&hasher.finalize());
    digest
}

/// Подписать сообщение приватным ключом X25519
pub fn xeddsa_sign(private_key: &PrivateKey, message: &[u8]) -> Result<[u8; SIGNATURE_LENGTH], CryptoError> {
    let mut random = [0u8; 64];
    OsRng
        .try_fill_bytes(&mut random)
        .map_err(|e| CryptoError::SigningError(e.to_string()))?;

    // A, a = calculate_key_pair(k)
    let k = Scalar::from_bytes_mod_order(clamp_integer(*private_key.as_bytes()));
    let cap_e = &k * ED25519_BASEPOINT_TABLE;
    let mut cap_a = cap_e.compress();
    let sign_bit = cap_a.0[31] >> 7;
    cap_a.0[31] &= 0b0111_1111;
    let a = if sign_bit == 1 { -k } else { k };

    // r = hash1(a || M || Z) (mod q)
    let r = Scalar::from_bytes_mod_order_wide(&sha512(&[
        &HASH_1_PREFIX,
        a.as_bytes(),
        message,
        &random,
    ]));
    let cap_r = (&r * ED25519_BASEPOINT_TABLE).compress();

    // h = hash(R || A || M) (mod q), s = r + ha (mod q)
    let h = Scalar::from_bytes_mod_order_wide(&sha512(&[cap_r.as_bytes(), cap_a.as_bytes(), message]));
    let s = r + h * a;

    let mut signature = [0u8; SIGNATURE_LENGTH];
    signature[..32].copy_from_slice(cap_r.as_bytes());
    signature[32..].copy_from_slice(s.as_bytes());
    Ok(signature)
}

/// Проверить подпись публичным ключом X25519
pub fn xeddsa_verify(public_key: &PublicKey, message: &[u8], signature: &[u8]) -> bool {
    let signature: &[u8; SIGNATURE_LENGTH] = match signature.try_into() {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    let mut cap_r = [0u8; 32];
    cap_r.copy_from_slice(&signature[..32]);
    let mut s = [0u8; 32];
    s.copy_from_slice(&signature[32..]);

    let sign_bit = s[31] >> 7;
    s[31] &= 0b0111_1111;
    if (s[31] & 0b1110_0000) != 0 {
        return false;
    }

    let a = match MontgomeryPoint(*public_key.as_bytes()).to_edwards(sign_bit) {
        Some(point) => point,
        None => return false,
    };
    let cap_a = a.compress();

    let h = Scalar::from_bytes_mod_order_wide(&sha512(&[&cap_r, cap_a.as_bytes(), message]));

    // Rcheck = sB - hA
    let cap_r_check =
        EdwardsPoint::vartime_double_scalar_mul_basepoint(&h, &(-a), &Scalar::from_bytes_mod_order(s))
            .compress();

    bool::from(cap_r_check.as_bytes().ct_eq(&cap_r))
}
