//! Defines the CryptoProvider trait for crypto-agility.
//!
//! The session core only ever touches curve operations through this trait:
//! key generation, Diffie-Hellman agreement, signing and verification.
//! Key derivation and the symmetric cipher live in the core itself.

use crate::crypto::keys::{KeyPair, PrivateKey, PublicKey};
use crate::error::CryptoError;

/// Trait that formalizes the curve operations for a specific cipher suite.
pub trait CryptoProvider: Send + Sync + 'static {
    /// Generates a fresh key pair from the OS random source.
    fn generate_key_pair() -> Result<KeyPair, CryptoError>;

    /// Derives the public key for a private key.
    fn public_key_from_private(private_key: &PrivateKey) -> Result<PublicKey, CryptoError>;

    /// Diffie-Hellman agreement, returns the 32-byte shared secret.
    fn agree(private_key: &PrivateKey, public_key: &PublicKey) -> Result<[u8; 32], CryptoError>;

    /// Signs a message with the given private key.
    fn sign(private_key: &PrivateKey, message: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Verifies a signature with the given public key.
    fn verify(public_key: &PublicKey, message: &[u8], signature: &[u8]) -> bool;

    /// Returns the SuiteID associated with this CryptoProvider.
    fn suite_id() -> u16;
}
