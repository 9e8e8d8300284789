use crate::crypto::keys::{KeyPair, PrivateKey, PublicKey};
use crate::crypto::provider::CryptoProvider;
use crate::crypto::xeddsa::{xeddsa_sign, xeddsa_verify};
use crate::error::CryptoError;
use rand::rngs::OsRng;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};

/// Concrete implementation of `CryptoProvider` for the classic suite:
/// X25519 agreement plus XEdDSA signatures over the same keys.
pub struct ClassicSuiteProvider;

impl CryptoProvider for ClassicSuiteProvider {
    fn generate_key_pair() -> Result<KeyPair, CryptoError> {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = X25519PublicKey::from(&secret);
        Ok(KeyPair::new(
            PublicKey::from(public.to_bytes()),
            PrivateKey::from(secret.to_bytes()),
        ))
    }

    fn public_key_from_private(private_key: &PrivateKey) -> Result<PublicKey, CryptoError> {
        let secret = StaticSecret::from(*private_key.as_bytes());
        Ok(PublicKey::from(X25519PublicKey::from(&secret).to_bytes()))
    }

    fn agree(private_key: &PrivateKey, public_key: &PublicKey) -> Result<[u8; 32], CryptoError> {
        let secret = StaticSecret::from(*private_key.as_bytes());
        let shared = secret.diffie_hellman(&X25519PublicKey::from(*public_key.as_bytes()));
        Ok(shared.to_bytes())
    }

    fn sign(private_key: &PrivateKey, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Ok(xeddsa_sign(private_key, message)?.to_vec())
    }

    fn verify(public_key: &PublicKey, message: &[u8], signature: &[u8]) -> bool {
        xeddsa_verify(public_key, message, signature)
    }

    fn suite_id() -> u16 {
        crate::config::Config::global().classic_suite_id
    }
}
