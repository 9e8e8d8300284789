//! X3DH (Extended Triple Diffie-Hellman) Protocol
//!
//! Инициализация SessionState из параметров соглашения.
//!
//! ## Протокол
//!
//! ```text
//! Alice (инициатор)                                   Bob (получатель)
//! =================                                   ================
//!
//! DH1 = DH(IK_A, SPK_B)                               DH1 = DH(SPK_B, IK_A)
//! DH2 = DH(EK_A, IK_B)                                DH2 = DH(IK_B, EK_A)
//! DH3 = DH(EK_A, SPK_B)                               DH3 = DH(SPK_B, EK_A)
//! DH4 = DH(EK_A, OPK_B)  (если есть)                  DH4 = DH(OPK_B, EK_A)
//!
//! secret = 0xFF × 32 ‖ DH1 ‖ DH2 ‖ DH3 [‖ DH4]
//! root_key ‖ chain_key = HKDF(secret, salt = ∅, info = "WhisperText", 64)
//! ```
//!
//! Alice: receiver chain по ratchet key Bob (= SPK_B) и сразу же первая
//! sender chain от свежей ratchet пары. Bob: sender chain на своей
//! ratchet паре, receiver chains нет до первого сообщения.

use tracing::{debug, trace};

use crate::config::Config;
use crate::crypto::kdf::Kdf;
use crate::crypto::keys::{KeyPair, PublicKey};
use crate::crypto::provider::CryptoProvider;
use crate::crypto::ratchet::{ChainKey, RootKey};
use crate::error::Result;
use crate::state::session_state::SessionState;

const DISCONTINUITY: [u8; 32] = [0xFF; 32];
const TEXT_INFO: &[u8] = b"WhisperText";

/// Параметры инициатора (Alice)
#[derive(Debug, Clone)]
pub struct AliceParameters {
    pub our_identity_key: KeyPair,
    pub our_base_key: KeyPair,
    pub their_identity_key: PublicKey,
    pub their_signed_pre_key: PublicKey,
    pub their_one_time_pre_key: Option<PublicKey>,
    pub their_ratchet_key: PublicKey,
}

/// Параметры получателя (Bob)
#[derive(Debug, Clone)]
pub struct BobParameters {
    pub our_identity_key: KeyPair,
    pub our_signed_pre_key: KeyPair,
    pub our_one_time_pre_key: Option<KeyPair>,
    pub our_ratchet_key: KeyPair,
    pub their_identity_key: PublicKey,
    pub their_base_key: PublicKey,
}

/// Параметры симметричного (legacy) обмена: роль определяется сравнением base keys
#[derive(Debug, Clone)]
pub struct SymmetricParameters {
    pub our_base_key: KeyPair,
    pub our_ratchet_key: KeyPair,
    pub our_identity_key: KeyPair,
    pub their_base_key: PublicKey,
    pub their_ratchet_key: PublicKey,
    pub their_identity_key: PublicKey,
}

impl SymmetricParameters {
    /// Меньший base key играет роль Alice
    pub fn are_we_alice(&self) -> bool {
        self.our_base_key.public_key < self.their_base_key
    }
}

fn derive_keys(secret: &[u8]) -> Result<(RootKey, ChainKey)> {
    let okm = Kdf::V3.derive_secrets(secret, None, TEXT_INFO, 64)?;
    let mut root = [0u8; 32];
    let mut chain = [0u8; 32];
    root.copy_from_slice(&okm[..32]);
    chain.copy_from_slice(&okm[32..64]);
    Ok((RootKey::new(Kdf::V3, root), ChainKey::new(Kdf::V3, chain, 0)))
}

/// Инициализировать состояние на стороне инициатора
pub fn initialize_alice_session<P: CryptoProvider>(params: &AliceParameters) -> Result<SessionState> {
    debug!(target: "crypto::x3dh", "Starting X3DH as initiator (Alice)");

    let mut secret = Vec::with_capacity(32 * 5);
    secret.extend_from_slice(&DISCONTINUITY);

    let dh1 = P::agree(&params.our_identity_key.private_key, &params.their_signed_pre_key)?;
    let dh2 = P::agree(&params.our_base_key.private_key, &params.their_identity_key)?;
    let dh3 = P::agree(&params.our_base_key.private_key, &params.their_signed_pre_key)?;
    trace!(target: "crypto::x3dh", "DH1, DH2, DH3 computed");
    secret.extend_from_slice(&dh1);
    secret.extend_from_slice(&dh2);
    secret.extend_from_slice(&dh3);

    if let Some(one_time) = &params.their_one_time_pre_key {
        let dh4 = P::agree(&params.our_base_key.private_key, one_time)?;
        trace!(target: "crypto::x3dh", "DH4 computed with one-time prekey");
        secret.extend_from_slice(&dh4);
    }

    let (root_key, chain_key) = derive_keys(&secret)?;

    let sending_ratchet_key = P::generate_key_pair()?;
    let (sending_root, sending_chain) =
        root_key.create_chain::<P>(&params.their_ratchet_key, &sending_ratchet_key)?;

    let mut state = SessionState::new(
        Config::global().current_version,
        params.our_identity_key.public_key,
        params.their_identity_key,
        sending_root,
    );
    state.add_receiver_chain(params.their_ratchet_key, chain_key);
    state.set_sender_chain(sending_ratchet_key, sending_chain);
    state.set_alice_base_key(params.our_base_key.public_key);

    debug!(
        target: "crypto::x3dh",
        one_time_pre_key = params.their_one_time_pre_key.is_some(),
        "Initiator session initialized"
    );
    Ok(state)
}

/// Инициализировать состояние на стороне получателя
pub fn initialize_bob_session<P: CryptoProvider>(params: &BobParameters) -> Result<SessionState> {
    debug!(target: "crypto::x3dh", "Starting X3DH as responder (Bob)");

    let mut secret = Vec::with_capacity(32 * 5);
    secret.extend_from_slice(&DISCONTINUITY);

    let dh1 = P::agree(&params.our_signed_pre_key.private_key, &params.their_identity_key)?;
    let dh2 = P::agree(&params.our_identity_key.private_key, &params.their_base_key)?;
    let dh3 = P::agree(&params.our_signed_pre_key.private_key, &params.their_base_key)?;
    trace!(target: "crypto::x3dh", "DH1, DH2, DH3 computed");
    secret.extend_from_slice(&dh1);
    secret.extend_from_slice(&dh2);
    secret.extend_from_slice(&dh3);

    if let Some(one_time) = &params.our_one_time_pre_key {
        let dh4 = P::agree(&one_time.private_key, &params.their_base_key)?;
        trace!(target: "crypto::x3dh", "DH4 computed with one-time prekey");
        secret.extend_from_slice(&dh4);
    }

    let (root_key, chain_key) = derive_keys(&secret)?;

    let mut state = SessionState::new(
        Config::global().current_version,
        params.our_identity_key.public_key,
        params.their_identity_key,
        root_key,
    );
    state.set_sender_chain(params.our_ratchet_key.clone(), chain_key);
    state.set_alice_base_key(params.their_base_key);

    debug!(
        target: "crypto::x3dh",
        one_time_pre_key = params.our_one_time_pre_key.is_some(),
        "Responder session initialized"
    );
    Ok(state)
}

/// Legacy обмен: обе стороны присылают base + ratchet keys, роли по сравнению ключей
pub fn initialize_symmetric_session<P: CryptoProvider>(
    params: &SymmetricParameters,
) -> Result<SessionState> {
    if params.are_we_alice() {
        initialize_alice_session::<P>(&AliceParameters {
            our_identity_key: params.our_identity_key.clone(),
            our_base_key: params.our_base_key.clone(),
            their_identity_key: params.their_identity_key,
            their_signed_pre_key: params.their_base_key,
            their_one_time_pre_key: None,
            their_ratchet_key: params.their_ratchet_key,
        })
    } else {
        initialize_bob_session::<P>(&BobParameters {
            our_identity_key: params.our_identity_key.clone(),
            our_signed_pre_key: params.our_base_key.clone(),
            our_one_time_pre_key: None,
            our_ratchet_key: params.our_ratchet_key.clone(),
            their_identity_key: params.their_identity_key,
            their_base_key: params.their_base_key,
        })
    }
}
