// Construct Messenger Session Core
// X3DH key agreement + Double Ratchet sessions

#![warn(clippy::all)]
#![allow(clippy::too_many_arguments)]

// Модули
pub mod config;
pub mod crypto;
pub mod error;
pub mod protocol;
pub mod state;
pub mod storage;
pub mod utils;

// Re-exports для удобства
pub use crypto::keys::{KeyPair, PrivateKey, PublicKey};
pub use crypto::provider::CryptoProvider;
pub use crypto::session_builder::SessionBuilder;
pub use crypto::session_cipher::SessionCipher;
pub use crypto::suites::classic::ClassicSuiteProvider;
pub use error::{CryptoError, Result, SessionError};
pub use protocol::{
    CiphertextMessage, CiphertextMessageType, DeviceId, PreKeySignalMessage, ProtocolAddress,
    SignalMessage, UserId,
};
pub use state::{PreKeyBundle, PreKeyRecord, SessionRecord, SessionState, SignedPreKeyRecord};
pub use storage::{
    Direction, IdentityKeyStore, InMemoryProtocolStore, PreKeyStore, ProtocolStore,
    SessionStore, SignedPreKeyStore,
};
