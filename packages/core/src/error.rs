use thiserror::Error;

/// Ошибки уровня примитивов (CryptoProvider, KDF, шифр)
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Failed to generate keys: {0}")]
    KeyGenerationError(String),
    #[error("Signing failed: {0}")]
    SigningError(String),
    #[error("Key agreement failed: {0}")]
    KeyAgreementError(String),
    #[error("Key derivation failed: {0}")]
    KeyDerivationError(String),
    #[error("Cipher failure: {0}")]
    CipherError(String),
    #[error("Invalid input: {0}")]
    InvalidInputError(String),
}

impl From<rand::Error> for CryptoError {
    fn from(err: rand::Error) -> Self {
        CryptoError::KeyGenerationError(err.to_string())
    }
}

impl From<hkdf::InvalidLength> for CryptoError {
    fn from(err: hkdf::InvalidLength) -> Self {
        CryptoError::KeyDerivationError(err.to_string())
    }
}

impl From<hmac::digest::InvalidLength> for CryptoError {
    fn from(err: hmac::digest::InvalidLength) -> Self {
        CryptoError::InvalidInputError(err.to_string())
    }
}

/// Ошибки сессионного протокола
///
/// Каждая ошибка расшифровки оставляет хранилища сессий и prekeys нетронутыми,
/// поэтому вызывающий код может просто отбросить сообщение.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Некорректный ключ или неверная подпись в bundle
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Сообщение ссылается на prekey, которого нет в хранилище
    #[error("No such prekey: {0}")]
    InvalidKeyId(u32),

    /// Повреждённое, подделанное или нерасшифровываемое сообщение
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Версия новее поддерживаемой
    #[error("Unknown message version: {0}")]
    InvalidVersion(u8),

    /// Версия старше поддерживаемой
    #[error("Legacy message version: {0}")]
    LegacyMessage(u8),

    /// Ключ для этого счётчика уже был использован
    #[error("Duplicate message: chain index {index}, counter {counter}")]
    DuplicateMessage { index: u32, counter: u32 },

    #[error("No session for {0}")]
    NoSession(String),

    /// Identity store отклонил ключ собеседника
    #[error("Untrusted identity for {0}")]
    UntrustedIdentity(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Состояние сессии не позволяет выполнить операцию
    #[error("Invalid session state: {0}")]
    InvalidState(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Cryptography error: {0}")]
    Crypto(#[from] CryptoError),
}

pub type Result<T> = std::result::Result<T, SessionError>;
