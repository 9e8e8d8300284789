//! Протокольный уровень: адреса и бинарный формат сообщений

pub mod address;
pub mod messages;
pub mod wire;

pub use address::{DeviceId, ProtocolAddress, UserId};
pub use messages::{CiphertextMessage, CiphertextMessageType, PreKeySignalMessage, SignalMessage};
