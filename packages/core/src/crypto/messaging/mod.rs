//! Secure Messaging
//!
//! Double Ratchet над отдельным [`SessionState`](crate::state::SessionState):
//! шифрование на sender chain, DH ratchet шаги, пропущенные ключи и защита
//! от повторов.
//!
//! ## Security Properties
//!
//! ### Forward Secrecy
//! Компрометация текущих ключей НЕ раскрывает прошлые сообщения.
//! Достигается через постоянное ratcheting ключей.
//!
//! ### Break-in Recovery
//! После компрометации новый DH ratchet step восстанавливает безопасность.
//!
//! ### Out-of-Order Messages
//! Сообщения могут прийти в произвольном порядке и всё равно расшифруются
//! (до 2000 пропущенных ключей на цепочку).

pub mod double_ratchet;

pub use double_ratchet::{decrypt_state, encrypt_state};
