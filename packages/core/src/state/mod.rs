//! Состояние сессий
//!
//! - [`session_state`]: одна инкарнация ratchet сессии
//! - [`session_record`]: текущее состояние + архив для одного адреса
//! - [`prekey`]: prekey записи и публичный bundle

pub mod prekey;
pub mod session_record;
pub mod session_state;

pub use prekey::{PreKeyBundle, PreKeyRecord, SignedPreKeyRecord};
pub use session_record::SessionRecord;
pub use session_state::{PendingKeyExchange, PendingPreKey, SessionState};
