//! Key Agreement
//!
//! Установка общего секрета между двумя сторонами без предварительного
//! обмена секретами и инициализация из него первого SessionState.
//!
//! ## Dataflow
//! ```text
//! Alice (инициатор)                          Bob (получатель)
//! ==================                         =================
//!
//! 1. Получает Bob's PreKeyBundle
//! 2. Генерирует base key
//! 3. initialize_alice_session(AliceParameters)
//!    → SessionState с sender chain
//! 4. Шифрует первое сообщение
//!    → PreKeySignalMessage (base key, prekey ids)
//!
//!                                            1. Получает PreKeySignalMessage
//!                                            2. Загружает свои signed/one-time prekeys
//!                                            3. initialize_bob_session(BobParameters)
//!                                               → SessionState (тот же root key)
//! ```

pub mod x3dh;

pub use x3dh::{
    initialize_alice_session, initialize_bob_session, initialize_symmetric_session,
    AliceParameters, BobParameters, SymmetricParameters,
};
