//! Криптографический модуль
//!
//! # Архитектура
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Application                          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                ┌─────────────┴─────────────┐
//!                ▼                           ▼
//! ┌───────────────────────────┐  ┌──────────────────────────┐
//! │   SessionBuilder          │  │  SessionCipher           │
//! │  - PreKeyBundle → сессия  │  │  - encrypt / decrypt     │
//! │  - PreKey message → Bob   │  │  - архивные состояния    │
//! └───────────────────────────┘  └──────────────────────────┘
//!                │                           │
//!                ▼                           ▼
//! ┌───────────────────────────┐  ┌──────────────────────────┐
//! │   Handshake (X3DH)        │  │  Messaging (DR)          │
//! │  - Alice / Bob / symmetric│  │  - DH ratchet step       │
//! │  - root + chain key       │  │  - skipped message keys  │
//! └───────────────────────────┘  └──────────────────────────┘
//!                │                           │
//!                └─────────────┬─────────────┘
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │   RootKey / ChainKey / MessageKeys   (HKDF v2/v3, HMAC)     │
//! │   AES-256-CBC                                               │
//! ├─────────────────────────────────────────────────────────────┤
//! │              CryptoProvider (Crypto-Agility)                │
//! │  - X25519 agreement                                         │
//! │  - XEdDSA signatures                                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Модули
//!
//! ### Core Traits
//! - [`provider`]: CryptoProvider trait для crypto-agility
//! - [`handshake`]: X3DH инициализация SessionState
//! - [`messaging`]: Double Ratchet над одним SessionState
//!
//! ### Implementations
//! - [`suites`]: Реализации CryptoProvider (Classic)
//! - [`xeddsa`]: подписи на ключах X25519
//!
//! ### High-Level APIs
//! - [`session_builder`]: установка сессий
//! - [`session_cipher`]: шифрование / расшифровка с хранилищем
//!
//! ### Primitives
//! - [`keys`], [`kdf`], [`ratchet`], [`cipher`]

// ============================================================================
// Core Traits
// ============================================================================

/// CryptoProvider trait для crypto-agility
pub mod provider;

/// Key Agreement (X3DH)
pub mod handshake;

/// Secure Messaging (Double Ratchet)
pub mod messaging;

// ============================================================================
// Implementations
// ============================================================================

/// Криптографические наборы
pub mod suites;

pub mod xeddsa;

// ============================================================================
// High-Level APIs
// ============================================================================

pub mod session_builder;

pub mod session_cipher;

// ============================================================================
// Primitives
// ============================================================================

pub mod cipher;
pub mod kdf;
pub mod keys;
pub mod ratchet;

// ============================================================================
// Re-exports для удобства
// ============================================================================

pub use provider::CryptoProvider;
