//! Криптографические наборы (Crypto Suites)
//!
//! Этот модуль содержит реализации CryptoProvider trait.
//!
//! ## Доступные наборы
//!
//! ### Classic Suite
//! - **DH**: X25519 (ECDH на Curve25519)
//! - **Signatures**: XEdDSA на тех же ключах X25519
//! - **Suite ID**: 1
//!
//! ## Выбор suite
//!
//! ```rust
//! use construct_session::crypto::suites::classic::ClassicSuiteProvider;
//! use construct_session::crypto::provider::CryptoProvider;
//!
//! type MySuite = ClassicSuiteProvider;
//!
//! let identity = MySuite::generate_key_pair().unwrap();
//! let signature = MySuite::sign(&identity.private_key, b"prekey").unwrap();
//! assert!(MySuite::verify(&identity.public_key, b"prekey", &signature));
//! ```

pub mod classic;
