//! Централизованная конфигурация протокольного ядра
//!
//! Все лимиты и размеры, которые используют сессии, определены здесь,
//! чтобы избежать хардкода по всему проекту.

use std::sync::OnceLock;

/// Глобальная конфигурация (синглтон)
static GLOBAL_CONFIG: OnceLock<Config> = OnceLock::new();

/// Основная структура конфигурации
#[derive(Debug, Clone)]
pub struct Config {
    // ============================================
    // ВЕРСИИ ПРОТОКОЛА
    // ============================================

    /// Текущая версия протокола (младший полубайт version byte)
    pub current_version: u8,

    // ============================================
    // КРИПТОГРАФИЧЕСКИЕ ПАРАМЕТРЫ
    // ============================================

    /// Размер публичного ключа X25519 (в байтах)
    pub public_key_size: usize,

    /// Размер XEdDSA подписи (в байтах)
    pub signature_size: usize,

    /// Длина усечённого HMAC-SHA256 в SignalMessage (в байтах)
    pub mac_length: usize,

    /// ID классического криптографического набора (Classic Suite)
    pub classic_suite_id: u16,

    // ============================================
    // DOUBLE RATCHET ПАРАМЕТРЫ
    // ============================================

    /// Максимальное количество receiver chains в одном SessionState
    pub max_receiver_chains: usize,

    /// Максимальное количество сохранённых ключей пропущенных сообщений на цепочку
    pub max_message_keys: usize,

    /// Насколько далеко вперёд счётчик сообщения может опережать цепочку (DoS защита)
    pub max_future_messages: u32,

    /// Максимальное количество архивных состояний в SessionRecord
    pub max_archived_states: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            current_version: 3,

            // Криптография
            public_key_size: 32,
            signature_size: 64,
            mac_length: 8,
            classic_suite_id: 1,

            // Double Ratchet
            max_receiver_chains: 5,
            max_message_keys: 2000,
            max_future_messages: 2000,
            max_archived_states: 40,
        }
    }
}

impl Config {
    /// Получить глобальный экземпляр конфигурации
    ///
    /// Автоматически инициализирует конфигурацию со значениями по умолчанию при первом вызове
    pub fn global() -> &'static Config {
        GLOBAL_CONFIG.get_or_init(Config::default)
    }

    /// Инициализировать глобальную конфигурацию со значениями по умолчанию
    ///
    /// # Errors
    ///
    /// Возвращает ошибку, если конфигурация уже была инициализирована
    pub fn init() -> Result<(), &'static str> {
        GLOBAL_CONFIG
            .set(Self::default())
            .map_err(|_| "Config already initialized")
    }

    /// Инициализировать глобальную конфигурацию с кастомным экземпляром
    ///
    /// # Errors
    ///
    /// Возвращает ошибку, если конфигурация уже была инициализирована
    pub fn init_with(config: Config) -> Result<(), &'static str> {
        GLOBAL_CONFIG
            .set(config)
            .map_err(|_| "Config already initialized")
    }

    /// Проверить, инициализирована ли глобальная конфигурация
    pub fn is_initialized() -> bool {
        GLOBAL_CONFIG.get().is_some()
    }
}
