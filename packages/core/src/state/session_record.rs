// Запись сессии для одного адреса: текущее состояние + архив предыдущих

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

use crate::config::Config;
use crate::crypto::keys::PublicKey;
use crate::error::Result;
use crate::state::session_state::SessionState;
use crate::utils::serialization::{from_bytes, to_bytes};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionRecord {
    current_session: Option<SessionState>,
    /// Самое свежее состояние первым
    previous_sessions: VecDeque<SessionState>,
}

impl SessionRecord {
    pub fn new_fresh() -> Self {
        Self::default()
    }

    pub fn new(state: SessionState) -> Self {
        Self {
            current_session: Some(state),
            previous_sessions: VecDeque::new(),
        }
    }

    pub fn is_fresh(&self) -> bool {
        self.current_session.is_none() && self.previous_sessions.is_empty()
    }

    pub fn session_state(&self) -> Option<&SessionState> {
        self.current_session.as_ref()
    }

    pub fn session_state_mut(&mut self) -> Option<&mut SessionState> {
        self.current_session.as_mut()
    }

    pub fn set_session_state(&mut self, state: SessionState) {
        self.current_session = Some(state);
    }

    pub fn previous_session_states(&self) -> impl ExactSizeIterator<Item = &SessionState> {
        self.previous_sessions.iter()
    }

    /// Есть ли (текущее или архивное) состояние, начатое этим base key
    pub fn has_session_state(&self, version: u8, alice_base_key: &PublicKey) -> bool {
        self.current_session
            .iter()
            .chain(self.previous_sessions.iter())
            .any(|state| {
                state.session_version() == version
                    && state.alice_base_key() == Some(alice_base_key)
            })
    }

    /// Убрать текущее состояние в архив
    pub fn archive_current_state(&mut self) {
        if let Some(current) = self.current_session.take() {
            self.push_previous(current);
        } else {
            debug!(target: "crypto::session", "Skipping archive, current state is empty");
        }
    }

    /// Новое состояние становится текущим, старое уходит в архив
    pub fn promote_state(&mut self, state: SessionState) {
        self.archive_current_state();
        self.current_session = Some(state);
    }

    /// Поднять архивное состояние `index` (уже обновлённое) в текущее
    pub(crate) fn promote_old_session(&mut self, index: usize, updated: SessionState) {
        self.previous_sessions.remove(index);
        self.promote_state(updated);
    }

    pub(crate) fn previous_session_state(&self, index: usize) -> Option<&SessionState> {
        self.previous_sessions.get(index)
    }

    fn push_previous(&mut self, state: SessionState) {
        self.previous_sessions.push_front(state);
        let limit = Config::global().max_archived_states;
        self.previous_sessions.truncate(limit);
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        to_bytes(self)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        from_bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::kdf::Kdf;
    use crate::crypto::ratchet::RootKey;

    fn state_with_base(n: u8) -> SessionState {
        let mut state = SessionState::new(
            3,
            PublicKey::from([0x01; 32]),
            PublicKey::from([0x02; 32]),
            RootKey::new(Kdf::V3, [n; 32]),
        );
        state.set_alice_base_key(PublicKey::from([n; 32]));
        state
    }

    #[test]
    fn test_fresh_record() {
        let record = SessionRecord::new_fresh();
        assert!(record.is_fresh());
        assert!(record.session_state().is_none());
        assert_eq!(record.previous_session_states().len(), 0);
    }

    #[test]
    fn test_promote_archives_current() {
        let mut record = SessionRecord::new(state_with_base(1));
        record.promote_state(state_with_base(2));

        assert_eq!(record.session_state().unwrap().alice_base_key(), Some(&PublicKey::from([2; 32])));
        assert_eq!(record.previous_session_states().len(), 1);
        assert!(record.has_session_state(3, &PublicKey::from([1; 32])));
        assert!(!record.has_session_state(2, &PublicKey::from([1; 32])));
    }

    #[test]
    fn test_archive_is_capped() {
        let mut record = SessionRecord::new(state_with_base(0));
        for n in 1..=50u8 {
            record.promote_state(state_with_base(n));
        }

        assert_eq!(record.previous_session_states().len(), 40);
        let newest = record.previous_session_states().next().unwrap();
        assert_eq!(newest.alice_base_key(), Some(&PublicKey::from([49; 32])));
        assert!(!record.has_session_state(3, &PublicKey::from([9; 32])), "oldest states must be evicted");
        assert!(record.has_session_state(3, &PublicKey::from([10; 32])));
    }

    #[test]
    fn test_promote_old_session() {
        let mut record = SessionRecord::new(state_with_base(1));
        record.promote_state(state_with_base(2));
        record.promote_state(state_with_base(3));

        let old = record.previous_session_state(1).unwrap().clone();
        record.promote_old_session(1, old);

        assert_eq!(record.session_state().unwrap().alice_base_key(), Some(&PublicKey::from([1; 32])));
        let archived: Vec<_> = record
            .previous_session_states()
            .map(|state| *state.alice_base_key().unwrap())
            .collect();
        assert_eq!(archived, vec![PublicKey::from([3; 32]), PublicKey::from([2; 32])]);
    }

    #[test]
    fn test_serialization_preserves_record() {
        let mut record = SessionRecord::new(state_with_base(1));
        record.promote_state(state_with_base(2));

        let bytes = record.serialize().unwrap();
        let restored = SessionRecord::deserialize(&bytes).unwrap();
        assert_eq!(restored.serialize().unwrap(), bytes);
        assert!(restored.has_session_state(3, &PublicKey::from([1; 32])));
        assert!(SessionRecord::deserialize(&bytes[..bytes.len() / 2]).is_err());
    }
}
