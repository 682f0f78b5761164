//! In-memory session store.
//!
//! A kiosk session tracks its model override, language, and question
//! counters. State is process local; sessions are not persisted across
//! restarts.

use dashmap::DashMap;

use kiosk_core::{ModelId, SessionState};

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<String, SessionState>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Fetch the session, creating it on first sight.
    pub fn get_or_create(&self, session_id: &str) -> SessionState {
        self.sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionState::new(session_id))
            .clone()
    }

    /// Fetch the session without creating it.
    pub fn get(&self, session_id: &str) -> Option<SessionState> {
        self.sessions.get(session_id).map(|s| s.clone())
    }

    /// Set or clear the session's model override.
    pub fn set_model(&self, session_id: &str, model: Option<ModelId>) {
        self.sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionState::new(session_id))
            .current_model = model;
    }

    /// Record the session's preferred reply language.
    pub fn set_language(&self, session_id: &str, language: impl Into<String>) {
        self.sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionState::new(session_id))
            .language = Some(language.into());
    }

    /// Count a question against the session, flagging whether it errored.
    pub fn record_question(&self, session_id: &str, errored: bool) {
        let mut session = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionState::new(session_id));
        session.question_count += 1;
        if errored {
            session.error_count += 1;
        }
    }

    /// Number of sessions seen since startup.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiosk_core::ProviderKind;

    #[test]
    fn test_get_or_create_is_stable() {
        let store = InMemorySessionStore::new();
        let first = store.get_or_create("s1");
        assert_eq!(first.question_count, 0);
        assert!(first.current_model.is_none());

        store.record_question("s1", false);
        store.record_question("s1", true);

        let again = store.get_or_create("s1");
        assert_eq!(again.question_count, 2);
        assert_eq!(again.error_count, 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_does_not_create() {
        let store = InMemorySessionStore::new();
        assert!(store.get("s1").is_none());
        assert!(store.is_empty());

        store.get_or_create("s1");
        assert!(store.get("s1").is_some());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_model_override_roundtrip() {
        let store = InMemorySessionStore::new();
        let model = ModelId::new(ProviderKind::OpenAi, "gpt-4o-mini");

        store.set_model("s1", Some(model.clone()));
        assert_eq!(store.get_or_create("s1").current_model, Some(model));

        store.set_model("s1", None);
        assert!(store.get_or_create("s1").current_model.is_none());
    }

    #[test]
    fn test_language_defaults_to_unset() {
        let store = InMemorySessionStore::new();
        assert!(store.get_or_create("s1").language.is_none());

        store.set_language("s1", "es");
        assert_eq!(store.get_or_create("s1").language.as_deref(), Some("es"));
    }
}
