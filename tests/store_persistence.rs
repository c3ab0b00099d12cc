#[cfg(test)]
mod tests {
    use docchat::config::StorageConfig;
    use docchat::store::models::{DocumentScope, Role, User, UserSettings};
    use docchat::store::{
        get_connection, BlobStore, ChatStore, DuckDbBlobStore, MemoryBlobStore, StoreError,
    };
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use uuid::Uuid;

    /// Memory slots whose writes start failing once `broken` is set.
    struct BrittleBlobStore {
        inner: MemoryBlobStore,
        broken: Arc<AtomicBool>,
    }

    impl BlobStore for BrittleBlobStore {
        fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.read(key)
        }

        fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
            if self.broken.load(Ordering::SeqCst) {
                return Err(StoreError::Storage("disk full".to_string()));
            }
            self.inner.write(key, value)
        }
    }

    fn admin() -> User {
        User {
            id: "u1".to_string(),
            email: "admin@example.com".to_string(),
            name: "Admin".to_string(),
            avatar_url: String::new(),
            is_admin: true,
        }
    }

    fn member(id: &str) -> User {
        User {
            id: id.to_string(),
            email: format!("{}@example.com", id),
            name: id.to_string(),
            avatar_url: String::new(),
            is_admin: false,
        }
    }

    fn memory_store() -> (ChatStore, MemoryBlobStore) {
        let blobs = MemoryBlobStore::new();
        let store = ChatStore::open(Box::new(blobs.clone()), UserSettings::default()).unwrap();
        (store, blobs)
    }

    #[test]
    fn test_empty_store_has_seed_documents_and_no_sessions() {
        let (store, _) = memory_store();
        assert!(store.sessions().is_empty());
        assert_eq!(store.documents().len(), 2);
        assert!(store
            .documents()
            .iter()
            .all(|d| d.scope == DocumentScope::Project));
    }

    #[test]
    fn test_session_lifecycle() {
        let (mut store, _) = memory_store();

        // 1. Create
        let session = store.create_session().unwrap();
        assert_eq!(session.title, "New Conversation");
        assert!(session.messages.is_empty());
        assert_eq!(session.created_at, session.updated_at);
        assert_eq!(store.active_session().unwrap().id, session.id);

        // 2. Newest first
        let second = store.create_session().unwrap();
        assert_eq!(store.sessions()[0].id, second.id);
        assert_eq!(store.sessions()[1].id, session.id);

        // 3. Deleting the active session clears the pointer
        assert!(store.delete_session(second.id).unwrap());
        assert!(store.active_session().is_none());
        assert_eq!(store.sessions().len(), 1);

        // 4. Unknown ids are a no-op
        assert!(!store.delete_session(Uuid::new_v4()).unwrap());
        assert_eq!(store.sessions().len(), 1);
    }

    #[test]
    fn test_first_message_sets_title() {
        let (mut store, _) = memory_store();
        let session = store.create_session().unwrap();

        let updated = store.append_user_message(session.id, "Hi").unwrap();
        assert_eq!(updated.title, "Hi");
        assert_eq!(updated.messages.len(), 1);
        assert_eq!(updated.messages[0].role, Role::User);
        assert!(updated.updated_at >= session.updated_at);

        let updated = store
            .append_user_message(session.id, "A much longer follow-up question that never renames")
            .unwrap();
        assert_eq!(updated.title, "Hi");
        assert_eq!(updated.messages.len(), 2);
    }

    #[test]
    fn test_long_first_message_is_truncated() {
        let (mut store, _) = memory_store();
        let session = store.create_session().unwrap();

        let exactly_thirty = "a".repeat(30);
        let updated = store.append_user_message(session.id, &exactly_thirty).unwrap();
        assert_eq!(updated.title, exactly_thirty);

        let other = store.create_session().unwrap();
        let text = "What is the remote work policy for contractors?";
        let updated = store.append_user_message(other.id, text).unwrap();
        assert_eq!(updated.title, format!("{}...", &text[..30]));
    }

    #[test]
    fn test_append_to_unknown_session_fails() {
        let (mut store, _) = memory_store();
        let missing = Uuid::new_v4();

        match store.append_user_message(missing, "hello") {
            Err(StoreError::InvalidSession(id)) => assert_eq!(id, missing),
            other => panic!("expected InvalidSession, got {:?}", other),
        }
    }

    #[test]
    fn test_model_reply_for_deleted_session_is_dropped() {
        let (mut store, _) = memory_store();
        let session = store.create_session().unwrap();
        store.delete_session(session.id).unwrap();

        let appended = store.append_model_message(session.id, "late answer").unwrap();
        assert!(appended.is_none());
        assert!(store.sessions().is_empty());
    }

    #[test]
    fn test_document_validation() {
        let (mut store, _) = memory_store();
        let before = store.documents().len();

        assert!(matches!(
            store.add_document(&admin(), "   ", "body", DocumentScope::User),
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            store.add_document(&admin(), "Title", "\n\t", DocumentScope::Project),
            Err(StoreError::Validation(_))
        ));
        assert_eq!(store.documents().len(), before);
    }

    #[test]
    fn test_document_permissions() {
        let (mut store, _) = memory_store();
        let alice = member("alice");
        let bob = member("bob");

        assert!(matches!(
            store.add_document(&alice, "Policy", "text", DocumentScope::Project),
            Err(StoreError::PermissionDenied(_))
        ));

        let note = store
            .add_document(&alice, "Notes", "alice only", DocumentScope::User)
            .unwrap();
        assert_eq!(note.owner_id.as_deref(), Some("alice"));
        assert!(store.documents_for(&alice).iter().any(|d| d.id == note.id));
        assert!(!store.documents_for(&bob).iter().any(|d| d.id == note.id));

        assert!(matches!(
            store.delete_document(&bob, note.id),
            Err(StoreError::PermissionDenied(_))
        ));
        let seed = store.documents()[0].id;
        assert!(matches!(
            store.delete_document(&alice, seed),
            Err(StoreError::PermissionDenied(_))
        ));

        assert!(store.delete_document(&alice, note.id).unwrap().is_some());
        assert!(store.delete_document(&admin(), seed).unwrap().is_some());
    }

    #[test]
    fn test_delete_unknown_document_is_noop() {
        let (mut store, _) = memory_store();
        let before = store.documents().to_vec();

        let removed = store.delete_document(&admin(), Uuid::new_v4()).unwrap();
        assert!(removed.is_none());
        assert_eq!(store.documents(), before.as_slice());
    }

    #[test]
    fn test_settings_are_clamped_and_persisted() {
        let (mut store, blobs) = memory_store();
        let saved = store
            .update_settings(UserSettings {
                context_history_limit: 99,
                use_project_knowledge: false,
                use_user_knowledge: true,
            })
            .unwrap();
        assert_eq!(saved.context_history_limit, 20);

        let reopened = ChatStore::open(Box::new(blobs), UserSettings::default()).unwrap();
        assert_eq!(reopened.settings(), saved);
    }

    #[test]
    fn test_memory_round_trip() {
        let (mut store, blobs) = memory_store();
        let first = store.create_session().unwrap();
        store.append_user_message(first.id, "Hi").unwrap();
        store.append_model_message(first.id, "Hello!").unwrap();
        store.create_session().unwrap();
        store
            .add_document(&admin(), "Policy", "Remote work allowed 3 days/week", DocumentScope::Project)
            .unwrap();

        let reopened = ChatStore::open(Box::new(blobs), UserSettings::default()).unwrap();
        assert_eq!(reopened.sessions(), store.sessions());
        assert_eq!(reopened.documents(), store.documents());
    }

    #[test]
    fn test_duckdb_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            path: dir.path().join("docchat.duckdb").to_string_lossy().to_string(),
        };

        let (sessions, documents) = {
            let pool = get_connection(&config).unwrap();
            let mut store =
                ChatStore::open(Box::new(DuckDbBlobStore::new(pool)), UserSettings::default())
                    .unwrap();
            let session = store.create_session().unwrap();
            store.append_user_message(session.id, "Who approves remote work?").unwrap();
            store.append_model_message(session.id, "The department manager.").unwrap();
            store
                .add_document(&admin(), "Mine", "private notes", DocumentScope::User)
                .unwrap();
            (store.sessions().to_vec(), store.documents().to_vec())
        };

        let pool = get_connection(&config).unwrap();
        let reopened =
            ChatStore::open(Box::new(DuckDbBlobStore::new(pool)), UserSettings::default()).unwrap();
        assert_eq!(reopened.sessions(), sessions.as_slice());
        assert_eq!(reopened.documents(), documents.as_slice());
        assert_eq!(reopened.sessions()[0].messages[1].role, Role::Model);
    }

    #[test]
    fn test_failed_write_leaves_memory_unchanged() {
        let broken = Arc::new(AtomicBool::new(false));
        let mut store = ChatStore::open(
            Box::new(BrittleBlobStore {
                inner: MemoryBlobStore::new(),
                broken: broken.clone(),
            }),
            UserSettings::default(),
        )
        .unwrap();
        let session = store.create_session().unwrap();
        store.append_user_message(session.id, "Hi").unwrap();
        let note = store
            .add_document(&admin(), "Notes", "kept", DocumentScope::User)
            .unwrap();
        let sessions = store.sessions().to_vec();
        let documents = store.documents().to_vec();
        let settings = store.settings();

        broken.store(true, Ordering::SeqCst);

        assert!(matches!(store.create_session(), Err(StoreError::Storage(_))));
        assert!(store.append_user_message(session.id, "lost").is_err());
        assert!(store.append_model_message(session.id, "lost").is_err());
        assert!(store.delete_session(session.id).is_err());
        assert!(store
            .add_document(&admin(), "Other", "lost", DocumentScope::Project)
            .is_err());
        assert!(store.delete_document(&admin(), note.id).is_err());
        assert!(store
            .update_settings(UserSettings {
                context_history_limit: 2,
                use_project_knowledge: false,
                use_user_knowledge: false,
            })
            .is_err());

        assert_eq!(store.sessions(), sessions.as_slice());
        assert_eq!(store.documents(), documents.as_slice());
        assert_eq!(store.settings(), settings);
        assert_eq!(store.active_session().unwrap().id, session.id);
        assert_eq!(store.sessions()[0].title, "Hi");
    }
}
