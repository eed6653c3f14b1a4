//! Unit tests for the generic repository.
//!
//! Uses in-memory SQLite. `Note` is a throwaway audited entity with a
//! generated primary key and a uniqueness constraint; `UserRecord` covers
//! the caller-provided-key path.

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::entity::{Entity, TableMeta};
use crate::error::StorageError;
use crate::models::{UserRecord, CREATE_USERS_TABLE};
use crate::repository::{Commit, Repository};
use crate::session::Database;
use crate::statement::Filter;
use crate::user_repo::UserRepo;
use crate::value::{Value, Values};

const CREATE_NOTES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS notes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    text TEXT NOT NULL UNIQUE,
    priority INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
    updated_at TEXT
)
"#;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
struct Note {
    id: i64,
    text: String,
    priority: i64,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

static NOTE_META: TableMeta = TableMeta {
    table: "notes",
    primary_key: "id",
    columns: &["text", "priority"],
    audit: true,
};

impl Entity for Note {
    fn meta() -> &'static TableMeta {
        &NOTE_META
    }

    fn primary_key(&self) -> Value {
        Value::Int(self.id)
    }

    fn to_values(&self) -> Values {
        Values::new()
            .set("text", self.text.clone())
            .set("priority", self.priority)
    }
}

async fn test_db() -> Database {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect");
    db.run_ddl(CREATE_USERS_TABLE)
        .await
        .expect("Failed to create users table");
    db.run_ddl(CREATE_NOTES_TABLE)
        .await
        .expect("Failed to create notes table");
    db
}

#[tokio::test]
async fn test_create_then_get_round_trip() {
    let db = test_db().await;
    let session = db.session().await.expect("Failed to open session");
    let repo = Repository::<Note>::new(&session);

    let created = repo
        .create(Values::new().set("text", "hello").set("priority", 3), Commit::Auto)
        .await
        .expect("Failed to create");

    assert!(created.id > 0, "primary key should be generated");
    assert_eq!(created.text, "hello");
    assert_eq!(created.priority, 3);
    assert!(created.updated_at.is_none());

    let fetched = repo
        .get(Filter::new().eq("id", created.id))
        .await
        .expect("Failed to get");
    assert_eq!(fetched, created);

    session.close().await.expect("Failed to close");
}

#[tokio::test]
async fn test_user_scenario_insert_get_update() {
    let db = test_db().await;
    let session = db.session().await.expect("Failed to open session");
    let repo = Repository::<UserRecord>::new(&session);

    repo.create(
        Values::new().set("telegram_id", 42).set("username", "alice"),
        Commit::Auto,
    )
    .await
    .expect("Failed to create user");

    let user = repo
        .get(Filter::new().eq("telegram_id", 42))
        .await
        .expect("Failed to get user");
    assert!(user.is_active, "is_active should default to true");
    assert!(user.updated_at.is_none());

    tokio::time::sleep(Duration::from_millis(20)).await;

    let updated = repo
        .update(
            Filter::new().eq("telegram_id", 42),
            Values::new().set("username", "alice2"),
            Commit::Auto,
        )
        .await
        .expect("Failed to update user");
    assert_eq!(updated.username.as_deref(), Some("alice2"));
    assert_eq!(updated.created_at, user.created_at);
    let updated_at = updated.updated_at.expect("updated_at should be set");
    assert!(updated_at > updated.created_at);

    session.close().await.expect("Failed to close");
}

#[tokio::test]
async fn test_update_zero_matches_is_not_found() {
    let db = test_db().await;
    let session = db.session().await.expect("Failed to open session");
    let repo = Repository::<Note>::new(&session);

    let err = repo
        .update(
            Filter::new().eq("id", 9999),
            Values::new().set("text", "nope"),
            Commit::Auto,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound(_)));

    session.close().await.expect("Failed to close");
}

#[tokio::test]
async fn test_update_many_matches_is_ambiguous_and_rolled_back() {
    let db = test_db().await;
    let session = db.session().await.expect("Failed to open session");
    let repo = Repository::<Note>::new(&session);

    repo.create_many(
        vec![
            Values::new().set("text", "a").set("priority", 1),
            Values::new().set("text", "b").set("priority", 1),
        ],
        Commit::Auto,
    )
    .await
    .expect("Failed to create notes");

    let err = repo
        .update(
            Filter::new().eq("priority", 1),
            Values::new().set("priority", 2),
            Commit::Auto,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Ambiguous(_)));

    // The multi-row update was never committed; a fresh session sees the
    // original priorities.
    session.close().await.expect("Failed to close");
    let session = db.session().await.expect("Failed to reopen session");
    let repo = Repository::<Note>::new(&session);
    let changed = repo
        .filter(Filter::new().eq("priority", 2))
        .await
        .expect("Failed to filter");
    assert!(changed.is_empty());
    session.close().await.expect("Failed to close");
}

#[tokio::test]
async fn test_update_many_returns_all_matches() {
    let db = test_db().await;
    let session = db.session().await.expect("Failed to open session");
    let repo = Repository::<Note>::new(&session);

    repo.create_many(
        vec![
            Values::new().set("text", "a").set("priority", 1),
            Values::new().set("text", "b").set("priority", 1),
            Values::new().set("text", "c").set("priority", 5),
        ],
        Commit::Auto,
    )
    .await
    .expect("Failed to create notes");

    let updated = repo
        .update_many(
            Filter::new().eq("priority", 1),
            Values::new().set("priority", 2),
            Commit::Auto,
        )
        .await
        .expect("Failed to update");
    assert_eq!(updated.len(), 2);
    assert!(updated.iter().all(|n| n.priority == 2 && n.updated_at.is_some()));

    let none = repo
        .update_many(
            Filter::new().eq("priority", 100),
            Values::new().set("priority", 0),
            Commit::Auto,
        )
        .await
        .expect("Failed to update");
    assert!(none.is_empty());

    session.close().await.expect("Failed to close");
}

#[tokio::test]
async fn test_delete_then_get_is_not_found() {
    let db = test_db().await;
    let session = db.session().await.expect("Failed to open session");
    let repo = Repository::<Note>::new(&session);

    let note = repo
        .create(Values::new().set("text", "gone"), Commit::Auto)
        .await
        .expect("Failed to create");

    let deleted = repo
        .delete(Filter::new().eq("id", note.id), Commit::Auto)
        .await
        .expect("Failed to delete");
    assert_eq!(deleted.id, note.id);

    let err = repo.get(Filter::new().eq("id", note.id)).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound(_)));

    session.close().await.expect("Failed to close");
}

#[tokio::test]
async fn test_create_many_is_atomic_on_constraint_violation() {
    let db = test_db().await;
    let session = db.session().await.expect("Failed to open session");
    let repo = Repository::<Note>::new(&session);

    repo.create(Values::new().set("text", "dup"), Commit::Auto)
        .await
        .expect("Failed to create");

    let err = repo
        .create_many(
            vec![
                Values::new().set("text", "fresh"),
                Values::new().set("text", "dup"),
            ],
            Commit::Auto,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Constraint(_)));
    session.close().await.expect("Failed to close");

    let session = db.session().await.expect("Failed to reopen session");
    let repo = Repository::<Note>::new(&session);
    let leaked = repo
        .filter(Filter::new().eq("text", "fresh"))
        .await
        .expect("Failed to filter");
    assert!(leaked.is_empty(), "batch insert must be all-or-nothing");
    session.close().await.expect("Failed to close");
}

#[tokio::test]
async fn test_get_or_none() {
    let db = test_db().await;
    let session = db.session().await.expect("Failed to open session");
    let repo = Repository::<Note>::new(&session);

    assert!(repo
        .get_or_none(Filter::new().eq("id", 1))
        .await
        .expect("Failed to query")
        .is_none());

    repo.create_many(
        vec![
            Values::new().set("text", "a").set("priority", 7),
            Values::new().set("text", "b").set("priority", 7),
        ],
        Commit::Auto,
    )
    .await
    .expect("Failed to create");

    let one = repo
        .get_or_none(Filter::new().eq("text", "a"))
        .await
        .expect("Failed to query");
    assert_eq!(one.map(|n| n.text), Some("a".to_string()));

    let err = repo
        .get_or_none(Filter::new().eq("priority", 7))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Ambiguous(_)));

    session.close().await.expect("Failed to close");
}

#[tokio::test]
async fn test_delete_by_instance_variants() {
    let db = test_db().await;
    let session = db.session().await.expect("Failed to open session");
    let repo = Repository::<Note>::new(&session);

    let notes = repo
        .create_many(
            vec![
                Values::new().set("text", "a"),
                Values::new().set("text", "b"),
                Values::new().set("text", "c"),
            ],
            Commit::Auto,
        )
        .await
        .expect("Failed to create");
    assert_eq!(notes.len(), 3);

    let deleted = repo
        .delete_from(&notes[0], Commit::Auto)
        .await
        .expect("Failed to delete by instance");
    assert_eq!(deleted.text, "a");

    let deleted = repo
        .delete_many_from(&notes[1..], Commit::Auto)
        .await
        .expect("Failed to delete many by instances");
    assert_eq!(deleted.len(), 2);

    assert!(repo.all().await.expect("Failed to list").is_empty());

    let err = repo.delete_by_id(notes[0].id, Commit::Auto).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound(_)));

    session.close().await.expect("Failed to close");
}

#[tokio::test]
async fn test_create_from_instance() {
    let db = test_db().await;
    let session = db.session().await.expect("Failed to open session");
    let repo = Repository::<UserRecord>::new(&session);

    let unpersisted = UserRecord {
        telegram_id: 7,
        username: Some("bob".to_string()),
        first_name: Some("Bob".to_string()),
        last_name: None,
        is_active: true,
        created_at: Utc::now(), // ignored; server sets its own
        updated_at: None,
    };

    let created = repo
        .create_from(&unpersisted, Commit::Auto)
        .await
        .expect("Failed to create from instance");
    assert_eq!(created.telegram_id, 7);
    assert_eq!(created.username.as_deref(), Some("bob"));
    assert!(created.updated_at.is_none());

    session.close().await.expect("Failed to close");
}

#[tokio::test]
async fn test_deferred_commit_batches_into_one_transaction() {
    let db = test_db().await;
    let session = db.session().await.expect("Failed to open session");
    let repo = Repository::<Note>::new(&session);

    repo.create(Values::new().set("text", "one"), Commit::Defer)
        .await
        .expect("Failed to create");
    repo.create(Values::new().set("text", "two"), Commit::Defer)
        .await
        .expect("Failed to create");
    repo.commit().await.expect("Failed to commit");
    session.close().await.expect("Failed to close");

    let session = db.session().await.expect("Failed to reopen session");
    let repo = Repository::<Note>::new(&session);
    assert_eq!(repo.all().await.expect("Failed to list").len(), 2);
    session.close().await.expect("Failed to close");
}

#[tokio::test]
async fn test_deferred_rollback_discards_batch() {
    let db = test_db().await;
    let session = db.session().await.expect("Failed to open session");
    let repo = Repository::<Note>::new(&session);

    repo.create(Values::new().set("text", "one"), Commit::Defer)
        .await
        .expect("Failed to create");
    repo.rollback().await.expect("Failed to rollback");
    session.close().await.expect("Failed to close");

    let session = db.session().await.expect("Failed to reopen session");
    let repo = Repository::<Note>::new(&session);
    assert!(repo.all().await.expect("Failed to list").is_empty());
    session.close().await.expect("Failed to close");
}

#[tokio::test]
async fn test_user_repo_get_or_create_and_deactivate() {
    let db = test_db().await;
    let session = db.session().await.expect("Failed to open session");
    let repo = UserRepo::new(&session);

    let user = repo
        .get_or_create(42, Values::new().set("username", "alice"))
        .await
        .expect("Failed to get or create");
    assert_eq!(user.telegram_id, 42);
    assert!(user.is_active);

    // Second call returns the existing row instead of inserting.
    let again = repo
        .get_or_create(42, Values::new().set("username", "other"))
        .await
        .expect("Failed to get or create");
    assert_eq!(again.username.as_deref(), Some("alice"));

    let deactivated = repo.deactivate(42).await.expect("Failed to deactivate");
    assert!(!deactivated.is_active);
    assert!(deactivated.updated_at.is_some());

    assert!(repo.active().await.expect("Failed to list").is_empty());

    let err = repo.deactivate(999).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound(_)));

    session.close().await.expect("Failed to close");
}

#[tokio::test]
async fn test_user_repo_listing_is_ordered_by_created_at() {
    let db = test_db().await;
    let session = db.session().await.expect("Failed to open session");
    let repo = UserRepo::new(&session);

    for (id, name) in [(3, "c"), (1, "a"), (2, "b")] {
        repo.get_or_create(id, Values::new().set("username", name))
            .await
            .expect("Failed to create");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let users = repo.all().await.expect("Failed to list");
    let ids: Vec<i64> = users.iter().map(|u| u.telegram_id).collect();
    assert_eq!(ids, vec![3, 1, 2]);

    session.close().await.expect("Failed to close");
}
