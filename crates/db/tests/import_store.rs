//! Integration tests for the PostgreSQL import store.
//!
//! These need a reachable PostgreSQL server (`DATABASE_URL`); run them with
//! `cargo test -p verdant-db -- --ignored`.

use assert_matches::assert_matches;
use sqlx::PgPool;
use verdant_core::credentials::StoredCredentials;
use verdant_core::import::committer::{commit, ImportRequest};
use verdant_core::import::file::{UploadedFile, MAX_FILE_SIZE_BYTES};
use verdant_core::import::rules::{ImportRecord, SupplierRecord, UserRecord};
use verdant_core::import::status::snapshot;
use verdant_core::import::store::{ImportStore, StoreError, UserConflict};
use verdant_core::import::users::bulk_import_users;
use verdant_core::import::TargetKind;
use verdant_db::PgImportStore;

fn supplier(name: &str) -> ImportRecord {
    ImportRecord::Supplier(SupplierRecord {
        name: name.to_string(),
        contact_person: None,
        email: None,
        phone: None,
        address: None,
        city: Some("Oslo".to_string()),
        postal_code: None,
        website: None,
        notes: None,
    })
}

// ---------------------------------------------------------------------------
// Test: identity lookups are trimmed and case-insensitive
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn find_existing_matches_normalized_identity(pool: PgPool) {
    let store = PgImportStore::new(pool);
    let id = store.create(&supplier("Oak Nursery")).await.unwrap();

    let found = store
        .find_existing(&supplier(" oak NURSERY ").identity())
        .await
        .unwrap();
    assert_eq!(found, Some(id));
}

// ---------------------------------------------------------------------------
// Test: constraint violations are classified
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn duplicate_identity_is_unique_violation(pool: PgPool) {
    let store = PgImportStore::new(pool);
    store.create(&supplier("Oak")).await.unwrap();

    let err = store.create(&supplier(" OAK")).await.unwrap_err();
    assert_eq!(err, StoreError::UniqueViolation("supplier 'oak' already exists".into()));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn missing_supplier_is_foreign_key_error(pool: PgPool) {
    let store = PgImportStore::new(pool);
    let request = ImportRequest::new(
        TargetKind::Plants,
        UploadedFile::csv(
            "plants.csv",
            "name,latin_name,supplier_id,price\nFern,Polypodium,4242,3.50\n",
        ),
        false,
    );

    let result = commit(&store, &request).await;
    assert_eq!(result.failed_imports, 1);
    assert_eq!(result.errors, vec!["Row 2: supplier 4242 does not exist"]);
}

// ---------------------------------------------------------------------------
// Test: user updates keep credentials when none are supplied
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn user_update_keeps_stored_credentials(pool: PgPool) {
    let store = PgImportStore::new(pool.clone());
    let user = |email: &str, credentials: Option<StoredCredentials>| {
        ImportRecord::User(UserRecord {
            username: "ana".to_string(),
            email: email.to_string(),
            first_name: None,
            last_name: None,
            role: None,
            password: None,
            credentials,
        })
    };
    let id = store
        .create(&user(
            "ana@x.test",
            Some(StoredCredentials {
                password_hash: "$argon2id$placeholder".to_string(),
                must_change_password: true,
            }),
        ))
        .await
        .unwrap();

    store.update(id, &user("ana@new.test", None)).await.unwrap();

    let (hash, must_change, role): (String, bool, String) =
        sqlx::query_as("SELECT password_hash, must_change_password, role FROM users WHERE id = $1")
            .bind(id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(hash, "$argon2id$placeholder");
    assert!(must_change);
    assert_eq!(role, "staff");

    assert_eq!(
        store.find_user_conflict("bob", "ANA@new.test").await.unwrap(),
        Some(UserConflict::Email)
    );
}

// ---------------------------------------------------------------------------
// Test: bulk user import persists hashed credentials
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn bulk_import_persists_users(pool: PgPool) {
    let store = PgImportStore::new(pool);
    let file = UploadedFile::csv(
        "users.csv",
        "username,email,password\nana,ana@x.test,\nbob,bob@x.test,a-long-enough-secret\n",
    );

    let result = bulk_import_users(&store, &file, MAX_FILE_SIZE_BYTES).await.unwrap();
    assert_eq!(result.total_created, 2);

    let status = snapshot(&store).await.unwrap();
    assert_eq!(status.get(TargetKind::Users), 2);
    assert_matches!(store.ping().await, Ok(()));
}
