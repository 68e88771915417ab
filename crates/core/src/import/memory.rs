//! In-process [`ImportStore`].
//!
//! Used when no database is configured and by tests. It enforces the same
//! constraints as the PostgreSQL schema: unique normalized identities,
//! unique user emails, and existing suppliers for plant and product rows.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::rules::{normalize_identity, Identity, ImportRecord, UserRecord};
use super::store::{ImportStore, StoreError, UserConflict};
use super::target::TargetKind;
use crate::roles::DEFAULT_IMPORT_ROLE;
use crate::types::{DbId, Timestamp};

/// A record as held by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub record: ImportRecord,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Rows of one kind plus the lookup indexes the unique constraints need.
#[derive(Debug, Default)]
struct Table {
    last_id: DbId,
    rows: BTreeMap<DbId, StoredRecord>,
    by_identity: HashMap<Identity, DbId>,
    /// Normalized user email -> id. Empty for other kinds.
    by_email: HashMap<String, DbId>,
}

impl Table {
    fn push(&mut self, record: ImportRecord) -> DbId {
        self.last_id += 1;
        let id = self.last_id;
        self.index(id, &record);
        let now = Utc::now();
        self.rows.insert(
            id,
            StoredRecord {
                record,
                created_at: now,
                updated_at: now,
            },
        );
        id
    }

    fn index(&mut self, id: DbId, record: &ImportRecord) {
        self.by_identity.insert(record.identity(), id);
        if let ImportRecord::User(user) = record {
            self.by_email.insert(normalize_identity(&user.email), id);
        }
    }

    fn unindex(&mut self, id: DbId, record: &ImportRecord) {
        let identity = record.identity();
        if self.by_identity.get(&identity) == Some(&id) {
            self.by_identity.remove(&identity);
        }
        if let ImportRecord::User(user) = record {
            let email = normalize_identity(&user.email);
            if self.by_email.get(&email) == Some(&id) {
                self.by_email.remove(&email);
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<BTreeMap<TargetKind, Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record without constraint checks. Intended for seeding.
    pub async fn insert(&self, record: ImportRecord) -> DbId {
        let mut tables = self.tables.write().await;
        tables.entry(record.kind()).or_default().push(record)
    }

    pub async fn get(&self, kind: TargetKind, id: DbId) -> Option<StoredRecord> {
        let tables = self.tables.read().await;
        tables.get(&kind).and_then(|t| t.rows.get(&id)).cloned()
    }

    /// All records of `kind`, ordered by id.
    pub async fn records(&self, kind: TargetKind) -> Vec<(DbId, StoredRecord)> {
        let tables = self.tables.read().await;
        tables
            .get(&kind)
            .map(|t| t.rows.iter().map(|(id, r)| (*id, r.clone())).collect())
            .unwrap_or_default()
    }
}

fn find_by_identity(
    tables: &BTreeMap<TargetKind, Table>,
    identity: &Identity,
) -> Option<DbId> {
    tables
        .get(&identity.kind)
        .and_then(|table| table.by_identity.get(identity).copied())
}

fn find_by_email(tables: &BTreeMap<TargetKind, Table>, email: &str) -> Option<DbId> {
    tables
        .get(&TargetKind::Users)
        .and_then(|table| table.by_email.get(&normalize_identity(email)).copied())
}

/// Apply the checks a write of `record` must pass. `own_id` excludes the
/// record being updated from uniqueness checks.
fn check_constraints(
    tables: &BTreeMap<TargetKind, Table>,
    record: &ImportRecord,
    own_id: Option<DbId>,
) -> Result<(), StoreError> {
    if let Some(supplier_id) = record.referenced_supplier() {
        let exists = tables
            .get(&TargetKind::Suppliers)
            .is_some_and(|t| t.rows.contains_key(&supplier_id));
        if !exists {
            return Err(StoreError::ForeignKey(format!(
                "supplier {supplier_id} does not exist"
            )));
        }
    }

    let identity = record.identity();
    if let Some(existing) = find_by_identity(tables, &identity) {
        if Some(existing) != own_id {
            return Err(StoreError::UniqueViolation(format!(
                "{} '{identity}' already exists",
                record.kind().entity_name()
            )));
        }
    }

    if let ImportRecord::User(user) = record {
        if let Some(existing) = find_by_email(tables, &user.email) {
            if Some(existing) != own_id {
                return Err(StoreError::UniqueViolation(format!(
                    "email '{}' is already in use",
                    user.email
                )));
            }
        }
    }
    Ok(())
}

/// Merge an update into a stored user, keeping role and credentials the
/// update leaves unset.
fn merge_user(stored: &UserRecord, update: &UserRecord) -> UserRecord {
    UserRecord {
        role: update.role.or(stored.role),
        credentials: update
            .credentials
            .clone()
            .or_else(|| stored.credentials.clone()),
        password: None,
        ..update.clone()
    }
}

#[async_trait]
impl ImportStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn find_existing(&self, identity: &Identity) -> Result<Option<DbId>, StoreError> {
        let tables = self.tables.read().await;
        Ok(find_by_identity(&tables, identity))
    }

    async fn create(&self, record: &ImportRecord) -> Result<DbId, StoreError> {
        let mut tables = self.tables.write().await;
        check_constraints(&tables, record, None)?;

        let mut record = record.clone();
        if let ImportRecord::User(user) = &mut record {
            if user.credentials.is_none() {
                return Err(StoreError::Invalid(
                    "user accounts require a password hash".to_string(),
                ));
            }
            user.role = user.role.or(Some(DEFAULT_IMPORT_ROLE));
            user.password = None;
        }

        Ok(tables.entry(record.kind()).or_default().push(record))
    }

    async fn update(&self, id: DbId, record: &ImportRecord) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        check_constraints(&tables, record, Some(id))?;

        let entity = record.kind().entity_name();
        let table = tables
            .get_mut(&record.kind())
            .ok_or_else(|| StoreError::Invalid(format!("{entity} {id} does not exist")))?;
        let Some(stored) = table.rows.get_mut(&id) else {
            return Err(StoreError::Invalid(format!("{entity} {id} does not exist")));
        };

        let previous = stored.record.clone();
        stored.record = match (&stored.record, record) {
            (ImportRecord::User(current), ImportRecord::User(update)) => {
                ImportRecord::User(merge_user(current, update))
            }
            _ => record.clone(),
        };
        stored.updated_at = Utc::now();
        let current = stored.record.clone();

        table.unindex(id, &previous);
        table.index(id, &current);
        Ok(())
    }

    async fn supplier_exists(&self, id: DbId) -> Result<bool, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(&TargetKind::Suppliers)
            .is_some_and(|t| t.rows.contains_key(&id)))
    }

    async fn count(&self, kind: TargetKind) -> Result<i64, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.get(&kind).map_or(0, |t| t.rows.len() as i64))
    }

    async fn find_user_conflict(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<UserConflict>, StoreError> {
        let tables = self.tables.read().await;
        let identity = Identity {
            kind: TargetKind::Users,
            key: vec![normalize_identity(username)],
        };
        if find_by_identity(&tables, &identity).is_some() {
            return Ok(Some(UserConflict::Username));
        }
        if find_by_email(&tables, email).is_some() {
            return Ok(Some(UserConflict::Email));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::StoredCredentials;
    use crate::import::rules::{PlantRecord, SupplierRecord};
    use assert_matches::assert_matches;

    fn supplier(name: &str) -> ImportRecord {
        ImportRecord::Supplier(SupplierRecord {
            name: name.into(),
            contact_person: None,
            email: None,
            phone: None,
            address: None,
            city: None,
            postal_code: None,
            website: None,
            notes: None,
        })
    }

    fn plant(name: &str, supplier_id: DbId) -> ImportRecord {
        ImportRecord::Plant(PlantRecord {
            name: name.into(),
            latin_name: None,
            supplier_id,
            price_cents: 100,
            height_cm: None,
            pot_size: None,
            hardiness_zone: None,
            stock_quantity: None,
            notes: None,
        })
    }

    fn user(username: &str, email: &str, hash: Option<&str>) -> ImportRecord {
        ImportRecord::User(UserRecord {
            username: username.into(),
            email: email.into(),
            first_name: None,
            last_name: None,
            role: None,
            password: None,
            credentials: hash.map(|h| StoredCredentials {
                password_hash: h.into(),
                must_change_password: false,
            }),
        })
    }

    #[tokio::test]
    async fn create_then_find_by_normalized_identity() {
        let store = MemoryStore::new();
        let id = store.create(&supplier("Oak Nursery")).await.unwrap();
        let found = store
            .find_existing(&supplier("  OAK nursery").identity())
            .await
            .unwrap();
        assert_eq!(found, Some(id));
        assert_eq!(store.count(TargetKind::Suppliers).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn duplicate_identity_is_rejected() {
        let store = MemoryStore::new();
        store.create(&supplier("Oak")).await.unwrap();
        let err = store.create(&supplier("oak")).await.unwrap_err();
        assert_matches!(err, StoreError::UniqueViolation(_));
    }

    #[tokio::test]
    async fn plant_requires_existing_supplier() {
        let store = MemoryStore::new();
        let err = store.create(&plant("Fern", 42)).await.unwrap_err();
        assert_eq!(err, StoreError::ForeignKey("supplier 42 does not exist".into()));

        let supplier_id = store.create(&supplier("Oak")).await.unwrap();
        store.create(&plant("Fern", supplier_id)).await.unwrap();
        assert!(store.supplier_exists(supplier_id).await.unwrap());
    }

    #[tokio::test]
    async fn user_update_keeps_unset_role_and_credentials() {
        let store = MemoryStore::new();
        let id = store.create(&user("ana", "ana@x.test", Some("hash-1"))).await.unwrap();

        store.update(id, &user("ana", "ana@new.test", None)).await.unwrap();

        let stored = store.get(TargetKind::Users, id).await.unwrap();
        assert_matches!(stored.record, ImportRecord::User(u) => {
            assert_eq!(u.email, "ana@new.test");
            assert_eq!(u.role, Some(DEFAULT_IMPORT_ROLE));
            assert_eq!(u.credentials.unwrap().password_hash, "hash-1");
        });
    }

    #[tokio::test]
    async fn user_without_credentials_cannot_be_created() {
        let store = MemoryStore::new();
        let err = store.create(&user("ana", "ana@x.test", None)).await.unwrap_err();
        assert_matches!(err, StoreError::Invalid(_));
    }

    #[tokio::test]
    async fn user_conflicts_report_the_field() {
        let store = MemoryStore::new();
        store.create(&user("ana", "ana@x.test", Some("h"))).await.unwrap();
        assert_eq!(
            store.find_user_conflict("ANA", "other@x.test").await.unwrap(),
            Some(UserConflict::Username)
        );
        assert_eq!(
            store.find_user_conflict("bob", " Ana@X.test").await.unwrap(),
            Some(UserConflict::Email)
        );
        assert_eq!(store.find_user_conflict("bob", "bob@x.test").await.unwrap(), None);
    }

    #[tokio::test]
    async fn update_moves_identity_and_email_indexes() {
        let store = MemoryStore::new();
        let oak = store.create(&supplier("Oak")).await.unwrap();
        store.update(oak, &supplier("Elm")).await.unwrap();

        assert_eq!(store.find_existing(&supplier("oak").identity()).await.unwrap(), None);
        assert_eq!(store.find_existing(&supplier("ELM").identity()).await.unwrap(), Some(oak));
        store.create(&supplier("Oak")).await.unwrap();

        let ana = store.create(&user("ana", "ana@x.test", Some("h"))).await.unwrap();
        store.update(ana, &user("ana", "ana@new.test", None)).await.unwrap();
        assert_eq!(store.find_user_conflict("bob", "ana@x.test").await.unwrap(), None);
        store.create(&user("bob", "ANA@x.test", Some("h"))).await.unwrap();

        let err = store.create(&user("cyd", "ana@new.test", Some("h"))).await.unwrap_err();
        assert_eq!(err, StoreError::UniqueViolation("email 'ana@new.test' is already in use".into()));
    }

    #[tokio::test]
    async fn large_batches_keep_lookups_indexed() {
        let store = MemoryStore::new();
        for i in 0..20_000 {
            store.create(&supplier(&format!("Supplier {i}"))).await.unwrap();
        }
        assert_eq!(store.count(TargetKind::Suppliers).await.unwrap(), 20_000);
        assert_eq!(
            store.find_existing(&supplier("supplier 19999").identity()).await.unwrap(),
            Some(20_000)
        );
        assert_matches!(
            store.create(&supplier("SUPPLIER 0")).await,
            Err(StoreError::UniqueViolation(_))
        );
    }
}
