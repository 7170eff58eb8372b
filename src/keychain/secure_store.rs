// keygate — Secure Item Store
//
// Enforces each record's access-control policy before releasing its data:
// accessibility against the current device state first, then the
// authentication requirement through the broker, then the enclave opens the
// sealed bytes. The policy stored with the record is the one evaluated, never
// anything supplied by the caller.
//
// The connection lock is not held while the broker prompts. A record is
// fetched again by id after authentication, so one deleted in the meantime
// is reported missing instead of being opened.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use uuid::Uuid;

use crate::access::{AuthRequirement, Availability, DeviceState};
use crate::broker::{authorize, AuthBroker, AuthContext, AuthError};
use crate::enclave::{DeviceKeystore, EnclaveError};
use crate::store::{
    Database, ItemClass, ItemFilter, ItemRecord, ItemRepository, ItemSummary, NewItem,
    SqliteItemRepository, StoreError,
};

use super::request::{AddRequest, DeleteRequest, ItemMatch, MatchLimit, ReadRequest, ReadResult};
use super::KeychainError;

// ─── Trait ───────────────────────────────────────────────────────────────────

/// The item-store capability the client is written against.
pub trait SecureStore {
    fn add(&self, request: AddRequest) -> Result<(), KeychainError>;

    /// Look up items. Blocks while the broker challenges the user.
    fn copy_matching(&self, request: ReadRequest) -> Result<ReadResult, KeychainError>;

    /// Remove matching items. Returns how many were removed (always at least one).
    fn delete(&self, request: DeleteRequest) -> Result<usize, KeychainError>;

    /// Attributes of every stored item. Never authenticates, never returns data.
    fn list_items(&self) -> Result<Vec<ItemSummary>, KeychainError>;
}

fn store_failure(err: StoreError) -> KeychainError {
    match err {
        StoreError::Duplicate(_) => KeychainError::DuplicateItem,
        StoreError::NotInitialized => KeychainError::NotAvailable,
        other => {
            tracing::error!(error = %other, "Item store failure");
            KeychainError::InternalError
        }
    }
}

fn enclave_failure(err: EnclaveError) -> KeychainError {
    match err {
        EnclaveError::Integrity => KeychainError::Decode,
        other => {
            tracing::error!(error = %other, "Enclave failure");
            KeychainError::InternalError
        }
    }
}

fn auth_failure(err: &AuthError) -> KeychainError {
    match err {
        AuthError::Failed | AuthError::NotAvailable(_) => KeychainError::AuthFailed,
        AuthError::UserCancel => KeychainError::UserCanceled,
        AuthError::NotInteractive => KeychainError::InteractionNotAllowed,
    }
}

/// Binds sealed bytes to the identity of the record holding them.
fn associated_data(class: ItemClass, account: &str, server: &str) -> Vec<u8> {
    format!("keygate:item\x1f{}\x1f{}\x1f{}", class.as_str(), account, server).into_bytes()
}

/// Write an audit entry; a failed write is logged, never returned.
fn record_audit(
    repo: &SqliteItemRepository<'_>,
    item_id: Option<&Uuid>,
    server: &str,
    action: &str,
    details: Option<&str>,
) {
    if let Err(e) = repo.log_access(item_id, server, action, details) {
        tracing::warn!(error = %e, action, "Failed to write audit entry");
    }
}

// ─── Keychain ────────────────────────────────────────────────────────────────

/// SQLite-backed secure store with enclave sealing and broker-gated reads.
pub struct Keychain<K, B> {
    db: Mutex<Database>,
    keystore: K,
    broker: B,
    device: Mutex<DeviceState>,
}

impl<K, B> Keychain<K, B>
where
    K: DeviceKeystore,
    B: AuthBroker,
{
    pub fn new(db: Database, keystore: K, broker: B, device: DeviceState) -> Self {
        Self {
            db: Mutex::new(db),
            keystore,
            broker,
            device: Mutex::new(device),
        }
    }

    pub fn device_state(&self) -> DeviceState {
        *self.device.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_device_state(&self, device: DeviceState) {
        *self.device.lock().unwrap_or_else(|e| e.into_inner()) = device;
    }

    /// Audit trail for one server.
    pub fn audit_log(&self, server: &str) -> Result<Vec<String>, KeychainError> {
        let db = self.lock_db();
        SqliteItemRepository::new(&db)
            .audit_log(server)
            .map_err(store_failure)
    }

    fn lock_db(&self) -> MutexGuard<'_, Database> {
        self.db.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Must not be called while the connection lock is held.
    fn audit(&self, item_id: Option<&Uuid>, server: &str, action: &str, details: Option<&str>) {
        let db = self.lock_db();
        record_audit(&SqliteItemRepository::new(&db), item_id, server, action, details);
    }

    /// Release one record's data after its policy has been satisfied.
    fn unlock_record(
        &self,
        record: &ItemRecord,
        context: &AuthContext,
        passed: &mut Vec<AuthRequirement>,
    ) -> Result<ItemMatch, KeychainError> {
        let requirement = record.access.requirement;
        if !passed.contains(&requirement) {
            match authorize(&self.broker, requirement, context, Instant::now()) {
                Ok(how) => {
                    tracing::debug!(item_id = %record.id, ?how, "Read authorized");
                    passed.push(requirement);
                }
                Err(e) => {
                    let status = auth_failure(&e);
                    self.audit(Some(&record.id), &record.server, "read_denied", Some(&e.to_string()));
                    tracing::warn!(
                        item_id = %record.id,
                        code = status.code(),
                        "Read denied by authentication"
                    );
                    return Err(status);
                }
            }
        }

        let current = {
            let db = self.lock_db();
            SqliteItemRepository::new(&db).get(&record.id)
        };
        let current = match current {
            Ok(Some(current)) => current,
            Ok(None) => {
                tracing::warn!(item_id = %record.id, "Item removed during authentication");
                self.audit(
                    Some(&record.id),
                    &record.server,
                    "read_not_found",
                    Some("item removed during authentication"),
                );
                return Err(KeychainError::ItemNotFound);
            }
            Err(e) => {
                let status = store_failure(e);
                self.audit(Some(&record.id), &record.server, "read_failed", Some(&status.to_string()));
                return Err(status);
            }
        };

        let aad = associated_data(current.class, &current.account, &current.server);
        let data = match self.keystore.open(&aad, current.sealed_secret()) {
            Ok(data) => data,
            Err(e) => {
                let status = enclave_failure(e);
                self.audit(Some(&current.id), &current.server, "read_failed", Some(&status.to_string()));
                return Err(status);
            }
        };

        self.audit(Some(&current.id), &current.server, "data_released", None);
        Ok(ItemMatch {
            account: None,
            server: None,
            access: None,
            data: Some(data),
        })
    }
}

impl<K, B> SecureStore for Keychain<K, B>
where
    K: DeviceKeystore,
    B: AuthBroker,
{
    fn add(&self, request: AddRequest) -> Result<(), KeychainError> {
        if request.account.is_empty() || request.server.is_empty() {
            self.audit(None, &request.server, "add_rejected", Some("account and server are required"));
            return Err(KeychainError::Param);
        }

        let device = self.device_state();
        if !request.access.accessibility.can_add(&device) {
            tracing::warn!(
                server = %request.server,
                accessibility = %request.access.accessibility,
                "Add refused: accessibility not satisfiable on this device"
            );
            self.audit(
                None,
                &request.server,
                "add_rejected",
                Some("accessibility not satisfiable on this device"),
            );
            return Err(KeychainError::NotAvailable);
        }

        if let Some(ctx) = &request.context {
            tracing::debug!(
                reuse_window_secs = ctx.reuse_window().as_secs(),
                "Add carries a session context"
            );
        }

        let aad = associated_data(request.class, &request.account, &request.server);
        let sealed = match self.keystore.seal(&aad, &request.secret) {
            Ok(sealed) => sealed,
            Err(e) => {
                let status = enclave_failure(e);
                self.audit(None, &request.server, "add_failed", Some(&status.to_string()));
                return Err(status);
            }
        };

        let db = self.lock_db();
        let repo = SqliteItemRepository::new(&db);
        let inserted = repo.insert(NewItem {
            class: request.class,
            account: request.account.clone(),
            server: request.server.clone(),
            sealed_secret: sealed,
            access: request.access,
        });
        let id = match inserted {
            Ok(id) => id,
            Err(e) => {
                let action = if matches!(e, StoreError::Duplicate(_)) {
                    "add_duplicate"
                } else {
                    "add_failed"
                };
                record_audit(&repo, None, &request.server, action, None);
                return Err(store_failure(e));
            }
        };

        record_audit(&repo, Some(&id), &request.server, "added", None);

        tracing::info!(
            item_id = %id,
            server = %request.server,
            accessibility = %request.access.accessibility,
            device_bound = request.access.accessibility.is_device_bound(),
            requirement = %request.access.requirement,
            "Item added"
        );
        Ok(())
    }

    fn copy_matching(&self, request: ReadRequest) -> Result<ReadResult, KeychainError> {
        let context = request
            .context
            .clone()
            .unwrap_or_else(|| Arc::new(AuthContext::new()));

        let mut filter = ItemFilter::server(request.class, request.server.clone());
        filter.account = request.account.clone();

        let candidates = {
            let db = self.lock_db();
            let repo = SqliteItemRepository::new(&db);
            match repo.find(&filter) {
                Ok(found) => found,
                Err(e) => {
                    let status = store_failure(e);
                    record_audit(&repo, None, &request.server, "read_failed", Some(&status.to_string()));
                    return Err(status);
                }
            }
        };

        let device = self.device_state();
        let mut locked = false;
        let mut available = Vec::new();
        for record in candidates {
            match record.access.accessibility.availability(&device) {
                Availability::Available => available.push(record),
                Availability::Locked => locked = true,
                Availability::Invalidated => {
                    tracing::debug!(item_id = %record.id, "Skipping invalidated item");
                }
            }
        }

        if available.is_empty() {
            let status = if locked {
                KeychainError::InteractionNotAllowed
            } else {
                KeychainError::ItemNotFound
            };
            self.audit(None, &request.server, "read_not_found", Some(&status.to_string()));
            return Err(status);
        }

        if request.match_limit == MatchLimit::One {
            available.truncate(1);
        }

        let mut passed = Vec::new();
        let mut matches = Vec::with_capacity(available.len());
        for record in &available {
            let mut found = if request.return_data {
                self.unlock_record(record, &context, &mut passed)?
            } else {
                ItemMatch {
                    account: None,
                    server: None,
                    access: None,
                    data: None,
                }
            };
            if request.return_attributes {
                found.account = Some(record.account.clone());
                found.server = Some(record.server.clone());
                found.access = Some(record.access);
            }
            matches.push(found);
        }

        match request.match_limit {
            MatchLimit::One => match matches.pop() {
                Some(single) => Ok(ReadResult::Single(single)),
                None => Err(KeychainError::ItemNotFound),
            },
            MatchLimit::All => Ok(ReadResult::Multiple(matches)),
        }
    }

    fn delete(&self, request: DeleteRequest) -> Result<usize, KeychainError> {
        let mut filter = ItemFilter::server(request.class, request.server.clone());
        filter.account = request.account.clone();

        let db = self.lock_db();
        let repo = SqliteItemRepository::new(&db);
        let removed = match repo.delete_matching(&filter) {
            Ok(removed) => removed,
            Err(e) => {
                let status = store_failure(e);
                record_audit(&repo, None, &request.server, "delete_failed", Some(&status.to_string()));
                return Err(status);
            }
        };

        if removed.is_empty() {
            record_audit(&repo, None, &request.server, "delete_not_found", None);
            return Err(KeychainError::ItemNotFound);
        }

        for id in &removed {
            record_audit(&repo, Some(id), &request.server, "deleted", None);
        }
        Ok(removed.len())
    }

    fn list_items(&self) -> Result<Vec<ItemSummary>, KeychainError> {
        let db = self.lock_db();
        SqliteItemRepository::new(&db).list().map_err(store_failure)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
