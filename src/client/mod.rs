// keygate — Credential Client
//
// The thin client: three calls over a (username, password, server) triple,
// each one request to the secure store. Failures come back as the store's
// status, untouched and never retried.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use zeroize::Zeroizing;

use crate::access::AccessControl;
use crate::broker::AuthContext;
use crate::keychain::{
    AddRequest, DeleteRequest, KeychainError, ReadRequest, ReadResult, SecureStore,
};
use crate::store::ItemSummary;

/// Prompt shown when a read needs the user's presence.
pub const READ_PROMPT: &str = "Access your password on the keychain";

/// Reuse window attached to the session context of an add.
pub const ADD_REUSE_WINDOW: Duration = Duration::from_secs(10);

/// A username/password pair. The password is zeroized on drop and never printed.
pub struct Credentials {
    pub username: String,
    password: Zeroizing<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: Zeroizing::new(password.into()),
        }
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

pub struct CredentialClient<S> {
    store: S,
    shared_context: Option<Arc<AuthContext>>,
}

impl<S: SecureStore> CredentialClient<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            shared_context: None,
        }
    }

    /// Use one session context for every operation instead of a fresh one each time.
    pub fn with_shared_context(mut self, context: Arc<AuthContext>) -> Self {
        self.shared_context = Some(context);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Store `credentials` for `server`, readable only after user presence.
    pub fn add_credentials(&self, credentials: &Credentials, server: &str) -> Result<(), KeychainError> {
        let context = self.shared_context.clone().unwrap_or_else(|| {
            Arc::new(AuthContext::new().with_reuse_window(ADD_REUSE_WINDOW))
        });

        let request = AddRequest::internet_password(
            credentials.username.clone(),
            server,
            credentials.password().as_bytes().to_vec(),
            AccessControl::user_presence(),
        )
        .with_context(context);

        self.store.add(request)
    }

    /// Fetch the credentials stored for `server`. Blocks while the user authenticates.
    pub fn read_credentials(&self, server: &str) -> Result<Credentials, KeychainError> {
        let context = self
            .shared_context
            .clone()
            .unwrap_or_else(|| Arc::new(AuthContext::new().with_prompt(READ_PROMPT)));

        let request = ReadRequest::internet_password(server).with_context(context);

        let found = match self.store.copy_matching(request)? {
            ReadResult::Single(found) => found,
            ReadResult::Multiple(items) => {
                tracing::warn!(count = items.len(), "Expected a single item");
                return Err(KeychainError::InternalError);
            }
        };

        let (Some(account), Some(data)) = (found.account, found.data) else {
            tracing::warn!("Item returned without account or data");
            return Err(KeychainError::InternalError);
        };

        let password = String::from_utf8(data.to_vec()).map_err(|_| {
            tracing::warn!("Stored password is not valid UTF-8");
            KeychainError::InternalError
        })?;

        Ok(Credentials::new(account, password))
    }

    /// Remove whatever is stored for `server`.
    pub fn delete_credentials(&self, server: &str) -> Result<(), KeychainError> {
        self.store
            .delete(DeleteRequest::internet_password(server))
            .map(|_| ())
    }

    /// Stored accounts and servers, no secrets, no authentication.
    pub fn list_credentials(&self) -> Result<Vec<ItemSummary>, KeychainError> {
        self.store.list_items()
    }
}

/// One-line status text for the outcome of an operation.
pub fn status_text<T>(result: &Result<T, KeychainError>, success: &str) -> String {
    match result {
        Ok(_) => success.to_string(),
        Err(e) => format!("{} (status {})", e.message(), e.code()),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::DeviceState;
    use crate::broker::mock::ScriptedBroker;
    use crate::broker::AuthError;
    use crate::enclave::SealingKeystore;
    use crate::keychain::{ItemMatch, Keychain};
    use crate::store::Database;

    const SERVER: &str = "www.example.com";

    fn client(broker: &ScriptedBroker) -> CredentialClient<Keychain<SealingKeystore, &ScriptedBroker>> {
        let keychain = Keychain::new(
            Database::open_in_memory().unwrap(),
            SealingKeystore::from_key(&[3u8; 32]).unwrap(),
            broker,
            DeviceState {
                passcode_set: true,
                unlocked: true,
                unlocked_since_boot: true,
            },
        );
        CredentialClient::new(keychain)
    }

    fn appleseed() -> Credentials {
        Credentials::new("appleseed", "1234")
    }

    #[test]
    fn test_add_read_delete_scenario() {
        let broker = ScriptedBroker::approving();
        let client = client(&broker);

        client.add_credentials(&appleseed(), SERVER).unwrap();

        let read = client.read_credentials(SERVER).unwrap();
        assert_eq!(read.username, "appleseed");
        assert_eq!(read.password(), "1234");

        client.delete_credentials(SERVER).unwrap();
        assert_eq!(
            client.read_credentials(SERVER).unwrap_err(),
            KeychainError::ItemNotFound
        );
    }

    #[test]
    fn test_second_add_is_duplicate() {
        let broker = ScriptedBroker::approving();
        let client = client(&broker);
        client.add_credentials(&appleseed(), SERVER).unwrap();
        assert_eq!(
            client.add_credentials(&appleseed(), SERVER).unwrap_err(),
            KeychainError::DuplicateItem
        );
    }

    #[test]
    fn test_read_without_record_is_not_found() {
        let broker = ScriptedBroker::approving();
        let client = client(&broker);
        assert_eq!(
            client.read_credentials(SERVER).unwrap_err(),
            KeychainError::ItemNotFound
        );
    }

    #[test]
    fn test_delete_without_record_is_not_found() {
        let broker = ScriptedBroker::approving();
        let client = client(&broker);
        assert_eq!(
            client.delete_credentials(SERVER).unwrap_err(),
            KeychainError::ItemNotFound
        );
    }

    #[test]
    fn test_failed_authentication_returns_auth_failure() {
        let broker = ScriptedBroker::with_outcomes(vec![Err(AuthError::Failed)]);
        let client = client(&broker);
        client.add_credentials(&appleseed(), SERVER).unwrap();

        assert_eq!(
            client.read_credentials(SERVER).unwrap_err(),
            KeychainError::AuthFailed
        );
        // The record is still there for a later, successful attempt.
        assert_eq!(client.read_credentials(SERVER).unwrap().password(), "1234");
    }

    #[test]
    fn test_every_read_prompts_with_read_prompt() {
        let broker = ScriptedBroker::approving();
        let client = client(&broker);
        client.add_credentials(&appleseed(), SERVER).unwrap();

        client.read_credentials(SERVER).unwrap();
        client.read_credentials(SERVER).unwrap();

        assert_eq!(
            broker.prompts(),
            vec![Some(READ_PROMPT.to_string()), Some(READ_PROMPT.to_string())]
        );
    }

    #[test]
    fn test_shared_context_prompts_once() {
        let broker = ScriptedBroker::approving();
        let ctx = Arc::new(AuthContext::new().with_reuse_window(ADD_REUSE_WINDOW));
        let client = client(&broker).with_shared_context(ctx);
        client.add_credentials(&appleseed(), SERVER).unwrap();

        client.read_credentials(SERVER).unwrap();
        client.read_credentials(SERVER).unwrap();
        assert_eq!(broker.prompt_count(), 1);
    }

    #[test]
    fn test_list_shows_accounts_only() {
        let broker = ScriptedBroker::approving();
        let client = client(&broker);
        client.add_credentials(&appleseed(), SERVER).unwrap();

        let listed = client.list_credentials().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].server, SERVER);
        assert_eq!(broker.prompt_count(), 0);
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let out = format!("{:?}", appleseed());
        assert!(out.contains("appleseed"));
        assert!(!out.contains("1234"));
    }

    #[test]
    fn test_status_text() {
        let ok: Result<(), KeychainError> = Ok(());
        assert_eq!(status_text(&ok, "Credentials saved"), "Credentials saved");

        let err: Result<(), KeychainError> = Err(KeychainError::ItemNotFound);
        assert_eq!(
            status_text(&err, "unused"),
            "The specified item could not be found in the keychain. (status -25300)"
        );
    }

    // ── Decoding against a fixed fake store ─────────────────────────────────

    /// Returns whatever shape it was built with.
    struct FixedStore {
        make: fn() -> ReadResult,
    }

    impl SecureStore for FixedStore {
        fn add(&self, _request: AddRequest) -> Result<(), KeychainError> {
            Ok(())
        }

        fn copy_matching(&self, _request: ReadRequest) -> Result<ReadResult, KeychainError> {
            Ok((self.make)())
        }

        fn delete(&self, _request: DeleteRequest) -> Result<usize, KeychainError> {
            Ok(1)
        }

        fn list_items(&self) -> Result<Vec<ItemSummary>, KeychainError> {
            Ok(Vec::new())
        }
    }

    fn item(account: Option<&str>, data: &[u8]) -> ItemMatch {
        ItemMatch {
            account: account.map(str::to_string),
            server: Some(SERVER.to_string()),
            access: None,
            data: Some(Zeroizing::new(data.to_vec())),
        }
    }

    #[test]
    fn test_multiple_matches_is_internal_error() {
        let client = CredentialClient::new(FixedStore {
            make: || ReadResult::Multiple(vec![item(Some("a"), b"1"), item(Some("b"), b"2")]),
        });
        assert_eq!(
            client.read_credentials(SERVER).unwrap_err(),
            KeychainError::InternalError
        );
    }

    #[test]
    fn test_invalid_utf8_is_internal_error() {
        let client = CredentialClient::new(FixedStore {
            make: || ReadResult::Single(item(Some("appleseed"), &[0xff, 0xfe])),
        });
        assert_eq!(
            client.read_credentials(SERVER).unwrap_err(),
            KeychainError::InternalError
        );
    }

    #[test]
    fn test_missing_account_is_internal_error() {
        let client = CredentialClient::new(FixedStore {
            make: || ReadResult::Single(item(None, b"1234")),
        });
        assert_eq!(
            client.read_credentials(SERVER).unwrap_err(),
            KeychainError::InternalError
        );
    }
}
