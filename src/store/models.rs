// keygate — Item data models
//
// SECURITY: `ItemRecord::sealed_secret` is private and never appears in Debug
// output or serialized summaries. It holds AEAD ciphertext; plaintext only
// exists after the enclave opens it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::access::AccessControl;

/// The kind of item stored. Uniqueness is (class, account, server).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemClass {
    GenericPassword,
    InternetPassword,
}

impl ItemClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GenericPassword => "generic_password",
            Self::InternetPassword => "internet_password",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "generic_password" => Some(Self::GenericPassword),
            "internet_password" => Some(Self::InternetPassword),
            _ => None,
        }
    }
}

impl fmt::Display for ItemClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted item, including its sealed secret.
pub struct ItemRecord {
    pub id: Uuid,
    pub class: ItemClass,
    pub account: String,
    pub server: String,
    sealed_secret: Vec<u8>,
    pub access: AccessControl,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ItemRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: Uuid,
        class: ItemClass,
        account: String,
        server: String,
        sealed_secret: Vec<u8>,
        access: AccessControl,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            class,
            account,
            server,
            sealed_secret,
            access,
            created_at,
            updated_at,
        }
    }

    /// The sealed secret bytes. Only the enclave can open them.
    pub fn sealed_secret(&self) -> &[u8] {
        &self.sealed_secret
    }

    pub fn summary(&self) -> ItemSummary {
        ItemSummary {
            id: self.id,
            class: self.class,
            account: self.account.clone(),
            server: self.server.clone(),
            access: self.access,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Debug that NEVER reveals the secret, not even sealed.
impl fmt::Debug for ItemRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemRecord")
            .field("id", &self.id)
            .field("class", &self.class)
            .field("account", &self.account)
            .field("server", &self.server)
            .field("sealed_secret", &"[REDACTED]")
            .field("access", &self.access)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Attributes of an item, without its secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemSummary {
    pub id: Uuid,
    pub class: ItemClass,
    pub account: String,
    pub server: String,
    pub access: AccessControl,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Display for ItemSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ {} ({}, {})",
            self.account, self.server, self.access.accessibility, self.access.requirement
        )
    }
}

/// Input for inserting an item. The secret must already be sealed.
pub struct NewItem {
    pub class: ItemClass,
    pub account: String,
    pub server: String,
    pub sealed_secret: Vec<u8>,
    pub access: AccessControl,
}

/// Which items a lookup or delete applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFilter {
    pub class: ItemClass,
    pub server: String,
    pub account: Option<String>,
}

impl ItemFilter {
    pub fn server(class: ItemClass, server: impl Into<String>) -> Self {
        Self {
            class,
            server: server.into(),
            account: None,
        }
    }

    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
