// keygate — Item store request shapes
//
// One struct per operation. Reads name what they want back (attributes,
// data, or both) and how many matches; the store never returns more.

use std::fmt;
use std::sync::Arc;

use zeroize::Zeroizing;

use crate::access::AccessControl;
use crate::broker::AuthContext;
use crate::store::ItemClass;

pub struct AddRequest {
    pub class: ItemClass,
    pub account: String,
    pub server: String,
    pub secret: Zeroizing<Vec<u8>>,
    pub access: AccessControl,
    pub context: Option<Arc<AuthContext>>,
}

impl AddRequest {
    pub fn internet_password(
        account: impl Into<String>,
        server: impl Into<String>,
        secret: impl Into<Vec<u8>>,
        access: AccessControl,
    ) -> Self {
        Self {
            class: ItemClass::InternetPassword,
            account: account.into(),
            server: server.into(),
            secret: Zeroizing::new(secret.into()),
            access,
            context: None,
        }
    }

    pub fn with_context(mut self, context: Arc<AuthContext>) -> Self {
        self.context = Some(context);
        self
    }
}

impl fmt::Debug for AddRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddRequest")
            .field("class", &self.class)
            .field("account", &self.account)
            .field("server", &self.server)
            .field("secret", &"[REDACTED]")
            .field("access", &self.access)
            .field("context", &self.context)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchLimit {
    One,
    All,
}

#[derive(Debug)]
pub struct ReadRequest {
    pub class: ItemClass,
    pub server: String,
    pub account: Option<String>,
    pub match_limit: MatchLimit,
    pub return_attributes: bool,
    pub return_data: bool,
    pub context: Option<Arc<AuthContext>>,
}

impl ReadRequest {
    /// Single internet-password match for `server`, attributes and data.
    pub fn internet_password(server: impl Into<String>) -> Self {
        Self {
            class: ItemClass::InternetPassword,
            server: server.into(),
            account: None,
            match_limit: MatchLimit::One,
            return_attributes: true,
            return_data: true,
            context: None,
        }
    }

    pub fn with_limit(mut self, limit: MatchLimit) -> Self {
        self.match_limit = limit;
        self
    }

    pub fn attributes_only(mut self) -> Self {
        self.return_attributes = true;
        self.return_data = false;
        self
    }

    pub fn with_context(mut self, context: Arc<AuthContext>) -> Self {
        self.context = Some(context);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRequest {
    pub class: ItemClass,
    pub server: String,
    pub account: Option<String>,
}

impl DeleteRequest {
    pub fn internet_password(server: impl Into<String>) -> Self {
        Self {
            class: ItemClass::InternetPassword,
            server: server.into(),
            account: None,
        }
    }
}

/// One item returned by a read. Fields are present only if requested.
pub struct ItemMatch {
    pub account: Option<String>,
    pub server: Option<String>,
    pub access: Option<AccessControl>,
    pub data: Option<Zeroizing<Vec<u8>>>,
}

impl fmt::Debug for ItemMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemMatch")
            .field("account", &self.account)
            .field("server", &self.server)
            .field("access", &self.access)
            .field("data", &self.data.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Result shape follows the match limit: `One` yields `Single`, `All` yields `Multiple`.
#[derive(Debug)]
pub enum ReadResult {
    Single(ItemMatch),
    Multiple(Vec<ItemMatch>),
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_read_request_shape() {
        let req = ReadRequest::internet_password("www.example.com");
        assert_eq!(req.match_limit, MatchLimit::One);
        assert!(req.return_attributes);
        assert!(req.return_data);
        assert!(req.context.is_none());
    }

    #[test]
    fn test_add_request_debug_redacts_secret() {
        let req = AddRequest::internet_password(
            "appleseed",
            "www.example.com",
            b"1234".to_vec(),
            AccessControl::user_presence(),
        );
        let out = format!("{:?}", req);
        assert!(out.contains("[REDACTED]"));
        assert!(!out.contains("1234"));
    }

    #[test]
    fn test_item_match_debug_redacts_data() {
        let m = ItemMatch {
            account: Some("appleseed".to_string()),
            server: None,
            access: None,
            data: Some(Zeroizing::new(b"hunter2".to_vec())),
        };
        let out = format!("{:?}", m);
        assert!(!out.contains("hunter2"));
        assert!(out.contains("appleseed"));
    }
}
