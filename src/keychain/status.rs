// keygate — Item store status codes
//
// Every failure of the secure item store is one of these statuses. The
// numeric codes follow the platform Security framework so that values logged
// here can be compared against platform documentation.

use thiserror::Error;

/// A failed item-store operation, carrying a numeric status and a message.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum KeychainError {
    #[error("The specified item already exists in the keychain.")]
    DuplicateItem,

    #[error("The specified item could not be found in the keychain.")]
    ItemNotFound,

    #[error("The user name or passphrase you entered is not correct.")]
    AuthFailed,

    #[error("User canceled the operation.")]
    UserCanceled,

    #[error("User interaction is not allowed.")]
    InteractionNotAllowed,

    #[error("No keychain is available.")]
    NotAvailable,

    #[error("One or more parameters passed to a function were not valid.")]
    Param,

    #[error("Unable to decode the provided data.")]
    Decode,

    #[error("An internal error has occurred.")]
    InternalError,

    #[error("Unknown error (status {0}).")]
    Other(i32),
}

pub const ERR_SEC_DUPLICATE_ITEM: i32 = -25299;
pub const ERR_SEC_ITEM_NOT_FOUND: i32 = -25300;
pub const ERR_SEC_AUTH_FAILED: i32 = -25293;
pub const ERR_SEC_USER_CANCELED: i32 = -128;
pub const ERR_SEC_INTERACTION_NOT_ALLOWED: i32 = -25308;
pub const ERR_SEC_NOT_AVAILABLE: i32 = -25291;
pub const ERR_SEC_PARAM: i32 = -50;
pub const ERR_SEC_DECODE: i32 = -26275;
pub const ERR_SEC_INTERNAL_ERROR: i32 = -26276;

impl KeychainError {
    /// The numeric status code for this error.
    pub fn code(&self) -> i32 {
        match self {
            Self::DuplicateItem => ERR_SEC_DUPLICATE_ITEM,
            Self::ItemNotFound => ERR_SEC_ITEM_NOT_FOUND,
            Self::AuthFailed => ERR_SEC_AUTH_FAILED,
            Self::UserCanceled => ERR_SEC_USER_CANCELED,
            Self::InteractionNotAllowed => ERR_SEC_INTERACTION_NOT_ALLOWED,
            Self::NotAvailable => ERR_SEC_NOT_AVAILABLE,
            Self::Param => ERR_SEC_PARAM,
            Self::Decode => ERR_SEC_DECODE,
            Self::InternalError => ERR_SEC_INTERNAL_ERROR,
            Self::Other(code) => *code,
        }
    }

    /// Map a numeric status back to an error. Returns `None` for success (0).
    pub fn from_code(code: i32) -> Option<Self> {
        let err = match code {
            0 => return None,
            ERR_SEC_DUPLICATE_ITEM => Self::DuplicateItem,
            ERR_SEC_ITEM_NOT_FOUND => Self::ItemNotFound,
            ERR_SEC_AUTH_FAILED => Self::AuthFailed,
            ERR_SEC_USER_CANCELED => Self::UserCanceled,
            ERR_SEC_INTERACTION_NOT_ALLOWED => Self::InteractionNotAllowed,
            ERR_SEC_NOT_AVAILABLE => Self::NotAvailable,
            ERR_SEC_PARAM => Self::Param,
            ERR_SEC_DECODE => Self::Decode,
            ERR_SEC_INTERNAL_ERROR => Self::InternalError,
            other => Self::Other(other),
        };
        Some(err)
    }

    /// Human-readable message suitable for a status label.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
