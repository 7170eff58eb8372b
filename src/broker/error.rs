// keygate — Broker error types

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Authentication failed")]
    Failed,

    #[error("Authentication canceled by the user")]
    UserCancel,

    #[error("Authentication requires interaction, which the request disallows")]
    NotInteractive,

    #[error("Authentication not available: {0}")]
    NotAvailable(String),
}
