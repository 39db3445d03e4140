//! Errors surfaced through the registry handle

use amm::AmmError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ActorError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActorError {
    /// The registry rejected the request
    #[error(transparent)]
    Amm(#[from] AmmError),

    #[error("registry actor mailbox is closed")]
    MailboxClosed,

    #[error("registry actor dropped the reply")]
    ReplyDropped,
}

impl ActorError {
    pub fn code(&self) -> &'static str {
        match self {
            ActorError::Amm(err) => err.code(),
            ActorError::MailboxClosed => "err_mailbox_closed",
            ActorError::ReplyDropped => "err_reply_dropped",
        }
    }
}
