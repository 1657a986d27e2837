//! Session error types

use thiserror::Error;

/// Why a question could not be answered.
#[derive(Debug, Error)]
pub enum AskError<E>
where
    E: std::error::Error + 'static,
{
    #[error("no conversation with id '{0}'")]
    UnknownEntry(String),

    #[error("document service failed: {0}")]
    Remote(#[source] E),
}

impl<E> AskError<E>
where
    E: std::error::Error + 'static,
{
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}
