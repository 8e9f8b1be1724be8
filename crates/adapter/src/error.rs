use thiserror::Error;

use crate::protocol::ErrorCode;

/// A `command` message that is well-formed JSON but not a valid game command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("select requires a card id")]
    MissingCard,
    #[error("card id {0} is out of range")]
    CardOutOfRange(u64),
    #[error("restart does not take a card id")]
    UnexpectedCard,
}

impl CommandError {
    pub fn code(&self) -> ErrorCode {
        ErrorCode::InvalidCommand
    }
}
