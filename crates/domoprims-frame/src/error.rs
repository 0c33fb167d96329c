use crate::codes::Command;

/// Errors that can occur while encoding outgoing telegrams.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The command has no outgoing payload table (only GET/SET/LOG do).
    #[error("command {0:?} cannot be encoded as an outgoing telegram")]
    UnsupportedCommand(Command),

    /// A payload slot required by the command is missing.
    #[error("telegram is missing {field} required for {command:?}")]
    MissingField {
        command: Command,
        field: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, FrameError>;
