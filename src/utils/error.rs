//! Error handling for harambec

use crate::utils::Pos;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal front-end error: anything that stops the pipeline before name
/// analysis. Name-analysis conditions are not errors in this sense; they
/// accumulate in the diagnostic sink and the walk continues.
#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("unexpected token: expected {expected}, got {got}")]
    UnexpectedToken {
        expected: String,
        got: String,
        pos: Pos,
    },

    #[error("expected {0}")]
    Expected(String, Pos),

    #[error("expected identifier")]
    ExpectedIdent { pos: Pos },

    #[error("expected type")]
    ExpectedType { pos: Pos },

    #[error("expected expression")]
    ExpectedExpr { pos: Pos },

    #[error("unrecognized character {ch:?}")]
    UnknownChar { ch: char, pos: Pos },
}

impl Error {
    /// Get the position associated with this error
    pub fn pos(&self) -> Pos {
        match self {
            Self::UnexpectedToken { pos, .. } => *pos,
            Self::Expected(_, pos) => *pos,
            Self::ExpectedIdent { pos } => *pos,
            Self::ExpectedType { pos } => *pos,
            Self::ExpectedExpr { pos } => *pos,
            Self::UnknownChar { pos, .. } => *pos,
        }
    }
}
