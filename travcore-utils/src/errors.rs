//! Errors produced while constructing or running a pass.
//!
//! Programming errors inside the traversal core itself (a busy node
//! re-entered by a pass that never overrode `loop_revisit`, a typed context
//! lookup for a type that isn't an ancestor, re-entering a paused split-flow
//! slot) are bugs in a pass, not user input, and are reported with `panic!`
//! rather than through this type -- see the core's design notes. `Error`
//! covers the two recoverable cases: pass construction failing and
//! diagnostics raised against the program being compiled.

use thiserror::Error as ThisError;

/// Convenience wrapper around a construction or diagnostic failure.
pub type TravResult<T> = std::result::Result<T, Error>;

#[derive(Clone, Debug, ThisError)]
pub enum Error {
    #[error("unknown pass option `{0}`")]
    UnknownOption(String),

    #[error("invalid value for pass option `{name}`: {msg}")]
    InvalidOption { name: String, msg: String },

    #[error("pass `{0}` failed to construct: {1}")]
    ConstructionFailed(String, String),

    #[error("{0}")]
    Misc(String),
}

impl Error {
    pub fn unknown_option<S: ToString>(name: S) -> Self {
        Error::UnknownOption(name.to_string())
    }

    pub fn invalid_option<S: ToString, M: ToString>(name: S, msg: M) -> Self {
        Error::InvalidOption {
            name: name.to_string(),
            msg: msg.to_string(),
        }
    }

    pub fn construction_failed<S: ToString, M: ToString>(
        pass: S,
        msg: M,
    ) -> Self {
        Error::ConstructionFailed(pass.to_string(), msg.to_string())
    }

    pub fn misc<S: ToString>(msg: S) -> Self {
        Error::Misc(msg.to_string())
    }
}
