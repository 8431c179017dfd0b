//! Errors raised while reading RTF. Positions are byte offsets into the input.

use thiserror::Error;

pub type RtfResult<T> = Result<T, RtfError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RtfError {
    /// Input ended inside a control word or escape
    #[error("unexpected end of input at byte {0}")]
    UnexpectedEof(usize),

    /// `\'` not followed by two hex digits
    #[error("invalid hex escape at byte {0}")]
    InvalidHex(usize),

    #[error("invalid control word at byte {0}")]
    InvalidControlWord(usize),

    /// Input does not open with `{\rtf`
    #[error("missing {{\\rtf header")]
    MissingHeader,
}
