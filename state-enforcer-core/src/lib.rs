//! Core runtime types for state-enforcer.
//!
//! Generated guard code and the compiler agree on everything in this crate:
//! the width of a code, the "unspecified state" sentinel and the status
//! words a guard signals when it rejects a request.

/// Numeric encoding of a state or function name.
///
/// Allocated codes live in `(0, 32767]`; the sentinel is negative.
pub type Code = i16;

/// Sentinel held by the state fields before the first explicit transition.
pub const STATE_UNSPECIFIED: Code = 0xF0F0_u16 as Code;

/// Reason a guard rejected a request.
///
/// Each variant maps onto a fixed ISO 7816 style status word so the same
/// values can be thrown from a Java Card applet or returned from Rust.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum Rejection {
    /// The function is known but the current state does not allow it.
    #[error("function not allowed in the current state")]
    FunctionNotAllowed,
    /// The current state value matches no state of the model.
    #[error("unknown state")]
    UnknownState,
    /// The requested function is not part of the model at all.
    #[error("unknown function")]
    UnknownFunction,
    /// The target state cannot be reached from the current state.
    #[error("incorrect state transition")]
    IncorrectStateTransition,
}

impl Rejection {
    /// All rejections in status word order.
    pub const ALL: [Rejection; 4] = [
        Rejection::FunctionNotAllowed,
        Rejection::UnknownState,
        Rejection::UnknownFunction,
        Rejection::IncorrectStateTransition,
    ];

    /// Status word signalled for this rejection.
    #[must_use]
    pub const fn status_word(self) -> u16 {
        match self {
            Self::FunctionNotAllowed => 0x9AF0,
            Self::UnknownState => 0x9AF1,
            Self::UnknownFunction => 0x9AF2,
            Self::IncorrectStateTransition => 0x9AF3,
        }
    }

    /// Maps a status word back onto its rejection.
    #[must_use]
    pub fn from_status_word(sw: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.status_word() == sw)
    }
}
