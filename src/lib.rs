//! # state-enforcer
//!
//! Compiles a declarative finite state model into guard code: which
//! functions may run in which state, and which transitions are legal.
//! Guards are emitted as a Java Card class, as a Rust file, or spliced
//! straight into a crate with [`state_model`].
//!
//! ## Example
//!
//! ```rust
//! use state_enforcer::{Rejection, state_model};
//!
//! #[state_model(yaml = "
//! states_transitions:
//!   Init:
//!     Activate: Active
//!   Active:
//!     Deactivate: Init
//! ")]
//! pub struct Door;
//!
//! let mut door = Door::new(Door::STATE_Init);
//! assert_eq!(door.check_allowed_function(Door::FNC_Activate), Ok(()));
//! assert_eq!(
//!     door.check_allowed_function(Door::FNC_Deactivate),
//!     Err(Rejection::FunctionNotAllowed)
//! );
//! door.change_state(Door::STATE_Active).unwrap();
//! ```

pub mod cli;

#[doc(inline)]
pub use state_enforcer_core::*;
#[doc(inline)]
pub use state_enforcer_macros::state_model;

/// The compiler behind the CLI and the macro.
pub use state_enforcer_codegen as codegen;
