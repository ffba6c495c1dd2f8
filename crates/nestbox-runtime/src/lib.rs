//! Launch lifecycle for the nestbox runtime.
//!
//! Two roles share this crate and the same executable:
//! - [`supervisor`] creates the namespaced child by re-executing the
//!   running binary, then mirrors its exit status.
//! - [`bootstrap`] runs inside the new namespaces, finishes setup in a fixed
//!   order and runs the target command.

#![allow(unsafe_code)]
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod bootstrap;
pub mod process;
pub mod supervisor;
