//! Local-first prompt management.
//!
//! Records are written to a durable [`storage::LocalStore`] first and then
//! mirrored, best effort, to a [`remote::RemoteMirror`]. [`state::PromptState`]
//! keeps one owner's records in memory and runs that write sequence;
//! [`api`] exposes it over HTTP together with the simulated refinement
//! endpoint in [`refine`].

pub mod api;
pub mod error;
pub mod models;
pub mod reconcile;
pub mod refine;
pub mod remote;
pub mod state;
pub mod storage;
pub mod text;

pub use error::{Error, Result};
pub use state::PromptState;
