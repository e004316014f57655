//! # stevedore-runbook
//!
//! Builds the command lines an operator would run against a resolved
//! compose document: the orchestration tool's `up`/`down` and the MongoDB
//! dump/restore tools executed inside the database container.
//!
//! Nothing here spawns a process. Each operation returns an
//! [`Invocation`] that can be printed (with secrets masked) or handed to a
//! process runner through [`Invocation::argv`].

pub mod dump;
pub mod error;
pub mod invocation;
pub mod orchestration;

pub use dump::{DumpOp, dump_restore};
pub use error::RunbookError;
pub use invocation::{Arg, Invocation};
pub use orchestration::{Verb, container_name, orchestration, project_name};
