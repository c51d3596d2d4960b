#![doc = include_str!("../README.md")]

/// Collaborator contracts for credential checks and maildrop access
pub mod backend;
mod command;
mod config;
mod error;
/// In-memory collaborators for tests and single-process deployments
pub mod memory;
mod server;
mod session;
mod wire;

pub use backend::{Authorizer, Backend};
pub use command::{Command, Request, UnknownCommand};
pub use config::Config;
pub use error::{BackendError, Pop3Error, Result};
pub use memory::{MemoryAuthorizer, MemoryBackend};
pub use server::Pop3Server;
pub use session::{Phase, Session};
pub use wire::Printer;
