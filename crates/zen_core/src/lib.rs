//! Core of the `zen` package manager.
//!
//! Packages are published from a local directory into the global store, after
//! which any other project can declare them as dependencies. Synchronizing a
//! project resolves every declaration against the store, follows the lock files
//! of published packages to find their own dependencies, and reconciles the
//! result against the lock file of the project.

pub mod cmd;
pub mod errors;
pub mod fs;
pub mod git;
pub mod home;
pub mod install;
pub mod lock;
pub mod manifest;
pub mod pack;
pub mod publish;
pub mod reconcile;
pub mod scripts;
pub mod session;
pub mod signature;
pub mod specifier;
pub mod store;
pub mod sync;
pub mod tree;
pub mod versions;

pub use manifest::Manifest;
pub use session::Session;
pub use specifier::{Specifier, SpecifierCache};
pub use store::GlobalStore;
