/// PTY (Pseudo Terminal) handling for rs_tty
/// Allocation of the master/slave pair, shell launch, and window sizing
mod master;
mod native_pty_impl;
mod pty_trait;

// Export all public types and traits
pub use master::PtyMaster;
pub use native_pty_impl::{NativePtyFactory, PtyPair, allocate, launch};
pub use pty_trait::*;
