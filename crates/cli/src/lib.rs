//! Line-oriented trading session: command parsing and reply rendering.

pub mod command;
pub mod session;

pub use command::{ParseCommandError, SessionCommand};
pub use session::{Session, SessionError};
