//! Data models for the club backend.
//!
//! Field names are camelCase on the wire to match the web front end.

mod member;
mod registration;
mod session;

pub use member::*;
pub use registration::*;
pub use session::*;
