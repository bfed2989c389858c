//! # Lore Rules
//!
//! The "Rulebook" crate - the knowledge rules an author writes for a story,
//! and everything needed to keep them: validation, keyword parsing, the rule
//! store, and import/export. This crate holds no evaluation logic; deciding
//! which rules reach the narrator each turn lives in `injection_core`.

pub mod error;
pub mod interchange;
pub mod keywords;
pub mod rule;
pub mod store;

pub use error::*;
pub use interchange::*;
pub use keywords::*;
pub use rule::*;
pub use store::*;
