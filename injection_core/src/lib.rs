//! # Injection Core (The Injector)
//!
//! Decides, turn by turn, which author-written lore rules are appended to the
//! context sent to the narration service. This crate reads rule snapshots
//! from `lore_rules` and never mutates them.
//!
//! ## Core Components
//!
//! - **scan**: Gathers the recent text each rule is matched against
//! - **trigger**: Keyword matching and ANY/ALL/NOT_ALL/NOT_ANY logic
//! - **context_assembler**: Activation gate, budget allocation, and the
//!   per-turn `InjectionEngine`
//! - **config**: Engine settings, loadable from TOML
//!
//! ## Design Philosophy
//!
//! - **Snapshot-Driven**: Every turn evaluates one frozen view of the rules
//! - **Deterministic**: Randomness only enters through an injected `RollSource`
//! - **Forgiving**: Bad rules and odd text degrade to "contributes nothing"

pub mod config;
pub mod context_assembler;
pub mod error;
pub mod scan;
pub mod trigger;

pub use config::*;
pub use context_assembler::*;
pub use error::*;
pub use scan::*;
pub use trigger::*;
