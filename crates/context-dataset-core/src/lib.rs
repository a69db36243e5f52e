//! # Context Dataset Core
//!
//! Pure logic for turning an agent action log into retrieval-evaluation
//! datasets: data models, case splitting, unified-diff parsing, evidence
//! extraction, golden-first ranking, base-commit derivation, and the
//! action-log store abstraction.
//!
//! This crate contains no tokio, sqlx, filesystem I/O, or subprocess
//! calls. Revision lookups go through [`commit::RevParse`] and log reads
//! through [`store::ActionLogStore`], both implemented by the app crate.

pub mod case;
pub mod commit;
pub mod diff;
pub mod extract;
pub mod models;
pub mod rank;
pub mod store;
pub mod tool_args;
