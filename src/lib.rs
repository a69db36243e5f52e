//! # Context Dataset
//!
//! Mines the action logs of an AI development-task platform into
//! supervised datasets for evaluating context-retrieval agents.
//!
//! Every flow of a completed task is split into cases, one per approved
//! merge. For each case the pipeline records which files and lines were
//! actually changed (golden evidence, from the approved diff) next to what
//! the agent looked at along the way (secondary evidence, from its tool
//! calls), ranks golden evidence first, and pins the commit the work
//! started from.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌────────────────────────┐   ┌──────────────┐
//! │ Action log   │──▶│ Split · Extract · Rank │──▶│ JSONL A/B/C  │
//! │ (SQLite)     │   │ + git base commit      │   │ (append)     │
//! └──────────────┘   └────────────────────────┘   └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! ctxds init                              # create the action-log schema
//! ctxds extract --workspace ws-1          # append new cases
//! ctxds extract --workspace ws-1 --full   # rewrite all datasets
//! ctxds stats
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Action-log schema |
//! | [`sqlite_store`] | SQLite action-log store |
//! | [`git`] | `git rev-parse` subprocess |
//! | [`extractor`] | Workspace extraction orchestration |
//! | [`dataset`] | JSON Lines dataset files |
//! | [`extract_cmd`] | `ctxds extract` |
//! | [`progress`] | Progress reporting on stderr |
//! | [`stats`] | `ctxds stats` |
//!
//! The pure pipeline (models, case splitting, diff parsing, extraction,
//! ranking) lives in the `context_dataset_core` crate.

pub mod config;
pub mod dataset;
pub mod db;
pub mod extract_cmd;
pub mod extractor;
pub mod git;
pub mod migrate;
pub mod progress;
pub mod sqlite_store;
pub mod stats;
