// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Generational snapshot retention.
//!
//! `tiersnap-core` decides, for a chain of frequency tiers (`hourly` through
//! `yearly`), when a tier's pending slot is ready to roll up, what overflow to
//! discard, and which renames move every slot along. Snapshots live on a
//! [`SnapshotStore`] as directories named `<tier>.<index>`; the directory tree
//! is the only state, rebuilt into a [`SnapshotCollection`] at every step.
//!
//! # Self-healing
//!
//! Rotation re-attempts every tier on every run. A run killed between two
//! renames leaves a tree that the next run's cascade completes; nothing is
//! journaled and nothing needs to be.
//!
//! # Concurrency
//!
//! One run per snapshot root at a time. There is no lock: overlapping runs
//! against the same root are the caller's problem.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::module_name_repetitions,
    clippy::use_self,
    clippy::missing_errors_doc,
    clippy::doc_markdown,
    clippy::multiple_crate_versions
)]

pub mod calendar;
mod collection;
mod engine;
mod memory;
mod policy;
pub mod rotation;
mod snapshot;
mod store;
mod sync;
mod tier;

pub use collection::SnapshotCollection;
pub use engine::{collect, dry_run, Engine, RotationError, RotationReport};
pub use memory::MemoryStore;
pub use policy::{PolicyTable, TierPolicy, DEFAULT_LIMITS};
pub use rotation::{
    is_eligible, plan_tier, readiness, Readiness, StorageOp, TierOutcome, TierPlan,
};
pub use snapshot::{ParseError, SlotId, Snapshot};
pub use store::{Entry, SnapshotStore, StoreError};
pub use sync::{plan_sync, sync, SyncPlan, Transfer};
pub use tier::{SpacingUnit, Tier};
