//! # Transfer engine
//!
//! Staged host↔device copies across a Graphics pool and, where available, a
//! dedicated Transfer pool (spec §4.F): region compaction, claim/recycle,
//! and fence-gated staging buffer lifetimes.

mod engine;
mod error;
mod operation;
mod pool;
mod stage;

pub use engine::{CopyRegion, DeviceRef, PoolKind, TransferEngine, TransferFlags};
pub use error::{TransferError, TransferResult};
pub use stage::{compact_regions, CompactedRegion, StageRegion};
