//! Shared value types used by the position algebra and merge engine.
//!
//! ## Numbers
//! - `BigInt`: arbitrary-precision signed integer, small-vector backed.
//! - `LogootInt`: value-semantics wrapper used for position atoms and clocks.
//!
//! ## Identity
//! - `BranchRank` / `BranchOrder`: opaque branch ids mapped to a stable rank.
//!
//! ## Positions
//! - `LogootPosition`: a variable-length, branch-tagged lexicographic key.
//! - `Position`: `LogootPosition` plus the `DocStart`/`DocEnd` sentinels.

pub mod bigint;
pub mod branch;
pub mod logoot_int;
pub mod position;

pub use bigint::BigInt;
pub use branch::{BranchOrder, BranchRank};
pub use logoot_int::LogootInt;
pub use position::{new_between, new_between_ranked, LogootPosition, Position};
