//! logoot-ldm - position algebra and merge engine for a Logoot-style list CRDT.
//!
//! This crate maintains the mapping between logical, replicated positions in
//! a sequence and local offsets into a materialized document. It does not
//! carry content, transport operations between replicas, or persist state;
//! it only computes the position algebra and the local edits that keep two
//! replicas converging.
//!
//! # Quick Start
//!
//! ```
//! use logoot_ldm::Doc;
//!
//! let mut doc = Doc::new();
//! let branch = doc.branch_of("alice");
//! let env = doc.insert_local(0, 3).unwrap();
//! let ops = doc.insert_logoot(branch, env.left, env.right, env.length, env.clk).unwrap();
//! assert_eq!(doc.local_len(), 3);
//! assert_eq!(ops.len(), 1);
//! ```

pub mod conflict;
pub mod doc;
pub mod error;
pub mod node;
pub mod op;
pub mod ost;
pub mod primitives;
pub mod slice;

pub use doc::Doc;
pub use error::LdmError;
pub use op::Operation;
