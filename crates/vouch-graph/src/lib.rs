//! Vouch trust-graph core.
//!
//! Owns the two pieces of the marketplace with real invariants: the
//! invite -> connection pipeline (single-use codes, symmetric edges) and
//! the trade-eligibility classification (self / direct / second-degree,
//! bounded at exactly two hops). Storage lives elsewhere, behind the
//! `ConnectionReads` trait, so the same logic runs against SQLite in
//! production and a hash map in tests.

pub mod eligibility;
pub mod invite;

pub use eligibility::{ConnectionReads, Relation, Verdict, evaluate, reachable_within_two_hops};
pub use invite::{CODE_LEN, InviteError, MAX_CODE_ATTEMPTS, new_invite_code};
