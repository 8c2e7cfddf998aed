//! Durable task identity across free-text edits.
//!
//! # Responsibility
//! - Map normalized task text to stable 8-character ids.
//! - Fuzzy-match edited text against previously seen text.
//! - Load and flush the side file holding the whole map.
//!
//! # Invariants
//! - The whole map is the unit of persistence; flush rewrites the file.
//! - A corrupt or unreadable side file yields an empty map, never an error.
//! - Within one parse, no two tasks receive the same id (see `resolve`).
//!
//! - Ids are lowercase hex; store lookups lowercase the caller's id.
//!
//! # Similarity
//! `similarity_ratio` is `2 * matched / (len(a) + len(b))` where `matched`
//! counts characters of an optimal (longest common subsequence) alignment
//! from `similar`'s Myers diff. On edits that keep word order this equals
//! the greedy longest-block ratio. On reordered text it can score higher,
//! so near the threshold it leans toward keeping an id rather than minting
//! a new one.
//!
//! # Scaling
//! Lookup on an exact miss is O(n) over every normalized text ever seen.

mod reconciler;

pub use reconciler::{
    normalize, similarity_ratio, IdentityError, IdentityMap, IdentityResult, ID_LENGTH,
    SIMILARITY_THRESHOLD,
};
