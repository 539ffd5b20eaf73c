//! Core data types for the hashgraph consensus engine.
//!
//! Focused on the signed, hashed, and encoded wire/storage representation
//! of peers, events, blocks and frames — the vocabulary the hashgraph
//! algorithm and the store operate on.
pub mod bincode;
pub mod block;
pub mod citem;
pub mod event;
pub mod frame;
pub mod hash;
pub mod peer;
pub mod peer_set;
pub mod round_info;
pub mod signed;
pub mod timestamp;

pub use hash::Hash32;
pub use signed::Signature;
