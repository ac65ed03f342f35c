//! Record shapes exchanged with the remote platform.
//!
//! # Responsibility
//! - Define log rows, log ranges and storage listing entries.
//! - Keep wire naming (`timestamp`, `name`) aligned with the remote schema.
//!
//! # Invariants
//! - Log rows keep unknown columns verbatim; nothing is dropped on read.

pub mod log_row;
pub mod object_entry;
