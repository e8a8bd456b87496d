//! Seek fixed-record dBase tables by record number or by key value.
//!
//! A dBase (`.dbf`) table is a fixed-length header followed by fixed-length records. This crate
//! reads such tables through a bounded window (memory mapped or buffered) that is re-acquired
//! whenever a requested record falls outside of it, and builds a value index over a single key
//! field so that a record can be located by the value it holds. The combination allows attribute
//! tables to be joined onto another dataset that shares the key.
//!
//! # Status
//!
//! `dbjoin-storage` is **ALPHA** software and is not yet recommended for production use. Developers
//! should expect breaking changes and occasional instability.

pub mod dbf;
pub mod table;
