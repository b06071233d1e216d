//! # unistore-domain
//!
//! Pure domain model for the unistore versioned resource store.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Resources** (opaque payloads addressed by a namespace/group/resource/name key)
//! - Define **History entries** (immutable snapshots written at every version)
//! - Define **Watch events** (change notifications republished from the history)
//! - Define list/history paging requests and their opaque continuation tokens
//! - Contain all invariant enforcement (key validation, etag computation)
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod event;
pub mod history;
pub mod page;
pub mod request;
pub mod resource;
pub mod response;
