//! Resource descriptors and tenant namespace mapping.
//!
//! # Responsibility
//! - Describe each served resource kind with an explicit `ResourceInfo`
//!   value passed to constructors.
//! - Map org ids to namespaces and back.

pub mod info;
pub mod namespace;
