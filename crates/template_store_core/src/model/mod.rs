//! Legacy and declarative representations of notification templates.
//!
//! # Responsibility
//! - Define the legacy domain record owned by the template service.
//! - Define the declarative resource shape served through `Storage`.
//!
//! # Invariants
//! - A template is identified by `(org, name)` in the legacy shape and by
//!   `(namespace, name)` in the resource shape.

pub mod resource;
pub mod template;
