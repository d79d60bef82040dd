//! Readability, exports and accessibility
//!
//! [`relations`] derives the three relations of a resolved graph, [`query`]
//! answers access questions against them.

pub mod query;
pub mod relations;

pub use query::{Access, AccessDenial, DenialReason, QueryService};
pub use relations::{Grant, PackageRelation, ReadabilityRelation, Relations};
