//! The resource model.
//!
//! Resources are the artifacts of one analysis pass: route trees, the route
//! and middleware entries registered on them, mounts between trees, handler
//! source locations and the imported modules those handlers use.
//!
//! - [`id`] - Resource kinds and (typed) identifiers
//! - [`types`] - The concrete records and the [`TreeResource`] union
//! - [`props`] - Creation properties consumed by the resource manager

pub mod id;
pub mod props;
pub mod types;

pub use id::{Id, ResourceType, TreeResourceId};
pub use props::{
    MiddlewareEntryProps, ModuleReferenceProps, ResourceProps, RouteEntryProps, RouteTreeProps,
    RouteTreeReferenceProps, SourceReferenceProps,
};
pub use types::{
    Location, MiddlewareEntry, MiddlewareEntryId, ModuleReference, ModuleReferenceId, Resource,
    RouteEntry, RouteEntryId, RouteTree, RouteTreeEntry, RouteTreeId, RouteTreeReference,
    RouteTreeReferenceId, SourceReference, SourceReferenceId, TreeResource,
};
