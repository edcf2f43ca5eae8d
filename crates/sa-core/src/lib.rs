//! Core types, errors, and utilities for the route monitor.
//!
//! This crate provides the foundational pieces shared across the workspace:
//!
//! - The resource model ([`TreeResource`] and its concrete kinds) with
//!   deterministic, location-derived identifiers
//! - The [`ResourceManager`], an identity-keyed store that the route
//!   extractor populates during an analysis pass
//! - Path helpers anchored on the project root
//! - Configuration structures and project (`tsconfig.json`) discovery
//! - Type aliases for `FxHashMap`/`FxHashSet`
//!
//! # Crate Dependencies
//!
//! ```text
//! sa-cli ──► sa-monitor ──► sa-ts-parser ──► sa-core
//!                       └─► sa-watcher ─────► sa-core
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod hash;
pub mod manager;
pub mod paths;
pub mod project;
pub mod resource;

pub use config::{Config, MonitorConfig, ReadinessConfig, WatchConfig};
pub use error::{ConfigError, ResourceError};
pub use hash::{FxHashMap, FxHashSet, content_hash};
pub use manager::{DecodedId, IdKey, ResourceManager};
pub use project::ProjectConfig;
pub use resource::{
    Id, Location, MiddlewareEntry, MiddlewareEntryId, MiddlewareEntryProps, ModuleReference,
    ModuleReferenceId, ModuleReferenceProps, Resource, ResourceProps, ResourceType, RouteEntry,
    RouteEntryId, RouteEntryProps, RouteTree, RouteTreeEntry, RouteTreeId, RouteTreeProps,
    RouteTreeReference, RouteTreeReferenceId, RouteTreeReferenceProps, SourceReference,
    SourceReferenceId, SourceReferenceProps, TreeResource, TreeResourceId,
};
