//! Resource kinds and identifiers.
//!
//! Every resource is keyed by a [`TreeResourceId`], a string of the form
//! `{TYPE}:{encoded-file-or-import-path}@{position-or-import-name}`. The
//! typed wrapper [`Id<R>`] carries the expected resource kind statically so
//! lookups through the manager can return the concrete record type.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::Resource;

/// The kind of a stored resource.
///
/// Serializes in `SCREAMING_SNAKE_CASE`, which is also the prefix used in
/// resource identifiers.
///
/// # Examples
///
/// ```
/// use sa_core::ResourceType;
///
/// assert_eq!(ResourceType::RouteEntry.as_str(), "ROUTE_ENTRY");
/// assert_eq!(ResourceType::parse("MODULE_REFERENCE"), Some(ResourceType::ModuleReference));
/// assert_eq!(ResourceType::parse("ROUTE"), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceType {
    /// A mounted application or router.
    RouteTree,
    /// A single HTTP route registration.
    RouteEntry,
    /// A registered middleware.
    MiddlewareEntry,
    /// A location in source plus the modules it uses.
    SourceReference,
    /// An imported symbol, keyed by import path and name.
    ModuleReference,
    /// A mount of one route tree inside another.
    RouteTreeReference,
}

impl ResourceType {
    /// All resource kinds, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::RouteTree,
        Self::RouteEntry,
        Self::MiddlewareEntry,
        Self::SourceReference,
        Self::ModuleReference,
        Self::RouteTreeReference,
    ];

    /// Returns the identifier prefix for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RouteTree => "ROUTE_TREE",
            Self::RouteEntry => "ROUTE_ENTRY",
            Self::MiddlewareEntry => "MIDDLEWARE_ENTRY",
            Self::SourceReference => "SOURCE_REFERENCE",
            Self::ModuleReference => "MODULE_REFERENCE",
            Self::RouteTreeReference => "ROUTE_TREE_REFERENCE",
        }
    }

    /// Parses an identifier prefix.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == s)
    }

    /// Returns `true` for kinds identified by `(file, position)`.
    ///
    /// These make up the local-file-resource view. Only module references
    /// are identified by import path and name instead.
    #[inline]
    #[must_use]
    pub const fn is_located(self) -> bool {
        !matches!(self, Self::ModuleReference)
    }

    /// Returns `true` for kinds that can appear in a route tree's entry list.
    #[inline]
    #[must_use]
    pub const fn is_route_tree_entry(self) -> bool {
        matches!(
            self,
            Self::RouteEntry | Self::MiddlewareEntry | Self::RouteTreeReference
        )
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An untyped resource identifier.
///
/// Identifiers are derived by the [`ResourceManager`](crate::ResourceManager)
/// and never generated randomly; deriving the same key twice always yields
/// the same identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TreeResourceId(String);

impl TreeResourceId {
    /// Wraps a raw identifier string without validating it.
    ///
    /// Lookups with a malformed identifier simply find nothing.
    #[inline]
    #[must_use]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the identifier as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the resource kind encoded in the identifier prefix, if valid.
    #[must_use]
    pub fn resource_type(&self) -> Option<ResourceType> {
        let (prefix, _) = self.0.split_once(':')?;
        ResourceType::parse(prefix)
    }
}

impl fmt::Display for TreeResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TreeResourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<R> From<Id<R>> for TreeResourceId {
    fn from(id: Id<R>) -> Self {
        id.raw
    }
}

/// A resource identifier tagged with the kind of resource it names.
///
/// `Id<R>` is a zero-cost wrapper over [`TreeResourceId`]; the marker only
/// exists at compile time. Trait impls are written by hand so that they do
/// not require `R` itself to implement them.
pub struct Id<R> {
    raw: TreeResourceId,
    kind: PhantomData<fn() -> R>,
}

impl<R> Id<R> {
    pub(crate) fn new_unchecked(raw: TreeResourceId) -> Self {
        Self {
            raw,
            kind: PhantomData,
        }
    }

    /// Returns the untyped identifier.
    #[inline]
    #[must_use]
    pub fn as_untyped(&self) -> &TreeResourceId {
        &self.raw
    }

    /// Returns the identifier as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.raw.as_str()
    }
}

impl<R: Resource> Id<R> {
    /// Converts an untyped identifier, checking that its prefix names `R`.
    ///
    /// # Examples
    ///
    /// ```
    /// use sa_core::{RouteEntryId, RouteTreeId, TreeResourceId};
    ///
    /// let raw = TreeResourceId::from_raw("ROUTE_TREE:src%2Findex.ts@10");
    /// assert!(RouteTreeId::from_untyped(raw.clone()).is_some());
    /// assert!(RouteEntryId::from_untyped(raw).is_none());
    /// ```
    #[must_use]
    pub fn from_untyped(raw: TreeResourceId) -> Option<Self> {
        (raw.resource_type() == Some(R::TYPE)).then(|| Self::new_unchecked(raw))
    }
}

impl<R> Clone for Id<R> {
    fn clone(&self) -> Self {
        Self::new_unchecked(self.raw.clone())
    }
}

impl<R> PartialEq for Id<R> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<R> Eq for Id<R> {}

impl<R> PartialOrd for Id<R> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<R> Ord for Id<R> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl<R> Hash for Id<R> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<R> fmt::Debug for Id<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.raw)
    }
}

impl<R> fmt::Display for Id<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.raw, f)
    }
}

impl<R> PartialEq<TreeResourceId> for Id<R> {
    fn eq(&self, other: &TreeResourceId) -> bool {
        &self.raw == other
    }
}

impl<R> Serialize for Id<R> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

impl<'de, R: Resource> Deserialize<'de> for Id<R> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = TreeResourceId::deserialize(deserializer)?;
        Self::from_untyped(raw.clone()).ok_or_else(|| {
            serde::de::Error::custom(format_args!("expected a {} id, got '{raw}'", R::TYPE))
        })
    }
}
