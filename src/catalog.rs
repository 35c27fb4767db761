//! Name-catalog membership checks.
//!
//! The runtime reports what it supports (layers, instance extensions,
//! device extensions) as flat name lists; callers request names the same
//! way. Everything here is an exact-match linear scan; the catalogs are
//! tens of entries, never worth indexing.

/// Returns the first requested name missing from `supported`, or `None`
/// when every requested name is present.
///
/// Comparison is exact equality; Vulkan names are case-sensitive ASCII.
pub fn missing_name<'a, T, U>(requested: &'a [T], supported: &[U]) -> Option<&'a T>
where
    T: PartialEq<U>,
{
    requested
        .iter()
        .find(|name| !supported.iter().any(|have| *name == have))
}

/// True when every requested name is present in `supported`.
pub fn supports_all<T, U>(requested: &[T], supported: &[U]) -> bool
where
    T: PartialEq<U>,
{
    missing_name(requested, supported).is_none()
}
