//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Tire records keep their identity while their quantity changes; two records
/// with the same name and size are still distinct entities.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
