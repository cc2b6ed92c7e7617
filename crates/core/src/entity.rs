//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Species, variations, lots and sales are all entities: a lot whose remaining
/// weight shrinks is still the same lot.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
