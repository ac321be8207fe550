//! Multi-part collision boxes.

use super::Aabb;

/// A set of boxes treated as one physical shape, with cached bounds.
///
/// Bounds are recomputed on every [`push`](Self::push), never lazily, so
/// reading them is free during collision queries.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeAabb<const N: usize> {
    parts: Vec<Aabb<N>>,
    bounds: Aabb<N>,
}

impl<const N: usize> CompositeAabb<N> {
    pub fn new() -> Self {
        Self {
            parts: Vec::new(),
            bounds: Aabb::ZERO,
        }
    }

    pub fn from_parts(parts: impl IntoIterator<Item = Aabb<N>>) -> Self {
        let mut composite = Self::new();
        for part in parts {
            composite.push(part);
        }
        composite
    }

    pub fn push(&mut self, part: Aabb<N>) {
        self.bounds = if self.parts.is_empty() {
            part
        } else {
            self.bounds.union(&part)
        };
        self.parts.push(part);
    }

    pub fn parts(&self) -> &[Aabb<N>] {
        &self.parts
    }

    /// Smallest box containing every part. Zero when empty.
    pub fn bounds(&self) -> Aabb<N> {
        self.bounds
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Whether any part overlaps `other`.
    pub fn overlaps(&self, other: &Aabb<N>) -> bool {
        self.bounds.overlaps(other) && self.parts.iter().any(|p| p.overlaps(other))
    }

    pub fn translate(&self, by: &Aabb<N>) -> Self {
        Self {
            parts: self.parts.iter().map(|p| p.translate(by)).collect(),
            bounds: self.bounds.translate(by),
        }
    }

    pub fn round(&self, digits: u32) -> Self {
        Self::from_parts(self.parts.iter().map(|p| p.round(digits)))
    }
}

impl<const N: usize> Default for CompositeAabb<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Collision geometry of an entity: one box or several.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape<const N: usize> {
    Single(Aabb<N>),
    Composite(CompositeAabb<N>),
}

impl<const N: usize> Shape<N> {
    pub fn parts(&self) -> &[Aabb<N>] {
        match self {
            Shape::Single(b) => std::slice::from_ref(b),
            Shape::Composite(c) => c.parts(),
        }
    }

    pub fn bounds(&self) -> Aabb<N> {
        match self {
            Shape::Single(b) => *b,
            Shape::Composite(c) => c.bounds(),
        }
    }

    pub fn overlaps_box(&self, other: &Aabb<N>) -> bool {
        match self {
            Shape::Single(b) => b.overlaps(other),
            Shape::Composite(c) => c.overlaps(other),
        }
    }

    /// Any part of `self` overlaps any part of `other`.
    pub fn overlaps(&self, other: &Shape<N>) -> bool {
        other.parts().iter().any(|p| self.overlaps_box(p))
    }

    pub fn translate(&self, by: &Aabb<N>) -> Self {
        match self {
            Shape::Single(b) => Shape::Single(b.translate(by)),
            Shape::Composite(c) => Shape::Composite(c.translate(by)),
        }
    }

    pub fn round(&self, digits: u32) -> Self {
        match self {
            Shape::Single(b) => Shape::Single(b.round(digits)),
            Shape::Composite(c) => Shape::Composite(c.round(digits)),
        }
    }
}

impl<const N: usize> From<Aabb<N>> for Shape<N> {
    fn from(b: Aabb<N>) -> Self {
        Shape::Single(b)
    }
}

impl<const N: usize> From<CompositeAabb<N>> for Shape<N> {
    fn from(c: CompositeAabb<N>) -> Self {
        Shape::Composite(c)
    }
}
