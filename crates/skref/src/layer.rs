//! Physics layer tags.
//!
//! Every entity carries one [`Layer`]. Controllers decide what may block them
//! by masking layers, which is an O(1) bit test instead of asking what kind of
//! controller another entity runs.

use std::fmt;
use std::ops::BitOr;

/// A set of physics layers, stored as a bitmask.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Layer(u32);

impl Layer {
    pub const NONE: Layer = Layer(0);
    /// Walls, props, terrain.
    pub const STATIC: Layer = Layer(1 << 0);
    /// The player-driven entity.
    pub const PLAYER: Layer = Layer(1 << 1);
    /// Autonomous movers (enemies, NPCs).
    pub const MOVER: Layer = Layer(1 << 2);
    /// Collectibles.
    pub const PICKUP: Layer = Layer(1 << 3);

    const NAMED: [(&'static str, Layer); 4] = [
        ("static", Layer::STATIC),
        ("player", Layer::PLAYER),
        ("mover", Layer::MOVER),
        ("pickup", Layer::PICKUP),
    ];

    pub fn bits(self) -> u32 {
        self.0
    }

    /// Every bit of `other` is set in `self`.
    pub fn contains(self, other: Layer) -> bool {
        self.0 & other.0 == other.0
    }

    /// At least one bit is shared.
    pub fn intersects(self, other: Layer) -> bool {
        self.0 & other.0 != 0
    }

    /// Look up a single layer by its lowercase name, as used in level files.
    pub fn from_name(name: &str) -> Option<Layer> {
        Self::NAMED
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, layer)| *layer)
    }
}

impl BitOr for Layer {
    type Output = Layer;

    fn bitor(self, rhs: Layer) -> Layer {
        Layer(self.0 | rhs.0)
    }
}

impl fmt::Debug for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Self::NAMED
            .iter()
            .filter(|(_, layer)| self.intersects(*layer))
            .map(|(name, _)| *name)
            .collect();
        write!(f, "Layer({})", names.join("|"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_combine() {
        let mask = Layer::PLAYER | Layer::MOVER;
        assert!(mask.contains(Layer::MOVER));
        assert!(!mask.contains(Layer::STATIC));
        assert!(mask.intersects(Layer::PLAYER | Layer::STATIC));
        assert!(!Layer::NONE.intersects(mask));
    }

    #[test]
    fn names_round_trip() {
        assert_eq!(Layer::from_name("pickup"), Some(Layer::PICKUP));
        assert_eq!(Layer::from_name("ghost"), None);
        assert_eq!(format!("{:?}", Layer::STATIC | Layer::MOVER), "Layer(static|mover)");
    }
}
