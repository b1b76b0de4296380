//! Static cosmetic catalog: the fixed set of acquirable items, their equip
//! slots, and the rarity tiers that drive gacha draw weights.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Equip slot on the pet. One item per slot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Hat,
    Face,
    Body,
}

impl Slot {
    pub const ALL: [Slot; 3] = [Slot::Hat, Slot::Face, Slot::Body];

    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::Hat => "hat",
            Slot::Face => "face",
            Slot::Body => "body",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Slot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hat" => Ok(Slot::Hat),
            "face" => Ok(Slot::Face),
            "body" => Ok(Slot::Body),
            other => Err(format!("unknown slot: '{}'", other)),
        }
    }
}

/// Rarity tier, ordered from most to least common.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum Rarity {
    N,
    R,
    Sr,
    Ssr,
}

impl Rarity {
    /// Draw weight for the gacha. Monotonic: rarer tiers get smaller weights.
    pub fn weight(&self) -> u32 {
        match self {
            Rarity::N => 75,
            Rarity::R => 18,
            Rarity::Sr => 6,
            Rarity::Ssr => 1,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Rarity::N => "N",
            Rarity::R => "R",
            Rarity::Sr => "SR",
            Rarity::Ssr => "SSR",
        }
    }
}

/// A catalog entry. Immutable reference data shared by every player.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct CosmeticItem {
    pub id: &'static str,
    pub name: &'static str,
    pub slot: Slot,
    pub rarity: Rarity,
    /// Emoji fallback used by text surfaces.
    pub icon: &'static str,
    /// Thumbnail asset path, relative to the asset root.
    pub image: &'static str,
}

/// The full item set. Draw order is fixed; `draw_gacha` iterates this
/// slice when converting a weighted roll into a pick.
pub const COSMETICS: [CosmeticItem; 7] = [
    CosmeticItem {
        id: "hat_leaf",
        name: "Leaf Hat",
        slot: Slot::Hat,
        rarity: Rarity::N,
        icon: "🍃",
        image: "items/hat_leaf.svg",
    },
    CosmeticItem {
        id: "hat_crown",
        name: "Little Crown",
        slot: Slot::Hat,
        rarity: Rarity::Sr,
        icon: "👑",
        image: "items/hat_crown.svg",
    },
    CosmeticItem {
        id: "hat_party",
        name: "Party Hat",
        slot: Slot::Hat,
        rarity: Rarity::R,
        icon: "🥳",
        image: "items/hat_party.svg",
    },
    CosmeticItem {
        id: "face_star",
        name: "Sparkle Sticker",
        slot: Slot::Face,
        rarity: Rarity::N,
        icon: "✨",
        image: "items/face_star.svg",
    },
    CosmeticItem {
        id: "face_sunglasses",
        name: "Sunglasses",
        slot: Slot::Face,
        rarity: Rarity::Sr,
        icon: "🕶️",
        image: "items/face_sunglasses.svg",
    },
    CosmeticItem {
        id: "body_cape",
        name: "Cape",
        slot: Slot::Body,
        rarity: Rarity::R,
        icon: "🧣",
        image: "items/body_cape.svg",
    },
    CosmeticItem {
        id: "body_armor",
        name: "Mini Armor",
        slot: Slot::Body,
        rarity: Rarity::Ssr,
        icon: "🛡️",
        image: "items/body_armor.svg",
    },
];

/// Look up a catalog entry by its stable identifier.
pub fn find_item(id: &str) -> Option<&'static CosmeticItem> {
    COSMETICS.iter().find(|item| item.id == id)
}

/// Sum of all draw weights over the catalog.
pub fn total_weight() -> u32 {
    COSMETICS.iter().map(|item| item.rarity.weight()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_are_monotonic_by_rarity() {
        assert!(Rarity::N.weight() > Rarity::R.weight());
        assert!(Rarity::R.weight() > Rarity::Sr.weight());
        assert!(Rarity::Sr.weight() > Rarity::Ssr.weight());
    }

    #[test]
    fn catalog_ids_are_unique() {
        for (i, a) in COSMETICS.iter().enumerate() {
            for b in COSMETICS.iter().skip(i + 1) {
                assert_ne!(a.id, b.id);
            }
        }
    }

    #[test]
    fn every_slot_has_at_least_one_item() {
        for slot in Slot::ALL {
            assert!(COSMETICS.iter().any(|item| item.slot == slot));
        }
    }

    #[test]
    fn find_item_resolves_known_ids() {
        let crown = find_item("hat_crown").expect("hat_crown in catalog");
        assert_eq!(crown.slot, Slot::Hat);
        assert_eq!(crown.rarity, Rarity::Sr);
        assert!(find_item("no_such_item").is_none());
    }

    #[test]
    fn total_weight_matches_manual_sum() {
        let manual: u32 = COSMETICS.iter().map(|i| i.rarity.weight()).sum();
        assert_eq!(total_weight(), manual);
        assert_eq!(total_weight(), 199);
    }

    #[test]
    fn slot_parses_case_insensitively() {
        assert_eq!("HAT".parse::<Slot>().unwrap(), Slot::Hat);
        assert_eq!("body".parse::<Slot>().unwrap(), Slot::Body);
        assert!("hand".parse::<Slot>().is_err());
    }
}
