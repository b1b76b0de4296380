//! Shop operations layered on the economy core: gem packs, gem-priced item
//! purchases, gem-to-gold exchange, and the gacha banner cost table.
//!
//! There is no real payment processing; gem packs credit instantly and the
//! KRW price is recorded in transaction metadata for display only.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use serde_json::json;

use super::catalog::CosmeticItem;
use super::state::{draw_gacha, grant, normalize, record_tx, spend};
use super::types::{CurrencyDelta, PlayerState, TxKind};

/// Gold credited per gem in the exchange.
pub const GOLD_PER_GEM: i64 = 500;

/// A purchasable gem bundle. `price_krw` is display-only.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct GemPack {
    pub id: &'static str,
    pub gems: i64,
    pub bonus: i64,
    pub price_krw: i64,
    pub popular: bool,
}

pub const GEM_PACKS: [GemPack; 6] = [
    GemPack { id: "gems_50", gems: 50, bonus: 0, price_krw: 1_100, popular: false },
    GemPack { id: "gems_120", gems: 120, bonus: 10, price_krw: 2_900, popular: false },
    GemPack { id: "gems_450", gems: 450, bonus: 50, price_krw: 9_900, popular: false },
    GemPack { id: "gems_1500", gems: 1500, bonus: 200, price_krw: 30_000, popular: false },
    GemPack { id: "gems_2600", gems: 2600, bonus: 400, price_krw: 50_000, popular: false },
    GemPack { id: "gems_5500", gems: 5500, bonus: 1000, price_krw: 99_000, popular: true },
];

pub fn find_gem_pack(id: &str) -> Option<&'static GemPack> {
    GEM_PACKS.iter().find(|pack| pack.id == id)
}

/// A gacha banner with its per-draw cost.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct GachaBanner {
    pub id: &'static str,
    pub name: &'static str,
    pub cost: CurrencyDelta,
}

pub const BANNERS: [GachaBanner; 3] = [
    GachaBanner {
        id: "standard",
        name: "Standard Box",
        cost: CurrencyDelta { gold: 100, gems: 0 },
    },
    GachaBanner {
        id: "premium",
        name: "Premium Box",
        cost: CurrencyDelta { gold: 0, gems: 10 },
    },
    GachaBanner {
        id: "special",
        name: "Special Box",
        cost: CurrencyDelta { gold: 200, gems: 0 },
    },
];

pub fn find_banner(id: &str) -> Option<&'static GachaBanner> {
    BANNERS.iter().find(|banner| banner.id == id)
}

/// Credit a gem pack (base + bonus) and ledger it as `shop_gem_pack`.
pub fn buy_gem_pack(state: &PlayerState, pack: &GemPack, now: DateTime<Utc>) -> PlayerState {
    let credited = pack.gems.saturating_add(pack.bonus);
    let mut next = state.clone();
    next.currency.gems = next.currency.gems.saturating_add(credited);
    let next = normalize(&next, now);
    record_tx(
        &next,
        TxKind::ShopGemPack,
        CurrencyDelta::gems(credited),
        Some(json!({ "product": pack.id, "price_krw": pack.price_krw })),
        now,
    )
}

/// Buy a catalog item from the shop for gems. Precondition: the caller
/// checked `can_afford(state, &CurrencyDelta::gems(price_gems))`.
pub fn buy_shop_item(
    state: &PlayerState,
    item_id: &str,
    price_gems: i64,
    now: DateTime<Utc>,
) -> PlayerState {
    let next = spend(state, &CurrencyDelta::gems(price_gems), now);
    let next = grant(&next, item_id, 1, now);
    record_tx(
        &next,
        TxKind::ShopItemBuy,
        CurrencyDelta::gems(-price_gems),
        Some(json!({ "item_id": item_id, "price_gems": price_gems })),
        now,
    )
}

/// Exchange gems for gold at [`GOLD_PER_GEM`]. Precondition: the caller
/// checked the gem balance covers `gems`.
pub fn exchange_gems_to_gold(state: &PlayerState, gems: i64, now: DateTime<Utc>) -> PlayerState {
    let gems = gems.max(1);
    let gold = gems.saturating_mul(GOLD_PER_GEM);
    let mut next = state.clone();
    next.currency.gems = next.currency.gems.saturating_sub(gems);
    next.currency.gold = next.currency.gold.saturating_add(gold);
    let next = normalize(&next, now);
    record_tx(
        &next,
        TxKind::ExchangeGemToGold,
        CurrencyDelta { gold, gems: -gems },
        None,
        now,
    )
}

/// The full paid draw: spend the banner cost, draw one item, and ledger a
/// `gacha_open` entry carrying the negated cost and the drawn item id.
/// Precondition: the caller checked `can_afford(state, cost)`.
pub fn open_gacha<R: Rng>(
    state: &PlayerState,
    cost: &CurrencyDelta,
    rng: &mut R,
    now: DateTime<Utc>,
) -> (PlayerState, &'static CosmeticItem) {
    let paid = spend(state, cost, now);
    let (drawn, item) = draw_gacha(&paid, rng, now);
    let next = record_tx(
        &drawn,
        TxKind::GachaOpen,
        cost.negated(),
        Some(json!({ "item_id": item.id })),
        now,
    );
    (next, item)
}
