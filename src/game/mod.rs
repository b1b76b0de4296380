//! Virtual economy engine for the pet mini-game.
//!
//! Layered leaves-first: [`catalog`] is static reference data, [`types`]
//! holds the persisted data model, [`state`] is the normalizer and pure
//! economy core, [`shop`] and [`market`] compose it into shop and
//! marketplace operations, and [`storage`] persists the results in sled.
//! The pure layers never perform I/O; callers thread state snapshots
//! through and write back explicitly.

pub mod catalog;
pub mod errors;
pub mod market;
pub mod shop;
pub mod state;
pub mod storage;
pub mod types;

pub use catalog::{find_item, total_weight, CosmeticItem, Rarity, Slot, COSMETICS};
pub use errors::GameStoreError;
pub use market::{
    apply_buy, apply_cancel, apply_payout_claim, credit_payout, list_offer, truncate_offers,
    ListOutcome,
};
pub use shop::{
    buy_gem_pack, buy_shop_item, exchange_gems_to_gold, find_banner, find_gem_pack, open_gacha,
    GachaBanner, GemPack, BANNERS, GEM_PACKS, GOLD_PER_GEM,
};
pub use state::{
    can_afford, claim_mission, date_key, draw_gacha, equip, equip_with_tx, grant,
    mission_claimed_on, normalize, owned_count, record_tx, spend, take,
};
pub use storage::GameStore;
pub use types::{
    Currency, CurrencyDelta, Equipped, GachaRecord, MarketOffer, PlayerState, Tx, TxKind,
    CURRENCY_MAX, GACHA_HISTORY_LIMIT, ITEM_COUNT_MAX, LEDGER_LIMIT, OFFER_LIMIT, STARTING_GEMS,
    STARTING_GOLD,
};
