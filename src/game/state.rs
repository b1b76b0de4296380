//! State normalizer and economy core.
//!
//! Every function here is a pure transform: it takes a state snapshot and
//! returns a new, normalized one. The clock is injected as `now` and the
//! gacha RNG as a [`rand::Rng`] so the whole core stays deterministic under
//! test. Persistence is the caller's job ([`super::storage`]).
//!
//! There are no error paths. Affordability and ownership are precondition
//! contracts checked by callers ([`can_afford`], [`owned_count`]); violating
//! them clamps at the invariant boundary instead of failing.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde_json::json;
use uuid::Uuid;

use super::catalog::{CosmeticItem, Slot, COSMETICS};
use super::types::{
    Currency, CurrencyDelta, Equipped, GachaRecord, PlayerState, Tx, TxKind, CURRENCY_MAX,
    GACHA_HISTORY_LIMIT, ITEM_COUNT_MAX, LEDGER_LIMIT,
};

// ============================================================================
// Normalization
// ============================================================================

/// Produce the canonical form of any candidate state: currencies clamped,
/// zero-count inventory entries pruned, empty-string loadout slots cleared,
/// history and ledger truncated to their newest entries, `updated_at` set
/// to `now`.
///
/// Idempotent for a fixed `now`: `normalize(&normalize(s, t), t) ==
/// normalize(s, t)`. Every mutating function in this module returns through
/// here, so callers never observe a non-canonical state.
pub fn normalize(state: &PlayerState, now: DateTime<Utc>) -> PlayerState {
    let currency = Currency {
        gold: state.currency.gold.clamp(0, CURRENCY_MAX),
        gems: state.currency.gems.clamp(0, CURRENCY_MAX),
    };

    let mut owned = HashMap::new();
    for (item_id, count) in &state.owned {
        let n = (*count).clamp(0, ITEM_COUNT_MAX);
        if n > 0 {
            owned.insert(item_id.clone(), n);
        }
    }

    let equipped = Equipped {
        hat: clean_slot(&state.equipped.hat),
        face: clean_slot(&state.equipped.face),
        body: clean_slot(&state.equipped.body),
    };

    PlayerState {
        currency,
        owned,
        equipped,
        gacha_history: tail(&state.gacha_history, GACHA_HISTORY_LIMIT),
        ledger: tail(&state.ledger, LEDGER_LIMIT),
        mission_claimed: state.mission_claimed.clone(),
        updated_at: Some(now),
    }
}

fn clean_slot(slot: &Option<String>) -> Option<String> {
    slot.as_ref().filter(|id| !id.is_empty()).cloned()
}

/// Keep the newest `limit` entries (append order is chronological).
pub(crate) fn tail<T: Clone>(items: &[T], limit: usize) -> Vec<T> {
    items[items.len().saturating_sub(limit)..].to_vec()
}

// ============================================================================
// Economy operations
// ============================================================================

/// True iff every balance covers the corresponding cost field.
pub fn can_afford(state: &PlayerState, cost: &CurrencyDelta) -> bool {
    state.currency.gold >= cost.gold && state.currency.gems >= cost.gems
}

/// Owned count for an item, 0 when absent.
pub fn owned_count(state: &PlayerState, item_id: &str) -> i64 {
    state.owned.get(item_id).copied().unwrap_or(0)
}

/// Subtract `cost` from the balances. Does not enforce affordability;
/// callers gate on [`can_afford`], and a violation clamps at 0.
pub fn spend(state: &PlayerState, cost: &CurrencyDelta, now: DateTime<Utc>) -> PlayerState {
    let mut next = state.clone();
    next.currency.gold = next.currency.gold.saturating_sub(cost.gold);
    next.currency.gems = next.currency.gems.saturating_sub(cost.gems);
    normalize(&next, now)
}

/// Add `max(1, count)` units of an item to the owned map.
pub fn grant(state: &PlayerState, item_id: &str, count: i64, now: DateTime<Utc>) -> PlayerState {
    let mut next = state.clone();
    let slot = next.owned.entry(item_id.to_string()).or_insert(0);
    *slot = slot.saturating_add(count.max(1));
    normalize(&next, now)
}

/// Remove `max(1, count)` units of an item, flooring at 0. Removing more
/// than is owned is not an error; the entry is simply pruned.
pub fn take(state: &PlayerState, item_id: &str, count: i64, now: DateTime<Utc>) -> PlayerState {
    let mut next = state.clone();
    let current = next.owned.get(item_id).copied().unwrap_or(0);
    let remaining = current.saturating_sub(count.max(1)).max(0);
    if remaining > 0 {
        next.owned.insert(item_id.to_string(), remaining);
    } else {
        next.owned.remove(item_id);
    }
    normalize(&next, now)
}

/// Set or clear a loadout slot. Ownership is not verified here; the
/// presentation layer only offers owned items.
pub fn equip(
    state: &PlayerState,
    slot: Slot,
    item_id: Option<&str>,
    now: DateTime<Utc>,
) -> PlayerState {
    let mut next = state.clone();
    next.equipped.set(slot, item_id.map(str::to_string));
    normalize(&next, now)
}

/// [`equip`] plus an `equip_change` ledger entry.
pub fn equip_with_tx(
    state: &PlayerState,
    slot: Slot,
    item_id: Option<&str>,
    now: DateTime<Utc>,
) -> PlayerState {
    let next = equip(state, slot, item_id, now);
    record_tx(
        &next,
        TxKind::EquipChange,
        CurrencyDelta::ZERO,
        Some(json!({ "slot": slot.as_str(), "item_id": item_id })),
        now,
    )
}

/// Append a ledger entry with a fresh id. Never touches balances or
/// inventory; callers compose this after the mutating call it describes.
pub fn record_tx(
    state: &PlayerState,
    kind: TxKind,
    delta: CurrencyDelta,
    meta: Option<serde_json::Value>,
    now: DateTime<Utc>,
) -> PlayerState {
    let mut next = state.clone();
    next.ledger.push(Tx {
        id: Uuid::new_v4().to_string(),
        at: now,
        kind,
        delta,
        meta,
    });
    normalize(&next, now)
}

// ============================================================================
// Gacha
// ============================================================================

/// Draw one item from the catalog, weighted by rarity (inverse-CDF over the
/// fixed catalog order). Grants the item and appends a history record.
///
/// Does not charge or ledger anything; callers wrap with [`spend`] and
/// [`record_tx`] (see `shop::open_gacha`).
pub fn draw_gacha<R: Rng>(
    state: &PlayerState,
    rng: &mut R,
    now: DateTime<Utc>,
) -> (PlayerState, &'static CosmeticItem) {
    let total: u32 = COSMETICS.iter().map(|item| item.rarity.weight()).sum();
    let mut roll = rng.gen_range(0..total) as i64;
    let mut pick = &COSMETICS[0];
    for item in COSMETICS.iter() {
        roll -= item.rarity.weight() as i64;
        if roll < 0 {
            pick = item;
            break;
        }
    }

    let mut next = grant(state, pick.id, 1, now);
    next.gacha_history.push(GachaRecord {
        at: now,
        item_id: pick.id.to_string(),
    });
    (normalize(&next, now), pick)
}

// ============================================================================
// Missions
// ============================================================================

/// Local date key ("YYYY-MM-DD") used for daily mission claims.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Whether a mission was already claimed on the given day.
pub fn mission_claimed_on(state: &PlayerState, mission_id: &str, date: NaiveDate) -> bool {
    state.mission_claimed.get(mission_id) == Some(&date_key(date))
}

/// Claim a daily mission reward at most once per local day. A repeat claim
/// on the same day returns the state unchanged (no reward, no ledger entry).
pub fn claim_mission(
    state: &PlayerState,
    mission_id: &str,
    reward: &CurrencyDelta,
    now: DateTime<Utc>,
) -> PlayerState {
    let today = now.date_naive();
    if mission_claimed_on(state, mission_id, today) {
        return state.clone();
    }
    let mut next = state.clone();
    next.currency.gold = next.currency.gold.saturating_add(reward.gold);
    next.currency.gems = next.currency.gems.saturating_add(reward.gems);
    next.mission_claimed
        .insert(mission_id.to_string(), date_key(today));
    let next = normalize(&next, now);
    record_tx(
        &next,
        TxKind::MissionReward,
        *reward,
        Some(json!({ "mission_id": mission_id })),
        now,
    )
}
