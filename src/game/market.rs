//! Marketplace core: pure transforms for listing, buying, and cancelling
//! offers, plus the seller payout ledger.
//!
//! These functions only compute new values; the ordered persistence of the
//! player write and the shared offers/payouts writes lives in
//! [`super::storage`], so a hardened store can add version checks on the
//! shared collection without touching this logic.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use super::state::{grant, normalize, record_tx, tail, take};
use super::types::{CurrencyDelta, MarketOffer, PlayerState, TxKind, OFFER_LIMIT};

/// Result of listing an item: the seller state with one unit removed and a
/// `market_list` ledger entry, plus the new offer for the shared list.
#[derive(Debug, Clone)]
pub struct ListOutcome {
    pub seller: PlayerState,
    pub offer: MarketOffer,
}

/// List one unit of an owned item at `price_gold` (floored at 1).
/// Precondition: `owned_count(seller, item_id) > 0`.
pub fn list_offer(
    seller: &PlayerState,
    seller_key: &str,
    seller_name: &str,
    item_id: &str,
    price_gold: i64,
    now: DateTime<Utc>,
) -> ListOutcome {
    let price = price_gold.max(1);
    let next = take(seller, item_id, 1, now);
    let next = record_tx(
        &next,
        TxKind::MarketList,
        CurrencyDelta::ZERO,
        Some(json!({ "item_id": item_id, "price_gold": price })),
        now,
    );
    let offer = MarketOffer {
        id: Uuid::new_v4().to_string(),
        seller_key: seller_key.to_string(),
        seller_name: seller_name.to_string(),
        item_id: item_id.to_string(),
        price_gold: price,
        created_at: now,
    };
    ListOutcome {
        seller: next,
        offer,
    }
}

/// Apply a purchase to the buyer: grant the item and deduct the price in a
/// single normalized update, ledgered as `market_buy`. Preconditions
/// (buyer is not the seller, buyer can afford) are the caller's.
pub fn apply_buy(buyer: &PlayerState, offer: &MarketOffer, now: DateTime<Utc>) -> PlayerState {
    let mut next = grant(buyer, &offer.item_id, 1, now);
    next.currency.gold = next.currency.gold.saturating_sub(offer.price_gold);
    let next = normalize(&next, now);
    record_tx(
        &next,
        TxKind::MarketBuy,
        CurrencyDelta::gold(-offer.price_gold),
        Some(json!({ "offer_id": offer.id, "item_id": offer.item_id })),
        now,
    )
}

/// Apply a cancellation to the seller: return the item, ledgered as
/// `market_cancel`. Precondition: the caller is the offer's seller.
pub fn apply_cancel(seller: &PlayerState, offer: &MarketOffer, now: DateTime<Utc>) -> PlayerState {
    let next = grant(seller, &offer.item_id, 1, now);
    record_tx(
        &next,
        TxKind::MarketCancel,
        CurrencyDelta::ZERO,
        Some(json!({ "offer_id": offer.id, "item_id": offer.item_id })),
        now,
    )
}

/// Accumulate a completed sale into the seller's pending payout balance.
pub fn credit_payout(payouts: &mut HashMap<String, i64>, seller_key: &str, amount: i64) {
    let pending = payouts.entry(seller_key.to_string()).or_insert(0);
    *pending = pending.saturating_add(amount);
}

/// Merge a pending payout balance into the player's spendable gold,
/// ledgered as `market_sale` with the positive delta. The payout map entry
/// is cleared by the caller alongside this.
pub fn apply_payout_claim(player: &PlayerState, pending: i64, now: DateTime<Utc>) -> PlayerState {
    let mut next = player.clone();
    next.currency.gold = next.currency.gold.saturating_add(pending);
    let next = normalize(&next, now);
    record_tx(
        &next,
        TxKind::MarketSale,
        CurrencyDelta::gold(pending),
        Some(json!({ "claimed": pending })),
        now,
    )
}

/// Keep the newest [`OFFER_LIMIT`] offers (append order is chronological).
pub fn truncate_offers(offers: &[MarketOffer]) -> Vec<MarketOffer> {
    tail(offers, OFFER_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::{can_afford, owned_count};
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn seller_with_crown() -> PlayerState {
        grant(&PlayerState::fresh(t0()), "hat_crown", 1, t0())
    }

    #[test]
    fn list_removes_one_unit_and_builds_offer() {
        let seller = seller_with_crown();
        let outcome = list_offer(&seller, "alice", "Alice", "hat_crown", 200, t0());
        assert_eq!(owned_count(&outcome.seller, "hat_crown"), 0);
        assert_eq!(outcome.offer.item_id, "hat_crown");
        assert_eq!(outcome.offer.price_gold, 200);
        assert_eq!(outcome.offer.seller_key, "alice");
        assert_eq!(
            outcome.seller.ledger.last().unwrap().kind,
            TxKind::MarketList
        );
    }

    #[test]
    fn list_floors_price_at_one_gold() {
        let seller = seller_with_crown();
        let outcome = list_offer(&seller, "alice", "Alice", "hat_crown", -10, t0());
        assert_eq!(outcome.offer.price_gold, 1);
    }

    #[test]
    fn list_then_cancel_restores_inventory_exactly() {
        let seller = seller_with_crown();
        let before = owned_count(&seller, "hat_crown");
        let outcome = list_offer(&seller, "alice", "Alice", "hat_crown", 200, t0());
        let restored = apply_cancel(&outcome.seller, &outcome.offer, t0());
        assert_eq!(owned_count(&restored, "hat_crown"), before);
        assert_eq!(
            restored.ledger.last().unwrap().kind,
            TxKind::MarketCancel
        );
    }

    #[test]
    fn buy_conserves_gold_and_items() {
        let outcome = list_offer(
            &seller_with_crown(),
            "alice",
            "Alice",
            "hat_crown",
            200,
            t0(),
        );
        let buyer = PlayerState::fresh(t0());
        assert!(can_afford(&buyer, &CurrencyDelta::gold(200)));

        let bought = apply_buy(&buyer, &outcome.offer, t0());
        assert_eq!(bought.currency.gold, 50);
        assert_eq!(owned_count(&bought, "hat_crown"), 1);
        let tx = bought.ledger.last().unwrap();
        assert_eq!(tx.kind, TxKind::MarketBuy);
        assert_eq!(tx.delta.gold, -200);
    }

    #[test]
    fn payout_credit_accumulates_per_seller() {
        let mut payouts = HashMap::new();
        credit_payout(&mut payouts, "alice", 200);
        credit_payout(&mut payouts, "alice", 50);
        credit_payout(&mut payouts, "bob", 10);
        assert_eq!(payouts["alice"], 250);
        assert_eq!(payouts["bob"], 10);
    }

    #[test]
    fn payout_claim_moves_pending_into_gold() {
        let seller = PlayerState::fresh(t0());
        let claimed = apply_payout_claim(&seller, 200, t0());
        assert_eq!(claimed.currency.gold, 450);
        let tx = claimed.ledger.last().unwrap();
        assert_eq!(tx.kind, TxKind::MarketSale);
        assert_eq!(tx.delta.gold, 200);
    }

    #[test]
    fn payout_credit_saturates_instead_of_wrapping() {
        let mut payouts = HashMap::new();
        credit_payout(&mut payouts, "alice", i64::MAX);
        credit_payout(&mut payouts, "alice", 1);
        assert_eq!(payouts["alice"], i64::MAX);
    }

    #[test]
    fn payout_claim_clamps_oversized_pending_balance() {
        use crate::game::types::CURRENCY_MAX;
        let seller = PlayerState::fresh(t0());
        let claimed = apply_payout_claim(&seller, i64::MAX, t0());
        assert_eq!(claimed.currency.gold, CURRENCY_MAX);
        assert_eq!(claimed.ledger.last().unwrap().kind, TxKind::MarketSale);
    }

    #[test]
    fn buy_with_absurd_price_floors_gold_at_zero() {
        let outcome = list_offer(
            &seller_with_crown(),
            "alice",
            "Alice",
            "hat_crown",
            i64::MAX,
            t0(),
        );
        let buyer = PlayerState::fresh(t0());
        let bought = apply_buy(&buyer, &outcome.offer, t0());
        assert_eq!(bought.currency.gold, 0);
        assert_eq!(owned_count(&bought, "hat_crown"), 1);
    }

    #[test]
    fn offer_list_truncates_to_newest() {
        let offers: Vec<MarketOffer> = (0..250)
            .map(|i| MarketOffer {
                id: format!("offer_{}", i),
                seller_key: "alice".into(),
                seller_name: "Alice".into(),
                item_id: "hat_leaf".into(),
                price_gold: 1,
                created_at: t0(),
            })
            .collect();
        let kept = truncate_offers(&offers);
        assert_eq!(kept.len(), OFFER_LIMIT);
        assert_eq!(kept.first().unwrap().id, "offer_50");
        assert_eq!(kept.last().unwrap().id, "offer_249");
    }
}
