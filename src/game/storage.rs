//! Sled-backed persistence for player state and the shared market
//! namespace.
//!
//! Values are JSON blobs so a record survives schema drift: a missing or
//! unreadable player record falls back to a fresh starting state, and the
//! normalizer repairs anything in between.
//!
//! The compound market operations implement the ordered-write discipline of
//! the design: the acting player's write is the one that must commit;
//! follow-up writes to the shared collections are best-effort and logged on
//! failure. Two store handles over the same path race last-write-wins on
//! the shared keys; there is no cross-handle locking.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use log::warn;
use sled::IVec;

use super::errors::GameStoreError;
use super::market;
use super::state::{can_afford, normalize, owned_count};
use super::types::{CurrencyDelta, MarketOffer, PlayerState};

const TREE_PLAYERS: &str = "slimekeep_players";
const TREE_MARKET: &str = "slimekeep_market";

const KEY_OFFERS: &[u8] = b"market:offers:v1";
const KEY_PAYOUTS: &[u8] = b"market:payouts:v1";

/// Sled-backed store: one tree for per-player state, one for the shared
/// offer list and payout ledger.
pub struct GameStore {
    _db: sled::Db,
    players: sled::Tree,
    market: sled::Tree,
}

impl GameStore {
    /// Open (or create) the store rooted at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GameStoreError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        let players = db.open_tree(TREE_PLAYERS)?;
        let market = db.open_tree(TREE_MARKET)?;
        Ok(Self {
            _db: db,
            players,
            market,
        })
    }

    fn player_key(player_key: &str) -> Vec<u8> {
        format!("players:v1:{}", player_key.to_ascii_lowercase()).into_bytes()
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, GameStoreError> {
        Ok(serde_json::to_vec(value)?)
    }

    fn deserialize<T: serde::de::DeserializeOwned>(bytes: IVec) -> Result<T, GameStoreError> {
        Ok(serde_json::from_slice::<T>(&bytes)?)
    }

    // ------------------------------------------------------------------
    // Player state
    // ------------------------------------------------------------------

    /// Load a player's state, normalized. A missing record yields the fresh
    /// starting state; an unreadable one does too, with a warning.
    pub fn load_player(
        &self,
        player_key: &str,
        now: DateTime<Utc>,
    ) -> Result<PlayerState, GameStoreError> {
        match self.players.get(Self::player_key(player_key))? {
            Some(bytes) => match serde_json::from_slice::<PlayerState>(&bytes) {
                Ok(state) => Ok(normalize(&state, now)),
                Err(err) => {
                    warn!(
                        "unreadable player record for '{}', starting fresh: {}",
                        player_key, err
                    );
                    Ok(PlayerState::fresh(now))
                }
            },
            None => Ok(PlayerState::fresh(now)),
        }
    }

    /// Persist a player's state. Normalizes before writing so storage only
    /// ever holds canonical records.
    pub fn save_player(
        &self,
        player_key: &str,
        state: &PlayerState,
        now: DateTime<Utc>,
    ) -> Result<(), GameStoreError> {
        let canonical = normalize(state, now);
        let bytes = Self::serialize(&canonical)?;
        self.players.insert(Self::player_key(player_key), bytes)?;
        self.players.flush()?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Shared market namespace
    // ------------------------------------------------------------------

    /// Load the shared offer list. Missing or unreadable data yields an
    /// empty list.
    pub fn load_offers(&self) -> Result<Vec<MarketOffer>, GameStoreError> {
        match self.market.get(KEY_OFFERS)? {
            Some(bytes) => match serde_json::from_slice::<Vec<MarketOffer>>(&bytes) {
                Ok(offers) => Ok(offers),
                Err(err) => {
                    warn!("unreadable offer list, resetting: {}", err);
                    Ok(Vec::new())
                }
            },
            None => Ok(Vec::new()),
        }
    }

    /// Persist the shared offer list, truncated to the newest entries.
    pub fn save_offers(&self, offers: &[MarketOffer]) -> Result<(), GameStoreError> {
        let kept = market::truncate_offers(offers);
        let bytes = Self::serialize(&kept)?;
        self.market.insert(KEY_OFFERS, bytes)?;
        self.market.flush()?;
        Ok(())
    }

    /// Load the shared seller payout ledger (seller key -> pending gold).
    pub fn load_payouts(&self) -> Result<HashMap<String, i64>, GameStoreError> {
        match self.market.get(KEY_PAYOUTS)? {
            Some(bytes) => Ok(Self::deserialize(bytes)?),
            None => Ok(HashMap::new()),
        }
    }

    pub fn save_payouts(&self, payouts: &HashMap<String, i64>) -> Result<(), GameStoreError> {
        let bytes = Self::serialize(payouts)?;
        self.market.insert(KEY_PAYOUTS, bytes)?;
        self.market.flush()?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Compound market operations
    // ------------------------------------------------------------------

    /// List one unit of an owned item for sale. The seller's state commits
    /// first; if the shared offer write then fails the unit is gone with no
    /// compensating offer, which this store accepts as a known risk of the
    /// non-transactional backend.
    pub fn list_item(
        &self,
        seller_key: &str,
        seller_name: &str,
        seller: &PlayerState,
        item_id: &str,
        price_gold: i64,
        now: DateTime<Utc>,
    ) -> Result<(PlayerState, MarketOffer), GameStoreError> {
        if owned_count(seller, item_id) <= 0 {
            return Err(GameStoreError::ItemNotOwned(item_id.to_string()));
        }
        let outcome = market::list_offer(seller, seller_key, seller_name, item_id, price_gold, now);
        self.save_player(seller_key, &outcome.seller, now)?;

        let mut offers = self.load_offers()?;
        offers.push(outcome.offer.clone());
        self.save_offers(&offers)?;
        Ok((outcome.seller, outcome.offer))
    }

    /// Buy an open offer. The buyer's combined update (item granted, gold
    /// deducted, tx recorded) must commit; the payout credit and offer
    /// removal are best-effort afterwards.
    pub fn buy_offer(
        &self,
        buyer_key: &str,
        buyer: &PlayerState,
        offer_id: &str,
        now: DateTime<Utc>,
    ) -> Result<PlayerState, GameStoreError> {
        let mut offers = self.load_offers()?;
        let offer = offers
            .iter()
            .find(|o| o.id == offer_id)
            .cloned()
            .ok_or_else(|| GameStoreError::OfferNotFound(offer_id.to_string()))?;
        if offer.seller_key == buyer_key {
            return Err(GameStoreError::OwnOffer);
        }
        if !can_afford(buyer, &CurrencyDelta::gold(offer.price_gold)) {
            return Err(GameStoreError::InsufficientFunds);
        }

        let next = market::apply_buy(buyer, &offer, now);
        self.save_player(buyer_key, &next, now)?;

        match self.load_payouts() {
            Ok(mut payouts) => {
                market::credit_payout(&mut payouts, &offer.seller_key, offer.price_gold);
                if let Err(err) = self.save_payouts(&payouts) {
                    warn!("payout credit for '{}' failed: {}", offer.seller_key, err);
                }
            }
            Err(err) => warn!("payout credit for '{}' failed: {}", offer.seller_key, err),
        }

        offers.retain(|o| o.id != offer.id);
        if let Err(err) = self.save_offers(&offers) {
            warn!("offer removal for '{}' failed: {}", offer.id, err);
        }
        Ok(next)
    }

    /// Cancel an open offer, returning the item to the seller.
    pub fn cancel_offer(
        &self,
        seller_key: &str,
        seller: &PlayerState,
        offer_id: &str,
        now: DateTime<Utc>,
    ) -> Result<PlayerState, GameStoreError> {
        let mut offers = self.load_offers()?;
        let offer = offers
            .iter()
            .find(|o| o.id == offer_id)
            .cloned()
            .ok_or_else(|| GameStoreError::OfferNotFound(offer_id.to_string()))?;
        if offer.seller_key != seller_key {
            return Err(GameStoreError::NotSeller);
        }

        let next = market::apply_cancel(seller, &offer, now);
        self.save_player(seller_key, &next, now)?;

        offers.retain(|o| o.id != offer.id);
        if let Err(err) = self.save_offers(&offers) {
            warn!("offer removal for '{}' failed: {}", offer.id, err);
        }
        Ok(next)
    }

    /// Merge a seller's pending payout into their spendable gold and clear
    /// the shared entry. Returns the new state and the amount claimed
    /// (0 when nothing was pending, in which case no write happens).
    pub fn claim_payouts(
        &self,
        player_key: &str,
        player: &PlayerState,
        now: DateTime<Utc>,
    ) -> Result<(PlayerState, i64), GameStoreError> {
        let mut payouts = self.load_payouts()?;
        let pending = payouts.get(player_key).copied().unwrap_or(0);
        if pending <= 0 {
            return Ok((player.clone(), 0));
        }

        let next = market::apply_payout_claim(player, pending, now);
        self.save_player(player_key, &next, now)?;

        payouts.remove(player_key);
        if let Err(err) = self.save_payouts(&payouts) {
            warn!("payout clear for '{}' failed: {}", player_key, err);
        }
        Ok((next, pending))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::grant;
    use crate::game::types::{STARTING_GEMS, STARTING_GOLD};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn open_store(dir: &TempDir) -> GameStore {
        GameStore::open(dir.path()).expect("store")
    }

    #[test]
    fn missing_player_loads_fresh_state() {
        let dir = TempDir::new().expect("tempdir");
        let store = open_store(&dir);
        let state = store.load_player("alice", t0()).expect("load");
        assert_eq!(state.currency.gold, STARTING_GOLD);
        assert_eq!(state.currency.gems, STARTING_GEMS);
    }

    #[test]
    fn player_round_trip_preserves_state() {
        let dir = TempDir::new().expect("tempdir");
        let store = open_store(&dir);
        let state = grant(&PlayerState::fresh(t0()), "hat_crown", 2, t0());
        store.save_player("alice", &state, t0()).expect("save");
        let loaded = store.load_player("alice", t0()).expect("load");
        assert_eq!(loaded, state);
    }

    #[test]
    fn corrupt_player_record_falls_back_to_fresh() {
        // Only a blob that is not JSON at all resets the player.
        let dir = TempDir::new().expect("tempdir");
        let store = open_store(&dir);
        store
            .players
            .insert(GameStore::player_key("mallory"), &b"{not json"[..])
            .expect("insert");
        let state = store.load_player("mallory", t0()).expect("load");
        assert_eq!(state.currency.gold, STARTING_GOLD);
    }

    #[test]
    fn single_bad_field_keeps_balances_and_inventory() {
        let dir = TempDir::new().expect("tempdir");
        let store = open_store(&dir);
        let blob =
            br#"{"currency":{"gold":987654,"gems":10},"owned":{"hat_crown":1},"ledger":"oops"}"#;
        store
            .players
            .insert(GameStore::player_key("alice"), &blob[..])
            .expect("insert");

        let state = store.load_player("alice", t0()).expect("load");
        assert_eq!(state.currency.gold, 987_654);
        assert_eq!(state.currency.gems, 10);
        assert_eq!(owned_count(&state, "hat_crown"), 1);
        assert!(state.ledger.is_empty());
    }

    #[test]
    fn list_item_writes_player_and_shared_offer() {
        let dir = TempDir::new().expect("tempdir");
        let store = open_store(&dir);
        let seller = grant(&PlayerState::fresh(t0()), "hat_crown", 1, t0());

        let (next, offer) = store
            .list_item("alice", "Alice", &seller, "hat_crown", 200, t0())
            .expect("list");
        assert_eq!(owned_count(&next, "hat_crown"), 0);

        let stored = store.load_player("alice", t0()).expect("load");
        assert_eq!(owned_count(&stored, "hat_crown"), 0);
        let offers = store.load_offers().expect("offers");
        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].id, offer.id);
    }

    #[test]
    fn list_item_refuses_unowned_item() {
        let dir = TempDir::new().expect("tempdir");
        let store = open_store(&dir);
        let seller = PlayerState::fresh(t0());
        let err = store
            .list_item("alice", "Alice", &seller, "hat_crown", 200, t0())
            .unwrap_err();
        assert!(matches!(err, GameStoreError::ItemNotOwned(_)));
        assert!(store.load_offers().expect("offers").is_empty());
    }

    #[test]
    fn buy_offer_enforces_preconditions() {
        let dir = TempDir::new().expect("tempdir");
        let store = open_store(&dir);
        let seller = grant(&PlayerState::fresh(t0()), "hat_crown", 1, t0());
        let (seller_after, offer) = store
            .list_item("alice", "Alice", &seller, "hat_crown", 400, t0())
            .expect("list");

        // Seller cannot buy their own offer.
        let err = store
            .buy_offer("alice", &seller_after, &offer.id, t0())
            .unwrap_err();
        assert!(matches!(err, GameStoreError::OwnOffer));

        // Buyer with 250 gold cannot cover 400.
        let buyer = PlayerState::fresh(t0());
        let err = store.buy_offer("bob", &buyer, &offer.id, t0()).unwrap_err();
        assert!(matches!(err, GameStoreError::InsufficientFunds));

        // Unknown offer id.
        let err = store.buy_offer("bob", &buyer, "nope", t0()).unwrap_err();
        assert!(matches!(err, GameStoreError::OfferNotFound(_)));

        // Nothing changed on the shared side.
        assert_eq!(store.load_offers().expect("offers").len(), 1);
        assert!(store.load_payouts().expect("payouts").is_empty());
    }

    #[test]
    fn cancel_offer_requires_original_seller() {
        let dir = TempDir::new().expect("tempdir");
        let store = open_store(&dir);
        let seller = grant(&PlayerState::fresh(t0()), "body_cape", 1, t0());
        let (_, offer) = store
            .list_item("alice", "Alice", &seller, "body_cape", 50, t0())
            .expect("list");

        let intruder = PlayerState::fresh(t0());
        let err = store
            .cancel_offer("bob", &intruder, &offer.id, t0())
            .unwrap_err();
        assert!(matches!(err, GameStoreError::NotSeller));
        assert_eq!(store.load_offers().expect("offers").len(), 1);
    }

    #[test]
    fn claim_with_nothing_pending_is_a_no_op() {
        let dir = TempDir::new().expect("tempdir");
        let store = open_store(&dir);
        let player = PlayerState::fresh(t0());
        let (next, claimed) = store.claim_payouts("alice", &player, t0()).expect("claim");
        assert_eq!(claimed, 0);
        assert_eq!(next, player);
        // No record was written for the no-op.
        assert!(store
            .players
            .get(GameStore::player_key("alice"))
            .expect("get")
            .is_none());
    }
}
