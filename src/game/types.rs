//! Core data model for the pet economy: currency, player state, ledger
//! transactions, and market offers.
//!
//! Persisted records are JSON blobs decoded leniently: numeric fields
//! coerce to 0, wrong-typed containers fall back to empty, and list entries
//! that fail to decode are dropped one by one, so a hand-edited or partially
//! corrupted blob degrades field by field instead of failing the whole load.
//! The normalizer in [`super::state`] then restores every invariant.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::catalog::Slot;

/// Upper bound for either currency balance.
pub const CURRENCY_MAX: i64 = 1_000_000_000;
/// Upper bound for a single owned-item count.
pub const ITEM_COUNT_MAX: i64 = 9999;
/// Gacha history retains this many newest draw records.
pub const GACHA_HISTORY_LIMIT: usize = 50;
/// Ledger retains this many newest transactions.
pub const LEDGER_LIMIT: usize = 200;
/// Shared market list retains this many newest offers.
pub const OFFER_LIMIT: usize = 200;

/// Fresh-player starting balances.
pub const STARTING_GOLD: i64 = 250;
pub const STARTING_GEMS: i64 = 10;

// ============================================================================
// Currency
// ============================================================================

/// A player's spendable balances. Non-negative and bounded after
/// normalization; raw values straight from a mutation may sit outside the
/// range until `normalize` clamps them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub gold: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub gems: i64,
}

/// A signed currency change, used both as a cost (positive fields) and as a
/// ledger delta (signed fields). Zero fields are omitted on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyDelta {
    #[serde(default, skip_serializing_if = "is_zero", deserialize_with = "lenient_i64")]
    pub gold: i64,
    #[serde(default, skip_serializing_if = "is_zero", deserialize_with = "lenient_i64")]
    pub gems: i64,
}

impl CurrencyDelta {
    pub const ZERO: CurrencyDelta = CurrencyDelta { gold: 0, gems: 0 };

    pub fn gold(amount: i64) -> Self {
        Self { gold: amount, gems: 0 }
    }

    pub fn gems(amount: i64) -> Self {
        Self { gold: 0, gems: amount }
    }

    /// Flip the sign of every field (cost -> ledger delta).
    pub fn negated(&self) -> Self {
        Self {
            gold: -self.gold,
            gems: -self.gems,
        }
    }
}

fn is_zero(n: &i64) -> bool {
    *n == 0
}

// ============================================================================
// Ledger
// ============================================================================

/// Kind tag for a ledger transaction. Wire strings match the v1 persisted
/// layout, so existing blobs decode unchanged.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TxKind {
    GachaOpen,
    ShopGemPack,
    ShopItemBuy,
    ExchangeGemToGold,
    MarketList,
    MarketSale,
    MarketCancel,
    MarketBuy,
    EquipChange,
    BotTrade,
    MissionReward,
}

/// One append-only ledger entry. The ledger is an audit trail: balances
/// live in [`Currency`] and the owned map, never reconstructed from here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tx {
    pub id: String,
    pub at: DateTime<Utc>,
    pub kind: TxKind,
    #[serde(default)]
    pub delta: CurrencyDelta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

// ============================================================================
// Player state
// ============================================================================

/// One gacha draw record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GachaRecord {
    pub at: DateTime<Utc>,
    pub item_id: String,
}

/// The equipped loadout: one optional item id per slot. Empty strings count
/// as unequipped, matching the v1 storage layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Equipped {
    #[serde(default)]
    pub hat: Option<String>,
    #[serde(default)]
    pub face: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

impl Equipped {
    pub fn get(&self, slot: Slot) -> Option<&str> {
        match slot {
            Slot::Hat => self.hat.as_deref(),
            Slot::Face => self.face.as_deref(),
            Slot::Body => self.body.as_deref(),
        }
    }

    pub fn set(&mut self, slot: Slot, item_id: Option<String>) {
        match slot {
            Slot::Hat => self.hat = item_id,
            Slot::Face => self.face = item_id,
            Slot::Body => self.body = item_id,
        }
    }
}

/// Aggregate per-player state. Mutated exclusively through the economy and
/// marketplace functions, each of which returns a normalized copy.
///
/// `Default` is the all-empty candidate used for lenient decoding; a brand
/// new player starts from [`PlayerState::fresh`] instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlayerState {
    #[serde(deserialize_with = "lenient_currency")]
    pub currency: Currency,
    /// item id -> owned count. Entries are pruned at zero.
    #[serde(deserialize_with = "lenient_count_map")]
    pub owned: HashMap<String, i64>,
    #[serde(deserialize_with = "lenient_equipped")]
    pub equipped: Equipped,
    #[serde(deserialize_with = "lenient_vec")]
    pub gacha_history: Vec<GachaRecord>,
    #[serde(deserialize_with = "lenient_vec")]
    pub ledger: Vec<Tx>,
    /// mission id -> local date key ("YYYY-MM-DD") of the last claim.
    #[serde(deserialize_with = "lenient_string_map")]
    pub mission_claimed: HashMap<String, String>,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl PlayerState {
    /// Starting state for a player with no stored record.
    pub fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            currency: Currency {
                gold: STARTING_GOLD,
                gems: STARTING_GEMS,
            },
            updated_at: Some(now),
            ..Self::default()
        }
    }
}

// ============================================================================
// Market
// ============================================================================

/// A sell listing in the shared market namespace. Binds one unit of an item
/// to an asking price; independent of any single player's state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketOffer {
    pub id: String,
    pub seller_key: String,
    pub seller_name: String,
    pub item_id: String,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub price_gold: i64,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Lenient decoding
// ============================================================================

/// Coerce any JSON value to an integer: numbers truncate, numeric strings
/// parse, everything else (including non-finite floats) becomes 0.
fn coerce_i64(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_i64(&value))
}

fn lenient_count_map<'de, D>(deserializer: D) -> Result<HashMap<String, i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Object(map) => map
            .into_iter()
            .map(|(key, value)| (key, coerce_i64(&value)))
            .collect(),
        _ => HashMap::new(),
    })
}

fn lenient_currency<'de, D>(deserializer: D) -> Result<Currency, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Object(map) => Currency {
            gold: map.get("gold").map(coerce_i64).unwrap_or(0),
            gems: map.get("gems").map(coerce_i64).unwrap_or(0),
        },
        _ => Currency::default(),
    })
}

fn lenient_equipped<'de, D>(deserializer: D) -> Result<Equipped, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Object(map) => Equipped {
            hat: slot_string(map.get("hat")),
            face: slot_string(map.get("face")),
            body: slot_string(map.get("body")),
        },
        _ => Equipped::default(),
    })
}

fn slot_string(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Decode a list field, dropping entries that do not decode instead of
/// failing the record. A non-array value yields an empty list.
fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

fn lenient_string_map<'de, D>(deserializer: D) -> Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Object(map) => map
            .into_iter()
            .filter_map(|(key, value)| match value {
                Value::String(s) => Some((key, s)),
                _ => None,
            })
            .collect(),
        _ => HashMap::new(),
    })
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenient_currency_decoding_coerces_garbage_to_zero() {
        let state: PlayerState =
            serde_json::from_str(r#"{"currency":{"gold":"not a number","gems":12.9}}"#).unwrap();
        assert_eq!(state.currency.gold, 0);
        assert_eq!(state.currency.gems, 12);
    }

    #[test]
    fn lenient_count_map_accepts_mixed_values() {
        let state: PlayerState =
            serde_json::from_str(r#"{"owned":{"hat_leaf":3,"face_star":"2","body_cape":null}}"#)
                .unwrap();
        assert_eq!(state.owned["hat_leaf"], 3);
        assert_eq!(state.owned["face_star"], 2);
        assert_eq!(state.owned["body_cape"], 0);
    }

    #[test]
    fn one_bad_field_does_not_reject_the_record() {
        // A wrong-typed container field degrades to empty; the rest of the
        // record (balances, inventory) survives intact.
        let state: PlayerState = serde_json::from_str(
            r#"{"currency":{"gold":987654,"gems":10},"owned":{"hat_crown":1},"ledger":"oops"}"#,
        )
        .unwrap();
        assert_eq!(state.currency.gold, 987_654);
        assert_eq!(state.currency.gems, 10);
        assert_eq!(state.owned["hat_crown"], 1);
        assert!(state.ledger.is_empty());
    }

    #[test]
    fn wrong_typed_containers_degrade_to_defaults() {
        let state: PlayerState = serde_json::from_str(
            r#"{
                "currency": "oops",
                "owned": 7,
                "equipped": {"hat": 5, "face": "face_star", "body": ""},
                "gacha_history": {"nope": true},
                "mission_claimed": {"daily_login": "2025-06-01", "bad": 3},
                "updated_at": "garbage"
            }"#,
        )
        .unwrap();
        assert_eq!(state.currency, Currency::default());
        assert!(state.owned.is_empty());
        assert_eq!(state.equipped.hat, None);
        assert_eq!(state.equipped.face.as_deref(), Some("face_star"));
        assert_eq!(state.equipped.body, None);
        assert!(state.gacha_history.is_empty());
        assert_eq!(state.mission_claimed.len(), 1);
        assert_eq!(state.mission_claimed["daily_login"], "2025-06-01");
        assert!(state.updated_at.is_none());
    }

    #[test]
    fn undecodable_list_entries_are_dropped_not_fatal() {
        let state: PlayerState = serde_json::from_str(
            r#"{"gacha_history":[
                {"at":"2025-06-01T12:00:00Z","item_id":"hat_leaf"},
                "broken",
                {"at":"2025-06-01T12:01:00Z","item_id":"body_cape"}
            ]}"#,
        )
        .unwrap();
        let ids: Vec<&str> = state
            .gacha_history
            .iter()
            .map(|r| r.item_id.as_str())
            .collect();
        assert_eq!(ids, vec!["hat_leaf", "body_cape"]);
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let state: PlayerState = serde_json::from_str("{}").unwrap();
        assert_eq!(state.currency.gold, 0);
        assert!(state.owned.is_empty());
        assert!(state.ledger.is_empty());
        assert!(state.equipped.hat.is_none());
    }

    #[test]
    fn tx_delta_omits_zero_fields() {
        let tx = Tx {
            id: "t1".into(),
            at: Utc::now(),
            kind: TxKind::GachaOpen,
            delta: CurrencyDelta::gold(-100),
            meta: None,
        };
        let json = serde_json::to_string(&tx).unwrap();
        assert!(json.contains(r#""kind":"gacha_open""#));
        assert!(json.contains(r#""gold":-100"#));
        assert!(!json.contains("gems"));
        assert!(!json.contains("meta"));
    }

    #[test]
    fn fresh_state_has_starting_balances() {
        let state = PlayerState::fresh(Utc::now());
        assert_eq!(state.currency.gold, STARTING_GOLD);
        assert_eq!(state.currency.gems, STARTING_GEMS);
        assert!(state.owned.is_empty());
        assert!(state.gacha_history.is_empty());
    }
}
