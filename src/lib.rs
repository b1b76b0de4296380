//! # Slimekeep - client-local pet economy engine
//!
//! Slimekeep is the virtual economy behind a casual pet/gacha mini-game:
//! currencies, owned cosmetics, an equipped loadout, a rarity-weighted loot
//! draw, an append-only transaction ledger, and a local resale marketplace.
//! Everything persists in an embedded sled store keyed per player plus a
//! shared market namespace; there is no server authority.
//!
//! ## Design
//!
//! The core is a set of pure transforms over immutable state snapshots:
//!
//! ```text
//! caller ──▶ economy/market core (pure) ──▶ GameStore (sled write)
//!   ▲                                             │
//!   └────────────── re-render from returned state ┘
//! ```
//!
//! The clock and RNG are injected, so the core is deterministic under test.
//! Out-of-range input is clamped by the normalizer rather than rejected;
//! affordability and ownership are precondition contracts checked by
//! callers, not enforced postconditions.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chrono::Utc;
//! use slimekeep::game::{can_afford, find_banner, open_gacha, GameStore};
//!
//! fn main() -> anyhow::Result<()> {
//!     let store = GameStore::open("data/slimekeep")?;
//!     let now = Utc::now();
//!     let state = store.load_player("alice", now)?;
//!
//!     let banner = find_banner("standard").expect("known banner");
//!     if can_afford(&state, &banner.cost) {
//!         let (next, item) = open_gacha(&state, &banner.cost, &mut rand::thread_rng(), now);
//!         store.save_player("alice", &next, now)?;
//!         println!("drew {} {}", item.icon, item.name);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`game`] - catalog, data model, normalizer, economy core, shop,
//!   marketplace, and sled persistence
//! - [`config`] - TOML configuration (storage path, player identity)

pub mod config;
pub mod game;
