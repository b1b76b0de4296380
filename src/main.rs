//! Binary entrypoint for the slimekeep CLI.
//!
//! Commands:
//! - `init` - create a starter `slimekeep.toml`
//! - `status` - balances, inventory, loadout, and pending payouts
//! - `draw [--banner <id>] [--count <n>]` - paid gacha draws
//! - `equip <slot> [item]` - set or clear a loadout slot
//! - `exchange <gems>` - convert gems to gold
//! - `ledger [--limit <n>]` - newest transactions
//! - `shop packs|buy-pack|buy-item` - shop operations
//! - `market offers|list|buy|cancel|claim` - marketplace operations
//!
//! See the library crate docs for module-level details: `slimekeep::`.

use anyhow::{anyhow, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};

use slimekeep::config::GameConfig;
use slimekeep::game::{
    buy_gem_pack, buy_shop_item, can_afford, equip_with_tx, exchange_gems_to_gold, find_banner,
    find_gem_pack, find_item, open_gacha, owned_count, CurrencyDelta, GameStore, PlayerState,
    Slot, COSMETICS, GEM_PACKS,
};

#[derive(Parser)]
#[command(name = "slimekeep")]
#[command(about = "Client-local virtual economy for a casual pet/gacha game")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "slimekeep.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a starter configuration file
    Init,
    /// Show balances, inventory, loadout, and pending payouts
    Status,
    /// Open the gacha one or more times
    Draw {
        /// Banner id (standard, premium, special)
        #[arg(short, long, default_value = "standard")]
        banner: String,
        /// Number of draws
        #[arg(short = 'n', long, default_value_t = 1)]
        count: u32,
    },
    /// Equip an item into a slot, or clear the slot
    Equip {
        /// Slot: hat, face, or body
        slot: String,
        /// Item id; omit to clear the slot
        item: Option<String>,
    },
    /// Exchange gems for gold (500 gold per gem)
    Exchange {
        /// Number of gems to convert
        gems: i64,
    },
    /// Show the newest ledger entries
    Ledger {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// Shop operations
    Shop {
        #[command(subcommand)]
        action: ShopAction,
    },
    /// Marketplace operations
    Market {
        #[command(subcommand)]
        action: MarketAction,
    },
}

#[derive(Subcommand)]
enum ShopAction {
    /// Show the gem pack catalog
    Packs,
    /// Credit a gem pack (no real payment; the KRW price is display-only)
    BuyPack { pack: String },
    /// Buy a catalog item for gems
    BuyItem {
        item: String,
        /// Price in gems
        price: i64,
    },
}

#[derive(Subcommand)]
enum MarketAction {
    /// Show open offers
    Offers,
    /// List one unit of an owned item for sale
    List {
        /// Item id to sell
        item: String,
        /// Asking price in gold (minimum 1)
        price: i64,
    },
    /// Buy an open offer by id
    Buy { offer: String },
    /// Cancel one of your own offers by id
    Cancel { offer: String },
    /// Claim pending gold from completed sales
    Claim,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if matches!(cli.command, Commands::Init) {
        GameConfig::create_default(&cli.config)?;
        println!("wrote {}", cli.config);
        return Ok(());
    }

    let config = GameConfig::load(&cli.config)?;
    let store = GameStore::open(&config.storage.data_dir)?;
    let key = config.player.key.as_str();
    let name = config.player.display_name.as_str();
    let now = Utc::now();
    let state = store.load_player(key, now)?;

    match cli.command {
        Commands::Init => unreachable!("handled above"),
        Commands::Status => {
            print_status(&store, key, &state)?;
        }
        Commands::Draw { banner, count } => {
            let banner = find_banner(&banner)
                .ok_or_else(|| anyhow!("unknown banner: '{}'", banner))?;
            let mut rng = rand::thread_rng();
            let mut current = state;
            for _ in 0..count.max(1) {
                if !can_afford(&current, &banner.cost) {
                    return Err(anyhow!(
                        "cannot afford {} ({} gold / {} gems per draw)",
                        banner.name,
                        banner.cost.gold,
                        banner.cost.gems
                    ));
                }
                let (next, item) = open_gacha(&current, &banner.cost, &mut rng, now);
                println!(
                    "{} {} [{}]",
                    item.icon,
                    item.name,
                    item.rarity.label()
                );
                current = next;
            }
            store.save_player(key, &current, now)?;
        }
        Commands::Equip { slot, item } => {
            let slot: Slot = slot.parse().map_err(|e: String| anyhow!(e))?;
            if let Some(item_id) = &item {
                if find_item(item_id).is_none() {
                    return Err(anyhow!("unknown item: '{}'", item_id));
                }
                if owned_count(&state, item_id) == 0 {
                    log::warn!("equipping '{}' without owning it", item_id);
                }
            }
            let next = equip_with_tx(&state, slot, item.as_deref(), now);
            store.save_player(key, &next, now)?;
            match item {
                Some(item_id) => println!("equipped {} on {}", item_id, slot),
                None => println!("cleared {}", slot),
            }
        }
        Commands::Exchange { gems } => {
            if gems < 1 {
                return Err(anyhow!("gem amount must be at least 1"));
            }
            if !can_afford(&state, &CurrencyDelta::gems(gems)) {
                return Err(anyhow!("not enough gems ({} held)", state.currency.gems));
            }
            let next = exchange_gems_to_gold(&state, gems, now);
            store.save_player(key, &next, now)?;
            println!(
                "exchanged {} gems; balance is now {} gold / {} gems",
                gems, next.currency.gold, next.currency.gems
            );
        }
        Commands::Ledger { limit } => {
            for tx in state.ledger.iter().rev().take(limit) {
                let delta = fmt_delta(&tx.delta);
                println!("{}  {:?}  {}", tx.at.format("%Y-%m-%d %H:%M:%S"), tx.kind, delta);
            }
        }
        Commands::Shop { action } => match action {
            ShopAction::Packs => {
                for pack in GEM_PACKS.iter() {
                    let tag = if pack.popular { "  (popular)" } else { "" };
                    println!(
                        "{}  {} gems +{} bonus  {} KRW{}",
                        pack.id, pack.gems, pack.bonus, pack.price_krw, tag
                    );
                }
            }
            ShopAction::BuyPack { pack } => {
                let pack = find_gem_pack(&pack)
                    .ok_or_else(|| anyhow!("unknown gem pack: '{}'", pack))?;
                let next = buy_gem_pack(&state, pack, now);
                store.save_player(key, &next, now)?;
                println!(
                    "credited {} gems; balance is now {} gems",
                    pack.gems + pack.bonus,
                    next.currency.gems
                );
            }
            ShopAction::BuyItem { item, price } => {
                if find_item(&item).is_none() {
                    return Err(anyhow!("unknown item: '{}'", item));
                }
                if price < 1 {
                    return Err(anyhow!("price must be at least 1 gem"));
                }
                if !can_afford(&state, &CurrencyDelta::gems(price)) {
                    return Err(anyhow!("not enough gems ({} held)", state.currency.gems));
                }
                let next = buy_shop_item(&state, &item, price, now);
                store.save_player(key, &next, now)?;
                println!("bought {} for {} gems", item, price);
            }
        },
        Commands::Market { action } => match action {
            MarketAction::Offers => {
                let offers = store.load_offers()?;
                if offers.is_empty() {
                    println!("no open offers");
                }
                for offer in offers.iter().rev() {
                    let label = find_item(&offer.item_id)
                        .map(|i| format!("{} {}", i.icon, i.name))
                        .unwrap_or_else(|| offer.item_id.clone());
                    println!(
                        "{}  {}  {} gold  (seller: {})",
                        offer.id, label, offer.price_gold, offer.seller_name
                    );
                }
            }
            MarketAction::List { item, price } => {
                let (_, offer) = store.list_item(key, name, &state, &item, price, now)?;
                println!("listed {} at {} gold (offer {})", item, offer.price_gold, offer.id);
            }
            MarketAction::Buy { offer } => {
                let next = store.buy_offer(key, &state, &offer, now)?;
                println!("bought offer {}; {} gold remaining", offer, next.currency.gold);
            }
            MarketAction::Cancel { offer } => {
                store.cancel_offer(key, &state, &offer, now)?;
                println!("cancelled offer {}; item returned to inventory", offer);
            }
            MarketAction::Claim => {
                let (next, claimed) = store.claim_payouts(key, &state, now)?;
                if claimed == 0 {
                    println!("nothing pending");
                } else {
                    println!("claimed {} gold; balance is now {}", claimed, next.currency.gold);
                }
            }
        },
    }
    Ok(())
}

fn print_status(store: &GameStore, key: &str, state: &PlayerState) -> Result<()> {
    println!(
        "balance: {} gold / {} gems",
        state.currency.gold, state.currency.gems
    );

    println!("inventory:");
    let mut any = false;
    for item in COSMETICS.iter() {
        let count = owned_count(state, item.id);
        if count > 0 {
            println!("  {} {} x{} [{}]", item.icon, item.name, count, item.rarity.label());
            any = true;
        }
    }
    if !any {
        println!("  (empty)");
    }

    println!("equipped:");
    for slot in Slot::ALL {
        let shown = state.equipped.get(slot).unwrap_or("-");
        println!("  {}: {}", slot, shown);
    }

    let payouts = store.load_payouts()?;
    let pending = payouts.get(key).copied().unwrap_or(0);
    if pending > 0 {
        println!("pending payouts: {} gold (run `market claim`)", pending);
    }
    Ok(())
}

fn fmt_delta(delta: &CurrencyDelta) -> String {
    let mut parts = Vec::new();
    if delta.gold != 0 {
        parts.push(format!("{:+} gold", delta.gold));
    }
    if delta.gems != 0 {
        parts.push(format!("{:+} gems", delta.gems));
    }
    if parts.is_empty() {
        "-".to_string()
    } else {
        parts.join(", ")
    }
}

fn init_logging(verbose: u8) {
    let mut builder = env_logger::Builder::new();
    let level = match verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(level);
    builder.init();
}
