use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::error::TradeError;
use crate::market::Market;
use crate::types::{CityId, Good};

// ============================================================================
// Player
// ============================================================================

/// What a player knows about one good: stock on hand and the last deals made.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct PlayerHolding {
    pub quantity: u32,
    pub last_purchase_price: u32,
    pub last_purchase_quantity: u32,
    pub last_sale_price: u32,
    pub last_sale_quantity: u32,
    /// Price seen on the board the last time the player looked
    pub last_seen_price: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub location: CityId,
    pub gold: u64,
    pub holdings: BTreeMap<Good, PlayerHolding>,
}

impl Player {
    pub fn new(name: impl Into<String>, location: CityId, gold: u64) -> Self {
        Self {
            name: name.into(),
            location,
            gold,
            holdings: BTreeMap::new(),
        }
    }

    pub fn holding(&self, good: Good) -> PlayerHolding {
        self.holdings.get(&good).copied().unwrap_or_default()
    }

    pub fn quantity_of(&self, good: Good) -> u32 {
        self.holding(good).quantity
    }

    /// Remember the current board prices of `market`
    pub fn observe(&mut self, market: &Market) {
        for (good, quote) in market.quotes() {
            self.holdings.entry(good).or_default().last_seen_price = quote.current_price;
        }
    }
}

// ============================================================================
// Transactions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    fn name(self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct Transaction {
    pub side: Side,
    pub good: Good,
    pub price: u32,
    pub quantity: u32,
    pub total: u64,
}

/// Buy `quantity` of `good` at the current board price. Stock and gold are
/// checked before anything moves.
pub fn buy(
    player: &mut Player,
    market: &mut Market,
    good: Good,
    quantity: u32,
) -> Result<Transaction, TradeError> {
    if quantity == 0 {
        return Err(TradeError::ZeroQuantity);
    }
    let quote = market.quote_mut(good).ok_or(TradeError::UnlistedGood(good))?;
    if quantity > quote.current_quantity {
        return Err(TradeError::InsufficientStock {
            good,
            requested: quantity,
            available: quote.current_quantity,
        });
    }
    let price = quote.current_price;
    let cost = u64::from(price) * u64::from(quantity);
    if cost > player.gold {
        return Err(TradeError::InsufficientGold {
            cost,
            gold: player.gold,
        });
    }

    quote.current_quantity -= quantity;
    player.gold -= cost;
    let holding = player.holdings.entry(good).or_default();
    holding.quantity = holding.quantity.saturating_add(quantity);
    holding.last_purchase_price = price;
    holding.last_purchase_quantity = quantity;
    holding.last_seen_price = price;

    Ok(record(&player.name, Transaction {
        side: Side::Buy,
        good,
        price,
        quantity,
        total: cost,
    }))
}

/// Sell `quantity` of `good` from the player's holdings. The market always has
/// the gold to pay.
pub fn sell(
    player: &mut Player,
    market: &mut Market,
    good: Good,
    quantity: u32,
) -> Result<Transaction, TradeError> {
    if quantity == 0 {
        return Err(TradeError::ZeroQuantity);
    }
    let quote = market.quote_mut(good).ok_or(TradeError::UnlistedGood(good))?;
    let held = player.quantity_of(good);
    if quantity > held {
        return Err(TradeError::InsufficientHoldings {
            good,
            requested: quantity,
            held,
        });
    }
    let price = quote.current_price;
    let proceeds = u64::from(price) * u64::from(quantity);

    quote.current_quantity = quote.current_quantity.saturating_add(quantity);
    player.gold = player.gold.saturating_add(proceeds);
    let holding = player.holdings.entry(good).or_default();
    holding.quantity -= quantity;
    holding.last_sale_price = price;
    holding.last_sale_quantity = quantity;
    holding.last_seen_price = price;

    Ok(record(&player.name, Transaction {
        side: Side::Sell,
        good,
        price,
        quantity,
        total: proceeds,
    }))
}

fn record(player: &str, tx: Transaction) -> Transaction {
    tracing::info!(
        target: "trade",
        player,
        side = tx.side.name(),
        good = tx.good.name(),
        price = tx.price,
        quantity = tx.quantity,
        total = tx.total,
    );
    tx
}

#[cfg(test)]
mod tests {
    use slotmap::SlotMap;

    use super::*;
    use crate::catalog::GoodsCatalog;

    fn setup(gold: u64) -> (Player, Market) {
        let mut ids: SlotMap<CityId, ()> = SlotMap::with_key();
        let city = ids.insert(());
        let market = Market::stocked(&GoodsCatalog::hanseatic(), 100);
        (Player::new("hanna", city, gold), market)
    }

    #[test]
    fn buy_moves_gold_and_goods_together() {
        let (mut player, mut market) = setup(1000);
        let tx = buy(&mut player, &mut market, Good::Wood, 10).unwrap();

        assert_eq!(tx.total, 300);
        assert_eq!(player.gold, 700);
        assert_eq!(market.quote(Good::Wood).unwrap().current_quantity, 90);

        let holding = player.holding(Good::Wood);
        assert_eq!(holding.quantity, 10);
        assert_eq!(holding.last_purchase_price, 30);
        assert_eq!(holding.last_purchase_quantity, 10);
    }

    #[test]
    fn buy_checks_stock_and_gold_first() {
        let (mut player, mut market) = setup(100);

        let err = buy(&mut player, &mut market, Good::Grain, 101).unwrap_err();
        assert_eq!(
            err,
            TradeError::InsufficientStock {
                good: Good::Grain,
                requested: 101,
                available: 100
            }
        );

        let err = buy(&mut player, &mut market, Good::Jewelry, 1).unwrap_err();
        assert_eq!(err, TradeError::InsufficientGold { cost: 1000, gold: 100 });

        assert_eq!(player.gold, 100);
        assert_eq!(market.quote(Good::Jewelry).unwrap().current_quantity, 100);
        assert!(player.holdings.is_empty());

        assert_eq!(
            buy(&mut player, &mut market, Good::Wood, 0),
            Err(TradeError::ZeroQuantity)
        );
    }

    #[test]
    fn sell_returns_stock_to_market() {
        let (mut player, mut market) = setup(1000);
        buy(&mut player, &mut market, Good::Salt, 4).unwrap();
        market.quote_mut(Good::Salt).unwrap().current_price = 70;

        let tx = sell(&mut player, &mut market, Good::Salt, 3).unwrap();
        assert_eq!(tx.side, Side::Sell);
        assert_eq!(tx.total, 210);
        assert_eq!(player.gold, 1000 - 200 + 210);
        assert_eq!(player.quantity_of(Good::Salt), 1);
        assert_eq!(market.quote(Good::Salt).unwrap().current_quantity, 99);
        assert_eq!(player.holding(Good::Salt).last_sale_price, 70);
    }

    #[test]
    fn cannot_sell_what_is_not_held() {
        let (mut player, mut market) = setup(1000);
        let err = sell(&mut player, &mut market, Good::Pelts, 1).unwrap_err();
        assert_eq!(
            err,
            TradeError::InsufficientHoldings {
                good: Good::Pelts,
                requested: 1,
                held: 0
            }
        );
    }

    #[test]
    fn unlisted_goods_are_refused() {
        let (mut player, _) = setup(1000);
        let mut empty = Market::default();
        assert_eq!(
            buy(&mut player, &mut empty, Good::Wine, 1),
            Err(TradeError::UnlistedGood(Good::Wine))
        );
    }

    #[test]
    fn observe_records_board_prices() {
        let (mut player, market) = setup(1000);
        player.observe(&market);
        assert_eq!(player.holding(Good::Gems).last_seen_price, 400);
        assert_eq!(player.holding(Good::Gems).quantity, 0);
    }
}
