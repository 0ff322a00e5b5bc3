//! In-process paper venue
//!
//! Serves books and funding set by the caller and fills orders against the
//! current book, reporting positions in the venue-native shape of the
//! exchange it stands in for. Used by dry runs, the binary's default wiring and
//! tests.

use super::{Exchange, ExchangeConnector, OrderId, OrderSide, VenuePosition};
use crate::{
    data::{FundingInfo, OrderBookSnapshot, Position},
    strategy::pricing,
    ArbitrageError, Result,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

/// How the paper venue treats new orders
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillPolicy {
    /// Fill the whole amount at the book VWAP on placement
    #[default]
    Immediate,
    /// Accept the order but never fill it
    Never,
}

/// Order accepted by the paper venue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperOrder {
    /// Assigned id
    pub order_id: OrderId,
    /// Symbol
    pub symbol: String,
    /// Side
    pub side: OrderSide,
    /// Amount
    pub amount: Decimal,
    /// Advisory price passed by the caller
    pub price: Decimal,
    /// Price the order filled at, if it filled
    pub fill_price: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, Default)]
struct PaperPosition {
    base: Decimal,
    quote: Decimal,
    entry_price: Option<Decimal>,
}

impl PaperPosition {
    fn apply_fill(&mut self, side: OrderSide, amount: Decimal, price: Decimal) {
        let delta = side.signed(amount);
        let new_base = self.base + delta;

        self.entry_price = if new_base.is_zero() {
            None
        } else if self.base.is_zero() || (self.base.is_sign_negative() != new_base.is_sign_negative()) {
            Some(price)
        } else if delta.is_sign_negative() == self.base.is_sign_negative() {
            let previous = self.entry_price.unwrap_or(price);
            Some((previous * self.base.abs() + price * amount) / new_base.abs())
        } else {
            self.entry_price
        };

        self.base = new_base;
        self.quote -= delta * price;
    }
}

#[derive(Debug)]
struct PaperState {
    books: HashMap<String, OrderBookSnapshot>,
    funding: HashMap<String, Decimal>,
    positions: HashMap<String, PaperPosition>,
    orders: Vec<PaperOrder>,
    cancelled: Vec<OrderId>,
    fill_policy: FillPolicy,
    reject_orders: bool,
}

/// Simulated venue implementing [`ExchangeConnector`]
#[derive(Debug)]
pub struct PaperConnector {
    exchange: Exchange,
    state: RwLock<PaperState>,
}

impl PaperConnector {
    /// Create an empty paper venue standing in for `exchange`
    pub fn new(exchange: Exchange) -> Self {
        Self {
            exchange,
            state: RwLock::new(PaperState {
                books: HashMap::new(),
                funding: HashMap::new(),
                positions: HashMap::new(),
                orders: Vec::new(),
                cancelled: Vec::new(),
                fill_policy: FillPolicy::Immediate,
                reject_orders: false,
            }),
        }
    }

    /// Replace the book served for `symbol`
    pub async fn set_book(&self, symbol: &str, book: OrderBookSnapshot) {
        self.state.write().await.books.insert(symbol.to_string(), book);
    }

    /// Set the raw funding value served for `symbol`
    pub async fn set_funding(&self, symbol: &str, raw_rate: Decimal) {
        self.state.write().await.funding.insert(symbol.to_string(), raw_rate);
    }

    /// Change how new orders are filled
    pub async fn set_fill_policy(&self, policy: FillPolicy) {
        self.state.write().await.fill_policy = policy;
    }

    /// Make order placement fail with a trading error
    pub async fn set_reject_orders(&self, reject: bool) {
        self.state.write().await.reject_orders = reject;
    }

    /// Orders accepted so far
    pub async fn orders(&self) -> Vec<PaperOrder> {
        self.state.read().await.orders.clone()
    }

    /// Order ids cancelled so far
    pub async fn cancelled(&self) -> Vec<OrderId> {
        self.state.read().await.cancelled.clone()
    }
}

#[async_trait]
impl ExchangeConnector for PaperConnector {
    fn exchange(&self) -> Exchange {
        self.exchange
    }

    async fn fetch_book(&self, symbol: &str) -> Result<OrderBookSnapshot> {
        let state = self.state.read().await;
        Ok(state.books.get(symbol).cloned().unwrap_or_default())
    }

    async fn fetch_funding(&self, symbol: &str) -> Result<FundingInfo> {
        let state = self.state.read().await;
        Ok(FundingInfo::new(state.funding.get(symbol).copied().unwrap_or_default()))
    }

    async fn place_order(
        &self,
        symbol: &str,
        side: OrderSide,
        amount: Decimal,
        price: Decimal,
    ) -> Result<OrderId> {
        let mut state = self.state.write().await;
        if state.reject_orders {
            return Err(ArbitrageError::Trading(format!(
                "{} rejected {} {} {}",
                self.exchange, side, amount, symbol
            ))
            .into());
        }

        let order_id = OrderId(format!("{}-{}", self.exchange, Uuid::new_v4()));
        let fill_price = match state.fill_policy {
            FillPolicy::Never => None,
            FillPolicy::Immediate => {
                let levels = state.books.get(symbol).map(|book| match side {
                    OrderSide::Buy => book.asks.as_slice(),
                    OrderSide::Sell => book.bids.as_slice(),
                });
                Some(levels.and_then(|levels| pricing::vwap(levels, amount)).unwrap_or(price))
            }
        };

        if let Some(fill) = fill_price {
            state
                .positions
                .entry(symbol.to_string())
                .or_default()
                .apply_fill(side, amount, fill);
            info!(exchange = %self.exchange, %symbol, %side, %amount, price = %fill, "Paper order filled");
        } else {
            debug!(exchange = %self.exchange, %symbol, %side, %amount, "Paper order resting");
        }

        state.orders.push(PaperOrder {
            order_id: order_id.clone(),
            symbol: symbol.to_string(),
            side,
            amount,
            price,
            fill_price,
        });
        Ok(order_id)
    }

    async fn cancel_order(&self, order_id: &OrderId) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.cancelled.contains(order_id) {
            state.cancelled.push(order_id.clone());
        }
        Ok(())
    }

    async fn get_position(&self, symbol: &str) -> Result<Position> {
        let state = self.state.read().await;
        let position = state.positions.get(symbol).copied().unwrap_or_default();
        let native = match self.exchange {
            Exchange::Drift => VenuePosition::Amounts {
                base_asset_amount: position.base,
                quote_asset_amount: position.quote,
            },
            Exchange::Hyperliquid => VenuePosition::Perp {
                szi: position.base,
                entry_px: position.entry_price,
            },
        };
        Ok(native.into())
    }
}
