use crate::models::analytics::PortfolioTotals;
use crate::models::position::Position;

/// Values positions and computes profit/loss.
///
/// Pure arithmetic over positions: no I/O, no state.
///
/// A position's market price is its `current_price` only when that price is
/// known, finite and strictly positive. A missing, zero or invalid price means
/// "not quoted yet" and the buy price is used instead, so an unquoted position
/// shows zero profit/loss rather than a total loss.
pub struct ValuationService;

impl ValuationService {
    pub fn new() -> Self {
        Self
    }

    /// Price used for valuation: the current price, or the buy price when unknown.
    #[must_use]
    pub fn effective_price(&self, position: &Position) -> f64 {
        position
            .current_price
            .filter(|p| p.is_finite() && *p > 0.0)
            .unwrap_or(position.buy_price)
    }

    /// Current market value of the position.
    #[must_use]
    pub fn value(&self, position: &Position) -> f64 {
        self.effective_price(position) * position.quantity
    }

    /// Amount paid for the position.
    #[must_use]
    pub fn invested(&self, position: &Position) -> f64 {
        position.buy_price * position.quantity
    }

    /// Unrealized profit (positive) or loss (negative) in currency units.
    #[must_use]
    pub fn profit_loss(&self, position: &Position) -> f64 {
        (self.effective_price(position) - position.buy_price) * position.quantity
    }

    /// Unrealized profit/loss relative to the buy price, in percent.
    ///
    /// Returns `0.0` when the buy price is zero (or not finite), never NaN or infinity.
    #[must_use]
    pub fn profit_loss_percent(&self, position: &Position) -> f64 {
        if position.buy_price == 0.0 || !position.buy_price.is_finite() {
            return 0.0;
        }
        let pct = (self.effective_price(position) - position.buy_price) / position.buy_price * 100.0;
        if pct.is_finite() {
            pct
        } else {
            0.0
        }
    }

    /// Portfolio totals. An empty portfolio (or one with nothing invested)
    /// reports a 0% return.
    #[must_use]
    pub fn totals(&self, positions: &[Position]) -> PortfolioTotals {
        let total_value: f64 = positions.iter().map(|p| self.value(p)).sum();
        let total_invested: f64 = positions.iter().map(|p| self.invested(p)).sum();
        let total_pl = total_value - total_invested;
        let total_pl_percent = if total_invested > 0.0 {
            total_pl / total_invested * 100.0
        } else {
            0.0
        };

        PortfolioTotals {
            total_value,
            total_invested,
            total_pl,
            total_pl_percent,
        }
    }
}

impl Default for ValuationService {
    fn default() -> Self {
        Self::new()
    }
}

