use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::models::types::PriceBound;

/// Book prices recorded after a placed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub bid: PriceBound,
    pub ask: PriceBound,
    /// Midpoint of bid and ask; `None` while either side is empty.
    pub mid: Option<Decimal>,
    /// Price of the most recent execution, if any.
    pub market: Option<i64>,
}

impl Snapshot {
    pub fn capture(bid: PriceBound, ask: PriceBound, market: Option<i64>) -> Self {
        let mid = match (bid, ask) {
            (PriceBound::At(bid), PriceBound::At(ask)) => {
                Some((Decimal::from(bid) + Decimal::from(ask)) / Decimal::from(2))
            }
            _ => None,
        };
        Self { bid, ask, mid, market }
    }

    /// Ask minus bid, when both sides are present. Widened so any pair of
    /// `i64` prices fits.
    pub fn spread(&self) -> Option<i128> {
        match (self.bid, self.ask) {
            (PriceBound::At(bid), PriceBound::At(ask)) => Some(i128::from(ask) - i128::from(bid)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_mid_is_exact_half() {
        let snapshot = Snapshot::capture(PriceBound::At(100), PriceBound::At(103), Some(101));
        assert_eq!(snapshot.mid, Some(dec!(101.5)));
        assert_eq!(snapshot.spread(), Some(3));
    }

    #[test]
    fn test_mid_undefined_with_empty_side() {
        let snapshot = Snapshot::capture(PriceBound::NoBid, PriceBound::At(103), None);
        assert_eq!(snapshot.mid, None);
        assert_eq!(snapshot.spread(), None);
    }

    #[test]
    fn test_extreme_prices() {
        let snapshot = Snapshot::capture(PriceBound::At(-10), PriceBound::At(i64::MAX), None);
        assert_eq!(snapshot.spread(), Some(i128::from(i64::MAX) + 10));

        let snapshot = Snapshot::capture(PriceBound::At(i64::MIN), PriceBound::At(i64::MAX), None);
        assert_eq!(snapshot.spread(), Some(i128::from(u64::MAX)));
        assert_eq!(snapshot.mid, Some(dec!(-0.5)));
    }
}
