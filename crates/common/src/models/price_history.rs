/// Time-ascending snapshot of recent prices for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceHistory {
    symbol: String,
    prices: Vec<f64>,
}

impl PriceHistory {
    pub fn new(symbol: impl Into<String>, prices: Vec<f64>) -> Self {
        Self {
            symbol: symbol.into(),
            prices,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn prices(&self) -> &[f64] {
        &self.prices
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn last(&self) -> Option<f64> {
        self.prices.last().copied()
    }
}
