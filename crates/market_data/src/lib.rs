pub mod error;
pub mod remote;
pub mod simulated;
pub mod traits;

pub use error::SourceError;
pub use remote::BinanceTickerSource;
pub use simulated::SimulatedSource;
pub use traits::MarketDataSource;
