pub mod binance_poller;
pub mod ticker_response;

pub use binance_poller::BinanceTickerSource;
pub use ticker_response::TickerResponse;
