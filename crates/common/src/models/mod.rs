pub mod direction;
pub mod observation;
pub mod prediction;
pub mod price_history;
pub mod signal;

pub use direction::{Action, Direction, ParseLabelError};
pub use observation::Observation;
pub use prediction::{Outlook, Prediction};
pub use price_history::PriceHistory;
pub use signal::Signal;
