pub mod data_manager;
pub mod db;
pub mod error;
pub mod repositories;

pub use data_manager::DataManager;
pub use error::StoreError;
