pub mod observations_repo;
pub mod signals_repo;

pub use observations_repo::ObservationsRepository;
pub use signals_repo::SignalsRepository;
