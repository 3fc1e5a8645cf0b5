pub mod aggregator;
pub mod gate;

pub use aggregator::RatingAggregator;
pub use gate::ReviewGate;
