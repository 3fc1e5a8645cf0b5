pub mod clock;
pub mod pagination;
pub mod test_utils;

pub use clock::{Clock, FixedClock, SystemClock};
pub use pagination::{Page, PageRequest};
