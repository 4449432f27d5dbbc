pub mod reader;
pub mod review;

pub use reader::ReviewReader;
pub use review::Review;
