pub mod error;
pub mod parsers;
pub mod validate;

pub use error::ParseError;
pub use validate::{capabilities, check_lidar_file, Capabilities};
