pub mod builder;
pub mod error;
pub mod gpstime;
pub mod runner;
pub mod transform;

pub use builder::{StageDescriptor, TransformBuilder};
pub use error::TransformError;
pub use runner::Transformer;
