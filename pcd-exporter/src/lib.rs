pub mod error;
pub mod extra_bytes;
pub mod geokeys;
pub mod las;

pub use error::ExportError;
