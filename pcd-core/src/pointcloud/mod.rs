pub mod dimension;
pub mod extra_bytes;
pub mod point;
