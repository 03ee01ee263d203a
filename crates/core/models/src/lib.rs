pub use iso8601_timestamp;

pub mod v0;
