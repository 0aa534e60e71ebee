//! Core types for index keys and record identifiers.

mod direction;
mod id;
mod value;

pub use direction::Direction;
pub use id::RecordId;
pub use value::Value;
