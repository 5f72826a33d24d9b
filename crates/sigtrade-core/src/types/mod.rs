//! Core data types: enums, the active-trade and settings records, order wire
//! types, and symbol normalization.

pub mod enums;
pub mod symbol;
pub mod trading;

pub use enums::*;
pub use symbol::*;
pub use trading::*;
