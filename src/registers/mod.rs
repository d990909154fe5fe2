//! Register definitions for the SX127x radio in LoRa mode
//! Generated from the SX1276/77/78/79 datasheet, rev. 7

mod dio;
pub mod map;
mod rf;
mod system;

pub use dio::*;
pub use map::{addr, lookup, Access, RegisterInfo, MAX_ADDRESS, REGISTER_MAP};
pub use rf::*;
pub use system::*;
