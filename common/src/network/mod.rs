pub mod interface;
pub mod range;
pub mod target;
pub mod transport;
