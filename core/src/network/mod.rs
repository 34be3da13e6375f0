pub mod dial;
pub mod multicast;
