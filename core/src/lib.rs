pub mod discovery;
pub mod identify;
pub mod network;
pub mod scanner;
pub mod secrets;
