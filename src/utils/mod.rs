pub mod balance;
pub mod config;
pub mod depth;
