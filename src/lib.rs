pub mod access;
pub mod audit;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod passgen;
pub mod vault;
