pub mod archive;
pub mod backup;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod logging;
pub mod restore;
