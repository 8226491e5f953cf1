//! padding-oracle attacks against cbc mode with pkcs#5/7 padding, assuming
//! the iv rides in front of the ciphertext as its first block

pub mod attack;
pub mod cbc;
pub mod config;
pub mod encode;
pub mod errors;
pub mod oracle;
pub mod progress;

pub use attack::decrypt::decrypt;
pub use attack::forge::forge;
pub use config::{Config, BLOCK_LEN, MAX_WORKERS};
pub use errors::AttackError;
pub use oracle::{HttpOracle, Oracle, Verdict};
pub use progress::Progress;
