pub mod password;

pub use password::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Stored password hash is corrupted")]
    CorruptedHash,

    #[error("Stored password salt has length {0}, expected {SALT_LENGTH}")]
    InvalidSaltLength(usize),
}
