use thiserror::Error;

#[derive(Error, Debug)]
pub enum AttackError {
    #[error("invalid ciphertext: {0}")]
    InvalidCiphertext(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("oracle transport failure: {0}")]
    OracleTransport(String),
    #[error("no byte found at position {0}: every guess reported an invalid pad")]
    NoByteFound(usize),
    #[error("invalid pkcs#7 padding")]
    InvalidPad,
}
