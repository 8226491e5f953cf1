pub const BLOCK_LEN: usize = 16;

pub const MAX_WORKERS: usize = 20;

#[derive(Debug, Clone)]
pub struct Config {
    pub block_len: usize,
    pub max_workers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            block_len: BLOCK_LEN,
            max_workers: MAX_WORKERS,
        }
    }
}
