use std::sync::Arc;

use tokio::sync::mpsc::Sender;
use tokio::sync::Semaphore;

use super::recover_block;
use crate::config::Config;
use crate::errors::AttackError;
use crate::oracle::Oracle;
use crate::progress::Progress;

///recovers the plaintext behind the ciphertext without the key. the result
///still carries its pkcs padding, callers strip it
pub async fn decrypt<O: Oracle>(
    ciphertext: &[u8],
    oracle: O,
    progress: Sender<Progress>,
    config: Config,
) -> Result<Vec<u8>, AttackError> {
    let blk_len = config.block_len;
    if blk_len < 2 {
        return Err(AttackError::InvalidInput(
            "block length must be at least 2".into(),
        ));
    }
    if ciphertext.len() % blk_len != 0 {
        return Err(AttackError::InvalidCiphertext(
            "length is not a multiple of the block length".into(),
        ));
    }
    let total = ciphertext.len() / blk_len;
    if total < 2 {
        return Err(AttackError::InvalidCiphertext(
            "need an IV and at least one block".into(),
        ));
    }

    let oracle = Arc::new(oracle);
    let permits = Arc::new(Semaphore::new(config.max_workers));
    let blocks: Vec<&[u8]> = ciphertext.chunks(blk_len).collect();
    let mut plaintext = Vec::with_capacity(ciphertext.len() - blk_len);
    for index in 1..total {
        let _ = progress
            .send(Progress::BlockStarted {
                index,
                total: total - 1,
            })
            .await;
        let block =
            recover_block(blocks[index - 1], blocks[index], &oracle, &permits, &progress).await?;
        plaintext.extend_from_slice(&block);
    }
    Ok(plaintext)
}
