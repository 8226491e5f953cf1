use std::sync::Arc;

use tokio::sync::mpsc::Sender;
use tokio::sync::Semaphore;

use super::recover_block;
use crate::cbc;
use crate::config::Config;
use crate::errors::AttackError;
use crate::oracle::Oracle;
use crate::progress::Progress;

///forges a ciphertext the oracle's companion decryptor will decode to the
///given plaintext, without the key
pub async fn forge<O: Oracle>(
    plaintext: &[u8],
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
    let padded = cbc::pkcs_pad(plaintext, blk_len);
    let total = padded.len() / blk_len;

    let oracle = Arc::new(oracle);
    let permits = Arc::new(Semaphore::new(config.max_workers));
    let zero = vec![0u8; blk_len];

    // assembled right to left, rightmost block first. the trailing block is
    // arbitrary (its own decryption is garbage nothing reads back), so zeros
    // do fine; the first assembled block ends up playing the iv role
    let mut assembled: Vec<Vec<u8>> = vec![zero.clone()];
    let mut next = zero.clone();
    for (index, target) in padded.chunks(blk_len).enumerate().rev() {
        let _ = progress
            .send(Progress::BlockStarted {
                index: total - index,
                total,
            })
            .await;
        // a zeroed previous block makes the engine hand back the raw
        // block-decryption of `next`
        let inter = recover_block(&zero, &next, &oracle, &permits, &progress).await?;
        next = cbc::xor_blocks(target, &inter);
        assembled.push(next.clone());
    }
    assembled.reverse();
    Ok(assembled.concat())
}
