use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;

use crate::cache::store::CoordinationStore;
use crate::models::errors::LiveError;

/// How long a completion marker stays visible to waiting workers.
const COMPLETION_MARKER_TTL: Duration = Duration::from_secs(600);
/// Base interval between marker polls; each wait adds jitter and grows.
const WAIT_BASE_INTERVAL: Duration = Duration::from_millis(250);
const WAIT_MAX_INTERVAL: Duration = Duration::from_secs(5);

/// Outcome of a leader-elected task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaderOutcome {
    /// This worker won the lease and ran the work.
    Led,
    /// Another worker ran the work; its completion marker was observed.
    Followed,
}

/// Lease-based distributed lock plus leader election over any
/// `CoordinationStore`. Leases self-expire; renewal is an efficiency
/// concern, not a correctness one.
#[derive(Clone)]
pub struct LockService<S: CoordinationStore> {
    store: S,
    owner: String,
}

impl<S: CoordinationStore> LockService<S> {
    pub fn new(store: S, owner: String) -> Self {
        Self { store, owner }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub async fn acquire(&self, key: &str, ttl: Duration) -> Result<bool, LiveError> {
        self.store.acquire(key, &self.owner, ttl).await
    }

    pub async fn release(&self, key: &str) -> Result<bool, LiveError> {
        self.store.release(key, &self.owner).await
    }

    /// Marks a leader-elected task as finished so waiting workers stop
    /// polling and read the shared result from cache.
    pub async fn mark_complete(&self, task: &str) -> Result<(), LiveError> {
        self.store
            .set_raw(&Self::marker_key(task), &self.owner, COMPLETION_MARKER_TTL)
            .await
    }

    /// Bounded poll for another worker's completion marker, backing off with
    /// jitter between checks. `CoordinationTimeout` once `wait` is exhausted.
    pub async fn wait_for_completion(&self, task: &str, wait: Duration) -> Result<(), LiveError> {
        let deadline = Instant::now() + wait;
        let mut interval = WAIT_BASE_INTERVAL;
        loop {
            if self
                .store
                .get_raw(&Self::marker_key(task))
                .await?
                .is_some()
            {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(LiveError::CoordinationTimeout(format!(
                    "task '{}' not completed within {:?}",
                    task, wait
                )));
            }
            let jitter = rand::thread_rng().gen_range(0..=interval.as_millis() as u64 / 2);
            tokio::time::sleep_until(
                (Instant::now() + interval + Duration::from_millis(jitter)).min(deadline),
            )
            .await;
            interval = (interval * 2).min(WAIT_MAX_INTERVAL);
        }
    }

    /// Leader election around an expensive shared task: the lease winner runs
    /// `work` and publishes a completion marker; every other worker waits for
    /// the marker (up to `wait`) instead of recomputing.
    pub async fn run_as_leader<F, Fut>(
        &self,
        task: &str,
        lease: Duration,
        wait: Duration,
        work: F,
    ) -> Result<LeaderOutcome, LiveError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), LiveError>>,
    {
        // Already done by an earlier leader: read the shared result.
        if self
            .store
            .get_raw(&Self::marker_key(task))
            .await?
            .is_some()
        {
            return Ok(LeaderOutcome::Followed);
        }
        let lock_key = format!("lock:{}", task);
        if self.acquire(&lock_key, lease).await? {
            tracing::info!("Won leadership for task '{}'", task);
            let result = work().await;
            match &result {
                Ok(()) => self.mark_complete(task).await?,
                Err(e) => {
                    tracing::error!("Leader work for '{}' failed: {}", task, e);
                }
            }
            let _ = self.release(&lock_key).await;
            result.map(|_| LeaderOutcome::Led)
        } else {
            tracing::info!("Another worker leads task '{}', waiting for marker", task);
            self.wait_for_completion(task, wait).await?;
            Ok(LeaderOutcome::Followed)
        }
    }

    fn marker_key(task: &str) -> String {
        format!("{}:complete", task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::MemoryStore;

    #[tokio::test]
    async fn concurrent_acquires_resolve_to_one_winner() {
        let store = MemoryStore::new();
        let a = LockService::new(store.clone(), "worker-a".into());
        let b = LockService::new(store, "worker-b".into());

        let (ra, rb) = tokio::join!(
            a.acquire("lock:sample", Duration::from_secs(30)),
            b.acquire("lock:sample", Duration::from_secs(30)),
        );
        let wins = [ra.unwrap(), rb.unwrap()];
        assert_eq!(wins.iter().filter(|w| **w).count(), 1);
    }

    #[tokio::test]
    async fn loser_observes_completion_marker() {
        let store = MemoryStore::new();
        let winner = LockService::new(store.clone(), "worker-a".into());
        let loser = LockService::new(store, "worker-b".into());

        assert!(winner
            .acquire("lock:sample:gw3", Duration::from_secs(30))
            .await
            .unwrap());
        winner.mark_complete("sample:gw3").await.unwrap();

        loser
            .wait_for_completion("sample:gw3", Duration::from_secs(2))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn wait_times_out_without_marker() {
        let store = MemoryStore::new();
        let service = LockService::new(store, "worker-a".into());
        let err = service
            .wait_for_completion("never", Duration::from_millis(300))
            .await
            .unwrap_err();
        assert!(matches!(err, LiveError::CoordinationTimeout(_)));
    }

    #[tokio::test]
    async fn follower_runs_no_work() {
        let store = MemoryStore::new();
        let leader = LockService::new(store.clone(), "worker-a".into());
        let follower = LockService::new(store, "worker-b".into());

        let outcome = leader
            .run_as_leader("build", Duration::from_secs(30), Duration::from_secs(1), || async {
                Ok(())
            })
            .await
            .unwrap();
        assert_eq!(outcome, LeaderOutcome::Led);

        let ran = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let ran_clone = ran.clone();
        let outcome = follower
            .run_as_leader("build", Duration::from_secs(30), Duration::from_secs(1), || async move {
                ran_clone.store(true, std::sync::atomic::Ordering::SeqCst);
                Ok(())
            })
            .await
            .unwrap();
        assert_eq!(outcome, LeaderOutcome::Followed);
        assert!(!ran.load(std::sync::atomic::Ordering::SeqCst));
    }
}
