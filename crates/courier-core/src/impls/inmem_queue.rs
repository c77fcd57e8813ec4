//! InMemoryTaskQueue - 開発・テスト用の配送キュー
//!
//! # 実装詳細
//! - HashMap<DeliveryId, TaskEntry> で dedup と attempt カウントを管理
//! - enqueue ごとに redelivery driver を 1 本 spawn し、webhook への
//!   POST を `RedeliveryDispatch` 経由で行う
//! - 2xx で完了、それ以外は `BackoffPolicy` の遅延を挟んで再送、
//!   max_attempts で打ち切り
//!
//! Durability はない（プロセスと共に消える）。本番ではマネージドキューの
//! アダプタを `TaskQueue` port に差し込む。

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::{AttemptStats, DeliveryId};
use crate::impls::BackoffPolicy;
use crate::ports::{QueueError, QueueTask, TaskQueue};

/// How a scheduled redelivery reaches the webhook.
///
/// The managed-service equivalent is the queue's HTTP push; tests plug in
/// a recording stub, the server plugs in a loopback HTTP POST.
#[async_trait]
pub trait RedeliveryDispatch: Send + Sync {
    /// Deliver one payload; returns the webhook's HTTP status.
    async fn dispatch(&self, webhook_path: &str, payload: &[u8]) -> Result<u16, QueueError>;
}

#[derive(Debug)]
struct TaskEntry {
    attempts: u32,
    done: bool,
}

/// In-memory `TaskQueue`: dedup by id, live attempt counter, spawned
/// redelivery driver per task.
pub struct InMemoryTaskQueue {
    tasks: Arc<Mutex<HashMap<DeliveryId, TaskEntry>>>,
    dispatch: Arc<dyn RedeliveryDispatch>,
    max_attempts: u32,
    backoff: BackoffPolicy,
}

impl InMemoryTaskQueue {
    pub fn new(
        max_attempts: u32,
        backoff: BackoffPolicy,
        dispatch: Arc<dyn RedeliveryDispatch>,
    ) -> Self {
        Self {
            tasks: Arc::new(Mutex::new(HashMap::new())),
            dispatch,
            max_attempts,
            backoff,
        }
    }

    /// Has the task with this id finished (delivered or exhausted)?
    pub fn is_settled(&self, id: &DeliveryId) -> bool {
        let tasks = self.tasks.lock().unwrap();
        tasks
            .get(id)
            .map(|entry| entry.done || entry.attempts >= self.max_attempts)
            .unwrap_or(false)
    }
}

#[async_trait]
impl TaskQueue for InMemoryTaskQueue {
    async fn enqueue(&self, task: QueueTask) -> Result<(), QueueError> {
        {
            let mut tasks = self.tasks.lock().unwrap();
            if tasks.contains_key(&task.id) {
                // Same id, same schedule: the contract is dedup-by-id.
                debug!(id = %task.id, "duplicate enqueue suppressed");
                return Ok(());
            }
            tasks.insert(
                task.id.clone(),
                TaskEntry {
                    attempts: 0,
                    done: false,
                },
            );
        }

        tokio::spawn(run_redeliveries(
            Arc::clone(&self.tasks),
            Arc::clone(&self.dispatch),
            self.backoff.clone(),
            self.max_attempts,
            task,
        ));
        Ok(())
    }

    async fn attempt_stats(&self, id: &DeliveryId) -> AttemptStats {
        let tasks = self.tasks.lock().unwrap();
        let attempts = tasks.get(id).map(|entry| entry.attempts).unwrap_or(0);
        AttemptStats::new(attempts, self.max_attempts)
    }
}

/// Drives one task to completion or exhaustion.
async fn run_redeliveries(
    tasks: Arc<Mutex<HashMap<DeliveryId, TaskEntry>>>,
    dispatch: Arc<dyn RedeliveryDispatch>,
    backoff: BackoffPolicy,
    max_attempts: u32,
    task: QueueTask,
) {
    for attempt in 1..=max_attempts {
        {
            // カウントは dispatch の前に上げる: webhook 側から見た
            // attempt_stats が「いま何回目か」を答えられるように。
            let mut tasks = tasks.lock().unwrap();
            if let Some(entry) = tasks.get_mut(&task.id) {
                entry.attempts = attempt;
            }
        }

        match dispatch.dispatch(&task.webhook_path, &task.payload).await {
            Ok(status) if (200..300).contains(&status) => {
                let mut tasks = tasks.lock().unwrap();
                if let Some(entry) = tasks.get_mut(&task.id) {
                    entry.done = true;
                }
                debug!(id = %task.id, attempt, "task delivered");
                return;
            }
            Ok(status) => {
                warn!(id = %task.id, attempt, status, "webhook reported failure");
            }
            Err(error) => {
                warn!(id = %task.id, attempt, %error, "webhook call failed");
            }
        }

        if attempt < max_attempts {
            tokio::time::sleep(backoff.next_delay(attempt)).await;
        }
    }

    warn!(id = %task.id, max_attempts, "task exhausted its attempt budget");
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    struct ScriptedDispatch {
        // Statuses to hand out in order; the last one repeats.
        script: Mutex<VecDeque<u16>>,
        calls: AtomicUsize,
    }

    impl ScriptedDispatch {
        fn new(script: &[u16]) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.iter().copied().collect()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RedeliveryDispatch for ScriptedDispatch {
        async fn dispatch(&self, _webhook_path: &str, _payload: &[u8]) -> Result<u16, QueueError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            let status = if script.len() > 1 {
                script.pop_front().unwrap()
            } else {
                *script.front().unwrap()
            };
            Ok(status)
        }
    }

    fn fast_backoff() -> BackoffPolicy {
        BackoffPolicy::new(Duration::from_millis(5), 1.0)
    }

    fn task(id: &str) -> QueueTask {
        QueueTask {
            id: DeliveryId::from(id),
            webhook_path: "/_ah/tasks/forward".to_string(),
            payload: b"{}".to_vec(),
        }
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached within 2s");
    }

    #[tokio::test]
    async fn duplicate_enqueue_creates_a_single_schedule() {
        let dispatch = ScriptedDispatch::new(&[200]);
        let queue = InMemoryTaskQueue::new(5, fast_backoff(), dispatch.clone());

        queue.enqueue(task("dup")).await.unwrap();
        queue.enqueue(task("dup")).await.unwrap();

        wait_until(|| queue.is_settled(&DeliveryId::from("dup"))).await;
        // Give a hypothetical second driver time to show itself.
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(dispatch.calls(), 1);
    }

    #[tokio::test]
    async fn redelivers_until_the_webhook_succeeds() {
        let dispatch = ScriptedDispatch::new(&[500, 500, 200]);
        let queue = InMemoryTaskQueue::new(5, fast_backoff(), dispatch.clone());

        queue.enqueue(task("eventually")).await.unwrap();
        wait_until(|| queue.is_settled(&DeliveryId::from("eventually"))).await;

        assert_eq!(dispatch.calls(), 3);
        let stats = queue.attempt_stats(&DeliveryId::from("eventually")).await;
        assert_eq!(stats, AttemptStats::new(3, 5));
        assert!(!stats.is_last_attempt());
    }

    #[tokio::test]
    async fn gives_up_when_the_budget_is_exhausted() {
        let dispatch = ScriptedDispatch::new(&[500]);
        let queue = InMemoryTaskQueue::new(2, fast_backoff(), dispatch.clone());

        queue.enqueue(task("hopeless")).await.unwrap();
        wait_until(|| dispatch.calls() == 2).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(dispatch.calls(), 2);
        let stats = queue.attempt_stats(&DeliveryId::from("hopeless")).await;
        assert!(stats.is_last_attempt());
    }

    #[tokio::test]
    async fn stats_for_an_unknown_id_do_not_read_as_last() {
        let dispatch = ScriptedDispatch::new(&[200]);
        let queue = InMemoryTaskQueue::new(5, fast_backoff(), dispatch);

        let stats = queue.attempt_stats(&DeliveryId::from("nobody")).await;
        assert_eq!(stats, AttemptStats::new(0, 5));
        assert!(!stats.is_last_attempt());
    }
}
