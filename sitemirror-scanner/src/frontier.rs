use crate::request::{Label, Request};
use std::collections::{HashSet, VecDeque};
use tokio::sync::{Mutex, Notify};
use tracing::debug;
use url::Url;

pub const DEFAULT_BUDGET: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Accepted,
    Duplicate,
    BudgetExceeded,
}

#[derive(Debug, Default)]
struct FrontierState {
    seen: HashSet<String>,
    pending: VecDeque<Request>,
    accepted: usize,
    in_flight: usize,
}

/// Deduplicating FIFO of pending requests shared by every worker.
///
/// The seen-set, the budget counter and the in-flight count live behind one
/// lock, so a URL can only ever be accepted once and the number of accepted
/// requests never exceeds the budget. Every accepted request is dispatched
/// exactly once.
pub struct Frontier {
    state: Mutex<FrontierState>,
    notify: Notify,
    budget: usize,
}

impl Frontier {
    pub fn new(budget: usize) -> Self {
        Self {
            state: Mutex::new(FrontierState::default()),
            notify: Notify::new(),
            budget,
        }
    }

    /// Duplicates are checked before the budget, so they never consume it.
    pub async fn enqueue(&self, url: Url, label: Label) -> EnqueueOutcome {
        let request = Request::new(url, label);
        let outcome = {
            let mut state = self.state.lock().await;
            if state.seen.contains(request.key()) {
                EnqueueOutcome::Duplicate
            } else if state.accepted >= self.budget {
                EnqueueOutcome::BudgetExceeded
            } else {
                state.seen.insert(request.key().to_string());
                state.accepted += 1;
                state.pending.push_back(request.clone());
                EnqueueOutcome::Accepted
            }
        };

        match outcome {
            EnqueueOutcome::Accepted => {
                debug!("Queued {} ({})", request.url, request.label);
                self.notify.notify_waiters();
            }
            EnqueueOutcome::Duplicate => debug!("Already seen {}", request.url),
            EnqueueOutcome::BudgetExceeded => {
                debug!("Budget exhausted, dropping {}", request.url)
            }
        }
        outcome
    }

    /// Next pending request, waiting while other workers still have fetches
    /// in flight that may discover more work. Returns `None` once the queue
    /// is empty and nothing is in flight: the crawl's terminal state.
    ///
    /// Every `Some` must be paired with a later call to [`Frontier::complete`].
    pub async fn dequeue(&self) -> Option<Request> {
        loop {
            // Registered before inspecting the state so a wakeup sent between
            // the check and the await is not lost.
            let notified = self.notify.notified();
            {
                let mut state = self.state.lock().await;
                if let Some(request) = state.pending.pop_front() {
                    state.in_flight += 1;
                    return Some(request);
                }
                if state.in_flight == 0 {
                    drop(state);
                    self.notify.notify_waiters();
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Mark one dispatched request as finished.
    pub async fn complete(&self) {
        {
            let mut state = self.state.lock().await;
            state.in_flight = state.in_flight.saturating_sub(1);
        }
        self.notify.notify_waiters();
    }

    pub async fn remaining_budget(&self) -> usize {
        let state = self.state.lock().await;
        self.budget.saturating_sub(state.accepted)
    }

    pub async fn accepted_count(&self) -> usize {
        self.state.lock().await.accepted
    }

    pub async fn pending_count(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    pub fn budget(&self) -> usize {
        self.budget
    }
}

impl Default for Frontier {
    fn default() -> Self {
        Self::new(DEFAULT_BUDGET)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn url(path: &str) -> Url {
        Url::parse(&format!("https://ex.com{}", path)).unwrap()
    }

    #[tokio::test]
    async fn test_enqueue_dedup_ignores_label() {
        let frontier = Frontier::new(10);
        assert_eq!(
            frontier.enqueue(url("/a.png"), Label::Image).await,
            EnqueueOutcome::Accepted
        );
        assert_eq!(
            frontier.enqueue(url("/a.png"), Label::Html).await,
            EnqueueOutcome::Duplicate
        );
        assert_eq!(frontier.pending_count().await, 1);
    }

    #[tokio::test]
    async fn test_budget_drops_new_urls() {
        let frontier = Frontier::new(2);
        frontier.enqueue(url("/1"), Label::Html).await;
        frontier.enqueue(url("/2"), Label::Html).await;
        assert_eq!(
            frontier.enqueue(url("/3"), Label::Html).await,
            EnqueueOutcome::BudgetExceeded
        );
        assert_eq!(frontier.remaining_budget().await, 0);
        assert_eq!(frontier.pending_count().await, 2);
    }

    #[tokio::test]
    async fn test_duplicate_does_not_consume_budget() {
        let frontier = Frontier::new(2);
        frontier.enqueue(url("/1"), Label::Html).await;
        for _ in 0..5 {
            frontier.enqueue(url("/1"), Label::Css).await;
        }
        assert_eq!(frontier.remaining_budget().await, 1);
        assert_eq!(
            frontier.enqueue(url("/2"), Label::Html).await,
            EnqueueOutcome::Accepted
        );
    }

    #[tokio::test]
    async fn test_duplicate_reported_after_budget_exhausted() {
        let frontier = Frontier::new(1);
        frontier.enqueue(url("/1"), Label::Html).await;
        assert_eq!(
            frontier.enqueue(url("/1"), Label::Html).await,
            EnqueueOutcome::Duplicate
        );
    }

    #[tokio::test]
    async fn test_dequeue_is_fifo() {
        let frontier = Frontier::new(10);
        for path in ["/a", "/b", "/c"] {
            frontier.enqueue(url(path), Label::Html).await;
        }
        let mut order = Vec::new();
        while let Some(request) = frontier.dequeue().await {
            order.push(request.url.path().to_string());
            frontier.complete().await;
        }
        assert_eq!(order, vec!["/a", "/b", "/c"]);
    }

    #[tokio::test]
    async fn test_dequeue_empty_frontier_terminates() {
        let frontier = Frontier::new(10);
        assert!(frontier.dequeue().await.is_none());
    }

    #[tokio::test]
    async fn test_dequeue_waits_for_in_flight_work() {
        let frontier = Arc::new(Frontier::new(10));
        frontier.enqueue(url("/seed"), Label::Html).await;
        let seed = frontier.dequeue().await.unwrap();
        assert_eq!(seed.url.path(), "/seed");

        let waiter = {
            let frontier = frontier.clone();
            tokio::spawn(async move { frontier.dequeue().await })
        };

        tokio::task::yield_now().await;
        frontier.enqueue(url("/found"), Label::Html).await;
        frontier.complete().await;

        let next = waiter.await.unwrap().unwrap();
        assert_eq!(next.url.path(), "/found");
        frontier.complete().await;
        assert!(frontier.dequeue().await.is_none());
    }

    #[tokio::test]
    async fn test_idle_waiters_released_at_terminal_state() {
        let frontier = Arc::new(Frontier::new(10));
        frontier.enqueue(url("/seed"), Label::Html).await;
        frontier.dequeue().await.unwrap();

        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let frontier = frontier.clone();
                tokio::spawn(async move { frontier.dequeue().await })
            })
            .collect();

        tokio::task::yield_now().await;
        frontier.complete().await;

        for waiter in waiters {
            assert!(waiter.await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn test_concurrent_enqueue_of_same_url_accepts_once() {
        let frontier = Arc::new(Frontier::new(100));
        let handles: Vec<_> = (0..32)
            .map(|_| {
                let frontier = frontier.clone();
                tokio::spawn(async move { frontier.enqueue(url("/same"), Label::Image).await })
            })
            .collect();

        let mut accepted = 0;
        for handle in handles {
            if handle.await.unwrap() == EnqueueOutcome::Accepted {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 1);
        assert_eq!(frontier.accepted_count().await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_enqueue_respects_budget() {
        let frontier = Arc::new(Frontier::new(25));
        let handles: Vec<_> = (0..100)
            .map(|i| {
                let frontier = frontier.clone();
                tokio::spawn(async move { frontier.enqueue(url(&format!("/{}", i)), Label::Html).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let mut dispatched = HashSet::new();
        while let Some(request) = frontier.dequeue().await {
            assert!(dispatched.insert(request.url.to_string()));
            frontier.complete().await;
        }
        assert_eq!(dispatched.len(), 25);
    }
}
