use std::{future::Future, time::Duration};

use tokio::time::{timeout_at, Instant};

/// A fixed point in time after which in-flight work is abandoned.
///
/// One deadline is shared by every title lookup made for a single message, so
/// slow early links eat into the budget of later ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Deadline(Instant);

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("deadline exceeded")]
pub struct DeadlineExceeded;

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self(Instant::now() + budget)
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.0
    }

    pub fn remaining(&self) -> Duration {
        self.0.saturating_duration_since(Instant::now())
    }

    /// Drive `fut` until it completes or the deadline passes, whichever is first.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, DeadlineExceeded> {
        timeout_at(self.0, fut).await.map_err(|_| DeadlineExceeded)
    }
}
