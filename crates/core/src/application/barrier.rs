// Join barrier for the fan-out stages

use futures::stream::{self, StreamExt, TryStreamExt};
use std::future::Future;

/// Dispatches N branches and resolves only once all N outcomes are in.
///
/// Branches may finish in any order; outcomes are returned in dispatch order.
#[derive(Debug, Clone, Copy)]
pub struct JoinBarrier {
    limit: Option<usize>,
}

impl JoinBarrier {
    /// Every branch runs concurrently
    pub fn unbounded() -> Self {
        Self { limit: None }
    }

    /// At most `limit` branches in flight (values below 1 are treated as 1)
    pub fn bounded(limit: usize) -> Self {
        Self {
            limit: Some(limit.max(1)),
        }
    }

    /// Await every branch. The first `Err` interrupts the barrier: no further
    /// branch is dispatched and the error is returned.
    pub async fn try_join<T, E, Fut>(&self, branches: Vec<Fut>) -> Result<Vec<T>, E>
    where
        Fut: Future<Output = Result<T, E>>,
    {
        let expected = branches.len();
        let limit = self.limit.unwrap_or(expected).max(1);

        let mut outcomes: Vec<(usize, T)> = stream::iter(
            branches
                .into_iter()
                .enumerate()
                .map(|(index, branch)| async move { branch.await.map(|outcome| (index, outcome)) }),
        )
        .buffer_unordered(limit)
        .try_collect()
        .await?;

        debug_assert_eq!(outcomes.len(), expected);
        outcomes.sort_by_key(|(index, _)| *index);
        Ok(outcomes.into_iter().map(|(_, outcome)| outcome).collect())
    }
}
