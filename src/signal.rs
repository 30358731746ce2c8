//! Single-shot waits over store streams, and the two-way race.
//!
//! Every lifecycle state arms exactly one of these: a wait for the first
//! qualifying value on one stream, or a race between two waits. Dropping
//! the returned future is the cancellation path - leaving a state cancels
//! its armed wait by construction.

use derive_more::{Display, Error};
use std::future::Future;
use tokio::sync::watch;

/// The watched stream's producer went away before a qualifying value arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
#[display("Subscription ended before a qualifying value arrived")]
pub struct SignalLost;

/// Waits for the first value matching `pred`, starting with the current one.
///
/// Resolves at most once per call; callers that need a second qualifying
/// value must call again. Cancel by dropping the future.
pub async fn first_match<T, F>(
    rx: &mut watch::Receiver<T>,
    pred: F,
) -> Result<T, SignalLost>
where
    T: Clone,
    F: FnMut(&T) -> bool,
{
    match rx.wait_for(pred).await {
        Ok(value) => Ok(value.clone()),
        Err(_) => Err(SignalLost),
    }
}

/// Winner of a two-way race.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum First<A, B> {
    /// The first future resolved first.
    Left(A),
    /// The second future resolved first.
    Right(B),
}

/// Races two futures, returning whichever resolves first and dropping the
/// loser. When both are immediately ready, the first argument wins - callers
/// put the "someone else already did this" observation there so a client
/// never produces work it has seen completed.
pub async fn select_first<A, B>(
    a: impl Future<Output = A>,
    b: impl Future<Output = B>,
) -> First<A, B> {
    tokio::select! {
        biased;
        value = a => First::Left(value),
        value = b => First::Right(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_match_sees_current_value() {
        let (_tx, mut rx) = watch::channel(5);
        let value = first_match(&mut rx, |v| *v == 5).await.unwrap();
        assert_eq!(value, 5);
    }

    #[tokio::test]
    async fn first_match_waits_for_qualifying_value() {
        let (tx, mut rx) = watch::channel(0);
        let wait = tokio::spawn(async move { first_match(&mut rx, |v| *v >= 3).await });

        tx.send(1).unwrap();
        tx.send(2).unwrap();
        tx.send(3).unwrap();

        assert_eq!(wait.await.unwrap().unwrap(), 3);
    }

    #[tokio::test]
    async fn first_match_resolves_once_despite_later_values() {
        let (tx, mut rx) = watch::channel(10);
        let value = first_match(&mut rx, |v| *v >= 10).await.unwrap();
        tx.send(20).unwrap();
        tx.send(30).unwrap();
        // The wait already resolved with the value it saw first.
        assert_eq!(value, 10);
    }

    #[tokio::test]
    async fn first_match_reports_lost_producer() {
        let (tx, mut rx) = watch::channel(0);
        drop(tx);
        assert_eq!(first_match(&mut rx, |v| *v == 1).await, Err(SignalLost));
    }

    #[tokio::test]
    async fn select_first_prefers_left_on_tie() {
        let winner = select_first(async { "left" }, async { "right" }).await;
        assert_eq!(winner, First::Left("left"));
    }

    #[tokio::test]
    async fn select_first_takes_whichever_resolves() {
        let winner = select_first(
            std::future::pending::<()>(),
            async { 7 },
        )
        .await;
        assert_eq!(winner, First::Right(7));
    }
}
