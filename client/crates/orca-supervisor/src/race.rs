use std::future::Future;
use std::time::Duration;

/// Result of racing an event against a deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Race<T> {
    Event(T),
    TimedOut,
}

/// Resolve with whichever finishes first: `event` or a timer of `limit`.
///
/// The losing side is dropped, so nothing is left waiting once this returns.
pub async fn first_of<F>(limit: Duration, event: F) -> Race<F::Output>
where
    F: Future,
{
    tokio::select! {
        biased;
        value = event => Race::Event(value),
        _ = tokio::time::sleep(limit) => Race::TimedOut,
    }
}
