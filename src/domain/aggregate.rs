//! Bounded aggregation over an unbounded, batch-producing stream
//!
//! `take_until` is the one place where a live source is turned into a finite value: it
//! stops at a count, a wall-clock deadline, a cancellation, or the end of the stream,
//! whichever happens first.

use tokio::time::Instant;
use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Limit,
    Deadline,
    Cancelled,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bounded<T> {
    pub items: Vec<T>,
    pub stop: StopReason,
}

/// Collects items in arrival order until one of the bounds is hit.
///
/// A batch that crosses `max_items` is cut at exactly `max_items`. An upstream error is
/// returned as-is and discards whatever was collected so far.
pub async fn take_until<S, T, E>(
    stream: &mut S,
    max_items: usize,
    deadline: Instant,
    cancel: &CancellationToken,
) -> Result<Bounded<T>, E>
where
    S: Stream<Item = Result<Vec<T>, E>> + Unpin,
{
    let mut items = Vec::new();
    if max_items == 0 {
        return Ok(Bounded {
            items,
            stop: StopReason::Limit,
        });
    }

    let sleep = tokio::time::sleep_until(deadline);
    tokio::pin!(sleep);

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Ok(Bounded { items, stop: StopReason::Cancelled });
            }
            _ = &mut sleep => {
                return Ok(Bounded { items, stop: StopReason::Deadline });
            }
            next = stream.next() => next,
        };

        let Some(batch) = next else {
            return Ok(Bounded {
                items,
                stop: StopReason::Closed,
            });
        };

        for item in batch? {
            items.push(item);
            if items.len() >= max_items {
                return Ok(Bounded {
                    items,
                    stop: StopReason::Limit,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc;
    use tokio_stream::wrappers::ReceiverStream;

    use super::*;

    fn deadline_in(seconds: u64) -> Instant {
        Instant::now() + Duration::from_secs(seconds)
    }

    #[tokio::test]
    async fn cuts_the_crossing_batch_at_the_limit() {
        let mut stream = tokio_stream::iter(vec![
            Ok::<_, String>(vec![1, 2, 3]),
            Ok(vec![4, 5, 6]),
            Ok(vec![7]),
        ]);

        let bounded = take_until(&mut stream, 5, deadline_in(5), &CancellationToken::new())
            .await
            .expect("no upstream error");

        assert_eq!(bounded.items, vec![1, 2, 3, 4, 5]);
        assert_eq!(bounded.stop, StopReason::Limit);
    }

    #[tokio::test]
    async fn reports_closed_when_the_stream_ends_first() {
        let mut stream = tokio_stream::iter(vec![Ok::<_, String>(vec![1]), Ok(vec![]), Ok(vec![2])]);

        let bounded = take_until(&mut stream, 10, deadline_in(5), &CancellationToken::new())
            .await
            .expect("no upstream error");

        assert_eq!(bounded.items, vec![1, 2]);
        assert_eq!(bounded.stop, StopReason::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_returns_partial_items() {
        let (sender, receiver) = mpsc::channel(4);
        sender
            .send(Ok::<_, String>(vec!["a", "b"]))
            .await
            .expect("send batch");
        let mut stream = ReceiverStream::new(receiver);

        let bounded = take_until(&mut stream, 10, deadline_in(5), &CancellationToken::new())
            .await
            .expect("no upstream error");

        assert_eq!(bounded.items, vec!["a", "b"]);
        assert_eq!(bounded.stop, StopReason::Deadline);
        drop(sender);
    }

    #[tokio::test(start_paused = true)]
    async fn caller_cancellation_wins_over_the_deadline() {
        let cancel = CancellationToken::new();
        let mut stream = tokio_stream::iter(vec![Ok::<_, String>(vec![1])])
            .chain(tokio_stream::pending());

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let bounded = take_until(&mut stream, 10, deadline_in(5), &cancel)
            .await
            .expect("no upstream error");

        assert_eq!(bounded.items, vec![1]);
        assert_eq!(bounded.stop, StopReason::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn upstream_error_is_returned() {
        let mut stream = tokio_stream::iter(vec![Ok(vec![1]), Err("boom".to_string())]);

        let error = take_until(&mut stream, 10, deadline_in(5), &CancellationToken::new())
            .await
            .expect_err("upstream error");

        assert_eq!(error, "boom");
    }

    #[tokio::test]
    async fn zero_limit_stops_immediately() {
        let mut stream = tokio_stream::pending::<Result<Vec<u8>, String>>();

        let bounded = take_until(&mut stream, 0, deadline_in(5), &CancellationToken::new())
            .await
            .expect("no upstream error");

        assert!(bounded.items.is_empty());
        assert_eq!(bounded.stop, StopReason::Limit);
    }
}
