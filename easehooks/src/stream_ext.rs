use crate::{BatteryState, PermissionStatus, RequestState};
use futures_core::stream::Stream;
use pin_project::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

/// A state that eventually comes to rest.
///
/// A request is settled once it has succeeded or failed. The battery and a
/// permission are settled once the platform has answered.
pub trait Settles {
    fn is_settled(&self) -> bool;
}

impl<T, E> Settles for RequestState<T, E> {
    fn is_settled(&self) -> bool {
        self.is_complete()
    }
}

impl Settles for BatteryState {
    fn is_settled(&self) -> bool {
        matches!(self, BatteryState::Available(_) | BatteryState::Unavailable)
    }
}

impl Settles for PermissionStatus {
    fn is_settled(&self) -> bool {
        !matches!(self, PermissionStatus::Unknown)
    }
}

/// Combinators for streams of observed states.
pub trait StateStreamExt: Stream {
    /// Yields states up to and including the first settled one, then ends.
    ///
    /// ```
    /// use easehooks::{RequestState, StateStreamExt};
    /// use futures::StreamExt;
    ///
    /// # futures::executor::block_on(async {
    /// let states = futures::stream::iter(vec![
    ///     RequestState::<u8, ()>::Pending,
    ///     RequestState::Success(1),
    ///     RequestState::Pending,
    /// ]);
    /// let seen: Vec<_> = states.until_settled().collect().await;
    /// assert_eq!(seen, vec![RequestState::Pending, RequestState::Success(1)]);
    /// # });
    /// ```
    fn until_settled(self) -> UntilSettled<Self>
    where
        Self: Sized,
        Self::Item: Settles,
    {
        UntilSettled {
            states: self,
            done: false,
        }
    }

    /// Resolves with the next settled state, or `None` if the stream ends first.
    fn next_settled(&mut self) -> NextSettled<'_, Self>
    where
        Self: Unpin + Sized,
        Self::Item: Settles,
    {
        NextSettled { states: self }
    }
}

impl<T: ?Sized> StateStreamExt for T where T: Stream {}

/// Stream returned by [`StateStreamExt::until_settled`].
#[pin_project]
#[derive(Debug)]
#[must_use = "Streams do nothing unless polled"]
pub struct UntilSettled<St> {
    #[pin]
    states: St,
    done: bool,
}

impl<St> Stream for UntilSettled<St>
where
    St: Stream,
    St::Item: Settles,
{
    type Item = St::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        if *this.done {
            return Poll::Ready(None);
        }
        let state = ready!(this.states.poll_next(cx));
        *this.done = state.as_ref().map_or(true, Settles::is_settled);
        Poll::Ready(state)
    }
}

/// Future returned by [`StateStreamExt::next_settled`].
#[derive(Debug)]
#[must_use = "Futures do nothing unless polled"]
pub struct NextSettled<'a, St> {
    states: &'a mut St,
}

impl<St> Future for NextSettled<'_, St>
where
    St: Stream + Unpin,
    St::Item: Settles,
{
    type Output = Option<St::Item>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        loop {
            match ready!(Pin::new(&mut *self.states).poll_next(cx)) {
                Some(state) if state.is_settled() => return Poll::Ready(Some(state)),
                Some(_) => continue,
                None => return Poll::Ready(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BatteryData;
    use futures::StreamExt;

    type Text = RequestState<String, String>;

    #[tokio::test]
    async fn test_next_settled_skips_pending_states() {
        let mut states = futures::stream::iter(vec![
            Text::Pending,
            Text::Pending,
            Text::Error("down".to_string()),
            Text::Success("late".to_string()),
        ]);
        assert_eq!(
            states.next_settled().await,
            Some(Text::Error("down".to_string()))
        );
        assert_eq!(
            states.next_settled().await,
            Some(Text::Success("late".to_string()))
        );
        assert_eq!(states.next_settled().await, None);
    }

    #[tokio::test]
    async fn test_until_settled_ends_with_the_stream() {
        let seen: Vec<Text> = futures::stream::iter(vec![Text::Pending, Text::Pending])
            .until_settled()
            .collect()
            .await;
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn test_battery_settles_once_known() {
        assert!(!BatteryState::Unknown.is_settled());
        assert!(!BatteryState::Loading.is_settled());
        assert!(BatteryState::Unavailable.is_settled());
        assert!(BatteryState::Available(BatteryData {
            charging: true,
            charging_time: 0.0,
            discharging_time: f64::INFINITY,
            level: 1.0,
        })
        .is_settled());
    }
}
