use crate::State;
use std::fmt;

/// Lifecycle status of one asynchronous request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestStatus {
    Pending,
    Success,
    Error,
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Success => "success",
            RequestStatus::Error => "error",
        };
        f.write_str(status)
    }
}

/// The state of one asynchronous request.
///
/// Data is only present on success and an error only on failure; the variant
/// alone decides which one is there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestState<T, E> {
    Pending,
    Success(T),
    Error(E),
}

/// Transitions accepted by [`RequestState::reduce`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestAction<T, E> {
    Reset,
    Start,
    ReceiveResponse(T),
    ReceiveError(E),
}

impl<T, E> RequestState<T, E> {
    /// Applies `action` and returns the next state.
    ///
    /// `Reset` and `Start` leave a pending state untouched and otherwise
    /// drop any data or error and return to pending.
    pub fn reduce(self, action: RequestAction<T, E>) -> Self {
        match action {
            RequestAction::Reset | RequestAction::Start => match self {
                RequestState::Pending => self,
                _ => RequestState::Pending,
            },
            RequestAction::ReceiveResponse(data) => RequestState::Success(data),
            RequestAction::ReceiveError(error) => RequestState::Error(error),
        }
    }

    pub fn status(&self) -> RequestStatus {
        match self {
            RequestState::Pending => RequestStatus::Pending,
            RequestState::Success(_) => RequestStatus::Success,
            RequestState::Error(_) => RequestStatus::Error,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, RequestState::Pending)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RequestState::Success(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, RequestState::Error(_))
    }

    /// Returns true once the request has either succeeded or failed.
    pub fn is_complete(&self) -> bool {
        !self.is_pending()
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            RequestState::Success(data) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&E> {
        match self {
            RequestState::Error(error) => Some(error),
            _ => None,
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            RequestState::Success(data) => Some(data),
            _ => None,
        }
    }

    pub fn into_result(self) -> Option<Result<T, E>> {
        match self {
            RequestState::Pending => None,
            RequestState::Success(data) => Some(Ok(data)),
            RequestState::Error(error) => Some(Err(error)),
        }
    }
}

impl<T, E> Default for RequestState<T, E> {
    fn default() -> Self {
        RequestState::Pending
    }
}

impl<T, E> State for RequestState<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
}
