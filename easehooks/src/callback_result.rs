use crate::CallbackError;

/// Conversion from whatever a wrapped callback returns into the outcome its
/// promise settles with.
///
/// Plain values resolve, `Err` and `None` reject.
pub trait CallbackResult<T> {
    fn into_result(self) -> Result<T, CallbackError>;
}

impl<T> CallbackResult<T> for T {
    fn into_result(self) -> Result<T, CallbackError> {
        Ok(self)
    }
}

impl<T, E> CallbackResult<T> for Result<T, E>
where
    E: ToString,
{
    fn into_result(self) -> Result<T, CallbackError> {
        self.map_err(|error| CallbackError::Error(error.to_string()))
    }
}

impl<T> CallbackResult<T> for Option<T> {
    fn into_result(self) -> Result<T, CallbackError> {
        self.ok_or(CallbackError::None)
    }
}
