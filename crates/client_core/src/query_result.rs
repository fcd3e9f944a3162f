/// State of one read operation as seen by the view.
///
/// Starts `Pending` on mount and settles on `Failed` or `Ready`. An empty
/// `Ready` is a valid result, not an error. Only a fresh fetch moves it back
/// to `Pending`.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult<T> {
    Pending,
    Failed(String),
    Ready(Vec<T>),
}

impl<T> Default for QueryResult<T> {
    fn default() -> Self {
        Self::Pending
    }
}

impl<T> QueryResult<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn items(&self) -> Option<&[T]> {
        match self {
            Self::Ready(items) => Some(items),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message),
            _ => None,
        }
    }
}

impl<T, E: std::fmt::Display> From<Result<Vec<T>, E>> for QueryResult<T> {
    fn from(value: Result<Vec<T>, E>) -> Self {
        match value {
            Ok(items) => Self::Ready(items),
            Err(err) => Self::Failed(err.to_string()),
        }
    }
}
