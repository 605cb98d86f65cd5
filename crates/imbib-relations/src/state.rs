//! Fetch state machine
//!
//! A fetch cycle starts `Pending` and ends in exactly one of `Success` or
//! `Failure`. Terminal results are never mutated; a reload starts a new cycle
//! with a new `FetchResult`.
//!
//! ```text
//! NotLoaded ──load──▶ Pending ──▶ Success | Failure
//!                        │
//!                     cancel
//!                        ▼
//!                    Cancelled ──load──▶ Pending
//! ```

use std::sync::Arc;

use crate::error::FetchError;

/// Outcome of one fetch cycle
#[derive(Debug, Clone, PartialEq)]
pub enum FetchResult<T> {
    Pending,
    Success(T),
    Failure(FetchError),
}

impl<T> FetchResult<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, FetchResult::Pending)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_pending()
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            FetchResult::Success(value) => Some(value),
            FetchResult::Pending | FetchResult::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match self {
            FetchResult::Failure(error) => Some(error),
            FetchResult::Pending | FetchResult::Success(_) => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FetchResult<U> {
        match self {
            FetchResult::Pending => FetchResult::Pending,
            FetchResult::Success(value) => FetchResult::Success(f(value)),
            FetchResult::Failure(error) => FetchResult::Failure(error),
        }
    }

    /// Check whether a transition within the same cycle is legal
    pub fn can_transition_to<U>(&self, target: &FetchResult<U>) -> bool {
        matches!(
            (self, target),
            (FetchResult::Pending, FetchResult::Success(_))
                | (FetchResult::Pending, FetchResult::Failure(_))
        )
    }
}

impl<T, E: Into<FetchError>> From<Result<T, E>> for FetchResult<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => FetchResult::Success(value),
            Err(error) => FetchResult::Failure(error.into()),
        }
    }
}

/// Observable state of a coordinator's slot
#[derive(Debug, Clone, PartialEq)]
pub enum RelationState<T> {
    /// No cycle has ever been started
    NotLoaded,
    /// The last cycle was cancelled before it completed
    Cancelled,
    /// A cycle is running or has finished
    Loaded(FetchResult<T>),
}

impl<T> RelationState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, RelationState::Loaded(FetchResult::Pending))
    }

    /// True when a new cycle may be started by a plain load
    pub fn is_idle(&self) -> bool {
        matches!(self, RelationState::NotLoaded | RelationState::Cancelled)
    }

    pub fn as_result(&self) -> Option<&FetchResult<T>> {
        match self {
            RelationState::Loaded(result) => Some(result),
            RelationState::NotLoaded | RelationState::Cancelled => None,
        }
    }
}

impl<E> RelationState<Arc<Vec<E>>> {
    /// Loaded successfully but nothing was found
    pub fn is_empty_success(&self) -> bool {
        match self {
            RelationState::Loaded(FetchResult::Success(entries)) => entries.is_empty(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        let pending: FetchResult<Vec<u32>> = FetchResult::Pending;
        assert!(pending.can_transition_to(&FetchResult::Success(vec![1])));
        assert!(pending.can_transition_to::<Vec<u32>>(&FetchResult::Failure(FetchError::Timeout)));
        assert!(!pending.can_transition_to::<Vec<u32>>(&FetchResult::Pending));

        let done: FetchResult<Vec<u32>> = FetchResult::Success(vec![]);
        assert!(done.is_terminal());
        assert!(!done.can_transition_to::<Vec<u32>>(&FetchResult::Pending));
        assert!(!done.can_transition_to(&FetchResult::Success(vec![2])));
    }

    #[test]
    fn test_from_result_and_map() {
        let ok: FetchResult<u32> = Ok::<u32, FetchError>(2).into();
        assert_eq!(ok.clone().map(|v| v * 2).value(), Some(&4));

        let err: FetchResult<u32> = Err::<u32, FetchError>(FetchError::RateLimited).into();
        assert_eq!(err.error(), Some(&FetchError::RateLimited));
        assert!(err.value().is_none());
    }

    #[test]
    fn test_relation_state_helpers() {
        let empty: RelationState<Arc<Vec<u32>>> =
            RelationState::Loaded(FetchResult::Success(Arc::new(vec![])));
        assert!(empty.is_empty_success());
        assert!(!empty.is_loading());

        let loading: RelationState<Arc<Vec<u32>>> = RelationState::Loaded(FetchResult::Pending);
        assert!(loading.is_loading());
        assert!(!loading.is_empty_success());

        assert!(RelationState::<Vec<u32>>::NotLoaded.is_idle());
        assert!(RelationState::<Vec<u32>>::Cancelled.is_idle());
        assert!(RelationState::<Vec<u32>>::Cancelled.as_result().is_none());
    }
}
