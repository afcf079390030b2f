/// Activities: dynamic values that may still be pending or have failed.
///
/// An [`Activity`] is a [`Var`] over [`State`]. Pending and failure are
/// ordinary states of the value, so they flow through `map`/`collect`
/// like any other update.
use std::fmt;
use std::sync::Arc;

use crate::var::{Observation, Var};

/// Why an activity (or an address) failed. Compared by message.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Failure(Arc<str>);

impl Failure {
    pub fn new(message: impl fmt::Display) -> Self {
        Self(Arc::from(message.to_string()))
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Failure").field(&&*self.0).finish()
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Current state of an [`Activity`].
#[derive(Debug, Clone, PartialEq)]
pub enum State<T> {
    Pending,
    Ok(T),
    Failed(Failure),
}

impl<T> State<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, State::Ok(_))
    }

    /// Map the `Ok` payload, passing pending and failure through.
    pub fn map<U>(&self, f: impl FnOnce(&T) -> U) -> State<U> {
        match self {
            State::Pending => State::Pending,
            State::Ok(value) => State::Ok(f(value)),
            State::Failed(failure) => State::Failed(failure.clone()),
        }
    }
}

/// A dynamically-updating value that may be pending or failed.
pub struct Activity<T> {
    var: Var<State<T>>,
}

impl<T> Clone for Activity<T> {
    fn clone(&self) -> Self {
        Self {
            var: self.var.clone(),
        }
    }
}

impl<T> Activity<T>
where
    T: Clone + PartialEq + Send + 'static,
{
    pub fn from_var(var: Var<State<T>>) -> Self {
        Self { var }
    }

    /// An activity that has not produced a value yet.
    pub fn pending() -> Self {
        Self::from_var(Var::new(State::Pending))
    }

    /// An activity already holding `value`.
    pub fn value(value: T) -> Self {
        Self::from_var(Var::new(State::Ok(value)))
    }

    pub fn failed(failure: Failure) -> Self {
        Self::from_var(Var::new(State::Failed(failure)))
    }

    pub fn var(&self) -> &Var<State<T>> {
        &self.var
    }

    pub fn sample(&self) -> State<T> {
        self.var.sample()
    }

    /// Move to a new state. Returns `false` when nothing changed.
    pub fn set(&self, state: State<T>) -> bool {
        self.var.update(state)
    }

    pub fn observe<F>(&self, f: F) -> Observation
    where
        F: Fn(&State<T>) + Send + Sync + 'static,
    {
        self.var.observe(f)
    }

    /// Derive an activity mapping the `Ok` payload.
    pub fn map<U, F>(&self, f: F) -> Activity<U>
    where
        U: Clone + PartialEq + Send + 'static,
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        Activity::from_var(self.var.map(move |state| state.map(&f)))
    }
}

impl<T> fmt::Debug for Activity<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Activity").field(&self.var).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_passes_pending_and_failure_through() {
        let activity: Activity<u32> = Activity::pending();
        let doubled = activity.map(|v| v * 2);
        assert_eq!(doubled.sample(), State::Pending);

        activity.set(State::Ok(4));
        assert_eq!(doubled.sample(), State::Ok(8));

        activity.set(State::Failed(Failure::new("lookup timed out")));
        assert_eq!(
            doubled.sample(),
            State::Failed(Failure::new("lookup timed out"))
        );
    }

    #[test]
    fn failures_compare_by_message() {
        let activity: Activity<u32> = Activity::failed(Failure::new("nxdomain"));
        assert!(!activity.set(State::Failed(Failure::new("nxdomain"))));
        assert!(activity.set(State::Failed(Failure::new("refused"))));
    }

    #[test]
    fn only_ok_is_ok() {
        assert!(State::Ok(1u8).is_ok());
        assert!(!State::<u8>::Pending.is_ok());
        assert!(!State::<u8>::Failed(Failure::new("refused")).is_ok());
    }
}
