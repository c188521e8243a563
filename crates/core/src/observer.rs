/// Receives simulation events and decides whether the run should continue.
///
/// Simulations emit one event per committed step. An observer can record
/// trajectories, log diagnostics, or stop the run by returning a
/// simulation-specific action.
///
/// Closures implement `Observer` directly, and `()` is the observer that
/// never acts.
pub trait Observer<E, A> {
    /// Observes an event and optionally returns an action.
    fn observe(&mut self, event: &E) -> Option<A>;
}

impl<E, A, F> Observer<E, A> for F
where
    F: FnMut(&E) -> Option<A>,
{
    fn observe(&mut self, event: &E) -> Option<A> {
        self(event)
    }
}

impl<E, A> Observer<E, A> for () {
    fn observe(&mut self, _event: &E) -> Option<A> {
        None
    }
}
