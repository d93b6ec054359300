//! Ordered application of route units against the server instance

use tracing::{debug, error};

use super::context::{Lifecycle, StopReason};
use crate::error::LifecycleError;

/// Second stage of a route unit: mutates the server's routing table.
pub trait ApplyRoutes<S> {
    fn apply(self: Box<Self>, lifecycle: &Lifecycle, server: &mut S) -> anyhow::Result<()>;
}

impl<S, F> ApplyRoutes<S> for F
where
    F: FnOnce(&Lifecycle, &mut S) -> anyhow::Result<()>,
{
    fn apply(self: Box<Self>, lifecycle: &Lifecycle, server: &mut S) -> anyhow::Result<()> {
        (*self)(lifecycle, server)
    }
}

/// A caller-supplied unit of route registration.
///
/// `init` sees the lifecycle first (to spawn background work bound to it,
/// for instance) and yields the applier that registers the routes.
pub trait RouteUnit<S> {
    fn init(self: Box<Self>, lifecycle: &Lifecycle) -> Box<dyn ApplyRoutes<S>>;
}

impl<S, F, A> RouteUnit<S> for F
where
    F: FnOnce(&Lifecycle) -> A,
    A: ApplyRoutes<S> + 'static,
{
    fn init(self: Box<Self>, lifecycle: &Lifecycle) -> Box<dyn ApplyRoutes<S>> {
        Box::new((*self)(lifecycle))
    }
}

/// Apply `units` in order. Returns the number of units applied.
///
/// The first failure terminates the lifecycle; the remaining units are
/// never initialised.
pub fn register_routes<S, I>(
    lifecycle: &Lifecycle,
    server: &mut S,
    units: I,
) -> Result<usize, LifecycleError>
where
    I: IntoIterator<Item = Box<dyn RouteUnit<S>>>,
{
    let mut applied = 0;
    for (position, unit) in units.into_iter().enumerate() {
        let apply = unit.init(lifecycle);
        if let Err(source) = apply.apply(lifecycle, server) {
            lifecycle.terminate(StopReason::RegistrationFailed);
            error!(position, error = %source, "Error in setting routes");
            return Err(LifecycleError::Registration { position, source });
        }
        applied += 1;
    }
    debug!(units = applied, "routes registered");
    Ok(applied)
}
