//! Time-based and state-based events during integration.
//!
//! Periodic events fire at fixed intervals; the solver clamps its step so it
//! lands exactly on each scheduled time, where the callback may update the
//! model and the state. Continuous events watch a scalar condition for a
//! sign change across each accepted step and localize the crossing on the
//! step's interpolant, so event times are resolved far below the step size.

use crate::{OdeModel, dense::DenseOutput, state::OdeState};

/// What a triggered continuous event does to the integration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventAction {
    /// Keep integrating.
    Continue,
    /// Stop at the crossing; the solution ends there.
    Terminate,
}

/// Fixed-interval callback.
pub struct PeriodicEvent<Model, State> {
    pub period: f64,
    pub f: fn(&mut Model, f64, &mut State),
    next_time: f64,
}

impl<Model, State> PeriodicEvent<Model, State> {
    pub fn new(period: f64, f: fn(&mut Model, f64, &mut State)) -> Self {
        Self { period, f, next_time: f64::INFINITY }
    }
}

/// Zero-crossing watcher on a scalar condition of `(t, y)`.
pub struct ContinuousEvent<Model, State> {
    pub condition: fn(f64, &State) -> f64,
    pub action: fn(&mut Model, f64, &State) -> EventAction,
}

impl<Model, State> ContinuousEvent<Model, State> {
    pub fn new(
        condition: fn(f64, &State) -> f64,
        action: fn(&mut Model, f64, &State) -> EventAction,
    ) -> Self {
        Self { condition, action }
    }
}

/// All events registered for one integration.
pub struct EventManager<Model, State>
where
    Model: OdeModel<State = State>,
    State: OdeState,
{
    pub periodic_events: Vec<PeriodicEvent<Model, State>>,
    pub continuous_events: Vec<ContinuousEvent<Model, State>>,
}

impl<Model, State> EventManager<Model, State>
where
    Model: OdeModel<State = State>,
    State: OdeState,
{
    pub fn new() -> Self {
        Self {
            periodic_events: Vec::new(),
            continuous_events: Vec::new(),
        }
    }

    pub fn add_periodic(&mut self, event: PeriodicEvent<Model, State>) {
        self.periodic_events.push(event);
    }

    pub fn add_continuous(&mut self, event: ContinuousEvent<Model, State>) {
        self.continuous_events.push(event);
    }

    pub fn is_empty(&self) -> bool {
        self.periodic_events.is_empty() && self.continuous_events.is_empty()
    }

    /// Schedules each periodic event's first activation after `t0`.
    pub(crate) fn initialize(&mut self, t0: f64) {
        for event in &mut self.periodic_events {
            event.next_time = t0 + event.period;
        }
    }

    /// Earliest scheduled periodic activation, or infinity when none.
    pub(crate) fn next_time(&self) -> f64 {
        self.periodic_events
            .iter()
            .map(|event| event.next_time)
            .fold(f64::INFINITY, f64::min)
    }

    /// Fires every periodic event scheduled at `t` and advances its
    /// schedule. The solver only calls this at step boundaries, so callbacks
    /// are free to modify the state.
    pub(crate) fn handle_periodic(&mut self, model: &mut Model, t: f64, y: &mut State) {
        for event in &mut self.periodic_events {
            if (t - event.next_time).abs() <= 1e-12 * t.abs().max(1.0) {
                (event.f)(model, t, y);
                event.next_time += event.period;
            }
        }
    }

    /// Checks every continuous event across an accepted step and runs the
    /// actions of those that crossed. Returns the earliest terminal
    /// crossing, if any.
    pub(crate) fn handle_continuous<const S: usize, const D: usize>(
        &mut self,
        model: &mut Model,
        interpolant: &DenseOutput<State, S, D>,
        span: (f64, f64),
        y0: &State,
        y1: &State,
    ) -> Option<f64> {
        let mut stop: Option<f64> = None;
        for event in &self.continuous_events {
            let g0 = (event.condition)(span.0, y0);
            let g1 = (event.condition)(span.1, y1);
            if !crossed(g0, g1) {
                continue;
            }
            let t_cross = bisect(
                |t| (event.condition)(t, &interpolant.evaluate(t)),
                span.0,
                span.1,
                g0,
            );
            let y_cross = interpolant.evaluate(t_cross);
            if (event.action)(model, t_cross, &y_cross) == EventAction::Terminate {
                stop = Some(stop.map_or(t_cross, |prev: f64| prev.min(t_cross)));
            }
        }
        stop
    }
}

impl<Model, State> Default for EventManager<Model, State>
where
    Model: OdeModel<State = State>,
    State: OdeState,
{
    fn default() -> Self {
        Self::new()
    }
}

fn crossed(g0: f64, g1: f64) -> bool {
    (g0 < 0.0) != (g1 < 0.0) || (g0 != 0.0 && g1 == 0.0)
}

/// Bisection on a bracketed sign change. The condition is evaluated through
/// the interpolant, so each probe is cheap; the iteration cap pins the
/// crossing to machine precision long before it is reached.
fn bisect<F>(mut g: F, mut a: f64, mut b: f64, ga: f64) -> f64
where
    F: FnMut(f64) -> f64,
{
    let mut fa = ga;
    for _ in 0..64 {
        let mid = 0.5 * (a + b);
        let fm = g(mid);
        if fm == 0.0 {
            return mid;
        }
        if (fa < 0.0) == (fm < 0.0) {
            a = mid;
            fa = fm;
        } else {
            b = mid;
        }
        if b - a <= f64::EPSILON * a.abs().max(b.abs()).max(1.0) {
            break;
        }
    }
    0.5 * (a + b)
}
