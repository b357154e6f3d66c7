//! The simulation engine for one vehicle
//!
//! All mutable state (vehicle state, drive controller, route cursor) lives in
//! one struct behind one mutex. The periodic ticker thread, `start`, `stop`
//! and `snapshot` all take that lock for their whole duration, so readers
//! never see half of an update. Nothing inside the lock does I/O; log output
//! for what happened during a step is written after the guard is released.

use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::collections::VecDeque;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::clock::{Clock, SystemClock};
use super::config::SimConfig;
use super::drivetrain::{shift, DriveControl};
use super::geo::Wgs84;
use super::route::{Route, RouteStep};
use super::types::{VehicleEvent, VehicleState, MAX_PENDING_EVENTS};

/// Handle of a running ticker thread. Dropping `cancel` ends the thread.
struct Ticker {
    cancel: Sender<()>,
    handle: JoinHandle<()>,
}

/// Everything a tick mutates, guarded as a single unit
struct Simulation {
    state: VehicleState,
    route: Route,
    control: DriveControl,
    last_position_time: u64,
    rng: Box<dyn RngCore + Send>,
    events: VecDeque<VehicleEvent>,
    /// Bumped on every start and stop so a cancelled ticker can tell it is stale
    generation: u64,
    ticker: Option<Ticker>,
}

impl Simulation {
    fn push_event(&mut self, event: VehicleEvent, fresh: &mut Vec<VehicleEvent>) {
        if self.events.len() >= MAX_PENDING_EVENTS {
            self.events.pop_front();
        }
        self.events.push_back(event.clone());
        fresh.push(event);
    }

    /// One simulation step at `now`. Does nothing while stopped.
    /// Returns the events raised by this step.
    fn step(&mut self, now: u64, config: &SimConfig) -> Vec<VehicleEvent> {
        let mut fresh = Vec::new();
        if !self.state.running {
            return fresh;
        }
        let params = &config.drivetrain;

        let now = now.max(self.state.time);
        let elapsed_secs = now.saturating_sub(self.last_position_time) as f64 / 1000.0;
        self.last_position_time = now;

        match self.route.advance(self.state.speed_kmh, elapsed_secs) {
            RouteStep::Moved(position) => self.state.position = position,
            RouteStep::WaypointReached { position, waypoint } => {
                self.state.position = position;
                self.push_event(
                    VehicleEvent::WaypointReached {
                        index: waypoint,
                        position,
                    },
                    &mut fresh,
                );
            }
            RouteStep::NoRoute { first_report } => {
                if first_report {
                    self.push_event(VehicleEvent::NoRoute, &mut fresh);
                }
            }
        }

        let speed = self.state.speed_kmh;
        if let Some(target) = self
            .control
            .maybe_retarget(speed, now, params, &mut *self.rng)
        {
            self.push_event(VehicleEvent::NewTarget { kmh: target }, &mut fresh);
        }
        self.state.speed_kmh = self.control.adjust_speed(speed, now, params);

        let (mut gear, mut rpm) = shift(self.state.speed_kmh, self.state.gear, params);
        if gear == 0 {
            // Engine running but standing still: first gear, idling at 0 rpm
            gear = 1;
            rpm = params.rpm_for(self.state.speed_kmh, gear);
        }
        self.state.gear = gear;
        self.state.rpm = rpm;

        self.state.time = now;
        fresh
    }
}

fn log_events(vehicle_id: &str, events: &[VehicleEvent]) {
    for event in events {
        match event {
            VehicleEvent::Started => info!("Vehicle {} started", vehicle_id),
            VehicleEvent::Stopped => info!("Vehicle {} stopped", vehicle_id),
            VehicleEvent::NoRoute => warn!(
                "Vehicle {} has no route with at least two waypoints, it does not know where to go",
                vehicle_id
            ),
            VehicleEvent::WaypointReached { index, position } => debug!(
                "Vehicle {} reached waypoint {} at {}",
                vehicle_id, index, position
            ),
            VehicleEvent::NewTarget { kmh } => {
                debug!("Vehicle {} new target speed {:.1} km/h", vehicle_id, kmh)
            }
        }
    }
}

/// Deadline after `previous` on the fixed-rate grid of `period`.
/// Slots that already passed by `now` are skipped instead of run back to back.
fn next_deadline(previous: Instant, now: Instant, period: Duration) -> Instant {
    let missed = now.saturating_duration_since(previous).as_nanos() / period.as_nanos().max(1);
    let slots = u32::try_from(missed + 1).unwrap_or(u32::MAX);
    previous + period * slots
}

/// Read-only parts plus the locked simulation, shared with the ticker thread
struct Shared {
    vehicle_id: String,
    config: SimConfig,
    clock: Arc<dyn Clock>,
    sim: Mutex<Simulation>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Simulation> {
        // A panic elsewhere must not stop readers from getting at the state
        self.sim.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn tick_generation(&self, generation: u64) {
        let events = {
            let mut sim = self.lock();
            if sim.generation != generation {
                return;
            }
            let now = self.clock.now_millis();
            sim.step(now, &self.config)
        };
        log_events(&self.vehicle_id, &events);
    }
}

/// A simulated vehicle driving its route in circles.
///
/// Commands and queries can be issued from any thread.
pub struct Vehicle {
    shared: Arc<Shared>,
}

impl Vehicle {
    /// Create a vehicle with default settings, the system clock and an
    /// OS-seeded random source
    pub fn new(vehicle_id: impl Into<String>, waypoints: Vec<Wgs84>) -> Self {
        Self::with_parts(
            vehicle_id,
            waypoints,
            SimConfig::default(),
            Arc::new(SystemClock),
            Box::new(StdRng::from_os_rng()),
        )
    }

    /// Create a vehicle whose target speeds are reproducible
    pub fn new_with_seed(vehicle_id: impl Into<String>, waypoints: Vec<Wgs84>, seed: u64) -> Self {
        Self::with_parts(
            vehicle_id,
            waypoints,
            SimConfig::default(),
            Arc::new(SystemClock),
            Box::new(StdRng::seed_from_u64(seed)),
        )
    }

    /// Create a vehicle from explicit parts. `config` is taken as is, call
    /// [`SimConfig::validate`] beforehand for untrusted input.
    pub fn with_parts(
        vehicle_id: impl Into<String>,
        waypoints: Vec<Wgs84>,
        config: SimConfig,
        clock: Arc<dyn Clock>,
        rng: Box<dyn RngCore + Send>,
    ) -> Self {
        let vehicle_id = vehicle_id.into();
        let route = Route::new(waypoints);
        let position = route.start_position().unwrap_or_default();
        let now = clock.now_millis();

        let sim = Simulation {
            state: VehicleState::new(vehicle_id.clone(), position, now),
            route,
            control: DriveControl::new(&config.drivetrain),
            last_position_time: now,
            rng,
            events: VecDeque::new(),
            generation: 0,
            ticker: None,
        };

        Self {
            shared: Arc::new(Shared {
                vehicle_id,
                config,
                clock,
                sim: Mutex::new(sim),
            }),
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.shared.config
    }

    pub fn vehicle_id(&self) -> &str {
        &self.shared.vehicle_id
    }

    pub fn is_running(&self) -> bool {
        self.shared.lock().state.running
    }

    /// Start driving. Does nothing if the vehicle is already running.
    ///
    /// The first step runs right away, later ones on a background thread at
    /// a fixed rate of one per tick period.
    pub fn start(&self) {
        let (events, spawned) = {
            let mut sim = self.shared.lock();
            if sim.state.running {
                return;
            }

            let now = self.shared.clock.now_millis();
            let mut events = Vec::new();
            sim.state.running = true;
            sim.last_position_time = now.max(sim.state.time);
            sim.generation += 1;
            sim.push_event(VehicleEvent::Started, &mut events);
            events.extend(sim.step(now, &self.shared.config));

            let generation = sim.generation;
            let (cancel, cancelled) = mpsc::channel::<()>();
            let period = Duration::from_millis(self.shared.config.tick_period_ms.max(1));
            let shared = Arc::clone(&self.shared);

            let spawned = thread::Builder::new()
                .name(format!("vehicle-{}", self.shared.vehicle_id))
                .spawn(move || {
                    let mut deadline = Instant::now() + period;
                    loop {
                        let wait = deadline.saturating_duration_since(Instant::now());
                        match cancelled.recv_timeout(wait) {
                            Err(RecvTimeoutError::Timeout) => {
                                shared.tick_generation(generation);
                                deadline = next_deadline(deadline, Instant::now(), period);
                            }
                            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                        }
                    }
                })
                .map(|handle| sim.ticker = Some(Ticker { cancel, handle }));

            (events, spawned)
        };

        log_events(&self.shared.vehicle_id, &events);
        if let Err(e) = spawned {
            error!(
                "Failed to spawn ticker for vehicle {}: {}",
                self.shared.vehicle_id, e
            );
        }
    }

    /// Stop driving. The gear drops to neutral, speed and position stay
    /// where they were. Does nothing if the vehicle is already stopped.
    pub fn stop(&self) {
        let (ticker, events) = {
            let mut sim = self.shared.lock();
            let ticker = sim.ticker.take();
            let mut events = Vec::new();
            if sim.state.running {
                sim.state.running = false;
                sim.state.gear = 0;
                sim.state.rpm = self.shared.config.drivetrain.rpm_for(sim.state.speed_kmh, 0);
                sim.generation += 1;
                sim.push_event(VehicleEvent::Stopped, &mut events);
            }
            (ticker, events)
        };

        log_events(&self.shared.vehicle_id, &events);

        // Joined outside the lock, the thread may be waiting for it
        if let Some(Ticker { cancel, handle }) = ticker {
            drop(cancel);
            if handle.thread().id() != thread::current().id() && handle.join().is_err() {
                warn!("Ticker thread panicked before it was stopped");
            }
        }
    }

    /// Owned copy of the current vehicle state
    pub fn snapshot(&self) -> VehicleState {
        self.shared.lock().state.clone()
    }

    /// Run one simulation step now, at the clock's current time.
    ///
    /// The ticker thread does this on its own; calling it by hand is useful
    /// for headless runs driven by a manual clock. Does nothing while stopped.
    pub fn tick(&self) {
        let events = {
            let mut sim = self.shared.lock();
            let now = self.shared.clock.now_millis();
            sim.step(now, &self.shared.config)
        };
        log_events(&self.shared.vehicle_id, &events);
    }

    /// Index of the waypoint passed last and kilometers driven since
    pub fn leg_progress(&self) -> (usize, f64) {
        let sim = self.shared.lock();
        (sim.route.current_leg_start(), sim.route.distance_on_leg_km())
    }

    /// Take all events raised since the last call, oldest first
    pub fn drain_events(&self) -> Vec<VehicleEvent> {
        self.shared.lock().events.drain(..).collect()
    }
}

impl Drop for Vehicle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_deadline_keeps_fixed_rate() {
        let start = Instant::now();
        let period = Duration::from_millis(10);

        // Tick finished early: the next slot is one period after the last one,
        // not one period after the tick finished
        let next = next_deadline(start, start + Duration::from_millis(3), period);
        assert_eq!(next, start + period);
    }

    #[test]
    fn test_next_deadline_skips_missed_slots() {
        let start = Instant::now();
        let period = Duration::from_millis(10);

        let next = next_deadline(start, start + Duration::from_millis(12), period);
        assert_eq!(next, start + Duration::from_millis(20));

        let next = next_deadline(start, start + Duration::from_millis(10), period);
        assert_eq!(next, start + Duration::from_millis(20));
    }
}
