//! The actor runtime: one long-running worker per active component.
//!
//! [`Simulation`] owns the three actors and their threads:
//!
//! - the **drive loop** ticks the vehicle manager every `tick_ms`;
//! - the **generate loop** tops up the passenger queue and registers new
//!   ride requests every `generate_ms`;
//! - the **matcher loop** drains the event mailbox, using `recv_timeout` as
//!   a shutdown-aware selector.
//!
//! Shutdown is cooperative: every loop checks a shared flag each iteration,
//! and [`Simulation::shutdown`] flips it and joins all workers. The renderer
//! is a fourth, external task that polls the `snapshot_*` methods at its own
//! interval.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info};

use crate::fleet::VehicleManager;
use crate::geo::Coordinate;
use crate::matcher::{MatcherEvent, RideMatcher};
use crate::passenger::PassengerQueue;
use crate::route_model::RouteModel;
use crate::scenario::SimParams;
use crate::snapshot::{PassengerSnapshot, VehicleSnapshot};

#[derive(Debug)]
pub struct Simulation {
    params: SimParams,
    model: Arc<RouteModel>,
    fleet: Arc<Mutex<VehicleManager>>,
    queue: Arc<Mutex<PassengerQueue>>,
    matcher: Arc<Mutex<RideMatcher>>,
    matcher_tx: Sender<MatcherEvent>,
    matcher_rx: Option<Receiver<MatcherEvent>>,
    running: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
}

impl Simulation {
    pub(crate) fn new(
        params: SimParams,
        model: Arc<RouteModel>,
        fleet: Arc<Mutex<VehicleManager>>,
        queue: Arc<Mutex<PassengerQueue>>,
        matcher_tx: Sender<MatcherEvent>,
        matcher_rx: Receiver<MatcherEvent>,
    ) -> Self {
        Self {
            params,
            model,
            fleet,
            queue,
            matcher: Arc::new(Mutex::new(RideMatcher::new())),
            matcher_tx,
            matcher_rx: Some(matcher_rx),
            running: Arc::new(AtomicBool::new(false)),
            workers: Vec::new(),
        }
    }

    /// Spawn the three worker threads. A simulation starts once; the mailbox
    /// receiver moves into the matcher worker.
    pub fn start(&mut self) {
        let Some(rx) = self.matcher_rx.take() else {
            debug!("simulation already started");
            return;
        };
        self.running.store(true, Ordering::SeqCst);
        info!(
            vehicles = self.params.max_vehicles,
            passengers = self.params.max_passengers,
            "simulation starting"
        );

        let running = self.running.clone();
        let fleet = self.fleet.clone();
        let tick = Duration::from_millis(self.params.tick_ms);
        self.workers.push(
            thread::Builder::new()
                .name("drive-loop".into())
                .spawn(move || {
                    while running.load(Ordering::SeqCst) {
                        fleet.lock().expect("vehicle manager lock").tick();
                        thread::sleep(tick);
                    }
                })
                .expect("spawn drive-loop"),
        );

        let running = self.running.clone();
        let queue = self.queue.clone();
        let pause = Duration::from_millis(self.params.generate_ms);
        self.workers.push(
            thread::Builder::new()
                .name("generate-loop".into())
                .spawn(move || {
                    while running.load(Ordering::SeqCst) {
                        {
                            let mut queue = queue.lock().expect("passenger queue lock");
                            queue.top_up();
                            queue.request_pending();
                        }
                        thread::sleep(pause);
                    }
                })
                .expect("spawn generate-loop"),
        );

        let running = self.running.clone();
        let matcher = self.matcher.clone();
        let queue = self.queue.clone();
        let fleet = self.fleet.clone();
        let poll = Duration::from_millis(self.params.match_poll_ms.max(1));
        self.workers.push(
            thread::Builder::new()
                .name("match-loop".into())
                .spawn(move || {
                    while running.load(Ordering::SeqCst) {
                        match rx.recv_timeout(poll) {
                            Ok(event) => matcher
                                .lock()
                                .expect("ride matcher lock")
                                .handle_event(event, &queue, &fleet),
                            Err(RecvTimeoutError::Timeout) => {}
                            Err(RecvTimeoutError::Disconnected) => break,
                        }
                    }
                })
                .expect("spawn match-loop"),
        );
    }

    /// Flip the shared flag and join every worker. Idempotent.
    pub fn shutdown(&mut self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                debug!("worker panicked before shutdown");
            }
        }
        info!("simulation stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start, run for `duration` of wall-clock time, and shut down.
    pub fn run_for(&mut self, duration: Duration) {
        self.start();
        thread::sleep(duration);
        self.shutdown();
    }

    // ── Render snapshot API ────────────────────────────────────────────

    /// Every intersection on the map, in node-id order. Immutable after
    /// init, so the renderer may cache it.
    pub fn snapshot_intersections(&self) -> Vec<Coordinate> {
        self.model.nodes().to_vec()
    }

    pub fn snapshot_vehicles(&self) -> Vec<VehicleSnapshot> {
        let fleet = self.fleet.lock().expect("vehicle manager lock");
        fleet
            .vehicles()
            .iter()
            .map(|v| VehicleSnapshot {
                id: v.id,
                position: v.position,
                state: v.state,
                color: v.passenger.as_ref().map(|p| p.color),
            })
            .collect()
    }

    pub fn snapshot_new_passengers(&self) -> Vec<PassengerSnapshot> {
        let queue = self.queue.lock().expect("passenger queue lock");
        queue
            .new_passengers()
            .iter()
            .map(|p| PassengerSnapshot {
                id: p.id,
                start: p.start,
                destination: p.destination,
                color: p.color,
            })
            .collect()
    }

    // ── Component handles (tests and embedding hosts) ──────────────────

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    pub fn model(&self) -> &Arc<RouteModel> {
        &self.model
    }

    pub fn fleet(&self) -> &Arc<Mutex<VehicleManager>> {
        &self.fleet
    }

    pub fn queue(&self) -> &Arc<Mutex<PassengerQueue>> {
        &self.queue
    }

    pub fn matcher(&self) -> &Arc<Mutex<RideMatcher>> {
        &self.matcher
    }

    pub fn matcher_sender(&self) -> Sender<MatcherEvent> {
        self.matcher_tx.clone()
    }

    /// Completed rides so far (forwarded from the vehicle manager).
    pub fn rides_completed(&self) -> u64 {
        self.fleet
            .lock()
            .expect("vehicle manager lock")
            .rides_completed()
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        self.shutdown();
    }
}
