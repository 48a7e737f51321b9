//! Simulation Event Delivery
//!
//! Fan-out of engine output to any number of observers, plus a broadcast
//! channel for async consumers. Delivery order within a tick is attacks,
//! then RSUs, then stats.
use crate::attack_sim::{AttackEvent, SimulationStats};
use crate::types::Rsu;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// Buffered events per broadcast receiver before it starts lagging
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum SimulationEvent {
    AttackGenerated(AttackEvent),
    RsusUpdated(Vec<Rsu>),
    StatsUpdated(SimulationStats),
}

type Observer<T> = Arc<dyn Fn(&T) + Send + Sync>;

pub struct EventBus {
    attack_observers: Mutex<Vec<Observer<AttackEvent>>>,
    rsu_observers: Mutex<Vec<Observer<[Rsu]>>>,
    stats_observers: Mutex<Vec<Observer<SimulationStats>>>,
    sender: broadcast::Sender<SimulationEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            attack_observers: Mutex::new(Vec::new()),
            rsu_observers: Mutex::new(Vec::new()),
            stats_observers: Mutex::new(Vec::new()),
            sender,
        }
    }

    pub fn on_attack_generated<F>(&self, observer: F)
    where
        F: Fn(&AttackEvent) + Send + Sync + 'static,
    {
        lock(&self.attack_observers).push(Arc::new(observer));
    }

    pub fn on_rsus_updated<F>(&self, observer: F)
    where
        F: Fn(&[Rsu]) + Send + Sync + 'static,
    {
        lock(&self.rsu_observers).push(Arc::new(observer));
    }

    pub fn on_stats_updated<F>(&self, observer: F)
    where
        F: Fn(&SimulationStats) + Send + Sync + 'static,
    {
        lock(&self.stats_observers).push(Arc::new(observer));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SimulationEvent> {
        self.sender.subscribe()
    }

    pub fn observer_count(&self) -> usize {
        lock(&self.attack_observers).len() + lock(&self.rsu_observers).len() + lock(&self.stats_observers).len()
    }

    /// Deliver events in order. Must not be called with engine state locked:
    /// observers may call back into the engine.
    pub fn publish(&self, events: Vec<SimulationEvent>) {
        for event in events {
            match &event {
                SimulationEvent::AttackGenerated(attack) => {
                    for observer in snapshot(&self.attack_observers) {
                        observer(attack);
                    }
                }
                SimulationEvent::RsusUpdated(rsus) => {
                    for observer in snapshot(&self.rsu_observers) {
                        observer(rsus.as_slice());
                    }
                }
                SimulationEvent::StatsUpdated(stats) => {
                    for observer in snapshot(&self.stats_observers) {
                        observer(stats);
                    }
                }
            }

            // No receivers is not an error
            let _ = self.sender.send(event);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Clone the observer list so callbacks run without the list locked
fn snapshot<T: ?Sized>(observers: &Mutex<Vec<Observer<T>>>) -> Vec<Observer<T>> {
    lock(observers).clone()
}
