//! Host signals
//!
//! The host simulation reports world and vehicle lifecycle through
//! [`HostEvent`]s queued on an [`EventQueue`]. Events are either sent for
//! delivery on the next dispatch or posted for a later simulation time.

use crate::scene::InstanceKey;

/// Lifecycle signal from the host simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    /// The world finished loading; every vehicle's audio graph exists
    WorldLoaded,
    /// A vehicle was spawned (its audio graph may still be under construction)
    VehicleSpawned(InstanceKey),
    /// A vehicle is about to be destroyed
    VehicleDestroyed(InstanceKey),
    /// The host read an audio parameter of a vehicle
    AudioParameterRead(InstanceKey),
}

impl HostEvent {
    /// Vehicle the event concerns, if any
    pub fn instance(&self) -> Option<InstanceKey> {
        match self {
            Self::WorldLoaded => None,
            Self::VehicleSpawned(key) | Self::VehicleDestroyed(key) | Self::AudioParameterRead(key) => Some(*key),
        }
    }
}

/// Immediate and deferred queues of host events
#[derive(Debug, Default)]
pub struct EventQueue {
    immediate: Vec<HostEvent>,
    deferred: Vec<(f64, HostEvent)>,
    current_time: f64,
}

impl EventQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Update current time (seconds since start)
    pub fn update_time(&mut self, time: f64) {
        self.current_time = time;
    }

    /// Queue for the next dispatch
    pub fn send(&mut self, event: HostEvent) {
        // parameter reads arrive every frame; one per vehicle per dispatch is enough
        if matches!(event, HostEvent::AudioParameterRead(_)) && self.immediate.contains(&event) {
            return;
        }
        self.immediate.push(event);
    }

    /// Queue for delivery once `delivery_time` is reached
    pub fn post(&mut self, delivery_time: f64, event: HostEvent) {
        self.deferred.push((delivery_time, event));
    }

    /// Take every event due for delivery, immediate ones first
    pub fn drain_due(&mut self) -> Vec<HostEvent> {
        let mut due = std::mem::take(&mut self.immediate);
        let now = self.current_time;
        let mut i = 0;
        while i < self.deferred.len() {
            if self.deferred[i].0 <= now {
                due.push(self.deferred.remove(i).1);
            } else {
                i += 1;
            }
        }
        due
    }

    /// Number of queued events, deferred included
    pub fn len(&self) -> usize {
        self.immediate.len() + self.deferred.len()
    }

    /// Whether nothing is queued
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every queued event (e.g. when the world is torn down)
    pub fn clear(&mut self) {
        self.immediate.clear();
        self.deferred.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn test_immediate_before_deferred() {
        let mut keys: SlotMap<InstanceKey, ()> = SlotMap::with_key();
        let loco = keys.insert(());
        let mut queue = EventQueue::new();
        queue.post(1.0, HostEvent::AudioParameterRead(loco));
        queue.send(HostEvent::WorldLoaded);

        assert_eq!(queue.drain_due(), vec![HostEvent::WorldLoaded]);
        assert_eq!(queue.len(), 1);

        queue.update_time(1.5);
        assert_eq!(queue.drain_due(), vec![HostEvent::AudioParameterRead(loco)]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_parameter_reads_are_coalesced() {
        let mut keys: SlotMap<InstanceKey, ()> = SlotMap::with_key();
        let loco = keys.insert(());
        let mut queue = EventQueue::new();
        for _ in 0..5 {
            queue.send(HostEvent::AudioParameterRead(loco));
        }
        queue.send(HostEvent::VehicleDestroyed(loco));
        assert_eq!(queue.len(), 2);
        assert_eq!(HostEvent::VehicleDestroyed(loco).instance(), Some(loco));
    }
}
