// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


/// An event emitted by a graphics device to external listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEvent {
    /// The native context was lost. Every native handle is now invalid.
    Lost,
    /// The native context was restored and the device rebuilt its caches.
    Restored,
    /// The backbuffer was resized to the given extent, in physical pixels.
    Resized {
        /// The new width of the backbuffer.
        width: u32,
        /// The new height of the backbuffer.
        height: u32,
    },
}

/// Broadcasts [`DeviceEvent`]s to any number of listeners.
///
/// Each call to [`DeviceEvents::subscribe`] opens a dedicated unbounded channel, so
/// unlike a single shared receiver every listener sees every event. Listeners whose
/// receiver has been dropped are pruned on the next emission.
#[derive(Debug, Default)]
pub struct DeviceEvents {
    listeners: Vec<flume::Sender<DeviceEvent>>,
}

impl DeviceEvents {
    /// Creates an event hub with no listeners.
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Registers a new listener and returns the receiving end of its channel.
    pub fn subscribe(&mut self) -> flume::Receiver<DeviceEvent> {
        let (sender, receiver) = flume::unbounded();
        self.listeners.push(sender);
        log::trace!("Device event listener registered ({} total).", self.listeners.len());
        receiver
    }

    /// Sends an event to every live listener.
    ///
    /// ## Arguments
    /// * `event` - The event to broadcast.
    pub fn emit(&mut self, event: DeviceEvent) {
        log::trace!("Emitting device event {event:?}.");
        self.listeners
            .retain(|listener| match listener.send(event) {
                Ok(()) => true,
                Err(_) => {
                    log::debug!("Dropping disconnected device event listener.");
                    false
                }
            });
    }

    /// Returns the number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flume::TryRecvError;

    #[test]
    fn every_listener_receives_every_event() {
        let mut events = DeviceEvents::new();
        let first = events.subscribe();
        let second = events.subscribe();

        events.emit(DeviceEvent::Lost);
        events.emit(DeviceEvent::Restored);

        for receiver in [&first, &second] {
            assert_eq!(receiver.try_recv(), Ok(DeviceEvent::Lost));
            assert_eq!(receiver.try_recv(), Ok(DeviceEvent::Restored));
            assert_eq!(receiver.try_recv(), Err(TryRecvError::Empty));
        }
    }

    #[test]
    fn dropped_listeners_are_pruned() {
        let mut events = DeviceEvents::new();
        let kept = events.subscribe();
        let dropped = events.subscribe();
        drop(dropped);

        events.emit(DeviceEvent::Resized {
            width: 640,
            height: 480,
        });

        assert_eq!(events.listener_count(), 1);
        assert_eq!(
            kept.try_recv(),
            Ok(DeviceEvent::Resized {
                width: 640,
                height: 480
            })
        );
    }

    #[test]
    fn emit_without_listeners_is_harmless() {
        let mut events = DeviceEvents::default();
        events.emit(DeviceEvent::Lost);
        assert_eq!(events.listener_count(), 0);
    }
}
