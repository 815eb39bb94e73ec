//! Read-only fan-out of microphone PCM

use std::sync::{Arc, Mutex, Weak};

/// Listener for mono f32 buffers
pub type PcmListener = Arc<dyn Fn(&[f32]) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, PcmListener)>,
}

/// Distributes each captured buffer to every subscriber.
///
/// Listeners run on the publishing thread (usually the audio callback) and
/// outside the internal lock, so they may subscribe or cancel freely.
#[derive(Clone, Default)]
pub struct PcmFanOut {
    listeners: Arc<Mutex<Listeners>>,
}

impl PcmFanOut {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: PcmListener) -> FanOutSubscription {
        let mut listeners = lock(&self.listeners);
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.push((id, listener));
        FanOutSubscription {
            listeners: Arc::downgrade(&self.listeners),
            id: Some(id),
        }
    }

    pub fn publish(&self, samples: &[f32]) {
        if samples.is_empty() {
            return;
        }
        let snapshot: Vec<PcmListener> = lock(&self.listeners)
            .entries
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in snapshot {
            listener(samples);
        }
    }

    #[cfg(test)]
    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).entries.len()
    }
}

/// Handle to one fan-out listener; cancelled on drop.
pub struct FanOutSubscription {
    listeners: Weak<Mutex<Listeners>>,
    id: Option<u64>,
}

impl FanOutSubscription {
    pub fn cancel(&mut self) {
        let Some(id) = self.id.take() else { return };
        if let Some(listeners) = self.listeners.upgrade() {
            lock(&listeners).entries.retain(|(entry, _)| *entry != id);
        }
    }
}

impl Drop for FanOutSubscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn lock(listeners: &Mutex<Listeners>) -> std::sync::MutexGuard<'_, Listeners> {
    listeners.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(counter: &Arc<AtomicUsize>) -> PcmListener {
        let counter = Arc::clone(counter);
        Arc::new(move |samples: &[f32]| {
            counter.fetch_add(samples.len(), Ordering::SeqCst);
        })
    }

    #[test]
    fn every_subscriber_sees_every_buffer() {
        let fan_out = PcmFanOut::new();
        let a = Arc::new(AtomicUsize::new(0));
        let b = Arc::new(AtomicUsize::new(0));
        let _sa = fan_out.subscribe(counting(&a));
        let _sb = fan_out.subscribe(counting(&b));

        fan_out.publish(&[0.0; 128]);
        fan_out.publish(&[0.0; 64]);

        assert_eq!(a.load(Ordering::SeqCst), 192);
        assert_eq!(b.load(Ordering::SeqCst), 192);
    }

    #[test]
    fn cancel_and_drop_unsubscribe() {
        let fan_out = PcmFanOut::new();
        let count = Arc::new(AtomicUsize::new(0));
        let mut first = fan_out.subscribe(counting(&count));
        let second = fan_out.subscribe(counting(&count));
        assert_eq!(fan_out.listener_count(), 2);

        first.cancel();
        first.cancel();
        drop(second);
        assert_eq!(fan_out.listener_count(), 0);

        fan_out.publish(&[1.0; 10]);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn listener_may_cancel_from_inside_callback() {
        let fan_out = PcmFanOut::new();
        let slot: Arc<Mutex<Option<FanOutSubscription>>> = Arc::new(Mutex::new(None));
        let slot_in = Arc::clone(&slot);
        let sub = fan_out.subscribe(Arc::new(move |_: &[f32]| {
            if let Some(mut sub) = slot_in.lock().unwrap().take() {
                sub.cancel();
            }
        }));
        *slot.lock().unwrap() = Some(sub);

        fan_out.publish(&[0.5; 4]);
        assert_eq!(fan_out.listener_count(), 0);
    }
}
