use std::collections::VecDeque;
use std::fmt::Debug;

type Handler<P> = Box<dyn FnMut(&P)>;

/// Named subscriber lists with optional deferred delivery.
///
/// Handlers run synchronously on `emit`. `schedule` queues an event until the
/// next `flush`, which is how work is pushed to the next host tick.
pub struct EventBus<K, P> {
    subscribers: Vec<(K, Handler<P>)>,
    pending: VecDeque<(K, P)>,
}

impl<K, P> Default for EventBus<K, P> {
    fn default() -> Self {
        Self {
            subscribers: Vec::new(),
            pending: VecDeque::new(),
        }
    }
}

impl<K: PartialEq + Debug, P> EventBus<K, P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, kind: K, handler: impl FnMut(&P) + 'static) {
        tracing::trace!(?kind, "subscribe");
        self.subscribers.push((kind, Box::new(handler)));
    }

    pub fn subscriber_count(&self, kind: &K) -> usize {
        self.subscribers.iter().filter(|(k, _)| k == kind).count()
    }

    /// Calls every handler for `kind` in subscription order and returns how
    /// many ran.
    pub fn emit(&mut self, kind: &K, payload: &P) -> usize {
        let mut called = 0;
        for (k, handler) in self.subscribers.iter_mut() {
            if k == kind {
                handler(payload);
                called += 1;
            }
        }
        tracing::trace!(?kind, called, "emit");
        called
    }

    pub fn schedule(&mut self, kind: K, payload: P) {
        self.pending.push_back((kind, payload));
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Delivers every event queued before this call.
    pub fn flush(&mut self) -> usize {
        let queued: Vec<_> = self.pending.drain(..).collect();
        let delivered = queued.len();
        for (kind, payload) in queued {
            self.emit(&kind, &payload);
        }
        delivered
    }
}

impl<K: Debug, P> Debug for EventBus<K, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .field("pending", &self.pending.len())
            .finish()
    }
}
