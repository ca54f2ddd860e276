use biometrics::{Collector, Counter};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("metrochat.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("metrochat.client.request_errors");

pub(crate) static STREAM_CHUNKS: Counter = Counter::new("metrochat.stream.chunks");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("metrochat.stream.errors");

pub(crate) static STORE_WRITES: Counter = Counter::new("metrochat.store.writes");

pub(crate) static TURNS_COMPLETED: Counter = Counter::new("metrochat.controller.turns_completed");
pub(crate) static TURNS_FAILED: Counter = Counter::new("metrochat.controller.turns_failed");
pub(crate) static TURNS_REJECTED: Counter = Counter::new("metrochat.controller.turns_rejected");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);

    collector.register_counter(&STREAM_CHUNKS);
    collector.register_counter(&STREAM_ERRORS);

    collector.register_counter(&STORE_WRITES);

    collector.register_counter(&TURNS_COMPLETED);
    collector.register_counter(&TURNS_FAILED);
    collector.register_counter(&TURNS_REJECTED);
}
