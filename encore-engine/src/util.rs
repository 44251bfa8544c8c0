use chrono::Utc;
use rand::{distributions::Alphanumeric, thread_rng, Rng};

pub fn random_string(length: usize) -> String {
    let mut rng = thread_rng();

    std::iter::repeat(())
        .map(|_| rng.sample(Alphanumeric) as char)
        .take(length)
        .collect()
}

/// The current time as unix epoch milliseconds, the timestamp format used
/// for all persisted records
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Creates a new queue item id, unique enough within a venue
pub fn song_id() -> String {
    format!("{}-{}", now_ms(), random_string(8).to_lowercase())
}
