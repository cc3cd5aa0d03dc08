//! Time-ordered identifiers for snapshots and alerts.

use snowflake::SnowflakeIdBucket;
use std::sync::{LazyLock, Mutex};

/// Machine discriminator of ids minted by the data-service.
pub const DATA_SERVICE_MACHINE_ID: i32 = 2;

static BUCKET: LazyLock<Mutex<SnowflakeIdBucket>> =
    LazyLock::new(|| Mutex::new(SnowflakeIdBucket::new(DATA_SERVICE_MACHINE_ID, 1)));

/// Sets the node discriminator (0-31) of this process. Replicas of the
/// data-service sharing one database must use distinct values.
pub fn init(node_id: i32) {
    let mut bucket = BUCKET.lock().unwrap_or_else(|e| e.into_inner());
    *bucket = SnowflakeIdBucket::new(DATA_SERVICE_MACHINE_ID, node_id);
}

/// Next identifier, rendered as a decimal string. Later ids are larger, so
/// ids sort the same way as creation time.
pub fn next_id() -> String {
    BUCKET
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .get_id()
        .to_string()
}
