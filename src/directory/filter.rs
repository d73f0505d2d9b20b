use anyhow::{Result, anyhow};
use autoscale_cuckoo_filter::CuckooFilter;
use futures::StreamExt;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

/// Expected capacity and false-positive rate.
/// Tune these based on real user counts.
const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

static USER_ID_FILTER: Lazy<RwLock<CuckooFilter<String>>> = Lazy::new(|| {
    RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE))
});

/// Until the warmup has streamed the users table, the filter is empty and a
/// miss means nothing.
static WARMED: AtomicBool = AtomicBool::new(false);

/// Check if a user id might exist (false positives possible).
pub fn might_exist(user_id: &str) -> bool {
    if !WARMED.load(Ordering::Acquire) {
        return true;
    }
    USER_ID_FILTER
        .read()
        .expect("user id filter poisoned")
        .contains(&user_id.to_string())
}

/// Insert a single user id into the filter.
pub fn insert(user_id: &str) {
    USER_ID_FILTER
        .write()
        .expect("user id filter poisoned")
        .add(&user_id.to_string());
}

/// Remove a user id from the filter.
pub fn remove(user_id: &str) {
    USER_ID_FILTER
        .write()
        .expect("user id filter poisoned")
        .remove(&user_id.to_string());
}

/// Warm up the user id filter using streaming + batching.
pub async fn warmup_user_filter(pool: &MySqlPool, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (String,)>("SELECT id FROM users").fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let (id,) = row.map_err(|e| anyhow!("DB row fetch failed: {}", e))?;

        batch.push(id);
        total += 1;

        if batch.len() == batch_size {
            insert_batch(&batch);
            batch.clear();
        }
    }

    if !batch.is_empty() {
        insert_batch(&batch);
    }

    WARMED.store(true, Ordering::Release);
    log::info!("User id filter warmup complete: {} users", total);
    Ok(())
}

fn insert_batch(user_ids: &[String]) {
    let mut filter = USER_ID_FILTER
        .write()
        .expect("user id filter poisoned");

    for id in user_ids {
        filter.add(id);
    }
}
