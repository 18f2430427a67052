use anyhow::{Context, Result};
use autoscale_cuckoo_filter::CuckooFilter;
use futures::StreamExt;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::sync::RwLock;

const FILTER_CAPACITY: usize = 10_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

/// Every username ever issued. A miss means the name is certainly free.
static USERNAME_FILTER: Lazy<RwLock<CuckooFilter<String>>> =
    Lazy::new(|| RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)));

#[inline]
pub fn normalize(username: &str) -> String {
    username.trim().to_lowercase()
}

/// Check if a username might exist (false positives possible).
/// A poisoned lock answers "maybe" so the caller falls through to the database.
pub fn might_exist(username: &str) -> bool {
    let username = normalize(username);
    match USERNAME_FILTER.read() {
        Ok(filter) => filter.contains(&username),
        Err(_) => true,
    }
}

pub fn insert(username: &str) {
    insert_batch(&[normalize(username)]);
}

/// Removes a username when its account is deleted during offboarding.
pub fn remove(username: &str) {
    let username = normalize(username);
    if let Ok(mut filter) = USERNAME_FILTER.write() {
        filter.remove(&username);
    }
}

fn insert_batch(usernames: &[String]) {
    match USERNAME_FILTER.write() {
        Ok(mut filter) => {
            for username in usernames {
                filter.add(username);
            }
        }
        Err(_) => tracing::warn!("username filter lock poisoned; skipping insert"),
    }
}

/// Streams all usernames into the filter in batches.
pub async fn warmup_username_filter(pool: &MySqlPool, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (String,)>("SELECT username FROM users").fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let (username,) = row.context("username row fetch failed")?;
        batch.push(normalize(&username));
        total += 1;

        if batch.len() == batch_size {
            insert_batch(&batch);
            batch.clear();
        }
    }

    if !batch.is_empty() {
        insert_batch(&batch);
    }

    log::info!("Username filter warmup complete: {} accounts", total);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserted_names_are_found_case_insensitively() {
        insert("Filter.Test.User");
        assert!(might_exist("filter.test.user"));
        assert!(might_exist("  FILTER.TEST.USER "));
    }

    #[test]
    fn removed_names_are_forgotten() {
        insert("filter.removed");
        remove("filter.removed");
        assert!(!might_exist("filter.removed"));
    }
}
