use anyhow::Result;
use futures::lock::Mutex;
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::model::holiday::Holiday;

/// Usernames known to be taken. Only positives are stored.
static TAKEN_USERNAMES: Lazy<Cache<String, ()>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(50_000)
        .time_to_live(Duration::from_secs(86_400))
        .build()
});

/// Holiday list per calendar year; invalidated on every holiday write.
static HOLIDAYS_BY_YEAR: Lazy<Cache<i32, Arc<Vec<Holiday>>>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(32)
        .time_to_live(Duration::from_secs(6 * 3600))
        .build()
});

/// Bumped on every holiday write. A load only fills the cache when no write
/// happened since it started.
static HOLIDAY_GENERATIONS: Lazy<Mutex<HashMap<i32, u64>>> = Lazy::new(|| Mutex::new(HashMap::new()));

pub async fn mark_username_taken(username: &str) {
    TAKEN_USERNAMES.insert(username.to_lowercase(), ()).await;
}

pub async fn forget_username(username: &str) {
    TAKEN_USERNAMES.invalidate(&username.to_lowercase()).await;
}

pub async fn is_username_taken(username: &str) -> bool {
    TAKEN_USERNAMES.contains_key(&username.to_lowercase())
}

pub async fn holidays_for_year(year: i32) -> Option<Arc<Vec<Holiday>>> {
    HOLIDAYS_BY_YEAR.get(&year).await
}

/// Read before loading holidays from the database; pass it to `store_holidays`.
pub async fn holiday_generation(year: i32) -> u64 {
    HOLIDAY_GENERATIONS.lock().await.get(&year).copied().unwrap_or(0)
}

pub async fn store_holidays(year: i32, generation: u64, holidays: Vec<Holiday>) -> Arc<Vec<Holiday>> {
    let holidays = Arc::new(holidays);
    let generations = HOLIDAY_GENERATIONS.lock().await;
    if generations.get(&year).copied().unwrap_or(0) == generation {
        HOLIDAYS_BY_YEAR.insert(year, holidays.clone()).await;
    }
    holidays
}

pub async fn invalidate_holidays(year: i32) {
    let mut generations = HOLIDAY_GENERATIONS.lock().await;
    *generations.entry(year).or_insert(0) += 1;
    HOLIDAYS_BY_YEAR.invalidate(&year).await;
}

/// Loads usernames of accounts that logged in recently.
pub async fn warmup_username_cache(pool: &MySqlPool, days: u32, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (String,)>(
        r#"
        SELECT username
        FROM users
        WHERE last_login_at >= NOW() - INTERVAL ? DAY
        "#,
    )
    .bind(days)
    .fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let (username,) = row?;
        batch.push(username);
        total += 1;

        if batch.len() >= batch_size {
            futures::future::join_all(batch.iter().map(|u| mark_username_taken(u))).await;
            batch.clear();
        }
    }

    if !batch.is_empty() {
        futures::future::join_all(batch.iter().map(|u| mark_username_taken(u))).await;
    }

    log::info!(
        "Username cache warmup complete: {} recent accounts (last {} days)",
        total,
        days
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[actix_web::test]
    async fn username_cache_is_case_insensitive() {
        mark_username_taken("Cache.Person").await;
        assert!(is_username_taken("cache.person").await);
        forget_username("CACHE.PERSON").await;
        assert!(!is_username_taken("cache.person").await);
    }

    #[actix_web::test]
    async fn holiday_cache_round_trip_and_invalidate() {
        let holiday = Holiday {
            id: 1,
            date: NaiveDate::from_ymd_opt(1999, 12, 25).unwrap(),
            name: "Christmas Day".into(),
            kind: "public".into(),
        };
        let generation = holiday_generation(1999).await;
        store_holidays(1999, generation, vec![holiday]).await;
        assert_eq!(holidays_for_year(1999).await.map(|h| h.len()), Some(1));

        invalidate_holidays(1999).await;
        assert!(holidays_for_year(1999).await.is_none());
    }

    #[actix_web::test]
    async fn load_started_before_a_write_is_not_cached() {
        let holiday = Holiday {
            id: 2,
            date: NaiveDate::from_ymd_opt(1998, 1, 26).unwrap(),
            name: "Republic Day".into(),
            kind: "public".into(),
        };

        let generation = holiday_generation(1998).await;
        invalidate_holidays(1998).await;

        let served = store_holidays(1998, generation, vec![holiday]).await;
        assert_eq!(served.len(), 1);
        assert!(holidays_for_year(1998).await.is_none());
    }
}
