/// Read-through caching over an optional [`Cache`](crate::db::Cache).
///
/// With no cache configured the block simply runs. A cache hit returns the
/// cached value. On a miss, or when the cache itself is unreachable, the
/// block runs and its successful result is queued for caching.
///
/// # Arguments
/// * `$cache`: `Option<Cache>` to read from and write to.
/// * `$key`: The [`CacheKey`](crate::db::CacheKey) for the value.
/// * `$ttl`: Time-to-live of the cached value in seconds.
/// * `$block`: Future computing the value as an `AppResult`.
///
/// # Example
/// ```rust,ignore
/// let items = cached!(self.cache, key, ttl, async move {
///     fetch_from_api().await
/// });
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        match $cache.as_ref() {
            Some(cache) => {
                let hit = match cache.get_from_cache(&$key).await {
                    Ok(hit) => hit,
                    Err(e) => {
                        tracing::warn!(key = %$key, error = %e, "Cache read failed, treating as miss");
                        None
                    }
                };

                match hit {
                    Some(cached) => Ok(cached),
                    None => {
                        let value = $block.await?;
                        cache.set_in_background(&$key, &value, $ttl);
                        Ok(value)
                    }
                }
            }
            None => $block.await,
        }
    }};
}
