/// Read-through caching over Redis.
///
/// Looks the key up in the cache first and returns the hit if present.
/// On a miss the block runs, its value is queued for a background cache
/// write, and the value is returned. A cache *read* failure is treated as a
/// miss (logged at warn) so a Redis outage degrades lookups to the backing
/// store instead of failing them.
///
/// # Arguments
/// * `$cache`: handle with `get_from_cache` and `set_in_background` methods
/// * `$key`: the `CacheKey` to read and write under
/// * `$ttl`: time-to-live for the cached value, in seconds
/// * `$block`: async block computing the value on a miss
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        match $cache.get_from_cache(&$key).await {
            Ok(Some(hit)) => Ok::<_, $crate::error::AppError>(hit),
            Ok(None) => {
                let value = $block.await?;
                $cache.set_in_background(&$key, &value, $ttl);
                Ok(value)
            }
            Err(e) => {
                tracing::warn!(error = %e, key = %$key, "Cache read failed, treating as miss");
                let value = $block.await?;
                $cache.set_in_background(&$key, &value, $ttl);
                Ok(value)
            }
        }
    }};
}
