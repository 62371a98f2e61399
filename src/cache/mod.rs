// 进程内TTL缓存
// Spotify响应的记忆化：搜索用短TTL，专辑详情用长TTL

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;
use serde_json::Value;

pub mod keys;

struct CacheEntry {
    value: Value,
    expires_at: i64,
}

/// 带上限的惰性过期缓存。条目数超过上限时整表清空，不做LRU。
pub struct TtlCache {
    name: &'static str,
    ttl_secs: i64,
    max_entries: usize,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl TtlCache {
    pub fn new(name: &'static str, ttl_secs: u64, max_entries: usize) -> Self {
        Self {
            name,
            ttl_secs: ttl_secs as i64,
            max_entries,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.get_at(key, Utc::now().timestamp())
    }

    pub fn insert(&self, key: &str, value: Value) {
        self.insert_at(key, value, Utc::now().timestamp())
    }

    fn get_at(&self, key: &str, now: i64) -> Option<Value> {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        match entries.get(key) {
            Some(entry) if now < entry.expires_at => Some(entry.value.clone()),
            Some(_) => {
                // 过期条目在读取时删除，没有后台清理
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn insert_at(&self, key: &str, value: Value, now: i64) {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        if entries.len() > self.max_entries {
            tracing::warn!(
                cache = self.name,
                entries = entries.len(),
                "Cache over capacity, clearing all entries"
            );
            entries.clear();
        }
        entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: now + self.ttl_secs,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn get_after_insert_within_ttl() {
        let cache = TtlCache::new("test", 60, 500);
        cache.insert_at("app:search:abbey road:20", json!({"albums": [1, 2]}), 1000);

        let hit = cache.get_at("app:search:abbey road:20", 1059);
        assert_eq!(hit, Some(json!({"albums": [1, 2]})));
    }

    #[test]
    fn expired_entry_is_absent_and_removed() {
        let cache = TtlCache::new("test", 60, 500);
        cache.insert_at("k", json!(1), 1000);

        assert_eq!(cache.get_at("k", 1060), None);
        // 读取过期条目后缓存应当已删除它
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn over_capacity_insert_clears_map() {
        let cache = TtlCache::new("test", 60, 500);
        for i in 0..501 {
            cache.insert_at(&format!("k{}", i), json!(i), 1000);
        }
        assert_eq!(cache.len(), 501);

        // 第502次插入触发整表清空，插入后只剩新条目
        cache.insert_at("k501", json!(501), 1000);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get_at("k501", 1001), Some(json!(501)));
    }

    #[test]
    fn distinct_keys_do_not_collide() {
        let cache = TtlCache::new("test", 60, 500);
        cache.insert_at("app:album:a", json!("a"), 1000);
        cache.insert_at("user:u1:album:a", json!("b"), 1000);

        assert_eq!(cache.get_at("app:album:a", 1001), Some(json!("a")));
        assert_eq!(cache.get_at("user:u1:album:a", 1001), Some(json!("b")));
    }
}
