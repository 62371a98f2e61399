//! 缓存键构造
//! 统一格式：{namespace}:{operation}:{params...}

/// 生成专辑搜索缓存键。查询文本转小写并去掉首尾空白，
/// 让等价查询命中同一条目。
pub fn search_key(namespace: &str, query: &str, limit: u32) -> String {
    format!("{}:search:{}:{}", namespace, query.trim().to_lowercase(), limit)
}

/// 生成单张专辑缓存键
pub fn album_key(namespace: &str, album_id: &str) -> String {
    format!("{}:album:{}", namespace, album_id)
}

/// 生成批量专辑缓存键
pub fn albums_key(namespace: &str, album_ids: &[String]) -> String {
    format!("{}:albums:{}", namespace, album_ids.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equivalent_queries_share_a_key() {
        assert_eq!(
            search_key("app", "  Abbey Road ", 20),
            search_key("app", "abbey road", 20),
        );
    }

    #[test]
    fn namespaces_keep_entries_apart() {
        assert_ne!(
            search_key("app", "abbey road", 20),
            search_key("user:u1", "abbey road", 20),
        );
    }

    #[test]
    fn params_are_part_of_the_key() {
        assert_ne!(search_key("app", "abbey road", 10), search_key("app", "abbey road", 20));
        assert_ne!(album_key("app", "a"), albums_key("app", &["a".to_string()]));
    }
}
