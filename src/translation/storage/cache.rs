//! 文本单元缓存
//!
//! 只缓存完全成功的单元译文，同一页面会话内重复出现的文本不再发请求。

use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};

use lru::LruCache;

const FALLBACK_CAPACITY: NonZeroUsize = match NonZeroUsize::new(1) {
    Some(n) => n,
    None => unreachable!(),
};

/// 缓存统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub inserts: usize,
}

struct Inner {
    entries: LruCache<String, String>,
    stats: CacheStats,
}

/// 本地LRU缓存
///
/// 键为 `源语言:目标语言:原文`。锁只在同步操作期间持有。
pub struct UnitCache {
    inner: Mutex<Inner>,
}

impl UnitCache {
    /// 创建缓存，容量为 0 时按 1 处理
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(FALLBACK_CAPACITY);
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::new(capacity),
                stats: CacheStats::default(),
            }),
        }
    }

    /// 生成缓存键
    pub fn cache_key(source_lang: &str, target_lang: &str, text: &str) -> String {
        format!("{}:{}:{}", source_lang, target_lang, text)
    }

    pub fn get(&self, source_lang: &str, target_lang: &str, text: &str) -> Option<String> {
        let key = Self::cache_key(source_lang, target_lang, text);
        let mut inner = self.lock();
        match inner.entries.get(&key).cloned() {
            Some(translated) => {
                inner.stats.hits += 1;
                Some(translated)
            }
            None => {
                inner.stats.misses += 1;
                None
            }
        }
    }

    pub fn insert(&self, source_lang: &str, target_lang: &str, text: &str, translated: String) {
        let key = Self::cache_key(source_lang, target_lang, text);
        let mut inner = self.lock();
        inner.entries.put(key, translated);
        inner.stats.inserts += 1;
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.lock().entries.cap().get()
    }

    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.lock().stats
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for UnitCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_and_miss() {
        let cache = UnitCache::new(10);
        assert_eq!(cache.get("en", "zh-CN", "hello"), None);

        cache.insert("en", "zh-CN", "hello", "你好".to_string());
        assert_eq!(cache.get("en", "zh-CN", "hello").as_deref(), Some("你好"));
        // 语言对不同视为不同条目
        assert_eq!(cache.get("en", "ja", "hello"), None);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.inserts, 1);
    }

    #[test]
    fn test_lru_eviction() {
        let cache = UnitCache::new(2);
        cache.insert("en", "zh-CN", "a", "A".to_string());
        cache.insert("en", "zh-CN", "b", "B".to_string());
        // 访问 a，使 b 成为最久未使用
        assert!(cache.get("en", "zh-CN", "a").is_some());
        cache.insert("en", "zh-CN", "c", "C".to_string());

        assert_eq!(cache.len(), 2);
        assert!(cache.get("en", "zh-CN", "b").is_none());
        assert!(cache.get("en", "zh-CN", "a").is_some());
        assert!(cache.get("en", "zh-CN", "c").is_some());
    }

    #[test]
    fn test_zero_capacity() {
        let cache = UnitCache::new(0);
        assert_eq!(cache.capacity(), 1);
        cache.insert("en", "zh-CN", "a", "A".to_string());
        cache.clear();
        assert!(cache.is_empty());
    }
}
