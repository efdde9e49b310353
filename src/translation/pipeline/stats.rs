//! 管道运行统计

use std::sync::atomic::{AtomicUsize, Ordering};

/// 翻译管道统计数据
///
/// 所有计数器均为原子类型，可在并发任务之间共享（通常包在 `Arc` 中）。
#[derive(Debug, Default)]
pub struct PipelineStats {
    /// 实际发出的翻译请求次数（含重试）
    pub requests_sent: AtomicUsize,

    /// 重试次数
    pub retries: AtomicUsize,

    /// 成功翻译的片段数
    pub segments_translated: AtomicUsize,

    /// 重试耗尽后使用固定提示的片段数
    pub segments_fallback: AtomicUsize,

    /// 调度器拒绝（任务异常）的片段数
    pub segments_rejected: AtomicUsize,

    /// 缓存命中次数
    pub cache_hits: AtomicUsize,

    /// 完成翻译的文本单元数
    pub units_translated: AtomicUsize,

    /// 已写回页面的元素数
    pub elements_rendered: AtomicUsize,
}

impl PipelineStats {
    pub fn inc_requests_sent(&self) {
        self.requests_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_retries(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_segments_translated(&self) {
        self.segments_translated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_segments_fallback(&self) {
        self.segments_fallback.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_segments_rejected(&self) {
        self.segments_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_cache_hits(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_units_translated(&self) {
        self.units_translated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_elements_rendered(&self) {
        self.elements_rendered.fetch_add(1, Ordering::Relaxed);
    }

    /// 获取统计数据快照
    ///
    /// 各字段分别读取，并发更新时字段之间不保证处于同一时刻。
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            requests_sent: self.requests_sent.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            segments_translated: self.segments_translated.load(Ordering::Relaxed),
            segments_fallback: self.segments_fallback.load(Ordering::Relaxed),
            segments_rejected: self.segments_rejected.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            units_translated: self.units_translated.load(Ordering::Relaxed),
            elements_rendered: self.elements_rendered.load(Ordering::Relaxed),
        }
    }
}

/// 统计数据的不可变快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub requests_sent: usize,
    pub retries: usize,
    pub segments_translated: usize,
    pub segments_fallback: usize,
    pub segments_rejected: usize,
    pub cache_hits: usize,
    pub units_translated: usize,
    pub elements_rendered: usize,
}

impl StatsSnapshot {
    /// 是否有片段最终未能翻译
    pub fn has_failures(&self) -> bool {
        self.segments_fallback > 0 || self.segments_rejected > 0
    }
}

impl std::fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "元素 {} 个, 文本单元 {} 个, 片段成功 {} / 降级 {} / 异常 {}, 请求 {} 次 (重试 {} 次), 缓存命中 {} 次",
            self.elements_rendered,
            self.units_translated,
            self.segments_translated,
            self.segments_fallback,
            self.segments_rejected,
            self.requests_sent,
            self.retries,
            self.cache_hits
        )
    }
}
