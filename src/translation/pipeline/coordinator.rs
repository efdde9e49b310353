//! 管道协调器
//!
//! 负责一个文本单元的完整流程：缓存 → 切分 → 经调度器并发翻译各片段 → 按原顺序拼接。

use std::sync::Arc;

use futures::future::{join_all, LocalBoxFuture};
use futures::FutureExt;

use super::dispatcher::Dispatcher;
use super::segmenter::segment;
use super::stats::{PipelineStats, StatsSnapshot};
use crate::translation::config::{constants, TranslationConfig};
use crate::translation::core::{HttpEndpoint, SegmentTranslator, TranslationEndpoint, TranslationOutcome};
use crate::translation::error::TranslationResult;
use crate::translation::storage::UnitCache;

/// 单元翻译的详细结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitTranslation {
    pub text: String,
    /// 片段数，命中缓存时为 0
    pub segments: usize,
    /// 重试耗尽后使用固定提示的片段数
    pub fallbacks: usize,
    /// 任务异常的片段数
    pub rejections: usize,
    pub cache_hit: bool,
}

impl UnitTranslation {
    pub fn is_complete(&self) -> bool {
        self.fallbacks == 0 && self.rejections == 0
    }
}

/// 文本单元翻译
///
/// 发现循环通过该 trait 翻译元素文本，[`TranslationCoordinator`] 是正式实现。
pub trait UnitTranslator {
    fn translate_unit<'a>(&'a self, text: &'a str) -> LocalBoxFuture<'a, String>;

    /// 元素写回译文后调用
    fn element_rendered(&self) {}
}

/// 翻译协调器
///
/// 每个页面会话一个实例，所有元素共享同一个调度器，
/// 因此对外请求数只受调度器上限约束。
pub struct TranslationCoordinator {
    config: TranslationConfig,
    dispatcher: Dispatcher,
    translator: SegmentTranslator,
    cache: Option<UnitCache>,
    stats: Arc<PipelineStats>,
}

impl TranslationCoordinator {
    /// 使用 HTTP 端点创建协调器
    pub fn new(config: TranslationConfig) -> TranslationResult<Self> {
        let endpoint = HttpEndpoint::new(&config)?;
        Ok(Self::with_endpoint(config, Arc::new(endpoint)))
    }

    /// 使用指定端点创建协调器
    pub fn with_endpoint(config: TranslationConfig, endpoint: Arc<dyn TranslationEndpoint>) -> Self {
        let stats = Arc::new(PipelineStats::default());
        let translator = SegmentTranslator::new(endpoint, &config, stats.clone());
        let dispatcher = Dispatcher::new(config.max_concurrent_requests);
        let cache = config
            .cache_enabled
            .then(|| UnitCache::new(config.cache_size));

        tracing::debug!(
            "翻译协调器就绪: {} -> {}, 并发上限 {}, 重试 {} 次",
            config.source_lang,
            config.target_lang,
            dispatcher.max_concurrent(),
            config.max_retries
        );

        Self {
            config,
            dispatcher,
            translator,
            cache,
            stats,
        }
    }

    /// 翻译一个文本单元，返回拼接后的译文
    pub async fn translate_unit(&self, text: &str) -> String {
        self.translate_unit_detailed(text).await.text
    }

    pub async fn translate_unit_detailed(&self, text: &str) -> UnitTranslation {
        if text.trim().is_empty() {
            return UnitTranslation {
                text: text.to_string(),
                segments: 0,
                fallbacks: 0,
                rejections: 0,
                cache_hit: false,
            };
        }

        if let Some(cached) = self.cached(text) {
            self.stats.inc_cache_hits();
            self.stats.inc_units_translated();
            tracing::debug!("缓存命中: {} 字符", text.chars().count());
            return UnitTranslation {
                text: cached,
                segments: 0,
                fallbacks: 0,
                rejections: 0,
                cache_hit: true,
            };
        }

        let segments = segment(text, self.config.max_segment_length);
        let max_retries = self.config.max_retries;

        // 所有片段先全部提交，再统一等待
        let pending: Vec<_> = segments
            .into_iter()
            .map(|part| {
                let translator = self.translator.clone();
                self.dispatcher
                    .submit(move || async move { translator.translate(&part, max_retries).await })
            })
            .collect();
        let segment_count = pending.len();

        let results = join_all(pending).await;

        let mut translated = String::new();
        let mut fallbacks = 0;
        let mut rejections = 0;
        for (index, result) in results.into_iter().enumerate() {
            match result {
                Ok(outcome) => {
                    if let TranslationOutcome::Fallback(_) = outcome {
                        fallbacks += 1;
                    }
                    translated.push_str(&outcome.into_text());
                }
                Err(error) => {
                    rejections += 1;
                    self.stats.inc_segments_rejected();
                    tracing::error!("片段 {} 处理异常: {}", index, error);
                    translated.push_str(&constants::segment_failure_placeholder(index));
                }
            }
        }

        let unit = UnitTranslation {
            text: translated,
            segments: segment_count,
            fallbacks,
            rejections,
            cache_hit: false,
        };

        if unit.is_complete() {
            if let Some(cache) = &self.cache {
                cache.insert(
                    &self.config.source_lang,
                    &self.config.target_lang,
                    text,
                    unit.text.clone(),
                );
            }
        }
        self.stats.inc_units_translated();

        tracing::debug!(
            "文本单元完成: {} 个片段, {} 个降级, {} 个异常",
            unit.segments,
            unit.fallbacks,
            unit.rejections
        );

        unit
    }

    fn cached(&self, text: &str) -> Option<String> {
        self.cache
            .as_ref()?
            .get(&self.config.source_lang, &self.config.target_lang, text)
    }

    pub fn config(&self) -> &TranslationConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn cache(&self) -> Option<&UnitCache> {
        self.cache.as_ref()
    }

    pub fn stats(&self) -> &Arc<PipelineStats> {
        &self.stats
    }

    pub fn stats_snapshot(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

impl UnitTranslator for TranslationCoordinator {
    fn translate_unit<'a>(&'a self, text: &'a str) -> LocalBoxFuture<'a, String> {
        self.translate_unit_detailed(text)
            .map(|unit| unit.text)
            .boxed_local()
    }

    fn element_rendered(&self) {
        self.stats.inc_elements_rendered();
    }
}
