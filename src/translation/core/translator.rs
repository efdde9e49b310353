//! 片段翻译器
//!
//! 每个片段一次远程调用，失败后固定间隔重试，重试耗尽时按最后一次失败类型
//! 返回固定提示文本。该层从不返回错误。

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::time::{sleep, timeout};

use super::endpoint::TranslationEndpoint;
use crate::translation::config::TranslationConfig;
use crate::translation::error::{FailureKind, TranslationError};
use crate::translation::pipeline::stats::PipelineStats;

/// 单个片段的翻译结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationOutcome {
    /// 翻译成功（空白片段原样返回也属于此类）
    Translated(String),
    /// 重试耗尽，携带最后一次失败的类型
    Fallback(FailureKind),
}

impl TranslationOutcome {
    pub fn is_fallback(&self) -> bool {
        matches!(self, TranslationOutcome::Fallback(_))
    }

    /// 用于拼接的最终文本
    pub fn into_text(self) -> String {
        match self {
            TranslationOutcome::Translated(text) => text,
            TranslationOutcome::Fallback(kind) => kind.fallback_message().to_string(),
        }
    }
}

/// 片段翻译器
#[derive(Clone)]
pub struct SegmentTranslator {
    endpoint: Arc<dyn TranslationEndpoint>,
    request_timeout: Duration,
    retry_delay: Duration,
    stats: Arc<PipelineStats>,
}

impl SegmentTranslator {
    pub fn new(
        endpoint: Arc<dyn TranslationEndpoint>,
        config: &TranslationConfig,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            endpoint,
            request_timeout: config.request_timeout(),
            retry_delay: config.retry_delay(),
            stats,
        }
    }

    /// 翻译一个片段
    ///
    /// 最多发出 `max_retries + 1` 次请求。
    pub async fn translate(&self, segment: &str, max_retries: usize) -> TranslationOutcome {
        if segment.trim().is_empty() {
            return TranslationOutcome::Translated(segment.to_string());
        }

        let mut remaining = max_retries;
        loop {
            let failure = match self.attempt(segment).await {
                Ok(translated) => {
                    self.stats.inc_segments_translated();
                    return TranslationOutcome::Translated(translated);
                }
                Err(kind) => kind,
            };

            if remaining == 0 {
                self.stats.inc_segments_fallback();
                tracing::error!(
                    "片段翻译失败，已重试 {} 次 ({}): {}",
                    max_retries,
                    failure,
                    preview(segment)
                );
                return TranslationOutcome::Fallback(failure);
            }

            remaining -= 1;
            self.stats.inc_retries();
            tracing::warn!(
                "片段翻译失败 ({})，{}ms后重试 (剩余 {} 次)",
                failure,
                self.retry_delay.as_millis(),
                remaining + 1
            );
            sleep(self.retry_delay).await;
        }
    }

    async fn attempt(&self, segment: &str) -> Result<String, FailureKind> {
        // 节流等待在超时计时之外
        self.endpoint.ready().await;
        self.stats.inc_requests_sent();

        let body = match timeout(self.request_timeout, self.endpoint.fetch(segment)).await {
            Ok(Ok(body)) => body,
            Ok(Err(error)) => {
                tracing::debug!("翻译请求失败: {}", error);
                return Err(error.failure_kind());
            }
            Err(elapsed) => {
                tracing::debug!("翻译请求超时: {}", TranslationError::from(elapsed));
                return Err(FailureKind::Timeout);
            }
        };

        parse_response(&body)
    }
}

/// 解析翻译服务响应
///
/// 期望格式为 `[[["译文", "原文", ...], ...], ...]`，
/// 译文为各元组第一个元素的拼接，第一个元素不是字符串的元组不贡献内容。
pub fn parse_response(body: &str) -> Result<String, FailureKind> {
    let value: Value = serde_json::from_str(body).map_err(|_| FailureKind::ParseError)?;

    let tuples = value
        .as_array()
        .and_then(|top| top.first())
        .and_then(Value::as_array)
        .ok_or(FailureKind::InvalidResponse)?;

    Ok(tuples
        .iter()
        .filter_map(|tuple| tuple.as_array()?.first()?.as_str())
        .collect())
}

fn preview(text: &str) -> String {
    let mut preview: String = text.chars().take(40).collect();
    if text.chars().count() > 40 {
        preview.push_str("...");
    }
    preview
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_concatenates_first_elements() {
        let body = r#"[[["你好，","Hello, ",null],["世界","world",null]],null,"en"]"#;
        assert_eq!(parse_response(body), Ok("你好，世界".to_string()));
    }

    #[test]
    fn test_parse_skips_non_string_entries() {
        let body = r#"[[[null,"x"],["好",""],[42],[]]]"#;
        assert_eq!(parse_response(body), Ok("好".to_string()));
    }

    #[test]
    fn test_parse_classifies_failures() {
        assert_eq!(parse_response("<html>"), Err(FailureKind::ParseError));
        assert_eq!(parse_response(""), Err(FailureKind::ParseError));
        assert_eq!(parse_response("{}"), Err(FailureKind::InvalidResponse));
        assert_eq!(parse_response("[]"), Err(FailureKind::InvalidResponse));
        assert_eq!(parse_response("[null]"), Err(FailureKind::InvalidResponse));
        assert_eq!(parse_response(r#"["text"]"#), Err(FailureKind::InvalidResponse));
    }

    #[test]
    fn test_outcome_text() {
        assert_eq!(
            TranslationOutcome::Translated("译文".into()).into_text(),
            "译文"
        );
        let fallback = TranslationOutcome::Fallback(FailureKind::NetworkError);
        assert!(fallback.is_fallback());
        assert_eq!(fallback.into_text(), "[翻译失败：网络错误]");
    }
}
