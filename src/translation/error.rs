//! 翻译模块统一错误处理
//!
//! 提供结构化错误类型、片段失败分类以及调度器错误

use std::fmt;

use thiserror::Error;

use crate::parsers::html::SelectorParseError;
use crate::translation::config::constants;

/// 翻译错误类型
#[derive(Error, Debug, Clone)]
pub enum TranslationError {
    /// 配置错误
    #[error("配置错误: {0}")]
    ConfigError(String),

    /// 网络错误
    #[error("网络错误: {0}")]
    NetworkError(String),

    /// 超时错误
    #[error("请求超时: {0}")]
    TimeoutError(String),

    /// 响应数据不是合法的 JSON
    #[error("解析错误: {0}")]
    ParseError(String),

    /// 响应结构不符合预期
    #[error("无效响应: {0}")]
    InvalidResponse(String),

    /// 选择器错误
    #[error("选择器错误: {0}")]
    SelectorError(String),

    /// IO 错误
    #[error("IO错误: {0}")]
    IoError(String),

    /// 内部错误
    #[error("内部错误: {0}")]
    InternalError(String),
}

impl TranslationError {
    /// 映射为片段级失败类型
    ///
    /// 端点只会产生网络或超时错误，其余未归类的错误统一按网络错误处理。
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            TranslationError::TimeoutError(_) => FailureKind::Timeout,
            TranslationError::ParseError(_) => FailureKind::ParseError,
            TranslationError::InvalidResponse(_) => FailureKind::InvalidResponse,
            _ => FailureKind::NetworkError,
        }
    }
}

/// 片段翻译的失败类型
///
/// 四类失败都可重试，重试耗尽后降级为对应的固定提示文本。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// 响应存在但结构不符合预期
    InvalidResponse,
    /// 响应不是合法的结构化数据
    ParseError,
    /// 传输层失败
    NetworkError,
    /// 超时未响应
    Timeout,
}

impl FailureKind {
    /// 重试耗尽后展示给用户的固定文本
    pub fn fallback_message(&self) -> &'static str {
        match self {
            FailureKind::InvalidResponse => constants::FALLBACK_INVALID_RESPONSE,
            FailureKind::ParseError => constants::FALLBACK_PARSE_ERROR,
            FailureKind::NetworkError => constants::FALLBACK_NETWORK_ERROR,
            FailureKind::Timeout => constants::FALLBACK_TIMEOUT,
        }
    }

    /// 日志中使用的标签
    pub fn tag(&self) -> &'static str {
        match self {
            FailureKind::InvalidResponse => "invalid-response",
            FailureKind::ParseError => "parse-error",
            FailureKind::NetworkError => "network-error",
            FailureKind::Timeout => "timeout",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// 调度器上报的任务失败
///
/// 只在操作本身异常退出时出现，正常的翻译失败会以降级文本的形式成功返回。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// 操作执行过程中 panic
    #[error("任务异常退出: {0}")]
    Panicked(String),

    /// 结果通道在任务完成前被丢弃
    #[error("任务结果丢失")]
    Dropped,
}

impl From<std::io::Error> for TranslationError {
    fn from(error: std::io::Error) -> Self {
        TranslationError::IoError(error.to_string())
    }
}

impl From<serde_json::Error> for TranslationError {
    fn from(error: serde_json::Error) -> Self {
        TranslationError::ParseError(format!("JSON解析错误: {}", error))
    }
}

impl From<toml::de::Error> for TranslationError {
    fn from(error: toml::de::Error) -> Self {
        TranslationError::ConfigError(format!("TOML解析错误: {}", error))
    }
}

impl From<tokio::time::error::Elapsed> for TranslationError {
    fn from(error: tokio::time::error::Elapsed) -> Self {
        TranslationError::TimeoutError(format!("异步操作超时: {}", error))
    }
}

impl From<reqwest::Error> for TranslationError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            TranslationError::TimeoutError(error.to_string())
        } else {
            TranslationError::NetworkError(error.to_string())
        }
    }
}

impl From<SelectorParseError> for TranslationError {
    fn from(error: SelectorParseError) -> Self {
        TranslationError::SelectorError(error.to_string())
    }
}

/// 错误结果类型别名
pub type TranslationResult<T> = Result<T, TranslationError>;
