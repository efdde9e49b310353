//! 翻译模块
//!
//! 采用分层结构：
//! - **core**: 远程端点与单片段翻译（超时、重试、降级）
//! - **pipeline**: 文本切分、并发调度、按序拼接
//! - **storage**: 单元译文缓存
//! - **config**: 配置管理
//! - **error**: 错误处理
//!
//! # 基本用法
//!
//! ```rust,no_run
//! use page_translator::translation::{TranslationConfig, TranslationCoordinator};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TranslationConfig {
//!     target_lang: "ja".to_string(),
//!     ..TranslationConfig::default()
//! };
//! let coordinator = TranslationCoordinator::new(config)?;
//!
//! let translated = coordinator.translate_unit("Hello, world.").await;
//! println!("{}", translated);
//! # Ok(())
//! # }
//! ```

/// 配置管理模块 - 语言、端点、并发、重试和发现参数
pub mod config;

/// 核心翻译模块 - 端点抽象与片段翻译器
pub mod core;

/// 错误处理模块 - 统一的错误类型和片段失败分类
pub mod error;

/// 文本处理管道模块 - 切分、调度与协调
pub mod pipeline;

/// 存储管理模块 - 译文缓存
pub mod storage;

pub use config::{ConfigManager, DiscoveryConfig, OutputPlacement, TranslationConfig};
pub use core::{
    HttpEndpoint, RequestThrottle, SegmentTranslator, TranslationEndpoint, TranslationOutcome,
};
pub use error::{DispatchError, FailureKind, TranslationError, TranslationResult};
pub use pipeline::{
    segment, Dispatcher, PipelineStats, StatsSnapshot, TranslationCoordinator, UnitTranslation,
    UnitTranslator,
};
pub use storage::UnitCache;
