//! # Page Translator Library
//!
//! 增量式页面翻译：在不断变化的 HTML 页面中发现可读文本，按长度切分后
//! 并发调用远程翻译服务，并把译文插入到原文旁边。
//!
//! ## 模块组织
//!
//! - `core` - 文档级入口（解析、发现、序列化）
//! - `discovery` - 页面抽象与防抖发现循环
//! - `parsers` - HTML 解析、选择器与序列化
//! - `translation` - 切分、调度、重试与缓存
//! - `env` - 环境变量定义

pub mod core;
pub mod discovery;
pub mod env;
pub mod parsers;
pub mod translation;

// Re-export commonly used items for convenience
pub use core::{translate_document, translate_document_with_endpoint, DocumentTranslation};
pub use discovery::{DiscoveryLoop, DiscoveryReport, Page, PageEvent, RcDomPage};
pub use translation::{TranslationConfig, TranslationCoordinator, TranslationEndpoint};
