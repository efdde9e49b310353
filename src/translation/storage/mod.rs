//! 存储模块
//!
//! 提供页面会话内的译文缓存。

pub mod cache;

pub use cache::{CacheStats, UnitCache};
