//! 翻译管道模块
//!
//! 一个文本单元的处理流程：切分 → 并发调度 → 按序拼接

pub mod coordinator;
pub mod dispatcher;
pub mod segmenter;
pub mod stats;

// 重新导出主要类型
pub use coordinator::{TranslationCoordinator, UnitTranslation, UnitTranslator};
pub use dispatcher::Dispatcher;
pub use segmenter::segment;
pub use stats::{PipelineStats, StatsSnapshot};
