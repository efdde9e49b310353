//! 翻译核心模块
//!
//! - **端点层** (`endpoint.rs`): 单次远程调用的抽象及 HTTP 实现
//! - **翻译层** (`translator.rs`): 单个片段的超时、重试与降级
//!
//! ```text
//! SegmentTranslator (translator.rs)
//!     └── dyn TranslationEndpoint (endpoint.rs)
//!             └── HttpEndpoint
//! ```

pub mod endpoint;
pub mod translator;

pub use endpoint::{HttpEndpoint, RequestThrottle, TranslationEndpoint};
pub use translator::{parse_response, SegmentTranslator, TranslationOutcome};
