//! 翻译配置管理模块
//!
//! 提供简化的配置管理，支持环境变量、配置文件和默认值

pub mod manager;

// 重新导出主要类型
pub use manager::{ConfigManager, DiscoveryConfig, OutputPlacement, TranslationConfig};

/// 配置常量
pub mod constants {
    use std::time::Duration;

    // 片段切分
    pub const MAX_SEGMENT_LENGTH: usize = 4000;
    pub const SENTENCE_TERMINATORS: &[char] = &['.', '!', '?', '。', '！', '？'];

    // 请求与重试
    pub const DEFAULT_API_URL: &str = "https://translate.googleapis.com/translate_a/single";
    pub const DEFAULT_SOURCE_LANG: &str = "en";
    pub const DEFAULT_TARGET_LANG: &str = "zh-CN";
    pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 20;
    pub const DEFAULT_MAX_RETRIES: usize = 3;
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
    pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

    // 缓存
    pub const DEFAULT_CACHE_SIZE: usize = 1000;

    // 页面发现
    pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);
    pub const DEFAULT_NAVIGATION_DELAY: Duration = Duration::from_millis(1000);
    pub const DEFAULT_SELECTORS: &[&str] = &[".titleline > a:first-child", ".commtext"];
    pub const DEFAULT_EXCLUDE_SELECTORS: &[&str] =
        &["form[action=\"comment\"]", "textarea", "[contenteditable]"];
    pub const STATE_ATTRIBUTE: &str = "data-translate-state";
    pub const OUTPUT_CLASS: &str = "page-translation";
    pub const CONTAINER_CLASS: &str = "page-translation-container";

    // 用户可见文本
    pub const PLACEHOLDER_TEXT: &str = "翻译中...";
    pub const ELEMENT_EXCEPTION_TEXT: &str = "[翻译异常]";
    pub const FALLBACK_INVALID_RESPONSE: &str = "[翻译失败：无效响应]";
    pub const FALLBACK_PARSE_ERROR: &str = "[翻译失败：解析错误]";
    pub const FALLBACK_NETWORK_ERROR: &str = "[翻译失败：网络错误]";
    pub const FALLBACK_TIMEOUT: &str = "[翻译失败：请求超时]";

    /// 调度器拒绝某个片段时的占位文本
    pub fn segment_failure_placeholder(index: usize) -> String {
        format!("[片段{}翻译失败]", index)
    }

    // 配置文件搜索路径
    pub const CONFIG_PATHS: &[&str] = &[
        "page-translator.toml",
        ".page-translator.toml",
        "page-translator.json",
        "~/.config/page-translator/config.toml",
        "/etc/page-translator/config.toml",
    ];

    // 依次尝试加载的 .env 文件
    pub const ENV_FILES: &[&str] = &[".env.local", ".env.development", ".env.production", ".env"];
}
