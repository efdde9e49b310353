//! 简化的配置管理器
//!
//! 提供统一的配置接口，支持文件配置、环境变量和默认值

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::constants;
use crate::parsers::html::SelectorList;
use crate::translation::error::{TranslationError, TranslationResult};

/// 译文节点的放置方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputPlacement {
    /// 用容器包裹原元素，译文追加在容器内
    #[default]
    Wrap,
    /// 译文作为紧随原元素之后的兄弟节点
    Sibling,
}

impl std::str::FromStr for OutputPlacement {
    type Err = TranslationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "wrap" => Ok(OutputPlacement::Wrap),
            "sibling" | "after" => Ok(OutputPlacement::Sibling),
            other => Err(TranslationError::ConfigError(format!(
                "未知的译文放置方式: {}",
                other
            ))),
        }
    }
}

/// 页面发现配置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// 可翻译元素的选择器
    pub selectors: Vec<String>,
    /// 祖先命中这些选择器的元素不翻译
    pub exclude_selectors: Vec<String>,
    pub debounce_ms: u64,
    /// 定时兜底扫描间隔，0 表示关闭
    pub rescan_interval_ms: u64,
    pub navigation_delay_ms: u64,
    pub min_text_length: usize,
    pub placement: OutputPlacement,
    pub output_class: String,
    pub container_class: String,
    pub state_attribute: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            selectors: constants::DEFAULT_SELECTORS.iter().map(|s| s.to_string()).collect(),
            exclude_selectors: constants::DEFAULT_EXCLUDE_SELECTORS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            debounce_ms: constants::DEFAULT_DEBOUNCE.as_millis() as u64,
            rescan_interval_ms: 0,
            navigation_delay_ms: constants::DEFAULT_NAVIGATION_DELAY.as_millis() as u64,
            min_text_length: 1,
            placement: OutputPlacement::default(),
            output_class: constants::OUTPUT_CLASS.to_string(),
            container_class: constants::CONTAINER_CLASS.to_string(),
            state_attribute: constants::STATE_ATTRIBUTE.to_string(),
        }
    }
}

impl DiscoveryConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn rescan_interval(&self) -> Option<Duration> {
        (self.rescan_interval_ms > 0).then(|| Duration::from_millis(self.rescan_interval_ms))
    }

    pub fn navigation_delay(&self) -> Duration {
        Duration::from_millis(self.navigation_delay_ms)
    }

    /// 解析可翻译元素选择器
    pub fn selector_list(&self) -> TranslationResult<SelectorList> {
        Ok(SelectorList::parse(&self.selectors.join(", "))?)
    }

    /// 解析排除选择器，列表为空时返回空选择器集
    pub fn exclude_list(&self) -> TranslationResult<SelectorList> {
        if self.exclude_selectors.is_empty() {
            return Ok(SelectorList::default());
        }
        Ok(SelectorList::parse(&self.exclude_selectors.join(", "))?)
    }
}

/// 翻译配置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TranslationConfig {
    // 基础配置
    pub source_lang: String,
    pub target_lang: String,
    pub api_url: String,

    // 请求配置
    pub max_concurrent_requests: usize,
    pub max_retries: usize,
    pub request_timeout_ms: u64,
    pub retry_delay_ms: u64,
    pub min_request_interval_ms: u64,
    pub max_segment_length: usize,

    // 缓存配置
    pub cache_enabled: bool,
    pub cache_size: usize,

    pub discovery: DiscoveryConfig,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            source_lang: constants::DEFAULT_SOURCE_LANG.to_string(),
            target_lang: constants::DEFAULT_TARGET_LANG.to_string(),
            api_url: constants::DEFAULT_API_URL.to_string(),

            max_concurrent_requests: constants::DEFAULT_MAX_CONCURRENT_REQUESTS,
            max_retries: constants::DEFAULT_MAX_RETRIES,
            request_timeout_ms: constants::DEFAULT_REQUEST_TIMEOUT.as_millis() as u64,
            retry_delay_ms: constants::DEFAULT_RETRY_DELAY.as_millis() as u64,
            min_request_interval_ms: 0,
            max_segment_length: constants::MAX_SEGMENT_LENGTH,

            cache_enabled: true,
            cache_size: constants::DEFAULT_CACHE_SIZE,

            discovery: DiscoveryConfig::default(),
        }
    }
}

impl TranslationConfig {
    /// 验证配置
    pub fn validate(&self) -> TranslationResult<()> {
        if self.max_concurrent_requests == 0 {
            return Err(TranslationError::ConfigError("最大并发数不能为0".to_string()));
        }

        if self.max_segment_length == 0 {
            return Err(TranslationError::ConfigError("片段最大长度不能为0".to_string()));
        }

        if self.request_timeout_ms == 0 {
            return Err(TranslationError::ConfigError("请求超时不能为0".to_string()));
        }

        if self.cache_enabled && self.cache_size == 0 {
            return Err(TranslationError::ConfigError(
                "启用缓存时缓存大小不能为0".to_string(),
            ));
        }

        if url::Url::parse(&self.api_url).is_err() {
            return Err(TranslationError::ConfigError(format!(
                "无效的 API 地址: {}",
                self.api_url
            )));
        }

        if self.discovery.selectors.is_empty() {
            return Err(TranslationError::ConfigError("至少需要一个选择器".to_string()));
        }

        self.discovery.selector_list()?;
        self.discovery.exclude_list()?;

        Ok(())
    }

    /// 应用环境变量覆盖
    ///
    /// 只有显式设置的变量才会覆盖，非法值记录警告后忽略。
    pub fn apply_env_overrides(&mut self) {
        use crate::env::{cache, discovery, translation, EnvVar};

        fn take<T>(value: Option<crate::env::EnvResult<T>>) -> Option<T> {
            match value? {
                Ok(v) => Some(v),
                Err(e) => {
                    tracing::warn!("忽略无效的环境变量: {}", e);
                    None
                }
            }
        }

        if let Some(lang) = take(translation::SourceLang::get_set()) {
            self.source_lang = lang;
        }
        if let Some(lang) = take(translation::TargetLang::get_set()) {
            self.target_lang = lang;
        }
        if let Some(api_url) = take(translation::ApiUrl::get_set()) {
            tracing::info!("环境变量覆盖 API URL: {}", api_url);
            self.api_url = api_url;
        }
        if let Some(n) = take(translation::MaxConcurrentRequests::get_set()) {
            self.max_concurrent_requests = n;
        }
        if let Some(n) = take(translation::MaxRetries::get_set()) {
            self.max_retries = n;
        }
        if let Some(timeout) = take(translation::RequestTimeout::get_set()) {
            self.request_timeout_ms = timeout.as_millis() as u64;
        }
        if let Some(delay) = take(translation::RetryDelay::get_set()) {
            self.retry_delay_ms = delay.as_millis() as u64;
        }
        if let Some(interval) = take(translation::MinRequestInterval::get_set()) {
            self.min_request_interval_ms = interval.as_millis() as u64;
        }
        if let Some(n) = take(translation::MaxSegmentLength::get_set()) {
            self.max_segment_length = n;
        }

        if let Some(enabled) = take(cache::Enabled::get_set()) {
            self.cache_enabled = enabled;
        }
        if let Some(size) = take(cache::LocalCacheSize::get_set()) {
            self.cache_size = size;
        }

        if let Some(debounce) = take(discovery::Debounce::get_set()) {
            self.discovery.debounce_ms = debounce.as_millis() as u64;
        }
        if let Some(interval) = take(discovery::RescanInterval::get_set()) {
            self.discovery.rescan_interval_ms = interval.map_or(0, |d| d.as_millis() as u64);
        }
        if let Some(selectors) = take(discovery::Selectors::get_set()) {
            self.discovery.selectors = selectors;
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }
}

/// 简化的配置管理器
pub struct ConfigManager {
    config: TranslationConfig,
}

impl ConfigManager {
    /// 搜索默认路径加载配置，再叠加环境变量
    ///
    /// 不做校验，调用方叠加完其他来源后调用 [`TranslationConfig::validate`]。
    pub fn new() -> TranslationResult<Self> {
        let mut config = Self::load_config()?;
        config.apply_env_overrides();

        Ok(Self { config })
    }

    /// 从指定文件加载配置，再叠加环境变量
    pub fn from_file<P: AsRef<Path>>(path: P) -> TranslationResult<Self> {
        Self::load_dotenv();
        let mut config = Self::load_from_file(path.as_ref())?;
        config.apply_env_overrides();

        Ok(Self { config })
    }

    /// 获取配置
    pub fn get_config(&self) -> &TranslationConfig {
        &self.config
    }

    pub fn into_config(self) -> TranslationConfig {
        self.config
    }

    fn load_config() -> TranslationResult<TranslationConfig> {
        // 首先尝试加载 .env 文件
        Self::load_dotenv();

        for path in constants::CONFIG_PATHS {
            let expanded_path = shellexpand::tilde(path);
            let candidate = Path::new(expanded_path.as_ref());
            if candidate.exists() {
                tracing::info!("加载配置文件: {}", expanded_path);
                return Self::load_from_file(candidate);
            }
        }

        tracing::debug!("未找到配置文件，使用默认配置");
        Ok(TranslationConfig::default())
    }

    /// 从指定文件加载配置，按扩展名选择 TOML 或 JSON
    pub fn load_from_file(path: &Path) -> TranslationResult<TranslationConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TranslationError::ConfigError(format!("读取配置文件失败: {}", e)))?;

        let is_json = path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            serde_json::from_str(&content)
                .map_err(|e| TranslationError::ConfigError(format!("解析JSON配置失败: {}", e)))
        } else {
            toml::from_str(&content)
                .map_err(|e| TranslationError::ConfigError(format!("解析TOML配置失败: {}", e)))
        }
    }

    fn load_dotenv() {
        for env_file in constants::ENV_FILES {
            if Path::new(env_file).exists() && dotenv::from_filename(env_file).is_ok() {
                tracing::info!("已加载环境变量文件: {}", env_file);
                break;
            }
        }
    }

    /// 生成示例配置文件
    pub fn generate_example_config<P: AsRef<Path>>(path: P) -> TranslationResult<()> {
        let config = TranslationConfig::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| TranslationError::ConfigError(format!("序列化配置失败: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| TranslationError::ConfigError(format!("写入配置文件失败: {}", e)))?;

        Ok(())
    }
}
