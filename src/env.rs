//! 统一的环境变量管理系统
//!
//! 提供类型安全、可验证的环境变量访问，所有变量都以 `PAGE_TRANSLATOR_` 为前缀

use std::env;
use std::fmt;
use std::time::Duration;

/// 环境变量解析错误
#[derive(Debug, Clone)]
pub struct EnvError {
    pub variable: String,
    pub message: String,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment variable '{}': {}", self.variable, self.message)
    }
}

impl std::error::Error for EnvError {}

pub type EnvResult<T> = Result<T, EnvError>;

/// 环境变量访问器特性
pub trait EnvVar<T> {
    const NAME: &'static str;
    const DEFAULT: Option<T>;
    const DESCRIPTION: &'static str;

    fn parse(value: &str) -> EnvResult<T>;

    fn get() -> EnvResult<T> {
        match env::var(Self::NAME) {
            Ok(value) => Self::parse(&value),
            Err(_) => {
                if let Some(default) = Self::DEFAULT {
                    Ok(default)
                } else {
                    Err(EnvError {
                        variable: Self::NAME.to_string(),
                        message: "Required environment variable not set".to_string(),
                    })
                }
            }
        }
    }

    /// 仅在变量被显式设置时返回值
    fn get_set() -> Option<EnvResult<T>> {
        env::var(Self::NAME).ok().map(|value| Self::parse(&value))
    }

    fn get_or_default(default: T) -> T {
        Self::get().unwrap_or(default)
    }
}

/// 核心环境变量定义
pub mod core {
    use super::*;

    /// 日志级别
    pub struct LogLevel;
    impl EnvVar<String> for LogLevel {
        const NAME: &'static str = "PAGE_TRANSLATOR_LOG_LEVEL";
        const DEFAULT: Option<String> = None;

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("warn".to_string()),
            }
        }
        const DESCRIPTION: &'static str = "Log level: trace, debug, info, warn, error";

        fn parse(value: &str) -> EnvResult<String> {
            match value.to_lowercase().as_str() {
                "trace" | "debug" | "info" | "warn" | "error" => Ok(value.to_lowercase()),
                _ => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!(
                        "Invalid log level '{}'. Use: trace, debug, info, warn, error",
                        value
                    ),
                }),
            }
        }
    }

    /// 禁用颜色输出
    pub struct NoColor;
    impl EnvVar<bool> for NoColor {
        const NAME: &'static str = "NO_COLOR";
        const DEFAULT: Option<bool> = Some(false);
        const DESCRIPTION: &'static str = "Disable colored output when set to any value";

        fn parse(value: &str) -> EnvResult<bool> {
            // NO_COLOR 遵循标准：任何值都表示禁用颜色
            Ok(!value.is_empty())
        }
    }
}

/// 翻译相关环境变量
pub mod translation {
    use super::*;

    /// 目标语言
    pub struct TargetLang;
    impl EnvVar<String> for TargetLang {
        const NAME: &'static str = "PAGE_TRANSLATOR_TARGET_LANG";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Target language code, e.g. zh-CN";

        fn parse(value: &str) -> EnvResult<String> {
            parse_lang(value, Self::NAME, false)
        }
    }

    /// 源语言
    pub struct SourceLang;
    impl EnvVar<String> for SourceLang {
        const NAME: &'static str = "PAGE_TRANSLATOR_SOURCE_LANG";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Source language code ('auto' for detection by the endpoint)";

        fn parse(value: &str) -> EnvResult<String> {
            parse_lang(value, Self::NAME, true)
        }
    }

    /// API URL
    pub struct ApiUrl;
    impl EnvVar<String> for ApiUrl {
        const NAME: &'static str = "PAGE_TRANSLATOR_API_URL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Translation endpoint URL";

        fn parse(value: &str) -> EnvResult<String> {
            let url = value.trim();
            if url.starts_with("http://") || url.starts_with("https://") {
                Ok(url.to_string())
            } else {
                Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "API URL must start with http:// or https://".to_string(),
                })
            }
        }
    }

    /// 最大并发请求数
    pub struct MaxConcurrentRequests;
    impl EnvVar<usize> for MaxConcurrentRequests {
        const NAME: &'static str = "PAGE_TRANSLATOR_MAX_CONCURRENT_REQUESTS";
        const DEFAULT: Option<usize> = Some(20);
        const DESCRIPTION: &'static str = "Maximum concurrent requests to the translation endpoint";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_positive_usize(value, Self::NAME, 1, 100)
        }
    }

    /// 最大重试次数
    pub struct MaxRetries;
    impl EnvVar<usize> for MaxRetries {
        const NAME: &'static str = "PAGE_TRANSLATOR_MAX_RETRIES";
        const DEFAULT: Option<usize> = Some(3);
        const DESCRIPTION: &'static str = "Retries per segment before falling back";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_positive_usize(value, Self::NAME, 0, 10)
        }
    }

    /// 单次请求超时
    pub struct RequestTimeout;
    impl EnvVar<Duration> for RequestTimeout {
        const NAME: &'static str = "PAGE_TRANSLATOR_REQUEST_TIMEOUT";
        const DEFAULT: Option<Duration> = Some(Duration::from_secs(15));
        const DESCRIPTION: &'static str = "Per-request timeout in seconds";

        fn parse(value: &str) -> EnvResult<Duration> {
            let seconds = parse_positive_usize(value, Self::NAME, 1, 300)?;
            Ok(Duration::from_secs(seconds as u64))
        }
    }

    /// 重试间隔
    pub struct RetryDelay;
    impl EnvVar<Duration> for RetryDelay {
        const NAME: &'static str = "PAGE_TRANSLATOR_RETRY_DELAY_MS";
        const DEFAULT: Option<Duration> = Some(Duration::from_millis(1000));
        const DESCRIPTION: &'static str = "Flat delay between retries in milliseconds";

        fn parse(value: &str) -> EnvResult<Duration> {
            let millis = parse_positive_usize(value, Self::NAME, 0, 60_000)?;
            Ok(Duration::from_millis(millis as u64))
        }
    }

    /// 请求最小间隔
    pub struct MinRequestInterval;
    impl EnvVar<Duration> for MinRequestInterval {
        const NAME: &'static str = "PAGE_TRANSLATOR_MIN_REQUEST_INTERVAL";
        const DEFAULT: Option<Duration> = Some(Duration::ZERO);
        const DESCRIPTION: &'static str =
            "Minimum milliseconds between the starts of two requests (0 disables throttling)";

        fn parse(value: &str) -> EnvResult<Duration> {
            let millis = parse_positive_usize(value, Self::NAME, 0, 60_000)?;
            Ok(Duration::from_millis(millis as u64))
        }
    }

    /// 片段最大长度
    pub struct MaxSegmentLength;
    impl EnvVar<usize> for MaxSegmentLength {
        const NAME: &'static str = "PAGE_TRANSLATOR_MAX_SEGMENT_LENGTH";
        const DEFAULT: Option<usize> = Some(4000);
        const DESCRIPTION: &'static str = "Maximum characters per translation request";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_positive_usize(value, Self::NAME, 100, 50_000)
        }
    }
}

/// 缓存相关环境变量
pub mod cache {
    use super::*;

    /// 缓存启用状态
    pub struct Enabled;
    impl EnvVar<bool> for Enabled {
        const NAME: &'static str = "PAGE_TRANSLATOR_CACHE_ENABLED";
        const DEFAULT: Option<bool> = Some(true);
        const DESCRIPTION: &'static str = "Cache fully translated text units in memory";

        fn parse(value: &str) -> EnvResult<bool> {
            parse_bool(value, Self::NAME)
        }
    }

    /// 本地缓存大小
    pub struct LocalCacheSize;
    impl EnvVar<usize> for LocalCacheSize {
        const NAME: &'static str = "PAGE_TRANSLATOR_CACHE_SIZE";
        const DEFAULT: Option<usize> = Some(1000);
        const DESCRIPTION: &'static str = "Local cache size (number of entries)";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_positive_usize(value, Self::NAME, 10, 100_000)
        }
    }
}

/// 页面发现相关环境变量
pub mod discovery {
    use super::*;

    /// 变更防抖时长
    pub struct Debounce;
    impl EnvVar<Duration> for Debounce {
        const NAME: &'static str = "PAGE_TRANSLATOR_DEBOUNCE_MS";
        const DEFAULT: Option<Duration> = Some(Duration::from_millis(500));
        const DESCRIPTION: &'static str = "Quiet period before a mutation burst triggers a scan";

        fn parse(value: &str) -> EnvResult<Duration> {
            let millis = parse_positive_usize(value, Self::NAME, 0, 60_000)?;
            Ok(Duration::from_millis(millis as u64))
        }
    }

    /// 定时重扫间隔，0 表示关闭
    pub struct RescanInterval;
    impl EnvVar<Option<Duration>> for RescanInterval {
        const NAME: &'static str = "PAGE_TRANSLATOR_RESCAN_INTERVAL_MS";
        const DEFAULT: Option<Option<Duration>> = Some(None);
        const DESCRIPTION: &'static str = "Safety-net rescan interval in milliseconds (0 disables)";

        fn parse(value: &str) -> EnvResult<Option<Duration>> {
            let millis = parse_positive_usize(value, Self::NAME, 0, 3_600_000)?;
            Ok((millis > 0).then(|| Duration::from_millis(millis as u64)))
        }
    }

    /// 选择器列表，以分号分隔
    pub struct Selectors;
    impl EnvVar<Vec<String>> for Selectors {
        const NAME: &'static str = "PAGE_TRANSLATOR_SELECTORS";
        const DEFAULT: Option<Vec<String>> = None;
        const DESCRIPTION: &'static str = "Selectors of translatable elements (semicolon-separated)";

        fn parse(value: &str) -> EnvResult<Vec<String>> {
            let selectors: Vec<String> = value
                .split(';')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if selectors.is_empty() {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "At least one selector is required".to_string(),
                });
            }
            Ok(selectors)
        }
    }
}

/// 辅助函数
fn parse_bool(value: &str, var_name: &str) -> EnvResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" | "enabled" => Ok(true),
        "false" | "0" | "no" | "off" | "disabled" => Ok(false),
        _ => Err(EnvError {
            variable: var_name.to_string(),
            message: format!(
                "Invalid boolean value '{}'. Use: true/false, 1/0, yes/no, on/off, enabled/disabled",
                value
            ),
        }),
    }
}

fn parse_positive_usize(value: &str, var_name: &str, min: usize, max: usize) -> EnvResult<usize> {
    let num: usize = value.trim().parse().map_err(|_| EnvError {
        variable: var_name.to_string(),
        message: "Must be a valid positive number".to_string(),
    })?;

    if num < min {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} is below minimum {}", num, min),
        });
    }

    if num > max {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} exceeds maximum {}", num, max),
        });
    }

    Ok(num)
}

/// 语言代码：两到三个字母，可带地区后缀（如 zh-CN）
fn parse_lang(value: &str, var_name: &str, allow_auto: bool) -> EnvResult<String> {
    let lang = value.trim();
    if allow_auto && lang.eq_ignore_ascii_case("auto") {
        return Ok("auto".to_string());
    }

    let mut parts = lang.splitn(2, '-');
    let primary = parts.next().unwrap_or_default();
    let region_ok = parts
        .next()
        .map_or(true, |r| !r.is_empty() && r.chars().all(|c| c.is_ascii_alphanumeric()));

    if (2..=3).contains(&primary.len())
        && primary.chars().all(|c| c.is_ascii_alphabetic())
        && region_ok
    {
        Ok(lang.to_string())
    } else {
        Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Invalid language code '{}'", value),
        })
    }
}

/// 环境变量文档生成器
pub fn generate_env_docs() -> String {
    fn line(name: &str, description: &str) -> String {
        format!("- `{}`: {}\n", name, description)
    }

    let mut docs = String::new();
    docs.push_str("# Environment Variables\n\n");

    docs.push_str("## Core\n\n");
    docs.push_str(&line(core::LogLevel::NAME, core::LogLevel::DESCRIPTION));
    docs.push_str(&line(core::NoColor::NAME, core::NoColor::DESCRIPTION));

    docs.push_str("\n## Translation\n\n");
    docs.push_str(&line(translation::SourceLang::NAME, translation::SourceLang::DESCRIPTION));
    docs.push_str(&line(translation::TargetLang::NAME, translation::TargetLang::DESCRIPTION));
    docs.push_str(&line(translation::ApiUrl::NAME, translation::ApiUrl::DESCRIPTION));
    docs.push_str(&line(
        translation::MaxConcurrentRequests::NAME,
        translation::MaxConcurrentRequests::DESCRIPTION,
    ));
    docs.push_str(&line(translation::MaxRetries::NAME, translation::MaxRetries::DESCRIPTION));
    docs.push_str(&line(
        translation::RequestTimeout::NAME,
        translation::RequestTimeout::DESCRIPTION,
    ));
    docs.push_str(&line(translation::RetryDelay::NAME, translation::RetryDelay::DESCRIPTION));
    docs.push_str(&line(
        translation::MinRequestInterval::NAME,
        translation::MinRequestInterval::DESCRIPTION,
    ));
    docs.push_str(&line(
        translation::MaxSegmentLength::NAME,
        translation::MaxSegmentLength::DESCRIPTION,
    ));

    docs.push_str("\n## Cache\n\n");
    docs.push_str(&line(cache::Enabled::NAME, cache::Enabled::DESCRIPTION));
    docs.push_str(&line(cache::LocalCacheSize::NAME, cache::LocalCacheSize::DESCRIPTION));

    docs.push_str("\n## Discovery\n\n");
    docs.push_str(&line(discovery::Debounce::NAME, discovery::Debounce::DESCRIPTION));
    docs.push_str(&line(discovery::RescanInterval::NAME, discovery::RescanInterval::DESCRIPTION));
    docs.push_str(&line(discovery::Selectors::NAME, discovery::Selectors::DESCRIPTION));

    docs
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_boolean_parsing() {
        assert!(cache::Enabled::parse("true").unwrap());
        assert!(cache::Enabled::parse("1").unwrap());
        assert!(cache::Enabled::parse("YES").unwrap());
        assert!(!cache::Enabled::parse("off").unwrap());
        assert!(cache::Enabled::parse("maybe").is_err());
    }

    #[test]
    fn test_language_codes() {
        assert_eq!(translation::TargetLang::parse("zh-CN").unwrap(), "zh-CN");
        assert_eq!(translation::TargetLang::parse(" ja ").unwrap(), "ja");
        assert!(translation::TargetLang::parse("auto").is_err());
        assert_eq!(translation::SourceLang::parse("AUTO").unwrap(), "auto");
        assert!(translation::SourceLang::parse("english").is_err());
        assert!(translation::SourceLang::parse("zh-").is_err());
    }

    #[test]
    fn test_url_validation() {
        assert!(translation::ApiUrl::parse("http://localhost:1188").is_ok());
        assert!(translation::ApiUrl::parse("https://translate.googleapis.com/translate_a/single").is_ok());
        assert!(translation::ApiUrl::parse("ftp://example.com").is_err());
    }

    #[test]
    fn test_numeric_validation() {
        assert_eq!(translation::MaxRetries::parse("0").unwrap(), 0);
        assert!(translation::MaxRetries::parse("11").is_err());
        assert!(translation::MaxConcurrentRequests::parse("0").is_err());
        assert_eq!(
            translation::RetryDelay::parse("250").unwrap(),
            Duration::from_millis(250)
        );
        assert_eq!(
            translation::MinRequestInterval::parse("400").unwrap(),
            Duration::from_millis(400)
        );
        assert!(translation::MinRequestInterval::parse("-1").is_err());
        assert_eq!(discovery::RescanInterval::parse("0").unwrap(), None);
        assert_eq!(
            discovery::RescanInterval::parse("4000").unwrap(),
            Some(Duration::from_secs(4))
        );
    }

    #[test]
    fn test_selector_list_parsing() {
        let selectors = discovery::Selectors::parse(".titleline > a ; .commtext;").unwrap();
        assert_eq!(selectors, vec![".titleline > a", ".commtext"]);
        assert!(discovery::Selectors::parse(" ; ").is_err());
    }

    #[test]
    fn test_get_set_only_reports_present_variables() {
        env::set_var("PAGE_TRANSLATOR_MAX_SEGMENT_LENGTH", "1200");
        assert_eq!(
            translation::MaxSegmentLength::get_set().map(|r| r.unwrap()),
            Some(1200)
        );
        env::remove_var("PAGE_TRANSLATOR_MAX_SEGMENT_LENGTH");
        assert!(translation::MaxSegmentLength::get_set().is_none());
        assert_eq!(translation::MaxSegmentLength::get().unwrap(), 4000);
    }

    #[test]
    fn test_env_docs_mention_every_section() {
        let docs = generate_env_docs();
        assert!(docs.contains("PAGE_TRANSLATOR_API_URL"));
        assert!(docs.contains("## Discovery"));
    }
}
