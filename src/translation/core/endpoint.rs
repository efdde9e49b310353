//! 翻译端点
//!
//! [`TranslationEndpoint`] 把"发一次请求、拿回响应正文或错误"抽象出来，
//! 重试、超时和响应解析都在 [`SegmentTranslator`](super::SegmentTranslator) 中完成。
//! 节流等待放在 [`TranslationEndpoint::ready`] 中，不计入单次请求的超时。

use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use tokio::sync::Mutex;
use tokio::time::Instant;
use url::Url;

use crate::translation::config::TranslationConfig;
use crate::translation::error::{TranslationError, TranslationResult};

/// 远程翻译服务
///
/// 实现方只负责单次调用：成功时返回原始响应正文，
/// 传输失败返回 `NetworkError`，传输层超时返回 `TimeoutError`。
pub trait TranslationEndpoint: Send + Sync {
    /// 每次请求前等待，直到可以发出请求
    fn ready(&self) -> BoxFuture<'_, ()> {
        futures::future::ready(()).boxed()
    }

    fn fetch<'a>(&'a self, text: &'a str) -> BoxFuture<'a, TranslationResult<String>>;
}

/// 基于 HTTP GET 的翻译端点
pub struct HttpEndpoint {
    client: Client,
    api_url: Url,
    source_lang: String,
    target_lang: String,
    throttle: RequestThrottle,
}

impl HttpEndpoint {
    pub fn new(config: &TranslationConfig) -> TranslationResult<Self> {
        let api_url = Url::parse(&config.api_url).map_err(|e| {
            TranslationError::ConfigError(format!("无效的API地址 '{}': {}", config.api_url, e))
        })?;

        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| TranslationError::ConfigError(format!("HTTP客户端创建失败: {}", e)))?;

        Ok(Self {
            client,
            api_url,
            source_lang: config.source_lang.clone(),
            target_lang: config.target_lang.clone(),
            throttle: RequestThrottle::new(config.min_request_interval()),
        })
    }

    /// 构造请求地址
    pub fn request_url(&self, text: &str) -> Url {
        let mut url = self.api_url.clone();
        url.query_pairs_mut()
            .append_pair("client", "gtx")
            .append_pair("sl", &self.source_lang)
            .append_pair("tl", &self.target_lang)
            .append_pair("dt", "t")
            .append_pair("q", text);
        url
    }

    async fn request(&self, text: &str) -> TranslationResult<String> {
        let url = self.request_url(text);
        tracing::debug!("发送翻译请求: {} 字符", text.chars().count());

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            // 正文照常读取，由响应解析决定是否可用
            tracing::debug!("翻译服务返回状态码 {}", status);
        }

        Ok(response.text().await?)
    }
}

impl TranslationEndpoint for HttpEndpoint {
    fn ready(&self) -> BoxFuture<'_, ()> {
        self.throttle.wait().boxed()
    }

    fn fetch<'a>(&'a self, text: &'a str) -> BoxFuture<'a, TranslationResult<String>> {
        self.request(text).boxed()
    }
}

/// 请求节流
///
/// 两次请求开始之间至少间隔 `interval`；间隔为 0 时不等待。
/// 并发调用按到达顺序排队。
#[derive(Debug)]
pub struct RequestThrottle {
    interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RequestThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_request: Mutex::new(None),
        }
    }

    pub async fn wait(&self) {
        if self.interval.is_zero() {
            return;
        }

        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.interval {
                tokio::time::sleep(self.interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_url_encodes_query() {
        let config = TranslationConfig::default();
        let endpoint = HttpEndpoint::new(&config).unwrap();
        let url = endpoint.request_url("Hello world & more?");

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("client".to_string(), "gtx".to_string()),
                ("sl".to_string(), "en".to_string()),
                ("tl".to_string(), "zh-CN".to_string()),
                ("dt".to_string(), "t".to_string()),
                ("q".to_string(), "Hello world & more?".to_string()),
            ]
        );
        assert!(url.as_str().starts_with(&config.api_url));
    }

    #[test]
    fn test_rejects_invalid_url() {
        let config = TranslationConfig {
            api_url: "not a url".to_string(),
            ..TranslationConfig::default()
        };
        assert!(matches!(
            HttpEndpoint::new(&config),
            Err(TranslationError::ConfigError(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_spaces_request_starts() {
        let throttle = std::sync::Arc::new(RequestThrottle::new(Duration::from_millis(400)));
        let origin = Instant::now();

        let waits: Vec<_> = (0..4)
            .map(|_| {
                let throttle = throttle.clone();
                tokio::spawn(async move {
                    throttle.wait().await;
                    Instant::now()
                })
            })
            .collect();

        let mut starts = Vec::new();
        for wait in waits {
            starts.push(wait.await.unwrap().duration_since(origin));
        }
        starts.sort();

        assert_eq!(
            starts,
            vec![
                Duration::ZERO,
                Duration::from_millis(400),
                Duration::from_millis(800),
                Duration::from_millis(1200),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_never_waits() {
        let throttle = RequestThrottle::new(Duration::ZERO);
        let origin = Instant::now();
        for _ in 0..3 {
            throttle.wait().await;
        }
        assert_eq!(origin.elapsed(), Duration::ZERO);
    }
}
