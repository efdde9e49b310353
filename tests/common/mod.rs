// 集成测试公共模块
//
// 提供可编排的翻译端点、测试配置和 HTML 辅助工具

use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use markup5ever_rcdom::{Handle, RcDom};
use tokio::time::Instant;

use page_translator::discovery::RcDomPage;
use page_translator::parsers::html::{html_to_dom, serialize_document};
use page_translator::translation::config::{DiscoveryConfig, TranslationConfig};
use page_translator::translation::error::{TranslationError, TranslationResult};
use page_translator::translation::{RequestThrottle, TranslationEndpoint};

/// 模拟翻译：转成大写
pub fn fake_translate(text: &str) -> String {
    text.to_uppercase()
}

/// 构造翻译服务格式的响应正文
pub fn google_payload(translated: &str) -> String {
    serde_json::json!([[[translated, "original", null, null, 10]], null, "en"]).to_string()
}

/// 单次调用的应答
#[derive(Debug, Clone)]
pub enum Reply {
    /// 正常翻译（大写）
    Translate,
    /// 返回指定正文
    Body(String),
    /// 传输失败
    NetworkError,
    /// 永不返回，由调用方超时
    Hang,
    /// 端点内部 panic
    Panic,
}

/// 可编排的翻译端点
///
/// 每段文本可以预设一串应答，用完后按 `fallback` 应答。
pub struct MockEndpoint {
    scripts: Mutex<HashMap<String, VecDeque<Reply>>>,
    fallback: Mutex<Reply>,
    delays: Mutex<HashMap<String, Duration>>,
    default_delay: Mutex<Duration>,
    calls: AtomicUsize,
    log: Mutex<Vec<String>>,
    active: AtomicUsize,
    peak: AtomicUsize,
    throttle: RequestThrottle,
    starts: Mutex<Vec<Instant>>,
}

impl Default for MockEndpoint {
    fn default() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            fallback: Mutex::new(Reply::Translate),
            delays: Mutex::new(HashMap::new()),
            default_delay: Mutex::new(Duration::ZERO),
            calls: AtomicUsize::new(0),
            log: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            throttle: RequestThrottle::new(Duration::ZERO),
            starts: Mutex::new(Vec::new()),
        }
    }
}

impl MockEndpoint {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// 所有请求都使用同一应答
    pub fn always(reply: Reply) -> Arc<Self> {
        let endpoint = Self::default();
        *endpoint.fallback.lock().unwrap() = reply;
        Arc::new(endpoint)
    }

    /// 两次请求开始之间至少间隔 `interval`
    pub fn throttled(interval: Duration) -> Arc<Self> {
        Arc::new(Self {
            throttle: RequestThrottle::new(interval),
            ..Self::default()
        })
    }

    /// 为某段文本预设应答序列
    pub fn script(&self, text: &str, replies: Vec<Reply>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(text.to_string(), replies.into());
    }

    pub fn delay_for(&self, text: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(text.to_string(), delay);
    }

    pub fn delay_all(&self, delay: Duration) {
        *self.default_delay.lock().unwrap() = delay;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// 按文本统计的调用次数
    pub fn calls_for(&self, text: &str) -> usize {
        self.log.lock().unwrap().iter().filter(|t| *t == text).count()
    }

    pub fn requested_texts(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// 每次请求开始的时间
    pub fn request_starts(&self) -> Vec<Instant> {
        self.starts.lock().unwrap().clone()
    }

    /// 同时进行中的请求数峰值
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn next_reply(&self, text: &str) -> Reply {
        let scripted = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(text)
            .and_then(|replies| replies.pop_front());
        scripted.unwrap_or_else(|| self.fallback.lock().unwrap().clone())
    }
}

struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl TranslationEndpoint for MockEndpoint {
    fn ready(&self) -> BoxFuture<'_, ()> {
        self.throttle.wait().boxed()
    }

    fn fetch<'a>(&'a self, text: &'a str) -> BoxFuture<'a, TranslationResult<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.starts.lock().unwrap().push(Instant::now());
        self.log.lock().unwrap().push(text.to_string());

        let reply = self.next_reply(text);
        let delay = self
            .delays
            .lock()
            .unwrap()
            .get(text)
            .copied()
            .unwrap_or_else(|| *self.default_delay.lock().unwrap());

        async move {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            let _guard = ActiveGuard(&self.active);

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            match reply {
                Reply::Translate => Ok(google_payload(&fake_translate(text))),
                Reply::Body(body) => Ok(body),
                Reply::NetworkError => Err(TranslationError::NetworkError(
                    "connection refused".to_string(),
                )),
                Reply::Hang => {
                    futures::future::pending::<()>().await;
                    unreachable!()
                }
                Reply::Panic => panic!("endpoint exploded"),
            }
        }
        .boxed()
    }
}

/// 测试配置
///
/// 重试间隔和超时都很短，配合 `start_paused` 的虚拟时间使用。
pub fn test_config() -> TranslationConfig {
    TranslationConfig {
        max_concurrent_requests: 4,
        max_retries: 3,
        request_timeout_ms: 1_000,
        retry_delay_ms: 100,
        max_segment_length: 4_000,
        cache_enabled: false,
        ..TranslationConfig::default()
    }
}

/// 只选择 `.commtext` 元素的发现配置
pub fn comment_discovery() -> DiscoveryConfig {
    DiscoveryConfig {
        selectors: vec![".commtext".to_string()],
        debounce_ms: 500,
        ..DiscoveryConfig::default()
    }
}

/// HTML测试工具
pub struct HtmlTestHelper;

impl HtmlTestHelper {
    /// 创建测试用的DOM结构
    pub fn create_test_dom(html: &str) -> RcDom {
        html_to_dom(html.as_bytes(), "utf-8").unwrap()
    }

    pub fn create_page(html: &str, config: &DiscoveryConfig) -> Rc<RcDomPage> {
        Rc::new(RcDomPage::new(Self::create_test_dom(html), config).unwrap())
    }

    /// 类似 Hacker News 评论区的页面
    pub fn create_comment_page(comments: &[&str]) -> String {
        let items: String = comments
            .iter()
            .map(|c| format!("<tr><td><div class=\"comment\"><div class=\"commtext\">{}</div></div></td></tr>", c))
            .collect();
        format!(
            r#"<!DOCTYPE html>
<html>
<head><title>Comments</title><meta charset="UTF-8"></head>
<body>
<span class="titleline"><a href="https://example.com">Show HN: A tiny translator</a> <a href="from?site=example.com">example.com</a></span>
<table>{}</table>
<form action="comment"><div class="commtext">Draft reply</div><textarea>typing</textarea></form>
</body>
</html>"#,
            items
        )
    }

    /// 在 body 末尾追加一段 HTML 片段中的全部元素
    pub fn append_html(page: &RcDomPage, fragment: &str) -> usize {
        let body = Self::find_by_tag(page.document(), "body").unwrap();
        let parsed = Self::create_test_dom(fragment);
        let source_body = Self::find_by_tag(&parsed.document, "body").unwrap();

        let children: Vec<Handle> = source_body.children.borrow().clone();
        for child in &children {
            page_translator::parsers::html::append_child(&body, child.clone());
        }
        children.len()
    }

    pub fn find_by_tag(root: &Handle, tag: &str) -> Option<Handle> {
        page_translator::parsers::html::dom::descendant_elements(root)
            .into_iter()
            .find(|n| page_translator::parsers::html::get_node_name(n) == Some(tag))
    }

    pub fn serialize(page: &RcDomPage) -> String {
        String::from_utf8(serialize_document(page.document(), "utf-8").unwrap()).unwrap()
    }

    /// 所有带指定 class 的元素文本
    pub fn texts_with_class(page: &RcDomPage, class: &str) -> Vec<String> {
        page_translator::parsers::html::dom::descendant_elements(page.document())
            .iter()
            .filter(|n| page_translator::parsers::html::has_class(n, class))
            .map(page_translator::parsers::html::text_content)
            .collect()
    }
}
