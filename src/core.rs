use std::rc::Rc;
use std::sync::Arc;

use encoding_rs::Encoding;
use markup5ever_rcdom::RcDom;
use tokio::sync::mpsc;
use tokio::task::LocalSet;

use crate::discovery::{DiscoveryLoop, DiscoveryReport, PageEvent, RcDomPage};
use crate::parsers::html::{get_charset, html_to_dom, serialize_document};
use crate::translation::config::{DiscoveryConfig, TranslationConfig};
use crate::translation::core::{HttpEndpoint, TranslationEndpoint};
use crate::translation::error::TranslationResult;
use crate::translation::pipeline::{StatsSnapshot, TranslationCoordinator};

const ANSI_COLOR_RED: &str = "\x1b[31m";
const ANSI_COLOR_RESET: &str = "\x1b[0m";

/// 一次文档翻译的结果
#[derive(Debug, Clone)]
pub struct DocumentTranslation {
    /// 按原文档编码序列化的 HTML
    pub html: Vec<u8>,
    pub encoding: String,
    pub report: DiscoveryReport,
    pub stats: StatsSnapshot,
}

/// 翻译整个 HTML 文档
///
/// 解析文档后执行一次完整的发现流程（就绪扫描，随后关闭事件通道），
/// 等待所有元素写回译文再序列化。
///
/// # Examples
///
/// ```no_run
/// use page_translator::core::translate_document;
/// use page_translator::translation::TranslationConfig;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let html = b"<div class=\"commtext\">Hello, world.</div>";
/// let result = translate_document(html, None, TranslationConfig::default()).await?;
/// println!("{}", String::from_utf8_lossy(&result.html));
/// # Ok(())
/// # }
/// ```
pub async fn translate_document(
    input_data: &[u8],
    input_encoding: Option<&str>,
    config: TranslationConfig,
) -> TranslationResult<DocumentTranslation> {
    let endpoint = HttpEndpoint::new(&config)?;
    translate_document_with_endpoint(input_data, input_encoding, config, Arc::new(endpoint)).await
}

/// 使用指定端点翻译整个 HTML 文档
pub async fn translate_document_with_endpoint(
    input_data: &[u8],
    input_encoding: Option<&str>,
    config: TranslationConfig,
    endpoint: Arc<dyn TranslationEndpoint>,
) -> TranslationResult<DocumentTranslation> {
    config.validate()?;

    let (dom, encoding) = parse_document(input_data, input_encoding)?;
    let page = Rc::new(RcDomPage::new(dom, &config.discovery)?);

    let discovery_config = config.discovery.clone();
    let coordinator = Arc::new(TranslationCoordinator::with_endpoint(config, endpoint));

    let report = LocalSet::new()
        .run_until(run_single_pass(
            page.clone(),
            coordinator.clone(),
            discovery_config,
        ))
        .await;

    let html = serialize_document(page.document(), &encoding)?;

    Ok(DocumentTranslation {
        html,
        encoding,
        report,
        stats: coordinator.stats_snapshot(),
    })
}

async fn run_single_pass(
    page: Rc<RcDomPage>,
    coordinator: Arc<TranslationCoordinator>,
    config: DiscoveryConfig,
) -> DiscoveryReport {
    let (events, receiver) = mpsc::unbounded_channel();
    let discovery = DiscoveryLoop::new(page, coordinator, config);

    // 接收端此时一定存活
    let _ = events.send(PageEvent::Ready);
    drop(events);

    discovery.run(receiver).await
}

/// 解析文档，优先使用文档内声明的字符集
fn parse_document(
    input_data: &[u8],
    input_encoding: Option<&str>,
) -> TranslationResult<(RcDom, String)> {
    let mut document_encoding = input_encoding.unwrap_or("utf-8").to_string();
    let mut dom = html_to_dom(input_data, &document_encoding)?;

    if input_encoding.is_none() {
        if let Some(html_charset) = get_charset(&dom.document) {
            if let Some(charset) = Encoding::for_label_no_replacement(html_charset.as_bytes()) {
                if !charset.name().eq_ignore_ascii_case(&document_encoding) {
                    tracing::debug!("按文档声明的字符集 {} 重新解析", charset.name());
                    document_encoding = charset.name().to_string();
                    dom = html_to_dom(input_data, &document_encoding)?;
                }
            }
        }
    }

    Ok((dom, document_encoding))
}

/// Prints an error message to stderr
pub fn print_error_message(msg: &str) {
    eprintln!("{ANSI_COLOR_RED}{msg}{ANSI_COLOR_RESET}");
}

/// Prints an info message to stderr
pub fn print_info_message(msg: &str) {
    eprintln!("{msg}");
}
