//! 翻译管道集成测试
//!
//! 测试切分、并发调度、按序拼接与缓存的完整流程

use std::sync::Arc;
use std::time::Duration;

use page_translator::core::translate_document_with_endpoint;
use page_translator::translation::config::constants;
use page_translator::translation::{segment, TranslationConfig, TranslationCoordinator};

mod common {
    include!("common/mod.rs");
}

use common::{comment_discovery, fake_translate, test_config, HtmlTestHelper, MockEndpoint};

fn coordinator(config: TranslationConfig, endpoint: Arc<MockEndpoint>) -> TranslationCoordinator {
    TranslationCoordinator::with_endpoint(config, endpoint)
}

/// 测试后完成的片段不会打乱拼接顺序
#[tokio::test(start_paused = true)]
async fn test_reassembly_follows_index_order() {
    let endpoint = MockEndpoint::new();
    // 第一个片段最慢
    endpoint.delay_for("First sentence. ", Duration::from_millis(500));
    endpoint.delay_for("Second one! ", Duration::from_millis(200));

    let config = TranslationConfig {
        max_segment_length: 16,
        ..test_config()
    };
    let coordinator = coordinator(config, endpoint.clone());

    let text = "First sentence. Second one! Third?";
    let unit = coordinator.translate_unit_detailed(text).await;

    assert_eq!(unit.text, fake_translate(text));
    assert_eq!(unit.segments, 3);
    assert!(unit.is_complete());
    assert_eq!(
        endpoint.requested_texts(),
        vec!["First sentence. ", "Second one! ", "Third?"],
        "segments should be submitted in order"
    );
}

/// 9000 字符、上限 4000、前 4000 字符内有两处句末 → 3 个片段
#[tokio::test(start_paused = true)]
async fn test_nine_thousand_char_unit() {
    let first = format!("{}. ", "a".repeat(1499));
    let second = format!("{}. ", "b".repeat(1499));
    let rest = "c".repeat(9000 - first.len() - second.len());
    let text = format!("{}{}{}", first, second, rest);

    let segments = segment(&text, constants::MAX_SEGMENT_LENGTH);
    assert_eq!(segments.len(), 3);
    assert!(segments.iter().all(|s| s.chars().count() <= 4000));
    assert_eq!(segments.concat(), text);

    let endpoint = MockEndpoint::new();
    let coordinator = coordinator(test_config(), endpoint.clone());
    let translated = coordinator.translate_unit(&text).await;

    assert_eq!(translated, fake_translate(&text));
    assert_eq!(endpoint.calls(), 3);
}

/// 测试空白文本不发请求
#[tokio::test(start_paused = true)]
async fn test_whitespace_unit_passes_through() {
    let endpoint = MockEndpoint::new();
    let coordinator = coordinator(test_config(), endpoint.clone());

    assert_eq!(coordinator.translate_unit("").await, "");
    assert_eq!(coordinator.translate_unit("  \n\t ").await, "  \n\t ");
    assert_eq!(endpoint.calls(), 0);
}

/// 测试所有元素共享同一个并发上限
#[tokio::test(start_paused = true)]
async fn test_shared_dispatcher_caps_requests() {
    let endpoint = MockEndpoint::new();
    endpoint.delay_all(Duration::from_millis(50));

    let config = TranslationConfig {
        max_concurrent_requests: 3,
        max_segment_length: 10,
        ..test_config()
    };
    let coordinator = Arc::new(coordinator(config, endpoint.clone()));

    let units: Vec<String> = (0..4)
        .map(|i| format!("Unit {} one. Unit {} two. Unit {} three.", i, i, i))
        .collect();
    let futures: Vec<_> = units
        .iter()
        .map(|unit| {
            let coordinator = coordinator.clone();
            async move { coordinator.translate_unit(unit).await }
        })
        .collect();
    let results = futures::future::join_all(futures).await;

    for (unit, result) in units.iter().zip(results) {
        assert_eq!(result, fake_translate(unit));
    }
    assert!(endpoint.calls() > 3);
    assert_eq!(
        endpoint.peak_concurrency(),
        3,
        "at most max_concurrent requests should be in flight"
    );
    assert_eq!(coordinator.dispatcher().running(), 0);
}

/// 测试缓存命中跳过网络请求
#[tokio::test(start_paused = true)]
async fn test_cache_hit_skips_network() {
    let endpoint = MockEndpoint::new();
    let config = TranslationConfig {
        cache_enabled: true,
        cache_size: 10,
        ..test_config()
    };
    let coordinator = coordinator(config, endpoint.clone());

    let first = coordinator.translate_unit_detailed("Cached text.").await;
    let second = coordinator.translate_unit_detailed("Cached text.").await;

    assert!(!first.cache_hit);
    assert!(second.cache_hit);
    assert_eq!(first.text, second.text);
    assert_eq!(endpoint.calls(), 1);
    assert_eq!(coordinator.stats_snapshot().cache_hits, 1);
    assert_eq!(coordinator.stats_snapshot().units_translated, 2);
}

/// 测试降级结果不进入缓存
#[tokio::test(start_paused = true)]
async fn test_fallback_is_not_cached() {
    let endpoint = MockEndpoint::always(common::Reply::NetworkError);
    let config = TranslationConfig {
        cache_enabled: true,
        max_retries: 0,
        ..test_config()
    };
    let coordinator = coordinator(config, endpoint.clone());

    for _ in 0..2 {
        assert_eq!(
            coordinator.translate_unit("Never works.").await,
            "[翻译失败：网络错误]"
        );
    }
    assert_eq!(endpoint.calls(), 2);
    assert!(coordinator.cache().unwrap().is_empty());
}

/// 端到端：解析文档、发现元素、写回译文
#[tokio::test(start_paused = true)]
async fn test_translate_document_end_to_end() {
    let html = HtmlTestHelper::create_comment_page(&["Hello there.", "Nice <i>work</i>!"]);
    let endpoint = MockEndpoint::new();
    let config = TranslationConfig {
        discovery: comment_discovery(),
        ..test_config()
    };

    let result = translate_document_with_endpoint(html.as_bytes(), None, config, endpoint.clone())
        .await
        .unwrap();
    let output = String::from_utf8(result.html).unwrap();

    assert!(output.contains("HELLO THERE."), "translation should be injected: {}", output);
    assert!(output.contains("NICE WORK!"));
    assert!(!output.contains(constants::PLACEHOLDER_TEXT));
    assert!(output.contains("data-translate-state=\"rendered\""));
    // 评论表单内的草稿不翻译
    assert!(!output.contains("DRAFT REPLY"));
    assert_eq!(endpoint.calls(), 2);

    assert_eq!(result.encoding, "utf-8");
    assert_eq!(result.report.scans, 1);
    assert_eq!(result.report.elements_started, 2);
    assert_eq!(result.report.elements_rendered, 2);
    assert_eq!(result.stats.elements_rendered, 2);
    assert_eq!(result.stats.segments_translated, 2);
}
