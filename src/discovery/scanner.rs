//! 发现循环
//!
//! 监听页面事件，找出尚未处理的可翻译元素，同步标记后为每个元素启动一个
//! 本地任务。元素句柄基于 `Rc`，因此循环及其任务必须运行在
//! [`tokio::task::LocalSet`] 中。

use std::panic::AssertUnwindSafe;
use std::rc::Rc;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::{JoinError, JoinSet};
use tokio::time::{interval_at, sleep, Instant, Interval, MissedTickBehavior};

use super::events::PageEvent;
use super::page::{Page, ProcessingState};
use crate::translation::config::{constants, DiscoveryConfig};
use crate::translation::pipeline::{TranslationCoordinator, UnitTranslator};

/// 发现循环运行报告
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    /// 执行的扫描次数
    pub scans: usize,
    /// 启动翻译的元素数
    pub elements_started: usize,
    /// 写回译文的元素数
    pub elements_rendered: usize,
    /// 因管道异常写入异常提示的元素数
    pub pipeline_panics: usize,
}

/// 发现循环
///
/// 默认使用 [`TranslationCoordinator`] 翻译元素文本。
pub struct DiscoveryLoop<P: Page + 'static, T: UnitTranslator + 'static = TranslationCoordinator> {
    page: Rc<P>,
    coordinator: Arc<T>,
    config: DiscoveryConfig,
    tasks: JoinSet<bool>,
    report: DiscoveryReport,
}

impl<P: Page + 'static, T: UnitTranslator + 'static> DiscoveryLoop<P, T> {
    pub fn new(
        page: Rc<P>,
        coordinator: Arc<T>,
        config: DiscoveryConfig,
    ) -> Self {
        Self {
            page,
            coordinator,
            config,
            tasks: JoinSet::new(),
            report: DiscoveryReport::default(),
        }
    }

    /// 扫描一次页面
    ///
    /// 同步完成全部标记和占位符插入，返回本次启动的元素数。
    /// 必须在 `LocalSet` 内调用。
    pub fn scan(&mut self) -> usize {
        self.report.scans += 1;

        let mut started = 0;
        for element in self.page.candidates() {
            if self.page.state(&element) != ProcessingState::Untouched {
                continue;
            }
            // 先标记再做其他判断，被跳过的元素同样保持已尝试状态
            self.page.set_state(&element, ProcessingState::Attempted);

            let text = self.page.text_content(&element).trim().to_string();
            if text.is_empty() || text.chars().count() < self.config.min_text_length {
                continue;
            }
            if self.page.is_excluded(&element) || self.page.has_adjacent_output(&element) {
                continue;
            }

            let output = match self.page.insert_output(&element, constants::PLACEHOLDER_TEXT) {
                Some(output) => output,
                None => {
                    tracing::debug!("元素已脱离文档，跳过");
                    continue;
                }
            };

            let page = self.page.clone();
            let coordinator = self.coordinator.clone();
            self.tasks.spawn_local(async move {
                let result = AssertUnwindSafe(coordinator.translate_unit(&text))
                    .catch_unwind()
                    .await;

                let (rendered, panicked) = match result {
                    Ok(translated) => (translated, false),
                    Err(_) => {
                        tracing::error!("元素翻译异常: {} 字符", text.chars().count());
                        (constants::ELEMENT_EXCEPTION_TEXT.to_string(), true)
                    }
                };

                page.set_output_text(&output, &rendered);
                page.set_state(&element, ProcessingState::Rendered);
                coordinator.element_rendered();
                panicked
            });
            started += 1;
        }

        self.report.elements_started += started;
        if started > 0 {
            tracing::info!("发现 {} 个新的待翻译元素", started);
        }
        started
    }

    /// 处理页面事件直到通道关闭，并等待全部元素任务完成
    pub async fn run(mut self, mut events: UnboundedReceiver<PageEvent>) -> DiscoveryReport {
        let debounce = sleep(self.config.debounce());
        tokio::pin!(debounce);
        let mut debounce_armed = false;

        let navigation = sleep(self.config.navigation_delay());
        tokio::pin!(navigation);
        let mut navigation_armed = false;

        let mut rescan = self.config.rescan_interval().map(|period| {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(PageEvent::Ready) => {
                        self.scan();
                    }
                    Some(PageEvent::Mutations(records)) => {
                        if records.iter().any(|record| record.adds_nodes()) {
                            debounce.as_mut().reset(Instant::now() + self.config.debounce());
                            debounce_armed = true;
                        }
                    }
                    Some(PageEvent::Navigated) => {
                        navigation
                            .as_mut()
                            .reset(Instant::now() + self.config.navigation_delay());
                        navigation_armed = true;
                    }
                    None => break,
                },
                () = &mut debounce, if debounce_armed => {
                    debounce_armed = false;
                    self.scan();
                }
                () = &mut navigation, if navigation_armed => {
                    navigation_armed = false;
                    self.scan();
                }
                _ = tick(&mut rescan), if rescan.is_some() => {
                    self.scan();
                }
                Some(result) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    self.record(result);
                }
            }
        }

        // 通道关闭前已排期的扫描直接执行
        if debounce_armed || navigation_armed {
            self.scan();
        }

        while let Some(result) = self.tasks.join_next().await {
            self.record(result);
        }

        tracing::info!(
            "发现循环结束: 扫描 {} 次, 启动 {} 个元素, 完成 {} 个",
            self.report.scans,
            self.report.elements_started,
            self.report.elements_rendered
        );
        self.report
    }

    /// 等待当前全部元素任务完成
    pub async fn settle(&mut self) {
        while let Some(result) = self.tasks.join_next().await {
            self.record(result);
        }
    }

    pub fn report(&self) -> DiscoveryReport {
        self.report
    }

    fn record(&mut self, result: Result<bool, JoinError>) {
        match result {
            Ok(panicked) => {
                self.report.elements_rendered += 1;
                if panicked {
                    self.report.pipeline_panics += 1;
                }
            }
            Err(error) => tracing::error!("元素任务异常退出: {}", error),
        }
    }
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
