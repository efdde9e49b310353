//! 并发调度器
//!
//! 所有片段请求都经过同一个调度器：同时运行的任务不超过上限，
//! 排队任务按提交顺序（FIFO）启动。任务 panic 只影响它自己的结果。

use std::collections::VecDeque;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::oneshot;

use crate::translation::error::DispatchError;

type Task = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

struct Queue {
    running: usize,
    pending: VecDeque<Task>,
}

/// 有界并发的任务调度器
///
/// 克隆后共享同一个队列和同一个并发上限。
#[derive(Clone)]
pub struct Dispatcher {
    max_concurrent: usize,
    queue: Arc<Mutex<Queue>>,
}

impl Dispatcher {
    /// 创建调度器，上限小于 1 时按 1 处理
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
            queue: Arc::new(Mutex::new(Queue {
                running: 0,
                pending: VecDeque::new(),
            })),
        }
    }

    /// 提交任务
    ///
    /// 任务在调用时立即入队，返回的 future 在任务结束后给出结果。
    /// 任务 panic 时得到 [`DispatchError::Panicked`]。
    /// 必须在 tokio 运行时内调用。
    pub fn submit<F, Fut, T>(&self, task: F) -> impl Future<Output = Result<T, DispatchError>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();

        let job: Task = Box::new(move || {
            async move {
                let result = AssertUnwindSafe(async move { task().await })
                    .catch_unwind()
                    .await
                    .map_err(|payload| DispatchError::Panicked(panic_message(payload.as_ref())));
                // 调用方已放弃结果时忽略
                let _ = tx.send(result);
            }
            .boxed()
        });

        self.lock().pending.push_back(job);
        self.pump();

        async move { rx.await.unwrap_or(Err(DispatchError::Dropped)) }
    }

    /// 当前运行中的任务数
    pub fn running(&self) -> usize {
        self.lock().running
    }

    /// 排队中的任务数
    pub fn pending(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 在未达上限时按顺序启动排队任务
    fn pump(&self) {
        loop {
            let job = {
                let mut queue = self.lock();
                if queue.running >= self.max_concurrent {
                    return;
                }
                match queue.pending.pop_front() {
                    Some(job) => {
                        queue.running += 1;
                        job
                    }
                    None => return,
                }
            };

            let dispatcher = self.clone();
            tokio::spawn(async move {
                job().await;
                dispatcher.lock().running -= 1;
                dispatcher.pump();
            });
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
