//! 页面发现模块
//!
//! - `page`: 宿主页面抽象及 RcDom 实现
//! - `events`: 页面变化事件
//! - `scanner`: 防抖扫描循环，把新元素送入翻译管道

pub mod events;
pub mod page;
pub mod scanner;

pub use events::{MutationKind, MutationRecord, PageEvent};
pub use page::{Page, ProcessingState, RcDomPage};
pub use scanner::{DiscoveryLoop, DiscoveryReport};
