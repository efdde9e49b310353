//! 页面事件
//!
//! 宿主通过 `tokio::sync::mpsc` 通道把页面变化推送给发现循环，
//! 通道关闭即表示页面会话结束。

/// DOM 变化类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    ChildList,
    Attributes,
    CharacterData,
}

/// 一条 DOM 变化记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub kind: MutationKind,
    pub added_nodes: usize,
    pub removed_nodes: usize,
}

impl MutationRecord {
    pub fn child_list(added_nodes: usize, removed_nodes: usize) -> Self {
        Self {
            kind: MutationKind::ChildList,
            added_nodes,
            removed_nodes,
        }
    }

    pub fn attributes() -> Self {
        Self {
            kind: MutationKind::Attributes,
            added_nodes: 0,
            removed_nodes: 0,
        }
    }

    /// 是否新增了节点
    pub fn adds_nodes(&self) -> bool {
        self.kind == MutationKind::ChildList && self.added_nodes > 0
    }
}

/// 页面事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    /// 页面就绪，立即扫描
    Ready,
    /// 一批 DOM 变化，含新增节点时触发防抖扫描
    Mutations(Vec<MutationRecord>),
    /// 前端路由跳转，延迟后扫描
    Navigated,
}
