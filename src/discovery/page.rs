//! 页面抽象
//!
//! [`Page`] 描述发现循环需要的全部 DOM 能力；[`RcDomPage`] 是基于
//! `markup5ever_rcdom` 文档的实现。

use std::rc::Rc;

use markup5ever_rcdom::{Handle, RcDom};

use crate::parsers::html::dom::{
    create_element_node, get_node_attr, get_parent_node, has_class, insert_after,
    next_element_sibling, set_node_attr, set_text_content, text_content, wrap_node,
};
use crate::parsers::html::{append_child, SelectorList};
use crate::translation::config::{constants, DiscoveryConfig, OutputPlacement};
use crate::translation::error::TranslationResult;

/// 元素处理状态
///
/// 只会沿 `Untouched → Attempted → Rendered` 方向变化。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingState {
    #[default]
    Untouched,
    Attempted,
    Rendered,
}

impl ProcessingState {
    pub fn as_str(&self) -> Option<&'static str> {
        match self {
            ProcessingState::Untouched => None,
            ProcessingState::Attempted => Some("attempted"),
            ProcessingState::Rendered => Some("rendered"),
        }
    }

    pub fn from_attr(value: Option<&str>) -> Self {
        match value {
            Some("rendered") => ProcessingState::Rendered,
            Some(_) => ProcessingState::Attempted,
            None => ProcessingState::Untouched,
        }
    }
}

/// 宿主页面
///
/// 所有方法都是同步的，调用方保证在单线程上访问。
pub trait Page {
    type Element: Clone + 'static;
    type Output: Clone + 'static;

    /// 按选择器策略查询候选元素（文档顺序）
    fn candidates(&self) -> Vec<Self::Element>;

    fn text_content(&self, element: &Self::Element) -> String;

    fn state(&self, element: &Self::Element) -> ProcessingState;

    fn set_state(&self, element: &Self::Element, state: ProcessingState);

    /// 元素位于排除区域或译文节点内
    fn is_excluded(&self, element: &Self::Element) -> bool;

    /// 元素旁已经有译文节点
    fn has_adjacent_output(&self, element: &Self::Element) -> bool;

    /// 插入显示 `text` 的译文节点，元素已脱离文档时返回 `None`
    fn insert_output(&self, element: &Self::Element, text: &str) -> Option<Self::Output>;

    fn set_output_text(&self, output: &Self::Output, text: &str);
}

/// 基于 RcDom 的页面
pub struct RcDomPage {
    dom: RcDom,
    selectors: SelectorList,
    exclusions: SelectorList,
    placement: OutputPlacement,
    output_class: String,
    container_class: String,
    state_attribute: String,
}

impl RcDomPage {
    pub fn new(dom: RcDom, config: &DiscoveryConfig) -> TranslationResult<Self> {
        Ok(Self {
            dom,
            selectors: config.selector_list()?,
            exclusions: config.exclude_list()?,
            placement: config.placement,
            output_class: config.output_class.clone(),
            container_class: config.container_class.clone(),
            state_attribute: config.state_attribute.clone(),
        })
    }

    pub fn dom(&self) -> &RcDom {
        &self.dom
    }

    pub fn document(&self) -> &Handle {
        &self.dom.document
    }

    pub fn into_dom(self) -> RcDom {
        self.dom
    }

    fn is_output(&self, node: &Handle) -> bool {
        has_class(node, &self.output_class)
    }

    fn inside_output(&self, element: &Handle) -> bool {
        let mut current = get_parent_node(element);
        while let Some(node) = current {
            if self.is_output(&node) {
                return true;
            }
            current = get_parent_node(&node);
        }
        false
    }
}

impl Page for RcDomPage {
    type Element = Handle;
    type Output = Handle;

    fn candidates(&self) -> Vec<Handle> {
        self.selectors.select(&self.dom.document)
    }

    fn text_content(&self, element: &Handle) -> String {
        text_content(element)
    }

    fn state(&self, element: &Handle) -> ProcessingState {
        ProcessingState::from_attr(get_node_attr(element, &self.state_attribute).as_deref())
    }

    fn set_state(&self, element: &Handle, state: ProcessingState) {
        set_node_attr(
            element,
            &self.state_attribute,
            state.as_str().map(str::to_string),
        );
    }

    fn is_excluded(&self, element: &Handle) -> bool {
        self.is_output(element)
            || self.exclusions.closest(element).is_some()
            || self.inside_output(element)
    }

    fn has_adjacent_output(&self, element: &Handle) -> bool {
        match self.placement {
            OutputPlacement::Wrap => get_parent_node(element).map_or(false, |parent| {
                has_class(&parent, &self.container_class)
                    || parent
                        .children
                        .borrow()
                        .iter()
                        .any(|child| !Rc::ptr_eq(child, element) && self.is_output(child))
            }),
            OutputPlacement::Sibling => {
                next_element_sibling(element).map_or(false, |next| self.is_output(&next))
            }
        }
    }

    fn insert_output(&self, element: &Handle, text: &str) -> Option<Handle> {
        match self.placement {
            OutputPlacement::Wrap => {
                let container = create_element_node(
                    &self.dom,
                    "div",
                    &[("class", self.container_class.as_str())],
                );
                if !wrap_node(element, container.clone()) {
                    return None;
                }
                let output =
                    create_element_node(&self.dom, "span", &[("class", self.output_class.as_str())]);
                set_text_content(&output, text);
                append_child(&container, output.clone());
                Some(output)
            }
            OutputPlacement::Sibling => {
                let output =
                    create_element_node(&self.dom, "div", &[("class", self.output_class.as_str())]);
                set_text_content(&output, text);
                insert_after(element, output.clone()).then_some(output)
            }
        }
    }

    fn set_output_text(&self, output: &Handle, text: &str) {
        set_text_content(output, text);
    }
}

impl Default for RcDomPage {
    fn default() -> Self {
        Self {
            dom: RcDom::default(),
            selectors: SelectorList::default(),
            exclusions: SelectorList::default(),
            placement: OutputPlacement::default(),
            output_class: constants::OUTPUT_CLASS.to_string(),
            container_class: constants::CONTAINER_CLASS.to_string(),
            state_attribute: constants::STATE_ATTRIBUTE.to_string(),
        }
    }
}
