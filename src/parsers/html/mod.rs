//! HTML解析和处理模块
//!
//! - `dom`: 基础DOM读取与修改
//! - `selector`: CSS 选择器子集
//! - `serializer`: 序列化功能

pub mod dom;
pub mod selector;
pub mod serializer;

pub use dom::{
    append_child, create_element_node, create_text_node, get_charset, get_node_attr, get_node_name,
    get_parent_node, has_class, html_to_dom, insert_after, next_element_sibling, set_node_attr,
    set_text_content, text_content, wrap_node,
};
pub use selector::{SelectorList, SelectorParseError};
pub use serializer::serialize_document;
