//! # 解析器模块
//!
//! 页面文档的解析、查询、修改与序列化。
//!
//! - `html` - HTML文档解析、DOM操作、选择器匹配

pub mod html;

pub use html::{html_to_dom, serialize_document, SelectorList};
