use std::cell::RefCell;
use std::rc::Rc;

use encoding_rs::Encoding;
use html5ever::interface::{Attribute, QualName};
use html5ever::parse_document;
use html5ever::tendril::{format_tendril, StrTendril, TendrilSink};
use html5ever::tree_builder::create_element;
use html5ever::{namespace_url, ns, LocalName};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom};

/// 将 HTML 字节转换为 DOM
pub fn html_to_dom(data: &[u8], document_encoding: &str) -> std::io::Result<RcDom> {
    let s: String = match Encoding::for_label(document_encoding.as_bytes()) {
        Some(encoding) => encoding.decode(data).0.into_owned(),
        None => String::from_utf8_lossy(data).into_owned(),
    };

    parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut s.as_bytes())
}

/// 获取节点属性值
pub fn get_node_attr(node: &Handle, attr_name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| &*attr.name.local == attr_name)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

/// 读取文档声明的字符集
///
/// 支持 `<meta charset="...">` 和
/// `<meta http-equiv="content-type" content="text/html; charset=...">` 两种写法。
pub fn get_charset(document: &Handle) -> Option<String> {
    for meta in descendant_elements(document)
        .iter()
        .filter(|node| get_node_name(node) == Some("meta"))
    {
        if let Some(charset) = get_node_attr(meta, "charset") {
            return Some(charset.trim().to_string());
        }

        let is_content_type = get_node_attr(meta, "http-equiv")
            .map_or(false, |value| value.eq_ignore_ascii_case("content-type"));
        if is_content_type {
            let content = get_node_attr(meta, "content").unwrap_or_default();
            let charset = content.split(';').find_map(|part| {
                let (key, value) = part.split_once('=')?;
                key.trim()
                    .eq_ignore_ascii_case("charset")
                    .then(|| value.trim().trim_matches('"').to_string())
            });
            if charset.is_some() {
                return charset;
            }
        }
    }

    None
}

/// 获取节点名称
pub fn get_node_name(node: &Handle) -> Option<&'_ str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.as_ref()),
        _ => None,
    }
}

/// 获取父节点，不改变节点的父指针
pub fn get_parent_node(child: &Handle) -> Option<Handle> {
    let weak = child.parent.take();
    let parent = weak.as_ref().and_then(|node| node.upgrade());
    child.parent.set(weak);
    parent
}

/// 设置节点属性，`None` 表示删除该属性
pub fn set_node_attr(node: &Handle, attr_name: &str, attr_value: Option<String>) {
    if let NodeData::Element { attrs, .. } = &node.data {
        let mut attrs = attrs.borrow_mut();
        let position = attrs.iter().position(|attr| &*attr.name.local == attr_name);

        match (position, attr_value) {
            (Some(i), Some(value)) => {
                attrs[i].value.clear();
                attrs[i].value.push_slice(value.as_str());
            }
            (Some(i), None) => {
                attrs.remove(i);
            }
            (None, Some(value)) => attrs.push(Attribute {
                name: QualName::new(None, ns!(), LocalName::from(attr_name)),
                value: format_tendril!("{}", value),
            }),
            (None, None) => {}
        }
    }
}

/// 检查元素是否带有指定 class
pub fn has_class(node: &Handle, class_name: &str) -> bool {
    get_node_attr(node, "class")
        .map_or(false, |classes| classes.split_ascii_whitespace().any(|c| c == class_name))
}

pub fn is_element(node: &Handle) -> bool {
    matches!(node.data, NodeData::Element { .. })
}

/// 元素子节点（跳过文本、注释等）
pub fn element_children(node: &Handle) -> Vec<Handle> {
    node.children
        .borrow()
        .iter()
        .filter(|child| is_element(child))
        .cloned()
        .collect()
}

/// 紧随其后的元素兄弟节点
pub fn next_element_sibling(node: &Handle) -> Option<Handle> {
    let parent = get_parent_node(node)?;
    let children = parent.children.borrow();
    let index = children.iter().position(|c| Rc::ptr_eq(c, node))?;
    children[index + 1..].iter().find(|c| is_element(c)).cloned()
}

/// 节点及其后代的全部文本
pub fn text_content(node: &Handle) -> String {
    let mut text = String::new();
    collect_text(node, &mut text);
    text
}

fn collect_text(node: &Handle, out: &mut String) {
    match &node.data {
        NodeData::Text { contents } => out.push_str(&contents.borrow()),
        NodeData::Element { .. } | NodeData::Document => {
            for child in node.children.borrow().iter() {
                collect_text(child, out);
            }
        }
        _ => {}
    }
}

/// 以单个文本节点替换全部子节点
pub fn set_text_content(node: &Handle, text: &str) {
    for child in node.children.borrow_mut().drain(..) {
        child.parent.set(None);
    }
    append_child(node, create_text_node(text));
}

/// 创建元素节点
pub fn create_element_node(dom: &RcDom, tag: &str, attrs: &[(&str, &str)]) -> Handle {
    create_element(
        dom,
        QualName::new(None, ns!(html), LocalName::from(tag)),
        attrs
            .iter()
            .map(|(name, value)| Attribute {
                name: QualName::new(None, ns!(), LocalName::from(*name)),
                value: format_tendril!("{}", value),
            })
            .collect(),
    )
}

pub fn create_text_node(text: &str) -> Handle {
    Node::new(NodeData::Text {
        contents: RefCell::new(StrTendril::from(text)),
    })
}

/// 将节点追加为最后一个子节点
pub fn append_child(parent: &Handle, child: Handle) {
    detach(&child);
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child);
}

/// 在参照节点之后插入新节点
pub fn insert_after(reference: &Handle, new_node: Handle) -> bool {
    let Some(parent) = get_parent_node(reference) else {
        return false;
    };
    detach(&new_node);

    let mut children = parent.children.borrow_mut();
    match children.iter().position(|c| Rc::ptr_eq(c, reference)) {
        Some(index) => {
            new_node.parent.set(Some(Rc::downgrade(&parent)));
            children.insert(index + 1, new_node);
            true
        }
        None => false,
    }
}

/// 用容器替换节点所在位置，并把节点移入容器
pub fn wrap_node(node: &Handle, container: Handle) -> bool {
    let Some(parent) = get_parent_node(node) else {
        return false;
    };
    detach(&container);

    {
        let mut children = parent.children.borrow_mut();
        let Some(index) = children.iter().position(|c| Rc::ptr_eq(c, node)) else {
            return false;
        };
        container.parent.set(Some(Rc::downgrade(&parent)));
        children[index] = container.clone();
    }

    node.parent.set(Some(Rc::downgrade(&container)));
    container.children.borrow_mut().push(node.clone());
    true
}

/// 从父节点中摘除
pub fn detach(node: &Handle) {
    if let Some(parent) = get_parent_node(node) {
        parent.children.borrow_mut().retain(|c| !Rc::ptr_eq(c, node));
    }
    node.parent.set(None);
}

/// 按文档顺序收集所有元素
pub fn descendant_elements(root: &Handle) -> Vec<Handle> {
    let mut found = Vec::new();
    collect_elements(root, &mut found);
    found
}

fn collect_elements(node: &Handle, found: &mut Vec<Handle>) {
    for child in node.children.borrow().iter() {
        if is_element(child) {
            found.push(child.clone());
        }
        collect_elements(child, found);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_of(dom: &RcDom) -> Handle {
        descendant_elements(&dom.document)
            .into_iter()
            .find(|n| get_node_name(n) == Some("body"))
            .unwrap()
    }

    #[test]
    fn test_text_content_and_attrs() {
        let dom = html_to_dom(
            b"<html><body><p class=\"a b\" id=\"x\">Hello <b>world</b></p></body></html>",
            "utf-8",
        )
        .unwrap();
        let p = element_children(&body_of(&dom)).remove(0);

        assert_eq!(text_content(&p), "Hello world");
        assert!(has_class(&p, "b"));
        assert!(!has_class(&p, "c"));

        set_node_attr(&p, "data-state", Some("attempted".to_string()));
        assert_eq!(get_node_attr(&p, "data-state").as_deref(), Some("attempted"));
        set_node_attr(&p, "data-state", None);
        assert_eq!(get_node_attr(&p, "data-state"), None);
    }

    #[test]
    fn test_parent_lookup_is_non_destructive() {
        let dom = html_to_dom(b"<body><p>one</p></body>", "utf-8").unwrap();
        let body = body_of(&dom);
        let p = element_children(&body).remove(0);

        assert!(get_parent_node(&p).is_some());
        assert!(get_parent_node(&p).is_some());
    }

    #[test]
    fn test_insert_after_and_wrap() {
        let dom = html_to_dom(b"<body><p>one</p><p>two</p></body>", "utf-8").unwrap();
        let body = body_of(&dom);
        let first = element_children(&body).remove(0);

        let note = create_element_node(&dom, "div", &[("class", "note")]);
        set_text_content(&note, "inserted");
        assert!(insert_after(&first, note.clone()));
        assert!(Rc::ptr_eq(&next_element_sibling(&first).unwrap(), &note));

        let container = create_element_node(&dom, "div", &[]);
        assert!(wrap_node(&first, container.clone()));
        let children = element_children(&body);
        assert!(Rc::ptr_eq(&children[0], &container));
        assert_eq!(text_content(&container), "one");
        assert!(Rc::ptr_eq(&get_parent_node(&first).unwrap(), &container));
    }

    #[test]
    fn test_charset_detection() {
        let dom = html_to_dom(b"<head><meta charset=\"GBK\"></head>", "utf-8").unwrap();
        assert_eq!(get_charset(&dom.document).as_deref(), Some("GBK"));

        let dom = html_to_dom(
            b"<head><meta http-equiv=\"Content-Type\" content=\"text/html; charset=windows-1252\"></head>",
            "utf-8",
        )
        .unwrap();
        assert_eq!(get_charset(&dom.document).as_deref(), Some("windows-1252"));

        let dom = html_to_dom(b"<p>none</p>", "utf-8").unwrap();
        assert_eq!(get_charset(&dom.document), None);
    }

    #[test]
    fn test_decodes_declared_encoding() {
        let (bytes, _, _) = encoding_rs::GBK.encode("<p>你好</p>");
        let dom = html_to_dom(&bytes, "gbk").unwrap();
        assert_eq!(text_content(&dom.document), "你好");
    }
}
