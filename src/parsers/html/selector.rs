//! CSS 选择器子集
//!
//! 支持类型、`*`、`.class`、`#id`、`[attr]`、`[attr=value]`、`:first-child`、
//! `:last-child`，以及后代（空格）和子（`>`）组合器与逗号分隔的选择器列表。
//! 词法部分交给 cssparser，匹配自右向左进行。

use cssparser::{ParseError, Parser, ParserInput, Token};
use markup5ever_rcdom::Handle;
use thiserror::Error;

use super::dom::{
    descendant_elements, element_children, get_node_attr, get_node_name, get_parent_node,
    has_class, is_element,
};
use std::rc::Rc;

/// 选择器解析错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("无法解析选择器 '{selector}': {message}")]
pub struct SelectorParseError {
    pub selector: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrSelector {
    Exists(String),
    Equals(String, String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pseudo {
    FirstChild,
    LastChild,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct CompoundSelector {
    tag: Option<String>,
    ids: Vec<String>,
    classes: Vec<String>,
    attrs: Vec<AttrSelector>,
    pseudos: Vec<Pseudo>,
}

/// 单个复合选择器链，最后一段是匹配主体
#[derive(Debug, Clone, PartialEq, Eq)]
struct ComplexSelector {
    parts: Vec<(Combinator, CompoundSelector)>,
}

/// 逗号分隔的选择器列表
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorList {
    selectors: Vec<ComplexSelector>,
}

impl SelectorList {
    pub fn parse(input: &str) -> Result<Self, SelectorParseError> {
        let selectors = SelectorParser::new(input)?.parse_list()?;
        Ok(Self { selectors })
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    /// 元素是否匹配列表中任一选择器
    pub fn matches(&self, element: &Handle) -> bool {
        is_element(element)
            && self
                .selectors
                .iter()
                .any(|s| matches_at(&s.parts, s.parts.len() - 1, element))
    }

    /// 按文档顺序返回根节点下所有匹配元素
    pub fn select(&self, root: &Handle) -> Vec<Handle> {
        if self.is_empty() {
            return Vec::new();
        }
        descendant_elements(root)
            .into_iter()
            .filter(|el| self.matches(el))
            .collect()
    }

    /// 自身或最近的匹配祖先
    pub fn closest(&self, element: &Handle) -> Option<Handle> {
        let mut current = Some(element.clone());
        while let Some(node) = current {
            if !is_element(&node) {
                return None;
            }
            if self.matches(&node) {
                return Some(node);
            }
            current = get_parent_node(&node);
        }
        None
    }
}

fn matches_at(parts: &[(Combinator, CompoundSelector)], index: usize, element: &Handle) -> bool {
    let (combinator, compound) = &parts[index];
    if !compound.matches(element) {
        return false;
    }
    if index == 0 {
        return true;
    }

    match combinator {
        Combinator::Child => get_parent_node(element)
            .filter(is_element)
            .map_or(false, |parent| matches_at(parts, index - 1, &parent)),
        Combinator::Descendant => {
            let mut ancestor = get_parent_node(element);
            while let Some(node) = ancestor.filter(is_element) {
                if matches_at(parts, index - 1, &node) {
                    return true;
                }
                ancestor = get_parent_node(&node);
            }
            false
        }
    }
}

impl CompoundSelector {
    fn is_empty(&self) -> bool {
        *self == CompoundSelector::default()
    }

    fn matches(&self, element: &Handle) -> bool {
        let Some(name) = get_node_name(element) else {
            return false;
        };

        if let Some(tag) = &self.tag {
            if tag != "*" && !name.eq_ignore_ascii_case(tag) {
                return false;
            }
        }

        if !self
            .ids
            .iter()
            .all(|id| get_node_attr(element, "id").as_deref() == Some(id.as_str()))
        {
            return false;
        }

        if !self.classes.iter().all(|class| has_class(element, class)) {
            return false;
        }

        let attrs_match = self.attrs.iter().all(|attr| match attr {
            AttrSelector::Exists(name) => get_node_attr(element, name).is_some(),
            AttrSelector::Equals(name, value) => {
                get_node_attr(element, name).as_deref() == Some(value.as_str())
            }
        });
        if !attrs_match {
            return false;
        }

        self.pseudos.iter().all(|pseudo| {
            let Some(parent) = get_parent_node(element) else {
                return false;
            };
            let siblings = element_children(&parent);
            let target = match pseudo {
                Pseudo::FirstChild => siblings.first(),
                Pseudo::LastChild => siblings.last(),
            };
            target.map_or(false, |t| Rc::ptr_eq(t, element))
        })
    }
}

/// 选择器中用到的 token
#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Whitespace,
    Ident(String),
    Hash(String),
    Delim(char),
    Colon,
    Comma,
    Attr(AttrSelector),
}

/// 用 cssparser 切分 token，属性选择器在方括号块内直接解析
fn tokenize(input: &str) -> Result<Vec<Piece>, String> {
    let mut parser_input = ParserInput::new(input);
    let mut parser = Parser::new(&mut parser_input);
    let mut pieces = Vec::new();

    loop {
        let token = match parser.next_including_whitespace() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };

        let piece = match token {
            Token::WhiteSpace(_) => Piece::Whitespace,
            Token::Ident(name) => Piece::Ident(name.to_string()),
            Token::IDHash(name) => Piece::Hash(name.to_string()),
            Token::Delim(c @ ('.' | '*' | '>')) => Piece::Delim(c),
            Token::Colon => Piece::Colon,
            Token::Comma => Piece::Comma,
            Token::SquareBracketBlock => {
                let attr = parser
                    .parse_nested_block(|parser| parse_attr(parser))
                    .map_err(|_| "无效的属性选择器".to_string())?;
                Piece::Attr(attr)
            }
            other => return Err(format!("意外的 token {:?}", other)),
        };
        pieces.push(piece);
    }

    Ok(pieces)
}

fn parse_attr<'i>(parser: &mut Parser<'i, '_>) -> Result<AttrSelector, ParseError<'i, ()>> {
    let name = parser.expect_ident()?.to_ascii_lowercase();
    if parser.is_exhausted() {
        return Ok(AttrSelector::Exists(name));
    }

    parser.expect_delim('=')?;
    let value = parser.expect_ident_or_string()?.to_string();
    parser.expect_exhausted()?;
    Ok(AttrSelector::Equals(name, value))
}

struct SelectorParser<'a> {
    input: &'a str,
    pieces: Vec<Piece>,
    pos: usize,
}

impl<'a> SelectorParser<'a> {
    fn new(input: &'a str) -> Result<Self, SelectorParseError> {
        let pieces = tokenize(input).map_err(|message| SelectorParseError {
            selector: input.to_string(),
            message,
        })?;
        Ok(Self {
            input,
            pieces,
            pos: 0,
        })
    }

    fn error(&self, message: impl Into<String>) -> SelectorParseError {
        SelectorParseError {
            selector: self.input.to_string(),
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<&Piece> {
        self.pieces.get(self.pos)
    }

    fn skip_whitespace(&mut self) {
        while self.peek() == Some(&Piece::Whitespace) {
            self.pos += 1;
        }
    }

    fn expect_ident(&mut self) -> Result<String, SelectorParseError> {
        match self.peek().cloned() {
            Some(Piece::Ident(name)) => {
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.error("缺少标识符")),
        }
    }

    fn parse_list(&mut self) -> Result<Vec<ComplexSelector>, SelectorParseError> {
        let mut selectors = vec![self.parse_complex()?];
        while self.peek() == Some(&Piece::Comma) {
            self.pos += 1;
            selectors.push(self.parse_complex()?);
        }
        Ok(selectors)
    }

    fn parse_complex(&mut self) -> Result<ComplexSelector, SelectorParseError> {
        let mut parts = Vec::new();
        let mut combinator = Combinator::Descendant;
        let mut pending_child = false;

        loop {
            self.skip_whitespace();
            match self.peek() {
                None | Some(Piece::Comma) => break,
                Some(Piece::Delim('>')) => {
                    if parts.is_empty() || pending_child {
                        return Err(self.error("组合器 '>' 缺少左侧选择器"));
                    }
                    self.pos += 1;
                    combinator = Combinator::Child;
                    pending_child = true;
                    continue;
                }
                _ => {}
            }

            let compound = self.parse_compound()?;
            if compound.is_empty() {
                return Err(self.error(format!("意外的 {:?}", self.peek())));
            }
            match self.peek() {
                None | Some(Piece::Whitespace | Piece::Comma | Piece::Delim('>')) => {}
                Some(other) => return Err(self.error(format!("意外的 {:?}", other))),
            }
            parts.push((combinator, compound));
            combinator = Combinator::Descendant;
            pending_child = false;
        }

        if pending_child {
            return Err(self.error("组合器 '>' 缺少右侧选择器"));
        }
        if parts.is_empty() {
            return Err(self.error("空选择器"));
        }

        Ok(ComplexSelector { parts })
    }

    fn parse_compound(&mut self) -> Result<CompoundSelector, SelectorParseError> {
        let mut compound = CompoundSelector::default();

        match self.peek().cloned() {
            Some(Piece::Delim('*')) => {
                self.pos += 1;
                compound.tag = Some("*".to_string());
            }
            Some(Piece::Ident(name)) => {
                self.pos += 1;
                compound.tag = Some(name.to_ascii_lowercase());
            }
            _ => {}
        }

        loop {
            match self.peek().cloned() {
                Some(Piece::Delim('.')) => {
                    self.pos += 1;
                    compound.classes.push(self.expect_ident()?);
                }
                Some(Piece::Hash(id)) => {
                    self.pos += 1;
                    compound.ids.push(id);
                }
                Some(Piece::Attr(attr)) => {
                    self.pos += 1;
                    compound.attrs.push(attr);
                }
                Some(Piece::Colon) => {
                    self.pos += 1;
                    let name = self.expect_ident()?;
                    let pseudo = match name.as_str() {
                        "first-child" => Pseudo::FirstChild,
                        "last-child" => Pseudo::LastChild,
                        other => return Err(self.error(format!("不支持的伪类 ':{}'", other))),
                    };
                    compound.pseudos.push(pseudo);
                }
                _ => break,
            }
        }

        Ok(compound)
    }
}
