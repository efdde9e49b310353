//! 文本切分器
//!
//! 把任意长的文本切成有序片段，每段不超过上限，优先在换行与句末标点处切分。
//! 片段只作为请求边界使用，不追求分句准确。长度以字符（`char`）计。

use std::sync::OnceLock;

use regex::Regex;

use crate::translation::config::constants::SENTENCE_TERMINATORS;

fn sentence_boundary() -> &'static Regex {
    static BOUNDARY: OnceLock<Regex> = OnceLock::new();
    // 句末标点及其后的空白一起归入前一个片段，拼接时不丢字符
    BOUNDARY.get_or_init(|| {
        let terminators: String = SENTENCE_TERMINATORS
            .iter()
            .map(|c| regex::escape(&c.to_string()))
            .collect();
        Regex::new(&format!(r"[{}]\s*", terminators)).expect("sentence boundary pattern")
    })
}

/// 切分文本
///
/// 返回的片段按顺序拼接后与输入完全一致，且每段字符数不超过 `max_length`。
/// 输入本身不超过上限时原样返回单个片段。
pub fn segment(text: &str, max_length: usize) -> Vec<String> {
    let max_length = max_length.max(1);

    if text.chars().count() <= max_length {
        return vec![text.to_string()];
    }

    let fragments = split_fragments(text);

    let mut safe_fragments: Vec<&str> = Vec::with_capacity(fragments.len());
    for fragment in fragments {
        if fragment.chars().count() > max_length {
            safe_fragments.extend(split_by_length(fragment, max_length));
        } else {
            safe_fragments.push(fragment);
        }
    }

    let segments = pack(&safe_fragments, max_length);

    tracing::debug!(
        "文本 ({} 字符) 切分为 {} 个片段",
        text.chars().count(),
        segments.len()
    );

    if segments.is_empty() {
        vec![text.to_string()]
    } else {
        segments
    }
}

/// 按换行切分（换行单独成段），再在每行内部按句末标点切分
fn split_fragments(text: &str) -> Vec<&str> {
    let mut fragments = Vec::new();

    let mut line_start = 0;
    for (i, c) in text.char_indices() {
        if c == '\n' {
            split_sentences(&text[line_start..i], &mut fragments);
            fragments.push(&text[i..i + 1]);
            line_start = i + 1;
        }
    }
    split_sentences(&text[line_start..], &mut fragments);

    fragments
}

fn split_sentences<'a>(line: &'a str, out: &mut Vec<&'a str>) {
    let mut start = 0;
    for m in sentence_boundary().find_iter(line) {
        if m.end() > start {
            out.push(&line[start..m.end()]);
            start = m.end();
        }
    }
    if start < line.len() {
        out.push(&line[start..]);
    }
}

/// 不考虑语义的定长切分
fn split_by_length(text: &str, max_length: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut chunk_start = 0;
    let mut count = 0;

    for (i, _) in text.char_indices() {
        if count == max_length {
            chunks.push(&text[chunk_start..i]);
            chunk_start = i;
            count = 0;
        }
        count += 1;
    }
    if chunk_start < text.len() {
        chunks.push(&text[chunk_start..]);
    }

    chunks
}

/// 贪心装箱：能放下就追加，放不下就另起一段
fn pack(fragments: &[&str], max_length: usize) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for fragment in fragments.iter().filter(|f| !f.is_empty()) {
        let fragment_len = fragment.chars().count();
        if current_len + fragment_len > max_length {
            if !current.is_empty() {
                segments.push(std::mem::take(&mut current));
            }
            current.push_str(fragment);
            current_len = fragment_len;
        } else {
            current.push_str(fragment);
            current_len += fragment_len;
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }

    segments
}
