//! Text Chunking Module
//!
//! 구분자 우선순위 기반 재귀 텍스트 분할을 제공합니다.
//! 문단 → 줄 → 문장 → 단어 → 글자 순으로 경계를 찾아
//! 최대 크기 이하의 청크로 나누고, 인접 청크 간 오버랩을 유지합니다.
//!
//! 모든 길이는 바이트가 아니라 문자(char) 단위입니다 (그리스어 텍스트).

use std::collections::VecDeque;

use super::document::{Chunk, SourceDocument};

// ============================================================================
// Chunk Configuration
// ============================================================================

/// 기본 구분자 우선순위 (마지막 빈 문자열은 글자 단위 분할)
pub const DEFAULT_SEPARATORS: [&str; 7] = ["\n\n", "\n", ". ", "! ", "? ", " ", ""];

/// 청킹 설정
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// 최대 청크 크기 (문자 수)
    pub chunk_size: usize,
    /// 인접 청크 간 오버랩 (문자 수)
    pub chunk_overlap: usize,
    /// 최소 청크 크기 (이보다 짧은 청크는 버림)
    pub min_characters: usize,
    /// 구분자 우선순위
    pub separators: Vec<String>,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 100,
            min_characters: 50,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

// ============================================================================
// Chunker Trait
// ============================================================================

/// 텍스트 청킹 전략 트레이트
pub trait Chunker: Send + Sync {
    /// 텍스트를 청크로 분할
    fn chunk(&self, text: &str) -> Vec<String>;

    /// 청커 이름
    fn name(&self) -> &'static str;

    /// 문서를 출처 메타데이터가 붙은 청크로 분할
    fn split(&self, document: &SourceDocument) -> Vec<Chunk> {
        self.chunk(&document.text)
            .into_iter()
            .enumerate()
            .map(|(index, text)| Chunk {
                text,
                source_url: document.source_url.clone(),
                content_type: document.content_type,
                index,
            })
            .collect()
    }
}

// ============================================================================
// RecursiveChunker
// ============================================================================

/// 재귀 구분자 청커
pub struct RecursiveChunker {
    config: ChunkConfig,
}

impl RecursiveChunker {
    /// 설정으로 생성
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    /// 기본 설정으로 생성 (500/100/50)
    pub fn with_defaults() -> Self {
        Self::new(ChunkConfig::default())
    }

    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// 재귀 분할
    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut final_chunks = Vec::new();
        let (separator, remaining) = pick_separator(text, separators);

        let mut good: Vec<String> = Vec::new();
        for piece in split_keep_separator(text, separator) {
            if char_len(&piece) < self.config.chunk_size {
                good.push(piece);
                continue;
            }

            if !good.is_empty() {
                final_chunks.extend(self.merge_splits(&good));
                good.clear();
            }

            if remaining.is_empty() {
                final_chunks.push(piece);
            } else {
                final_chunks.extend(self.split_recursive(&piece, remaining));
            }
        }

        if !good.is_empty() {
            final_chunks.extend(self.merge_splits(&good));
        }

        final_chunks
    }

    /// 작은 조각들을 최대 크기까지 병합 (오버랩 유지)
    fn merge_splits(&self, pieces: &[String]) -> Vec<String> {
        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;

        let mut docs = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(piece);

            if total + len > size && !window.is_empty() {
                if total > size {
                    tracing::warn!(
                        "Created a chunk of size {}, which is longer than the specified {}",
                        total,
                        size
                    );
                }
                push_joined(&window, &mut docs);

                // 오버랩 크기 이하가 될 때까지 앞쪽 조각 제거
                while total > overlap || (total + len > size && total > 0) {
                    match window.pop_front() {
                        Some((_, front_len)) => total -= front_len,
                        None => break,
                    }
                }
            }

            window.push_back((piece.as_str(), len));
            total += len;
        }

        push_joined(&window, &mut docs);
        docs
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return vec![];
        }

        // 문서 전체가 최소 길이보다 짧으면 그대로 하나의 청크
        if char_len(trimmed) < self.config.min_characters {
            return vec![trimmed.to_string()];
        }

        let mut chunks = self.split_recursive(text, &self.config.separators);
        chunks.retain(|c| char_len(c) >= self.config.min_characters);
        chunks
    }

    fn name(&self) -> &'static str {
        "RecursiveChunker"
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

#[inline]
fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// 텍스트에 존재하는 첫 번째 구분자와 나머지 구분자 목록
///
/// 빈 구분자는 항상 매칭되며 더 이상 재귀하지 않습니다.
fn pick_separator<'a>(text: &str, separators: &'a [String]) -> (&'a str, &'a [String]) {
    for (i, sep) in separators.iter().enumerate() {
        if sep.is_empty() {
            return ("", &[]);
        }
        if text.contains(sep.as_str()) {
            return (sep.as_str(), &separators[i + 1..]);
        }
    }
    (separators.last().map(String::as_str).unwrap_or(""), &[])
}

/// 구분자로 분할하되 구분자를 다음 조각의 앞에 붙임
fn split_keep_separator(text: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        return text.chars().map(String::from).collect();
    }

    let mut parts = text.split(separator);
    let mut pieces = Vec::new();
    if let Some(first) = parts.next() {
        pieces.push(first.to_string());
    }
    for part in parts {
        pieces.push(format!("{}{}", separator, part));
    }
    pieces.retain(|p| !p.is_empty());
    pieces
}

fn push_joined(window: &VecDeque<(&str, usize)>, docs: &mut Vec<String>) {
    let joined: String = window.iter().map(|(piece, _)| *piece).collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        docs.push(trimmed.to_string());
    }
}

// ============================================================================
// Factory Functions
// ============================================================================

/// 기본 청커 생성
pub fn default_chunker() -> Box<dyn Chunker> {
    Box::new(RecursiveChunker::with_defaults())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::document::ContentType;

    /// 다음 청크의 머리가 이전 청크의 꼬리(최대 overlap 문자)와 겹치는 길이
    fn shared_overlap(prev: &str, next: &str, overlap: usize) -> usize {
        let next_chars: Vec<char> = next.chars().collect();
        (1..=overlap.min(next_chars.len()))
            .rev()
            .find(|&k| {
                let head: String = next_chars[..k].iter().collect();
                prev.ends_with(&head)
            })
            .unwrap_or(0)
    }

    fn greek_paragraphs(count: usize) -> String {
        (0..count)
            .map(|i| {
                format!(
                    "Το ντέρμπι αριθμός {} ήταν γεμάτο πάθος. Οι φίλαθλοι γέμισαν το γήπεδο! \
                     Ποιος θα κερδίσει; Η ένταση κράτησε μέχρι το τελευταίο λεπτό του αγώνα.",
                    i
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_chunker_empty() {
        let chunker = RecursiveChunker::with_defaults();
        assert!(chunker.chunk("").is_empty());
        assert!(chunker.chunk("   \n\n  ").is_empty());
    }

    #[test]
    fn test_short_document_single_chunk() {
        let chunker = RecursiveChunker::with_defaults();
        let chunks = chunker.chunk("  Ολυμπιακός - Παναθηναϊκός 1-1  ");
        assert_eq!(chunks, vec!["Ολυμπιακός - Παναθηναϊκός 1-1".to_string()]);
    }

    #[test]
    fn test_no_separators_shorter_than_chunk_size() {
        let chunker = RecursiveChunker::with_defaults();
        let text = "α".repeat(120);
        let chunks = chunker.chunk(&text);
        assert_eq!(chunks, vec![text]);
    }

    #[test]
    fn test_hard_cut_window_and_overlap() {
        let chunker = RecursiveChunker::with_defaults();
        let text = "x".repeat(1200);
        let chunks = chunker.chunk(&text);

        let lens: Vec<usize> = chunks.iter().map(|c| c.chars().count()).collect();
        assert_eq!(lens, vec![500, 500, 400]);
        for pair in chunks.windows(2) {
            assert_eq!(shared_overlap(&pair[0], &pair[1], 100), 100);
        }
    }

    #[test]
    fn test_chunks_respect_max_size() {
        let chunker = RecursiveChunker::with_defaults();
        let text = greek_paragraphs(40);
        let chunks = chunker.chunk(&text);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 500, "chunk too long: {}", chunk.len());
        }
    }

    #[test]
    fn test_consecutive_chunks_overlap() {
        let chunker = RecursiveChunker::with_defaults();
        let words: Vec<String> = (0..400).map(|i| format!("λέξη{}", i)).collect();
        let text = words.join(" ");
        let chunks = chunker.chunk(&text);

        assert!(chunks.len() > 2);
        for pair in chunks.windows(2) {
            let shared = shared_overlap(&pair[0], &pair[1], 100);
            assert!(shared > 0, "no overlap between {:?} and {:?}", pair[0], pair[1]);
            assert!(shared <= 100);
        }
    }

    #[test]
    fn test_min_length_filter() {
        let chunker = RecursiveChunker::new(ChunkConfig {
            chunk_size: 100,
            chunk_overlap: 0,
            ..ChunkConfig::default()
        });
        let text = format!("{}\n\nτέλος", "Μεγάλη ιστορία του ντέρμπι. ".repeat(6));
        let chunks = chunker.chunk(&text);

        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.chars().count() >= 50, "short chunk emitted: {:?}", chunk);
        }
        assert!(!chunks.iter().any(|c| c == "τέλος"));
    }

    #[test]
    fn test_prefers_paragraph_boundaries() {
        let chunker = RecursiveChunker::with_defaults();
        let first = "Α".repeat(300);
        let second = "Β".repeat(300);
        let text = format!("{}\n\n{}", first, second);
        let chunks = chunker.chunk(&text);

        assert_eq!(chunks, vec![first, second]);
    }

    #[test]
    fn test_split_keeps_metadata() {
        let chunker = RecursiveChunker::with_defaults();
        let doc = SourceDocument::new(
            greek_paragraphs(20),
            "https://www.gazzetta.gr/football/superleague/olympiakos",
        );
        let chunks = chunker.split(&doc);

        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
            assert_eq!(chunk.source_url, doc.source_url);
            assert_eq!(chunk.content_type, ContentType::Olympiakos);
        }
    }

    #[test]
    fn test_pick_separator() {
        let seps: Vec<String> = DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect();

        let (sep, rest) = pick_separator("a\nb", &seps);
        assert_eq!(sep, "\n");
        assert_eq!(rest.len(), 5);

        let (sep, rest) = pick_separator("abc", &seps);
        assert_eq!(sep, "");
        assert!(rest.is_empty());
    }

    #[test]
    fn test_split_keep_separator() {
        assert_eq!(
            split_keep_separator("a. b. c", ". "),
            vec!["a".to_string(), ". b".to_string(), ". c".to_string()]
        );
        assert_eq!(split_keep_separator("αβ", ""), vec!["α".to_string(), "β".to_string()]);
    }
}
