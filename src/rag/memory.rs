//! 대화 메모리 - 질문/답변 턴의 순서 있는 기록
//!
//! 추가만 가능하며 (전체 삭제 제외) 시간 순서를 유지합니다.
//! 동기 API이고 인스턴스당 단일 소유자를 가정합니다.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 요약에서 질문/답변을 자르는 길이 (문자)
const SUMMARY_PREVIEW_CHARS: usize = 50;

// ============================================================================
// Types
// ============================================================================

/// 대화 한 턴
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub question: String,
    pub answer: String,
    pub timestamp: DateTime<Utc>,
    /// 답변에 사용된 컨텍스트의 출처
    #[serde(default)]
    pub sources: Vec<String>,
}

impl Turn {
    /// 현재 시각으로 턴 생성
    pub fn new(question: impl Into<String>, answer: impl Into<String>, sources: Vec<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            timestamp: Utc::now(),
            sources,
        }
    }
}

/// 대화 통계
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub count: usize,
    pub first_timestamp: Option<DateTime<Utc>>,
    pub last_timestamp: Option<DateTime<Utc>>,
    /// 질문 + 답변 전체 문자 수
    pub total_characters: usize,
    pub avg_question_length: f64,
    pub avg_answer_length: f64,
}

impl MemoryStats {
    /// 사용자 표시용 그리스어 텍스트
    pub fn render(&self) -> String {
        if self.count == 0 {
            return "Δεν υπάρχει συνομιλία ακόμα.".to_string();
        }

        format!(
            "📊 Στατιστικά Συνομιλίας:\n\
             - Συνολικές Ερωτήσεις: {}\n\
             - Συνολικοί Χαρακτήρες: {}\n\
             - Μέσος Όρος Μήκους Ερώτησης: {:.1} χαρακτήρες\n\
             - Μέσος Όρος Μήκους Απάντησης: {:.1} χαρακτήρες",
            self.count,
            format_thousands(self.total_characters),
            self.avg_question_length,
            self.avg_answer_length
        )
    }
}

/// JSON 내보내기 형식
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationExport {
    pub conversation_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub exported_at: DateTime<Utc>,
    pub stats: MemoryStats,
    pub turns: Vec<Turn>,
}

// ============================================================================
// ConversationMemory
// ============================================================================

/// 대화 메모리
#[derive(Debug, Clone)]
pub struct ConversationMemory {
    id: Uuid,
    started_at: DateTime<Utc>,
    turns: Vec<Turn>,
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            turns: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// 턴을 끝에 추가
    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// 전체 기록 (오래된 순)
    pub fn history(&self) -> &[Turn] {
        &self.turns
    }

    /// 최근 n개 턴 (오래된 순)
    pub fn recent(&self, n: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// 모든 턴 삭제
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// 통계 계산
    pub fn stats(&self) -> MemoryStats {
        let count = self.turns.len();
        let question_chars: usize = self.turns.iter().map(|t| t.question.chars().count()).sum();
        let answer_chars: usize = self.turns.iter().map(|t| t.answer.chars().count()).sum();

        let average = |total: usize| {
            if count == 0 {
                0.0
            } else {
                total as f64 / count as f64
            }
        };

        MemoryStats {
            count,
            first_timestamp: self.turns.first().map(|t| t.timestamp),
            last_timestamp: self.turns.last().map(|t| t.timestamp),
            total_characters: question_chars + answer_chars,
            avg_question_length: average(question_chars),
            avg_answer_length: average(answer_chars),
        }
    }

    /// 그리스어 대화 요약 (질문/답변은 50자까지)
    pub fn summary(&self) -> String {
        if self.turns.is_empty() {
            return "Δεν υπάρχει ιστορικό συνομιλίας.".to_string();
        }

        let mut summary = format!("Συνομιλία με {} ερωτήσεις:\n", self.turns.len());
        for (i, turn) in self.turns.iter().enumerate() {
            summary.push_str(&format!(
                "{}. Ερώτηση: {}\n   Απάντηση: {}\n",
                i + 1,
                preview(&turn.question),
                preview(&turn.answer)
            ));
        }
        summary
    }

    /// 내보내기 스냅샷
    pub fn export(&self) -> ConversationExport {
        ConversationExport {
            conversation_id: self.id,
            started_at: self.started_at,
            exported_at: Utc::now(),
            stats: self.stats(),
            turns: self.turns.clone(),
        }
    }

    /// 보기 좋은 JSON으로 내보내기
    pub fn export_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.export()).context("Failed to serialize conversation")
    }

    /// `greek_derby_chat_<YYYYmmdd_HHMMSS>.json` 파일로 내보내기
    ///
    /// 같은 초에 이미 파일이 있으면 번호를 붙입니다.
    pub fn export_to_file(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create export directory: {:?}", dir))?;

        let stem = format!("greek_derby_chat_{}", Local::now().format("%Y%m%d_%H%M%S"));
        let mut path = dir.join(format!("{}.json", stem));
        let mut n = 1;
        while path.exists() {
            path = dir.join(format!("{}_{}.json", stem, n));
            n += 1;
        }

        let json = self.export_json()?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write export file: {:?}", path))?;

        tracing::info!("Exported {} turns to {:?}", self.turns.len(), path);
        Ok(path)
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn preview(text: &str) -> String {
    if text.chars().count() <= SUMMARY_PREVIEW_CHARS {
        text.to_string()
    } else {
        let cut: String = text.chars().take(SUMMARY_PREVIEW_CHARS).collect();
        format!("{}...", cut)
    }
}

/// 천 단위 구분 (1234567 -> "1,234,567")
fn format_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
