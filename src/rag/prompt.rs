//! 프롬프트 구성
//!
//! 같은 입력이면 항상 같은 메시지 목록을 만듭니다.

use crate::llm::ChatMessage;

use super::memory::Turn;
use super::pipeline::Retrieval;
use super::sample::SAMPLE_SOURCE;

/// 고정 그리스어 시스템 지시문
pub const SYSTEM_INSTRUCTION: &str = "\
Είστε ένας εξειδικευμένος βοηθός για το ελληνικό ποδόσφαιρο και το ντέρμπι Ολυμπιακός-Παναθηναϊκός.

Χρησιμοποιήστε τις παρακάτω πληροφορίες για να απαντήσετε στην ερώτηση του χρήστη.
Αν δεν γνωρίζετε την απάντηση, πείτε ότι δεν γνωρίζετε.
Απαντήστε στα ελληνικά με φιλικό και ενημερωτικό τρόπο.
Κρατήστε τις απαντήσεις συνοπτικές αλλά πλήρεις.";

/// 컨텍스트 블록 (청크마다 출처 태그)
pub fn format_context(retrieval: &Retrieval) -> String {
    match retrieval {
        Retrieval::Found { chunks } => chunks
            .iter()
            .map(|c| source_block(&c.source_url, &c.text))
            .collect::<Vec<_>>()
            .join("\n\n"),
        Retrieval::Fallback { text, .. } => source_block(SAMPLE_SOURCE, text),
    }
}

fn source_block(source: &str, text: &str) -> String {
    format!("[Πηγή: {}]\n{}", source, text.trim())
}

/// 시스템 메시지 + 최근 대화 + 새 질문
pub fn build_messages(retrieval: &Retrieval, history: &[Turn], question: &str) -> Vec<ChatMessage> {
    let system = format!(
        "{}\n\nΠεριεχόμενο:\n{}",
        SYSTEM_INSTRUCTION,
        format_context(retrieval)
    );

    let mut messages = Vec::with_capacity(history.len() * 2 + 2);
    messages.push(ChatMessage::system(system));
    for turn in history {
        messages.push(ChatMessage::user(turn.question.clone()));
        messages.push(ChatMessage::assistant(turn.answer.clone()));
    }
    messages.push(ChatMessage::user(question));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::{ContentType, SearchResult};
    use crate::llm::Role;
    use crate::rag::pipeline::FallbackReason;

    fn result(text: &str, source: &str, similarity: f32) -> SearchResult {
        SearchResult {
            id: text.to_string(),
            text: text.to_string(),
            source_url: source.to_string(),
            content_type: ContentType::General,
            chunk_index: 0,
            similarity,
        }
    }

    #[test]
    fn test_format_context_tags_sources() {
        let retrieval = Retrieval::Found {
            chunks: vec![
                result("Το πρώτο ντέρμπι το 1925.", "https://www.gazzetta.gr/a", 0.9),
                result(" Γήπεδο Καραϊσκάκη. ", "https://www.gazzetta.gr/b", 0.5),
            ],
        };
        assert_eq!(
            format_context(&retrieval),
            "[Πηγή: https://www.gazzetta.gr/a]\nΤο πρώτο ντέρμπι το 1925.\n\n\
             [Πηγή: https://www.gazzetta.gr/b]\nΓήπεδο Καραϊσκάκη."
        );
    }

    #[test]
    fn test_format_context_fallback() {
        let retrieval = Retrieval::Fallback {
            text: "Σταθερό κείμενο".to_string(),
            reason: FallbackReason::NoMatches,
        };
        assert_eq!(
            format_context(&retrieval),
            "[Πηγή: sample_content]\nΣταθερό κείμενο"
        );
    }

    #[test]
    fn test_build_messages_layout() {
        let retrieval = Retrieval::Found {
            chunks: vec![result("κείμενο", "https://www.gazzetta.gr", 1.0)],
        };
        let history = vec![
            Turn::new("q1", "a1", vec![]),
            Turn::new("q2", "a2", vec![]),
        ];

        let messages = build_messages(&retrieval, &history, "q3");
        let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                Role::System,
                Role::User,
                Role::Assistant,
                Role::User,
                Role::Assistant,
                Role::User
            ]
        );
        assert!(messages[0].content.starts_with(SYSTEM_INSTRUCTION));
        assert!(messages[0].content.contains("[Πηγή: https://www.gazzetta.gr]"));
        assert_eq!(messages[1].content, "q1");
        assert_eq!(messages[4].content, "a2");
        assert_eq!(messages[5].content, "q3");
    }

    #[test]
    fn test_build_messages_deterministic() {
        let retrieval = Retrieval::Found {
            chunks: vec![result("κείμενο", "https://www.gazzetta.gr", 1.0)],
        };
        let history = vec![Turn::new("q1", "a1", vec![])];
        assert_eq!(
            build_messages(&retrieval, &history, "q2"),
            build_messages(&retrieval, &history, "q2")
        );
    }
}
