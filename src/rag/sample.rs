//! 내장 더비 지식 및 예시 질문
//!
//! 벡터 저장소를 쓸 수 없을 때의 폴백 컨텍스트이자,
//! 빈 인덱스를 초기화할 때의 시드 문서입니다.

use crate::knowledge::SourceDocument;

/// 내장 지식의 출처 표기
pub const SAMPLE_SOURCE: &str = "sample_content";

/// 고정 더비 지식 텍스트
pub const FALLBACK_KNOWLEDGE: &str = "\
Ολυμπιακός vs Παναθηναϊκός - Το Μεγάλο Ντέρμπι της Ελλάδας

Το ντέρμπι μεταξύ Ολυμπιακού και Παναθηναϊκού είναι το πιο σημαντικό ποδοσφαιρικό γεγονός στην Ελλάδα.
Αυτό το ματς, γνωστό ως \"Το Μεγάλο Ντέρμπι\", συγκεντρώνει εκατομμύρια θεατές και φιλάθλους.

Ιστορία του Ντέρμπι:
Το πρώτο επίσημο ματς μεταξύ των δύο ομάδων έγινε το 1925. Από τότε, έχουν αγωνιστεί
εκατοντάδες φορές, με κάθε ματς να είναι γεμάτο πάθος και συναίσθημα.

Σημαντικές Στιγμές:
- Το 2004, ο Ολυμπιακός κέρδισε 3-1 στο ΟΑΚΑ
- Το 2007, ο Παναθηναϊκός επικράτησε 2-1 στο Καραϊσκάκη
- Το 2010, ισόπαλος 1-1 με αξέχαστα γκολ

Κορυφαίοι Παίκτες:
- Γιώργος Καραγκούνης (Παναθηναϊκός)
- Γιώργος Σεϊταρίδης (Ολυμπιακός)
- Αντώνης Νικοπολίδης (Ολυμπιακός)
- Αντώνης Αντωνιάδης (Παναθηναϊκός)

Σημασία για τους Φιλάθλους:
Το ντέρμπι δεν είναι απλά ένα ποδοσφαιρικό ματς, αλλά μια σύγκρουση ταυτοτήτων,
ιστοριών και παθών. Κάθε φίλαθλος περιμένει με αγωνία αυτό το ματς όλο το χρόνο.

Γήπεδα:
- Ολυμπιακός: Γεώργιος Καραϊσκάκης (Πειραιάς)
- Παναθηναϊκός: Απόστολος Νικολαΐδης (Αθήνα)

Στατιστικά:
Ο Ολυμπιακός έχει κερδίσει περισσότερες φορές το ντέρμπι στην ιστορία.
Οι αγώνες είναι γεμάτοι ένταση και συχνά κρίνουν τίτλους.
";

/// 예시 질문 (항상 같은 순서)
pub const SAMPLE_QUESTIONS: [&str; 10] = [
    "Ποια είναι η ιστορία του ντέρμπι;",
    "Ποιος έχει κερδίσει περισσότερες φορές;",
    "Ποιοι είναι οι κορυφαίοι παίκτες;",
    "Ποια είναι τα πιο αξέχαστα γκολ;",
    "Που γίνεται το ντέρμπι;",
    "Ποια είναι η σημασία για τους φιλάθλους;",
    "Ποια είναι τα στατιστικά;",
    "Ποια είναι τα γήπεδα;",
    "Ποια είναι τα πιο αξέχαστα γεγονότα;",
    "Πώς ξεκίνησε η αντιπαλότητα;",
];

pub fn sample_questions() -> Vec<String> {
    SAMPLE_QUESTIONS.iter().map(|q| q.to_string()).collect()
}

/// 인덱스 시드용 문서
pub fn sample_document() -> SourceDocument {
    SourceDocument::new(FALLBACK_KNOWLEDGE, SAMPLE_SOURCE)
}
