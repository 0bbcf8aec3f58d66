//! CLI 모듈
//!
//! derby-rag CLI 명령어 정의 및 구현

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::config::{Config, VectorBackend};
use crate::embedding::{EmbeddingProvider, OpenAIEmbedding};
use crate::error::RagError;
use crate::ingest::{Indexer, RefreshOutcome};
use crate::knowledge::{default_chunker, open_vector_store, VectorStore};
use crate::llm::OpenAIChat;
use crate::rag::{sample_questions, ChatService, PipelineConfig, RagPipeline, Retrieval};
use crate::scraper::WebScraper;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "derby-rag")]
#[command(version, about = "Ολυμπιακός-Παναθηναϊκός 더비 RAG 챗봇", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 질문 하나에 답변
    Ask {
        /// 질문 (그리스어)
        question: String,

        /// 사용된 컨텍스트 출력
        #[arg(long)]
        show_context: bool,
    },

    /// 대화형 채팅
    Chat,

    /// 콘텐츠 갱신 1회 실행 (cron용)
    Refresh,

    /// 인덱스가 비어 있으면 내장 지식으로 초기화
    Seed,

    /// 예시 질문 목록
    Samples,

    /// 상태 확인
    Status,
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Ask {
            question,
            show_context,
        } => cmd_ask(&question, show_context).await,
        Commands::Chat => cmd_chat().await,
        Commands::Refresh => cmd_refresh().await,
        Commands::Seed => cmd_seed().await,
        Commands::Samples => cmd_samples(),
        Commands::Status => cmd_status().await,
    }
}

// ============================================================================
// Setup
// ============================================================================

/// 임베딩 + 벡터 저장소 초기화
async fn open_backends(
    config: &Config,
) -> Result<(Arc<dyn EmbeddingProvider>, Arc<dyn VectorStore>)> {
    let embedder: Arc<dyn EmbeddingProvider> =
        Arc::new(OpenAIEmbedding::from_config(config).context("임베딩 클라이언트 생성 실패")?);
    let store = open_vector_store(config)
        .await
        .context("벡터 저장소 열기 실패")?;
    Ok((embedder, store))
}

fn indexer(embedder: &Arc<dyn EmbeddingProvider>, store: &Arc<dyn VectorStore>) -> Indexer {
    Indexer::new(default_chunker(), Arc::clone(embedder), Arc::clone(store))
}

/// 채팅 서비스 구성 (빈 인덱스는 내장 지식으로 초기화)
async fn build_service(config: &Config) -> Result<ChatService> {
    let (embedder, store) = open_backends(config).await?;

    // 저장소 문제는 답변 시 폴백으로 처리되므로 경고만 남김
    if let Err(e) = indexer(&embedder, &store).ensure_seeded().await {
        tracing::warn!("Knowledge base check failed: {:#}", e);
    }

    let llm = OpenAIChat::from_config(config).context("LLM 클라이언트 생성 실패")?;
    let pipeline = RagPipeline::new(
        embedder,
        store,
        Arc::new(llm),
        PipelineConfig::from_config(config),
    );

    Ok(ChatService::new(pipeline, config.export_dir()))
}

// ============================================================================
// Commands
// ============================================================================

/// 질문 명령어 (ask)
async fn cmd_ask(question: &str, show_context: bool) -> Result<()> {
    let config = Config::load()?;
    let service = build_service(&config).await?;

    match service.ask(question).await {
        Ok(result) => {
            println!("{}", result.answer);

            if show_context {
                println!();
                match &result.context {
                    Retrieval::Found { chunks } => {
                        println!("[*] 컨텍스트 ({} 청크):", chunks.len());
                        for (i, chunk) in chunks.iter().enumerate() {
                            println!(
                                "{}. [유사도: {:.4}] {}",
                                i + 1,
                                chunk.similarity,
                                chunk.source_url
                            );
                            println!("   {}", truncate_text(&chunk.text, 200));
                        }
                    }
                    Retrieval::Fallback { reason, .. } => {
                        println!("[!] 내장 지식 사용 ({:?})", reason);
                    }
                }
            }
            Ok(())
        }
        Err(e @ RagError::InvalidInput(_)) => {
            println!("{}", e.user_message());
            Ok(())
        }
        Err(e) => {
            tracing::error!("Ask failed: {}", e);
            eprintln!("{}", e.user_message());
            std::process::exit(ask_exit_code(&e));
        }
    }
}

/// ask 실패 시 종료 코드 (빈 질문은 오류가 아님)
fn ask_exit_code(error: &RagError) -> i32 {
    match error {
        RagError::InvalidInput(_) => 0,
        _ => 1,
    }
}

/// 대화형 채팅 명령어 (chat)
async fn cmd_chat() -> Result<()> {
    let config = Config::load()?;
    let service = build_service(&config).await?;

    print_welcome();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all("\n👤 Εσείς: ".as_bytes()).await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await.context("입력 읽기 실패")? else {
            println!("\n👋 Αντίο! Ευχαριστούμε που συνομιλήσατε για το ντέρμπι!");
            break;
        };

        match ReplCommand::parse(&line) {
            ReplCommand::Exit => {
                println!("\n👋 Αντίο! Ευχαριστούμε που συνομιλήσατε για το ντέρμπι!");
                break;
            }
            ReplCommand::History => {
                println!("\n📚 Ιστορικό Συνομιλίας:");
                println!("{}", service.summary().await);
            }
            ReplCommand::Clear => {
                service.clear().await;
                println!("Η μνήμη της συνομιλίας διαγράφηκε.");
            }
            ReplCommand::Stats => println!("{}", service.stats().await.render()),
            ReplCommand::Export => match service.export().await {
                Ok(path) => println!("Συνομιλία εξήχθη στο αρχείο: {}", path.display()),
                Err(e) => println!("\n❌ Σφάλμα: {:#}", e),
            },
            ReplCommand::Help => print_welcome(),
            ReplCommand::Empty => {
                println!("{}", RagError::InvalidInput(String::new()).user_message())
            }
            ReplCommand::Question(question) => match service.ask(&question).await {
                Ok(result) => println!("\n🤖 Bot: {}", result.answer),
                Err(e) => {
                    println!("\n❌ {}", e.user_message());
                    println!(
                        "Παρακαλώ δοκιμάστε ξανά ή πληκτρολογήστε 'έξοδος' για να τερματίσετε."
                    );
                }
            },
        }
    }

    Ok(())
}

/// 갱신 명령어 (refresh)
async fn cmd_refresh() -> Result<()> {
    let config = Config::load()?;
    let (embedder, store) = open_backends(&config).await?;
    let scraper = WebScraper::from_config(&config)?;

    println!("[*] 콘텐츠 갱신 시작 ({} URL)", scraper.urls().len());

    match indexer(&embedder, &store).refresh(&scraper).await? {
        RefreshOutcome::Completed(report) => {
            println!("[OK] 갱신 완료");
            println!("     문서: {} 건", report.documents);
            println!("     청크: {} 개 (upsert {})", report.chunks, report.upserted);
            println!(
                "     벡터: {} -> {}",
                report.vectors_before, report.vectors_after
            );
            println!("     소요: {:.1}초", report.duration.as_secs_f64());
        }
        RefreshOutcome::Skipped { reason } => {
            println!("[!] 갱신 건너뜀: {}", reason);
        }
    }

    Ok(())
}

/// 초기화 명령어 (seed)
async fn cmd_seed() -> Result<()> {
    let config = Config::load()?;
    let (embedder, store) = open_backends(&config).await?;

    match indexer(&embedder, &store).ensure_seeded().await? {
        Some(chunks) => println!("[OK] 내장 지식 저장: {} 청크", chunks),
        None => println!("[*] 인덱스에 이미 데이터가 있습니다"),
    }

    Ok(())
}

/// 예시 질문 명령어 (samples)
fn cmd_samples() -> Result<()> {
    for (i, question) in sample_questions().iter().enumerate() {
        println!("{:>2}. {}", i + 1, question);
    }
    Ok(())
}

/// 상태 명령어 (status)
async fn cmd_status() -> Result<()> {
    println!("derby-rag v{}", env!("CARGO_PKG_VERSION"));
    println!();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            println!("[!] 설정 오류: {:#}", e);
            println!("    설정: export OPENAI_API_KEY=your-key (또는 .env)");
            return Ok(());
        }
    };

    println!("[*] 데이터 디렉토리: {}", config.data_dir.display());
    println!("[OK] API 키: 설정됨");
    println!(
        "[*] 모델: {} / {} ({}차원)",
        config.chat_model, config.embedding_model, config.embedding_dimension
    );
    println!("[*] top-k: {}, 대화 윈도우: {} 턴", config.top_k, config.history_window);

    match &config.vector_backend {
        VectorBackend::Pinecone { index_host, .. } => {
            println!("[*] 벡터 저장소: Pinecone ({})", index_host)
        }
        VectorBackend::Lance { path } => {
            println!("[*] 벡터 저장소: LanceDB ({})", path.display())
        }
    }

    match open_vector_store(&config).await {
        Ok(store) => match store.count().await {
            Ok(count) => println!("[OK] 벡터 인덱스: {} 청크", count),
            Err(e) => println!("[!] 벡터 수 조회 실패: {:#}", e),
        },
        Err(e) => println!("[!] 벡터 저장소 열기 실패: {:#}", e),
    }

    println!("[*] 소스 URL:");
    for url in &config.source_urls {
        println!("     {}", url);
    }

    Ok(())
}

// ============================================================================
// REPL
// ============================================================================

/// 대화형 모드 입력 해석
#[derive(Debug, Clone, PartialEq, Eq)]
enum ReplCommand {
    Exit,
    History,
    Clear,
    Stats,
    Export,
    Help,
    Empty,
    Question(String),
}

impl ReplCommand {
    fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        match trimmed.to_lowercase().as_str() {
            "" => ReplCommand::Empty,
            "έξοδος" | "exit" | "quit" | "q" => ReplCommand::Exit,
            "ιστορικό" => ReplCommand::History,
            "διαγραφή" => ReplCommand::Clear,
            "στατιστικά" => ReplCommand::Stats,
            "εξαγωγή" => ReplCommand::Export,
            "βοήθεια" => ReplCommand::Help,
            _ => ReplCommand::Question(trimmed.to_string()),
        }
    }
}

fn print_welcome() {
    let rule = "=".repeat(70);
    println!("{}", rule);
    println!("🇬🇷 GREEK DERBY RAG CHATBOT 🇬🇷");
    println!("{}", rule);
    println!("Καλώς ήρθατε στο chatbot για το ντέρμπι Ολυμπιακός-Παναθηναϊκός!");
    println!("Μπορείτε να ρωτήσετε οτιδήποτε σχετικά με το μεγάλο ντέρμπι.");
    println!("{}", rule);
    println!("Εντολές:");
    println!("  - Ρωτήστε οτιδήποτε για το ντέρμπι");
    println!("  - 'ιστορικό' - Δείτε το ιστορικό συνομιλίας");
    println!("  - 'διαγραφή' - Διαγράψτε τη μνήμη");
    println!("  - 'στατιστικά' - Δείτε στατιστικά");
    println!("  - 'εξαγωγή' - Εξάγετε τη συνομιλία");
    println!("  - 'βοήθεια' - Δείτε αυτές τις εντολές");
    println!("  - 'έξοδος' - Τερματίστε το πρόγραμμα");
    println!("{}", rule);
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 텍스트 자르기 (UTF-8 안전)
fn truncate_text(text: &str, max_chars: usize) -> String {
    let cleaned = text.replace('\n', " ").replace('\r', "");
    let cleaned = cleaned.trim();

    if cleaned.chars().count() <= max_chars {
        cleaned.to_string()
    } else {
        let truncated: String = cleaned.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("ντέρμπι", 10), "ντέρμπι");
        assert_eq!(truncate_text("Ολυμπιακός Πειραιά", 10), "Ολυμπιακός...");
        assert_eq!(truncate_text("ΟΑΚΑ\nΚαραϊσκάκη", 20), "ΟΑΚΑ Καραϊσκάκη");
    }

    #[test]
    fn test_repl_commands() {
        assert_eq!(ReplCommand::parse("  έξοδος "), ReplCommand::Exit);
        assert_eq!(ReplCommand::parse("QUIT"), ReplCommand::Exit);
        assert_eq!(ReplCommand::parse("q"), ReplCommand::Exit);
        assert_eq!(ReplCommand::parse("ιστορικό"), ReplCommand::History);
        assert_eq!(ReplCommand::parse("διαγραφή"), ReplCommand::Clear);
        assert_eq!(ReplCommand::parse("στατιστικά"), ReplCommand::Stats);
        assert_eq!(ReplCommand::parse("εξαγωγή"), ReplCommand::Export);
        assert_eq!(ReplCommand::parse("βοήθεια"), ReplCommand::Help);
        assert_eq!(ReplCommand::parse("   "), ReplCommand::Empty);
    }

    #[test]
    fn test_repl_uppercase_greek_command() {
        assert_eq!(ReplCommand::parse("ΙΣΤΟΡΙΚΌ"), ReplCommand::History);
    }

    #[test]
    fn test_repl_question_keeps_case() {
        assert_eq!(
            ReplCommand::parse(" Ποια είναι τα γήπεδα; "),
            ReplCommand::Question("Ποια είναι τα γήπεδα;".to_string())
        );
    }

    #[test]
    fn test_ask_generation_failure_is_greek_and_nonzero() {
        let error = RagError::GenerationFailed("timeout".to_string());
        assert_eq!(error.user_message(), "Σφάλμα: timeout");
        assert_eq!(ask_exit_code(&error), 1);
        assert_eq!(ask_exit_code(&RagError::InvalidInput(String::new())), 0);
    }

    #[test]
    fn test_cli_parses_ask() {
        let cli = Cli::try_parse_from(["derby-rag", "ask", "Ποια είναι τα γήπεδα;", "--show-context"])
            .unwrap();
        match cli.command {
            Commands::Ask {
                question,
                show_context,
            } => {
                assert_eq!(question, "Ποια είναι τα γήπεδα;");
                assert!(show_context);
            }
            _ => panic!("expected ask command"),
        }
    }
}
