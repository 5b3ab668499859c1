use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use faqdb_core::config::GenerationSettings;
use faqdb_core::traits::{AnswerGenerator, OverallFaq, OverallFaqGenerator};
use faqdb_core::types::Entry;
use faqdb_generate::parse::{candidate_text, parse_overall_faq, strip_code_fences};
use faqdb_generate::prompt::{answer_prompt, overall_faq_prompt, question_prompt, NOT_IN_FAQ_NOTICE};
use faqdb_generate::GeminiClient;

#[test]
fn candidate_text_joins_parts_of_the_first_candidate() {
    let v = json!({"candidates": [{"content": {"parts": [{"text": "연차는 "}, {"text": "15일입니다. "}]}}]});
    assert_eq!(candidate_text(&v).as_deref(), Some("연차는 15일입니다."));
    assert_eq!(candidate_text(&json!({"candidates": []})), None);
    assert_eq!(candidate_text(&json!({"promptFeedback": {"blockReason": "SAFETY"}})), None);
}

#[test]
fn overall_faq_tolerates_fences_and_surrounding_prose() {
    let fenced = "```json\n{\"question\": \"보안 정책은?\", \"answer\": \"요약\"}\n```";
    assert_eq!(strip_code_fences(fenced), "{\"question\": \"보안 정책은?\", \"answer\": \"요약\"}");
    assert_eq!(
        parse_overall_faq(fenced),
        OverallFaq { question: Some("보안 정책은?".into()), answer: Some("요약".into()) }
    );
    let chatty = "물론이죠! {\"question\": \"Q\", \"answer\": \"A\"} 도움이 되길 바랍니다.";
    assert_eq!(parse_overall_faq(chatty).question.as_deref(), Some("Q"));
}

#[test]
fn overall_faq_missing_or_blank_fields_are_none() {
    assert_eq!(parse_overall_faq("not json at all"), OverallFaq::default());
    let partial = parse_overall_faq(r#"{"question": "  ", "answer": 3}"#);
    assert_eq!(partial, OverallFaq::default());
    let half = parse_overall_faq(r#"{"answer": "only answer"}"#);
    assert_eq!(half.question, None);
    assert_eq!(half.answer.as_deref(), Some("only answer"));
}

#[test]
fn answer_prompt_carries_entry_query_and_hedge() {
    let e = Entry::new("IT", "VPN 접속 방법", "원격 접속 앱을 설치하세요.");
    let confident = answer_prompt(&e, "원격 접속 어떻게 해요?", false, "yobuddy");
    assert!(confident.contains("카테고리: IT"));
    assert!(confident.contains("질문: VPN 접속 방법"));
    assert!(confident.contains("원격 접속 어떻게 해요?"));
    assert!(confident.contains("yobuddy"));
    assert!(confident.contains(NOT_IN_FAQ_NOTICE));
    assert!(!confident.contains("[검색 신뢰도]"));

    let hedged = answer_prompt(&e, "주식 추천해줘", true, "yobuddy");
    assert!(hedged.contains("[검색 신뢰도]"));
}

#[test]
fn question_and_overall_prompts_embed_their_input() {
    assert!(question_prompt("김밥천국은 회사 1층에 있다.").contains("\"\"\"김밥천국은 회사 1층에 있다.\"\"\""));
    let p = overall_faq_prompt("식당 안내", "본문");
    assert!(p.contains("\"식당 안내\""));
    assert!(p.contains("{\"question\": \"...\", \"answer\": \"...\"}"));
}

/// Serves the canned `(status, body)` responses in order, one per connection.
async fn serve(responses: Vec<(u16, String)>) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    tokio::spawn(async move {
        for (status, body) in responses {
            let (mut sock, _) = listener.accept().await.unwrap();
            counter.fetch_add(1, Ordering::SeqCst);
            read_request(&mut sock).await;
            let reply = format!(
                "HTTP/1.1 {} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            sock.write_all(reply.as_bytes()).await.unwrap();
            sock.shutdown().await.ok();
        }
    });
    (format!("http://{}/v1beta", addr), hits)
}

async fn read_request(sock: &mut tokio::net::TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = sock.read(&mut chunk).await.unwrap();
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf).to_string();
        if let Some(head_end) = text.find("\r\n\r\n") {
            let len = text[..head_end]
                .lines()
                .find_map(|l| l.to_ascii_lowercase().strip_prefix("content-length:").map(|v| v.trim().parse::<usize>().unwrap_or(0)))
                .unwrap_or(0);
            if buf.len() >= head_end + 4 + len {
                return;
            }
        }
    }
}

fn settings(endpoint: String) -> GenerationSettings {
    GenerationSettings { endpoint, max_retries: 2, retry_backoff_ms: 1, timeout_ms: 5_000, ..GenerationSettings::default() }
}

fn ok_body(text: &str) -> String {
    json!({"candidates": [{"content": {"parts": [{"text": text}]}}]}).to_string()
}

#[tokio::test]
async fn transient_failures_are_retried() {
    let (endpoint, hits) = serve(vec![
        (503, "{}".into()),
        (429, "{}".into()),
        (200, ok_body("12시부터 1시까지입니다.")),
    ])
    .await;
    let client = GeminiClient::new(&settings(endpoint), "test-key").unwrap();
    let e = Entry::new("HR", "점심시간", "12:00~13:00");
    let text = client.generate_answer(&e, "점심시간?", false).await.unwrap();
    assert_eq!(text, "12시부터 1시까지입니다.");
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn malformed_response_is_not_retried() {
    let (endpoint, hits) = serve(vec![(200, "{\"candidates\": []}".into()), (200, ok_body("late"))]).await;
    let client = GeminiClient::new(&settings(endpoint), "test-key").unwrap();
    assert!(client.generate("prompt").await.is_err());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let (endpoint, hits) = serve(vec![(400, "{\"error\": \"bad\"}".into()), (200, ok_body("late"))]).await;
    let client = GeminiClient::new(&settings(endpoint), "test-key").unwrap();
    assert!(client.generate("prompt").await.is_err());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn retries_are_bounded() {
    let (endpoint, hits) = serve(vec![(500, "{}".into()), (500, "{}".into()), (500, "{}".into()), (200, ok_body("never"))]).await;
    let client = GeminiClient::new(&settings(endpoint), "test-key").unwrap();
    assert!(client.generate("prompt").await.is_err());
    assert_eq!(hits.load(Ordering::SeqCst), 3, "one call plus two retries");
}

#[tokio::test]
async fn overall_faq_is_parsed_from_the_response() {
    let (endpoint, _) = serve(vec![(200, ok_body("```json\n{\"question\":\"주차는?\",\"answer\":\"B2\"}\n```"))]).await;
    let client = GeminiClient::new(&settings(endpoint), "test-key").unwrap();
    let faq = client.generate_overall_faq("주차", "B2만 가능").await.unwrap();
    assert_eq!(faq.question.as_deref(), Some("주차는?"));
    assert_eq!(faq.answer.as_deref(), Some("B2"));
}
