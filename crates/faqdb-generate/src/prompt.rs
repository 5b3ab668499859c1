use faqdb_core::types::Entry;

/// Line the model must open with when the FAQ does not cover the question.
pub const NOT_IN_FAQ_NOTICE: &str = "💡 해당 질문은 회사 FAQ에 포함되지 않은 내용입니다.";

/// Grounded answer prompt for the selected entry.
///
/// With `low_confidence` the model is told up front that the match is weak
/// and must lead with [`NOT_IN_FAQ_NOTICE`] before answering generally.
pub fn answer_prompt(entry: &Entry, query: &str, low_confidence: bool, assistant_name: &str) -> String {
    let mut p = String::new();
    p.push_str("당신은 회사 FAQ 챗봇입니다.\n\n");
    p.push_str("[검색된 FAQ]\n");
    p.push_str(&format!("카테고리: {}\n질문: {}\n답변: {}\n\n", entry.category, entry.question, entry.answer));
    p.push_str(&format!("[사용자 질문]\n{}\n\n", query.trim()));
    if low_confidence {
        p.push_str("[검색 신뢰도]\n검색된 FAQ와 사용자 질문의 유사도가 낮습니다. FAQ가 질문을 다루지 않을 가능성이 큽니다.\n\n");
    }
    p.push_str("**중요 지침:**\n");
    p.push_str("1. 위 FAQ가 사용자 질문과 **회사 업무/정책/제도/위키와 직접 관련**이 있다면 FAQ 내용으로 답변하세요.\n");
    p.push_str("2. 하지만 FAQ와 사용자 질문이 **단순히 주제만 비슷**하거나, **회사와 무관한 일반 상식 질문**이라면:\n");
    p.push_str(&format!("   - \"{}\" 라고 먼저 말하고\n", NOT_IN_FAQ_NOTICE));
    p.push_str("   - 그 다음 줄에 일반 상식으로 답변하세요.\n");
    p.push_str(&format!(
        "3. 당신은 {}라는 회사 내부 도우미 챗봇입니다. 사용하는 모델이나 정보에 대해서는 언급하지 마세요.\n",
        assistant_name
    ));
    p
}

/// Asks for one natural FAQ-style question about `chunk`.
pub fn question_prompt(chunk: &str) -> String {
    format!(
        r#"아래 내용을 읽고, 실제 사용자가 이 내용을 질문하려고 할 때 자연스럽게 물어볼 'FAQ 스타일 질문'을 한 문장으로 만들어줘.

내용:
"""{chunk}"""

질문 생성 규칙:
- 자연스러운 질문일 것
- "이 문단", "내용", "핵심" 같은 단어 절대 사용 금지
- 가게, 제도, 설명 등의 대상에 맞춰 실제 사람이 묻는 방식으로 작성
- 예시와 유사한 톤을 사용할 것:
  - 회사 근처에 어떤 맛집이 있나요?
  - 김밥천국은 어떤 곳인가요?
  - 어떤 서비스를 제공하나요?
- 답변에 직접 등장하는 대상(가게명, 개념명)을 사용해 질문을 구성할 것

출력 형식:
- 질문 문장만 출력
"#
    )
}

/// Asks for a single question/answer pair covering a whole document, as JSON.
pub fn overall_faq_prompt(title: &str, text: &str) -> String {
    format!(
        r#"아래는 사내 위키 문서 "{title}"의 전체 내용이야. 이 문서 전체를 대표하는 FAQ 한 쌍을 만들어줘.

문서:
"""{text}"""

규칙:
- question: 사용자가 이 문서를 찾을 때 물어볼 자연스러운 질문 한 문장
- answer: 문서 전체를 3~5문장으로 요약한 답변
- 문서에 없는 내용은 지어내지 말 것

출력 형식 (JSON 객체만 출력):
{{"question": "...", "answer": "..."}}
"#
    )
}
