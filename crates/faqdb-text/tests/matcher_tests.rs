use faqdb_core::config::RetrievalSettings;
use faqdb_core::traits::QueryRewriter;
use faqdb_core::types::Entry;
use faqdb_text::{KeywordMatcher, SynonymTable};

fn entries(questions: &[&str]) -> Vec<Entry> {
    questions.iter().map(|q| Entry::new("test", *q, format!("answer to {q}"))).collect()
}

fn matcher(questions: &[&str]) -> KeywordMatcher {
    KeywordMatcher::new(&entries(questions), RetrievalSettings::default())
}

fn synonyms() -> SynonymTable {
    SynonymTable::new(vec![
        ("원격근무".into(), "재택근무".into()),
        ("연차".into(), "휴가".into()),
        ("VPN".into(), "원격 접속".into()),
        ("CEO".into(), "대표이사".into()),
    ])
}

#[test]
fn synonyms_apply_in_order_and_trim() {
    assert_eq!(synonyms().apply("  원격근무 신청은?  "), "재택근무 신청은?");
    assert_eq!(synonyms().rewrite("CEO 이름"), "대표이사 이름");
}

#[test]
fn synonym_replacement_is_substring_not_word_aware() {
    assert_eq!(synonyms().apply("연차휴가"), "휴가휴가");
}

#[test]
fn later_synonyms_see_earlier_output() {
    let table = SynonymTable::new(vec![("a".into(), "b".into()), ("b".into(), "c".into())]);
    assert_eq!(table.apply("a"), "c");
    let reversed = SynonymTable::new(vec![("b".into(), "c".into()), ("a".into(), "b".into())]);
    assert_eq!(reversed.apply("a"), "b");
}

#[test]
fn empty_query_normalizes_to_empty() {
    assert_eq!(synonyms().apply(""), "");
    assert_eq!(SynonymTable::default().apply("   "), "");
}

#[test]
fn normalized_equal_query_scores_one() {
    let m = matcher(&["점심시간은 언제인가요?", "복장 규정은 어떻게 되나요?"]);
    let hit = m.find("복장규정은 어떻게되나요").expect("match");
    assert_eq!(hit.index, 1);
    assert!((hit.score - 1.0).abs() < 1e-6);
}

#[test]
fn containment_matches_in_either_direction() {
    let m = matcher(&["와이파이 비밀번호"]);
    let hit = m.find("와이파이 비밀번호 알려줘").expect("query contains question");
    assert_eq!(hit.index, 0);
    let hit = m.find("비밀번호").expect("question contains query");
    assert!((hit.score - 1.0).abs() < 1e-6);
}

#[test]
fn first_match_wins_in_collection_order() {
    let m = matcher(&["휴가 신청", "휴가 신청 방법", "휴가"]);
    let hit = m.find("휴가 신청").unwrap();
    assert_eq!(hit.index, 0);
}

#[test]
fn overlap_two_of_three_does_not_qualify() {
    let m = matcher(&["휴가 신청 방법"]);
    assert_eq!(m.find("신청 휴가 절차를 알려주세요"), None);
}

#[test]
fn overlap_two_of_two_qualifies_with_lower_score() {
    let m = matcher(&["휴가 절차"]);
    let hit = m.find("신청 절차 휴가 알려줘").expect("overlap match");
    assert_eq!(hit.index, 0);
    assert!((hit.score - 0.95).abs() < 1e-6);
}

#[test]
fn trailing_particles_are_stripped_before_overlap() {
    let m = matcher(&["법인카드 사용 한도"]);
    let hit = m.find("한도가 궁금해요 법인카드를 사용 중").expect("particles stripped");
    assert!((hit.score - 0.95).abs() < 1e-6);
}

#[test]
fn short_generic_questions_never_overlap_match() {
    let m = matcher(&["휴가"]);
    assert_eq!(m.find("병가 제도는 어떻게 되나요"), None);
}

#[test]
fn repeated_lookups_are_deterministic() {
    let m = matcher(&["보안 교육 일정", "보안 교육 대상", "교육 일정 안내"]);
    let first = m.find("보안 교육 일정 대상 안내");
    for _ in 0..20 {
        assert_eq!(m.find("보안 교육 일정 대상 안내"), first);
    }
}

#[test]
fn no_match_returns_none() {
    let m = matcher(&["점심시간은 언제인가요?"]);
    assert_eq!(m.find("주차 등록 방법"), None);
    assert_eq!(m.find(""), None, "empty query is not contained in every question");
}
