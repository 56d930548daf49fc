//! Offline evaluation harness.
//!
//! Runs a fixed question set through the retrieval and generation path of a
//! [`PolicyAssistant`] and scores each answer with cheap heuristics:
//! expected-keyword coverage and a hallucination check (declines for
//! unanswerable questions, hedging phrases otherwise). The result is an
//! [`EvalReport`] that serialises to JSON. Two reports, typically one per
//! prompt version, can be lined up with [`compare_reports`].

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::assistant::PolicyAssistant;
use crate::error::Result;

/// How much of the answer the corpus is expected to contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvalCategory {
    Answerable,
    PartiallyAnswerable,
    Unanswerable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HallucinationCheck {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Pass,
    Partial,
    Fail,
}

/// A test question with what a good answer should look like.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalQuestion {
    pub id: u32,
    pub question: String,
    pub category: EvalCategory,
    pub ground_truth: String,
    #[serde(default)]
    pub expected_keywords: Vec<String>,
    #[serde(default)]
    pub expected_source: Option<String>,
}

impl EvalQuestion {
    fn new(
        id: u32,
        question: &str,
        category: EvalCategory,
        ground_truth: &str,
        expected_keywords: &[&str],
        expected_source: Option<&str>,
    ) -> Self {
        Self {
            id,
            question: question.to_string(),
            category,
            ground_truth: ground_truth.to_string(),
            expected_keywords: expected_keywords.iter().map(|k| k.to_string()).collect(),
            expected_source: expected_source.map(str::to_string),
        }
    }
}

/// The built-in question set for the company policy corpus.
pub fn default_questions() -> Vec<EvalQuestion> {
    use EvalCategory::*;

    vec![
        EvalQuestion::new(
            1,
            "How long does it take to process a refund?",
            Answerable,
            "Approved refunds are typically processed within 7-10 business days. Refunds are \
             issued to the original payment method where possible; otherwise, a credit note or \
             service credit may be provided.",
            &["7-10", "business days", "original payment method"],
            Some("refund_policy.md"),
        ),
        EvalQuestion::new(
            2,
            "What is the refund policy for annual subscriptions and what discounts are available?",
            PartiallyAnswerable,
            "Monthly and annual subscription fees are generally non-refundable once a billing \
             period has started. No information about discounts is available in the policy \
             documents.",
            &["non-refundable", "billing period", "discount"],
            Some("refund_policy.md"),
        ),
        EvalQuestion::new(
            3,
            "Can I get a refund if I cancel after the project starts, and who is my account \
             manager?",
            PartiallyAnswerable,
            "After project start, you pay for all work completed and committed third-party \
             costs. Prepaid unused phases may be partially refunded or credited per contract. \
             Account manager information is not available in the policy documents.",
            &["work completed", "third-party", "account manager"],
            Some("cancellation_policy.md"),
        ),
        EvalQuestion::new(
            4,
            "Does Neura Dynamics offer a free trial period?",
            Unanswerable,
            "This information is not available in the provided policy documents. Free trials \
             are never mentioned.",
            &[],
            None,
        ),
        EvalQuestion::new(
            5,
            "What programming languages and tech stack does Neura Dynamics use internally?",
            Unanswerable,
            "This information is not available in the provided policy documents. Internal tech \
             stack details are not covered.",
            &[],
            None,
        ),
    ]
}

const DECLINE_PHRASES: &[&str] = &[
    "not available",
    "not found",
    "no information",
    "don't have",
    "cannot answer",
    "not mentioned",
    "not in the provided",
    "not covered",
];

const FABRICATION_SIGNALS: &[&str] = &[
    "i think",
    "i believe",
    "probably",
    "it's likely",
    "i assume",
    "generally speaking",
    "in most companies",
];

/// Split `keywords` into those found in `answer` and those missing.
/// Matching is a case-insensitive substring test.
pub fn check_keywords(answer: &str, keywords: &[String]) -> (Vec<String>, Vec<String>) {
    let answer = answer.to_lowercase();
    keywords.iter().cloned().partition(|kw| answer.contains(&kw.to_lowercase()))
}

/// Unanswerable questions must be declined. Anything else must not hedge.
pub fn check_hallucination(answer: &str, category: EvalCategory) -> HallucinationCheck {
    let answer = answer.to_lowercase();
    let contains_any = |phrases: &[&str]| phrases.iter().any(|p| answer.contains(p));

    match category {
        EvalCategory::Unanswerable if contains_any(DECLINE_PHRASES) => HallucinationCheck::Pass,
        EvalCategory::Unanswerable => HallucinationCheck::Fail,
        _ if contains_any(FABRICATION_SIGNALS) => HallucinationCheck::Warn,
        _ => HallucinationCheck::Pass,
    }
}

/// Combine keyword coverage and the hallucination check into a verdict.
pub fn verdict(category: EvalCategory, keyword_score: f64, check: HallucinationCheck) -> Verdict {
    match category {
        EvalCategory::Unanswerable if check == HallucinationCheck::Pass => Verdict::Pass,
        EvalCategory::Unanswerable => Verdict::Fail,
        EvalCategory::PartiallyAnswerable if keyword_score >= 0.5 => Verdict::Pass,
        EvalCategory::PartiallyAnswerable
            if keyword_score >= 0.3 && check != HallucinationCheck::Fail =>
        {
            Verdict::Partial
        }
        EvalCategory::PartiallyAnswerable => Verdict::Fail,
        EvalCategory::Answerable if keyword_score >= 0.5 && check == HallucinationCheck::Pass => {
            Verdict::Pass
        }
        EvalCategory::Answerable if keyword_score >= 0.25 => Verdict::Partial,
        EvalCategory::Answerable => Verdict::Fail,
    }
}

/// Whether the expected source was returned. `None` when no source is expected.
pub fn source_hit(question: &EvalQuestion, sources: &[String]) -> Option<bool> {
    question.expected_source.as_ref().map(|expected| sources.iter().any(|s| s == expected))
}

/// Score for one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionScore {
    pub question_id: u32,
    pub question: String,
    pub category: EvalCategory,
    pub keyword_score: f64,
    pub keywords_found: Vec<String>,
    pub keywords_missing: Vec<String>,
    pub hallucination_check: HallucinationCheck,
    pub verdict: Verdict,
    pub source_hit: Option<bool>,
    pub sources_returned: Vec<String>,
    pub model_used: Option<String>,
    pub answer_preview: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

const PREVIEW_CHARS: usize = 200;

/// Score `answer` (with the `sources` it cited) against `question`.
pub fn score_answer(question: &EvalQuestion, answer: &str, sources: &[String]) -> QuestionScore {
    let (found, missing) = check_keywords(answer, &question.expected_keywords);
    let keyword_score = if question.expected_keywords.is_empty() {
        1.0
    } else {
        found.len() as f64 / question.expected_keywords.len() as f64
    };
    let check = check_hallucination(answer, question.category);

    QuestionScore {
        question_id: question.id,
        question: question.question.clone(),
        category: question.category,
        keyword_score,
        keywords_found: found,
        keywords_missing: missing,
        hallucination_check: check,
        verdict: verdict(question.category, keyword_score, check),
        source_hit: source_hit(question, sources),
        sources_returned: sources.to_vec(),
        model_used: None,
        answer_preview: answer.chars().take(PREVIEW_CHARS).collect(),
        error: None,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvalSummary {
    pub total: usize,
    pub pass: usize,
    pub partial: usize,
    pub fail: usize,
    pub mean_keyword_score: f64,
    /// Questions with an expected source that was returned.
    pub source_hits: usize,
}

impl EvalSummary {
    fn from_scores(scores: &[QuestionScore]) -> Self {
        let count = |v: Verdict| scores.iter().filter(|s| s.verdict == v).count();
        let mean_keyword_score = if scores.is_empty() {
            0.0
        } else {
            scores.iter().map(|s| s.keyword_score).sum::<f64>() / scores.len() as f64
        };

        Self {
            total: scores.len(),
            pass: count(Verdict::Pass),
            partial: count(Verdict::Partial),
            fail: count(Verdict::Fail),
            mean_keyword_score,
            source_hits: scores.iter().filter(|s| s.source_hit == Some(true)).count(),
        }
    }
}

/// The outcome of an evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalReport {
    pub generated_at: DateTime<Utc>,
    pub prompt_version: String,
    pub use_reranking: bool,
    pub results: Vec<QuestionScore>,
    pub summary: EvalSummary,
}

impl EvalReport {
    /// Write the report as pretty-printed JSON, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Ask every question and score the answers.
///
/// Each question is a single-turn inquiry: intent routing is skipped, so even
/// unanswerable questions are retrieved for and generated, and the
/// conversation history is neither read nor changed. A question whose answer
/// fails is scored [`Verdict::Fail`] with the error recorded, and the run
/// continues.
pub async fn run_evaluation(assistant: &PolicyAssistant, questions: &[EvalQuestion]) -> EvalReport {
    let mut results = Vec::with_capacity(questions.len());

    for question in questions {
        let score = match assistant.answer_inquiry(&question.question).await {
            Ok(answer) => {
                let mut score = score_answer(question, &answer.answer, &answer.sources);
                score.model_used = Some(answer.model_used);
                score
            }
            Err(e) => {
                warn!(question.id = question.id, error = %e, "evaluation question failed");
                QuestionScore {
                    question_id: question.id,
                    question: question.question.clone(),
                    category: question.category,
                    keyword_score: 0.0,
                    keywords_found: Vec::new(),
                    keywords_missing: question.expected_keywords.clone(),
                    hallucination_check: HallucinationCheck::Fail,
                    verdict: Verdict::Fail,
                    source_hit: question.expected_source.as_ref().map(|_| false),
                    sources_returned: Vec::new(),
                    model_used: None,
                    answer_preview: String::new(),
                    error: Some(e.to_string()),
                }
            }
        };

        info!(
            question.id = question.id,
            verdict = ?score.verdict,
            keyword_score = score.keyword_score,
            hallucination = ?score.hallucination_check,
            "scored question"
        );
        results.push(score);
    }

    let summary = EvalSummary::from_scores(&results);
    info!(
        total = summary.total,
        pass = summary.pass,
        partial = summary.partial,
        fail = summary.fail,
        "evaluation finished"
    );

    EvalReport {
        generated_at: Utc::now(),
        prompt_version: assistant.prompt_version().to_string(),
        use_reranking: assistant.pipeline().config().use_reranking,
        results,
        summary,
    }
}

/// One question's verdicts under two runs. `None` when the question is
/// missing from that run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub question_id: u32,
    pub question: String,
    pub baseline: Option<Verdict>,
    pub candidate: Option<Verdict>,
}

/// Side-by-side verdicts of two evaluation runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportComparison {
    pub baseline_prompt: String,
    pub candidate_prompt: String,
    pub rows: Vec<ComparisonRow>,
    pub baseline_pass: usize,
    pub candidate_pass: usize,
}

impl ReportComparison {
    /// Questions whose verdict differs between the runs.
    pub fn changed(&self) -> impl Iterator<Item = &ComparisonRow> {
        self.rows.iter().filter(|row| row.baseline != row.candidate)
    }
}

/// Line up the verdicts of `baseline` and `candidate` by question id.
///
/// Rows follow the baseline's order; questions only the candidate answered
/// come last, in its order.
pub fn compare_reports(baseline: &EvalReport, candidate: &EvalReport) -> ReportComparison {
    let verdict_in = |report: &EvalReport, id: u32| {
        report
            .results
            .iter()
            .find(|score| score.question_id == id)
            .map(|score| score.verdict)
    };

    let mut rows: Vec<ComparisonRow> = baseline
        .results
        .iter()
        .map(|score| ComparisonRow {
            question_id: score.question_id,
            question: score.question.clone(),
            baseline: Some(score.verdict),
            candidate: verdict_in(candidate, score.question_id),
        })
        .collect();
    for score in &candidate.results {
        if verdict_in(baseline, score.question_id).is_none() {
            rows.push(ComparisonRow {
                question_id: score.question_id,
                question: score.question.clone(),
                baseline: None,
                candidate: Some(score.verdict),
            });
        }
    }

    ReportComparison {
        baseline_prompt: baseline.prompt_version.clone(),
        candidate_prompt: candidate.prompt_version.clone(),
        rows,
        baseline_pass: baseline.summary.pass,
        candidate_pass: candidate.summary.pass,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn keywords_are_case_insensitive() {
        let (found, missing) = check_keywords(
            "Refunds take 7-10 Business Days.",
            &strings(&["7-10", "business days", "credit"]),
        );
        assert_eq!(found, strings(&["7-10", "business days"]));
        assert_eq!(missing, strings(&["credit"]));
    }

    #[test]
    fn unanswerable_must_decline() {
        assert_eq!(
            check_hallucination("This information is not available.", EvalCategory::Unanswerable),
            HallucinationCheck::Pass
        );
        assert_eq!(
            check_hallucination("Yes, a 30 day trial.", EvalCategory::Unanswerable),
            HallucinationCheck::Fail
        );
        assert_eq!(
            check_hallucination("It's probably 5 days.", EvalCategory::Answerable),
            HallucinationCheck::Warn
        );
        assert_eq!(
            check_hallucination("7-10 business days.", EvalCategory::PartiallyAnswerable),
            HallucinationCheck::Pass
        );
    }

    #[test]
    fn verdict_table() {
        use EvalCategory::*;
        use HallucinationCheck as H;

        assert_eq!(verdict(Unanswerable, 1.0, H::Pass), Verdict::Pass);
        assert_eq!(verdict(Unanswerable, 1.0, H::Fail), Verdict::Fail);

        assert_eq!(verdict(PartiallyAnswerable, 0.5, H::Warn), Verdict::Pass);
        assert_eq!(verdict(PartiallyAnswerable, 0.34, H::Pass), Verdict::Partial);
        assert_eq!(verdict(PartiallyAnswerable, 0.34, H::Fail), Verdict::Fail);
        assert_eq!(verdict(PartiallyAnswerable, 0.2, H::Pass), Verdict::Fail);

        assert_eq!(verdict(Answerable, 0.67, H::Pass), Verdict::Pass);
        assert_eq!(verdict(Answerable, 0.67, H::Warn), Verdict::Partial);
        assert_eq!(verdict(Answerable, 0.25, H::Pass), Verdict::Partial);
        assert_eq!(verdict(Answerable, 0.0, H::Pass), Verdict::Fail);
    }

    #[test]
    fn scores_answer_with_source_hit() {
        let question = &default_questions()[0];
        let score = score_answer(
            question,
            "Approved refunds are processed within 7-10 business days.",
            &strings(&["refund_policy.md"]),
        );
        assert!((score.keyword_score - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(score.verdict, Verdict::Pass);
        assert_eq!(score.source_hit, Some(true));

        let unanswerable = &default_questions()[3];
        let score = score_answer(unanswerable, "Not covered by the documents.", &[]);
        assert_eq!(score.keyword_score, 1.0);
        assert_eq!(score.source_hit, None);
        assert_eq!(score.verdict, Verdict::Pass);
    }

    #[test]
    fn summary_counts_verdicts() {
        let questions = default_questions();
        let scores = vec![
            score_answer(
                &questions[0],
                "7-10 business days to the original payment method",
                &[],
            ),
            score_answer(&questions[3], "Sure, 14 days free.", &[]),
        ];
        let summary = EvalSummary::from_scores(&scores);
        assert_eq!((summary.total, summary.pass, summary.partial, summary.fail), (2, 1, 0, 1));
        assert_eq!(summary.mean_keyword_score, 1.0);
    }

    #[test]
    fn category_serialises_screaming_snake() {
        let json = serde_json::to_string(&EvalCategory::PartiallyAnswerable).unwrap();
        assert_eq!(json, "\"PARTIALLY_ANSWERABLE\"");
    }

    #[test]
    fn report_saves_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results").join("eval_v2.json");
        let report = EvalReport {
            generated_at: Utc::now(),
            prompt_version: "v2".into(),
            use_reranking: true,
            results: Vec::new(),
            summary: EvalSummary::default(),
        };
        report.save(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let loaded: EvalReport = serde_json::from_str(&raw).unwrap();
        assert_eq!(loaded.prompt_version, "v2");
    }

    fn report(prompt: &str, scores: Vec<QuestionScore>) -> EvalReport {
        EvalReport {
            generated_at: Utc::now(),
            prompt_version: prompt.into(),
            use_reranking: true,
            summary: EvalSummary::from_scores(&scores),
            results: scores,
        }
    }

    #[test]
    fn comparison_lines_up_verdicts_by_question() {
        let questions = default_questions();
        let v1 = report(
            "v1",
            vec![
                score_answer(&questions[0], "About a week.", &[]),
                score_answer(&questions[3], "Not available in the documents.", &[]),
            ],
        );
        let v2 = report(
            "v2",
            vec![
                score_answer(&questions[3], "Not available in the documents.", &[]),
                score_answer(&questions[0], "7-10 business days", &[]),
                score_answer(&questions[4], "Rust and Python.", &[]),
            ],
        );

        let comparison = compare_reports(&v1, &v2);
        assert_eq!(comparison.baseline_prompt, "v1");
        assert_eq!(comparison.candidate_prompt, "v2");
        let ids: Vec<u32> = comparison.rows.iter().map(|r| r.question_id).collect();
        assert_eq!(ids, vec![1, 4, 5]);

        assert_eq!(comparison.rows[0].baseline, Some(Verdict::Fail));
        assert_eq!(comparison.rows[0].candidate, Some(Verdict::Pass));
        assert_eq!(comparison.rows[1].baseline, comparison.rows[1].candidate);
        assert_eq!(comparison.rows[2].baseline, None);
        assert_eq!(comparison.rows[2].candidate, Some(Verdict::Fail));

        assert_eq!((comparison.baseline_pass, comparison.candidate_pass), (1, 2));
        let changed: Vec<u32> = comparison.changed().map(|r| r.question_id).collect();
        assert_eq!(changed, vec![1, 5]);
    }
}
