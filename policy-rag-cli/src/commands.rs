//! Subcommand handlers.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use policy_rag::{
    AssistantAnswer, DirectoryVectorStore, EvalReport, PolicyAssistant, PromptVersion, Verdict,
    compare_reports, default_questions, load_documents, run_evaluation,
};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::info;

use crate::{Options, setup};

pub async fn build(options: &Options) -> Result<()> {
    let documents = load_documents(&options.data_dir)
        .with_context(|| {
            format!(
                "failed to load documents from {}",
                options.data_dir.display()
            )
        })?;
    if documents.is_empty() {
        println!(
            "No .md documents found in {}; building an empty index.",
            options.data_dir.display()
        );
    }

    let store = Arc::new(DirectoryVectorStore::open(&options.index_dir).await?);
    let pipeline = setup::pipeline(options, Arc::clone(&store))?;
    let summary = pipeline.build_index(&documents).await?;
    drop(pipeline);

    if let Some(store) = Arc::into_inner(store) {
        store.close().await?;
    }

    println!(
        "Indexed {} documents into {} chunks at {}",
        summary.document_count,
        summary.chunk_count,
        options.index_dir.display()
    );
    Ok(())
}

pub async fn ask_once(options: &Options, question: &str) -> Result<()> {
    let mut assistant = setup::assistant(options).await?;
    let answer = assistant.ask(question).await?;
    print_answer(&answer);
    Ok(())
}

pub async fn interactive(options: &Options) -> Result<()> {
    let mut assistant = setup::assistant(options).await?;
    let mut editor = DefaultEditor::new()?;

    println!(
        "Policy assistant. Type a question, `reset` to forget the conversation, `exit` to quit."
    );
    loop {
        match editor.readline("you> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line);
                match line {
                    "exit" | "quit" => break,
                    "reset" => {
                        assistant.reset();
                        println!("Conversation cleared.");
                    }
                    question => ask_and_print(&mut assistant, question).await,
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

async fn ask_and_print(assistant: &mut PolicyAssistant, question: &str) {
    match assistant.ask(question).await {
        Ok(answer) => print_answer(&answer),
        Err(e) => eprintln!("error: {e}"),
    }
}

fn print_answer(answer: &AssistantAnswer) {
    println!("\n{}\n", answer.answer);
    if !answer.sources.is_empty() {
        println!("Sources: {}", answer.sources.join(", "));
    }
    println!(
        "Model: {} | Intent: {} | Prompt: {}\n",
        answer.model_used, answer.intent, answer.prompt_version
    );
}

pub async fn eval(options: &Options, output: Option<PathBuf>, compare: bool) -> Result<()> {
    let mut assistant = setup::assistant(options).await?;
    let questions = default_questions();

    if !compare {
        let report = run_evaluation(&assistant, &questions).await;
        print_report(&report);
        return save_report(&report, output);
    }

    let mut reports = Vec::with_capacity(2);
    for version in [PromptVersion::V1, PromptVersion::V2] {
        assistant = assistant.with_prompt_version(version);
        println!("\n== Prompt {version} ==");
        let report = run_evaluation(&assistant, &questions).await;
        print_report(&report);
        save_report(&report, None)?;
        reports.push(report);
    }
    print_comparison(&reports[0], &reports[1]);
    Ok(())
}

fn verdict_label(verdict: Option<Verdict>) -> &'static str {
    match verdict {
        Some(Verdict::Pass) => "PASS",
        Some(Verdict::Partial) => "PARTIAL",
        Some(Verdict::Fail) => "FAIL",
        None => "-",
    }
}

fn print_report(report: &EvalReport) {
    for score in &report.results {
        println!(
            "Q{} [{}] keywords {:.2} | hallucination {:?} | {}",
            score.question_id,
            verdict_label(Some(score.verdict)),
            score.keyword_score,
            score.hallucination_check,
            score.question
        );
    }
    let summary = &report.summary;
    println!(
        "\nPASS {}  PARTIAL {}  FAIL {}  (total {}, mean keyword score {:.2})",
        summary.pass, summary.partial, summary.fail, summary.total, summary.mean_keyword_score
    );
}

fn save_report(report: &EvalReport, output: Option<PathBuf>) -> Result<()> {
    let path = output.unwrap_or_else(|| {
        PathBuf::from("evaluation_results").join(format!("eval_{}.json", report.prompt_version))
    });
    report.save(&path).with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "evaluation report saved");
    println!("Saved to {}", path.display());
    Ok(())
}

fn print_comparison(baseline: &EvalReport, candidate: &EvalReport) {
    let comparison = compare_reports(baseline, candidate);
    let (left, right) = (
        comparison.baseline_prompt.to_uppercase(),
        comparison.candidate_prompt.to_uppercase(),
    );

    println!("\n{left} vs {right}\n");
    println!("{:<48} {left:<10} {right:<10}", "Question");
    println!("{}", "-".repeat(70));
    for row in &comparison.rows {
        let question: String = row.question.chars().take(45).collect();
        println!(
            "{question:<48} {:<10} {:<10}",
            verdict_label(row.baseline),
            verdict_label(row.candidate)
        );
    }
    println!(
        "\n{left} pass: {}/{}  |  {right} pass: {}/{}",
        comparison.baseline_pass,
        baseline.summary.total,
        comparison.candidate_pass,
        candidate.summary.total
    );
}
