//! The `viva run` command: an interactive exam at the terminal.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use comfy_table::Table;

use viva_core::model::{ContentSource, FinalGrade, GradeSource};
use viva_core::session::{CurrentQuestion, ExamEngine, NextAction};
use viva_core::template::TemplateStore;
use viva_core::LlmGateway;
use viva_providers::config::{create_invoker, load_config_from, VivaConfig};
use viva_providers::OfflineInvoker;
use viva_store::JsonFileStore;

pub async fn execute(student: String, offline: bool, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let engine = build_engine(&config, offline)?;

    let session = engine.start_session(&student).await?;
    println!("Exam session {} for {student}", session.id);
    println!(
        "{} questions on {} ({})\n",
        session.slots.len(),
        config.exam.topic,
        config.exam.difficulty
    );

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        let current = engine.current_question(session.id).await?;
        let CurrentQuestion::Question {
            index,
            total,
            question_text,
            background,
            attempt,
            max_attempts,
            source,
        } = current
        else {
            break;
        };

        println!(
            "--- Question {}/{total} (attempt {attempt} of {max_attempts}) ---",
            index + 1
        );
        if source == ContentSource::Fallback {
            println!("(standard question: generation was unavailable)");
        }
        println!("{question_text}\n");
        if !background.trim().is_empty() {
            println!("Context: {background}\n");
        }

        print!("Your answer: ");
        std::io::stdout().flush()?;
        let Some(answer) = lines.next() else {
            anyhow::bail!("input ended before the exam completed");
        };
        let answer = answer.context("failed to read answer")?;

        let outcome = engine.submit_answer(session.id, &answer).await?;
        println!("\nScore: {:.1}/100", outcome.result.score);
        println!("Feedback: {}\n", outcome.result.feedback);

        match outcome.next {
            NextAction::Followup => {
                println!("Below the passing threshold: you get one more attempt.\n");
            }
            NextAction::Advance { .. } => {}
            NextAction::Completed => break,
        }
    }

    let grade = engine.final_grade(session.id).await?;
    print_final_grade(&grade);
    println!("\nSession stored as {}", session.id);
    Ok(())
}

pub fn build_engine(config: &VivaConfig, offline: bool) -> Result<ExamEngine> {
    let invoker = if offline {
        Arc::new(OfflineInvoker) as Arc<dyn viva_core::traits::ModelInvoker>
    } else {
        create_invoker(config)
    };

    let templates = match &config.prompt_dir {
        Some(dir) => TemplateStore::with_overrides_from_dir(dir)?,
        None => TemplateStore::builtin(),
    };

    let gateway = LlmGateway::new(invoker, templates, config.gateway_config());
    let store = Arc::new(JsonFileStore::new(&config.data_dir));
    Ok(ExamEngine::new(
        gateway,
        config.policy(),
        store,
        config.exam_config(),
    ))
}

pub fn print_final_grade(grade: &FinalGrade) {
    println!("=== Final grade: {:.1}/100 ({}) ===\n", grade.score, grade.band);
    println!("{}\n", grade.explanation);
    if grade.narrative_source == GradeSource::Fallback {
        println!("(summary generated without model assistance)\n");
    }

    let mut table = Table::new();
    table.set_header(vec!["#", "Question", "Score", "Attempts", "Graded by"]);
    for q in &grade.per_question {
        let graded_by = match q.grade_source {
            GradeSource::Llm => "model",
            GradeSource::Fallback => "heuristic",
        };
        table.add_row(vec![
            (q.index + 1).to_string(),
            truncate(&q.question_text, 60),
            format!("{:.1}", q.score),
            q.attempts.to_string(),
            graded_by.to_string(),
        ]);
    }
    println!("{table}");
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}
