//! The `viva show` command: print a stored session transcript.

use std::path::PathBuf;

use anyhow::Result;
use uuid::Uuid;

use viva_core::model::{GradeSource, SessionState};
use viva_core::traits::SessionStore;
use viva_providers::config::load_config_from;
use viva_store::JsonFileStore;

use super::run::print_final_grade;

pub async fn execute(id: Uuid, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let store = JsonFileStore::new(&config.data_dir);
    let session = store.load(id).await?;

    println!("Session {} — student {}", session.id, session.student_id);
    println!(
        "Started {}, state: {}\n",
        session.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
        session.state
    );

    for slot in &session.slots {
        println!("--- Question {} ---", slot.index + 1);
        println!("{}\n", slot.question_text);
        for attempt in &slot.attempts {
            println!("Attempt {} ({}):", attempt.index, attempt.submitted_at.format("%H:%M:%S"));
            println!("  Answer: {}", attempt.answer_text);
            match &attempt.result {
                Some(result) => {
                    let graded_by = match result.source {
                        GradeSource::Llm => "model",
                        GradeSource::Fallback => "heuristic",
                    };
                    println!("  Score: {:.1}/100 ({graded_by})", result.score);
                    println!("  Feedback: {}", result.feedback);
                }
                None => println!("  (ungraded)"),
            }
        }
        println!();
    }

    match (&session.state, &session.final_grade) {
        (SessionState::Completed, Some(grade)) => print_final_grade(grade),
        _ => println!("Exam still in progress."),
    }

    Ok(())
}
