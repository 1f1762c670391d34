//! The `viva validate` command: check that prompt templates render.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Result;

use viva_core::gateway::PromptKind;
use viva_core::template::{vars, TemplateStore};
use viva_providers::config::load_config_from;

/// Dummy variables for each prompt kind, used to smoke-render templates.
fn dummy_vars(kind: PromptKind) -> HashMap<String, String> {
    match kind {
        PromptKind::GenerateQuestion => vars([
            ("topic", "Computer Science".to_string()),
            ("difficulty", "Intermediate".to_string()),
            ("question_number", "1".to_string()),
        ]),
        PromptKind::Grade => vars([
            ("question_text", "Q".to_string()),
            ("context", "C".to_string()),
            ("rubric", "- Concept (100 points): d".to_string()),
            ("student_answer", "A".to_string()),
        ]),
        PromptKind::Followup => vars([
            ("question_text", "Q".to_string()),
            ("context", "C".to_string()),
            ("student_answer", "A".to_string()),
            ("feedback", "F".to_string()),
        ]),
        PromptKind::FinalSummary => vars([
            ("question_scores", "Q1: 80".to_string()),
            ("feedback_summary", "F".to_string()),
        ]),
    }
}

pub fn execute(prompt_dir: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let dir = prompt_dir.or(config.prompt_dir);

    let store = match &dir {
        Some(dir) => {
            println!("Checking templates with overrides from {}", dir.display());
            TemplateStore::with_overrides_from_dir(dir)?
        }
        None => {
            println!("Checking built-in templates");
            TemplateStore::builtin()
        }
    };

    let kinds = [
        PromptKind::GenerateQuestion,
        PromptKind::Grade,
        PromptKind::Followup,
        PromptKind::FinalSummary,
    ];

    let mut failures = 0;
    for kind in kinds {
        let name = kind.template_name();
        match store.render(name, &dummy_vars(kind)) {
            Ok(rendered) => println!("  {name}: OK ({} chars)", rendered.len()),
            Err(e) => {
                println!("  {name}: FAILED: {e}");
                failures += 1;
            }
        }
    }

    for name in store.names() {
        if !kinds.iter().any(|k| k.template_name() == name) {
            println!("  {name}: present but unused by any operation");
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} template(s) failed to render");
    }
    println!("All templates valid.");
    Ok(())
}
