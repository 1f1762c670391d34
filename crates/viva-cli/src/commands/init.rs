//! The `viva init` command.

use anyhow::Result;

use viva_core::template;

pub fn execute() -> Result<()> {
    if std::path::Path::new("viva.toml").exists() {
        println!("viva.toml already exists, skipping.");
    } else {
        std::fs::write("viva.toml", SAMPLE_CONFIG)?;
        println!("Created viva.toml");
    }

    std::fs::create_dir_all("prompts")?;
    let templates = [
        ("question_gen_v1", template::QUESTION_GEN_V1),
        ("grade_response_v1", template::GRADE_RESPONSE_V1),
        ("followup_v1", template::FOLLOWUP_V1),
        ("final_grade_v1", template::FINAL_GRADE_V1),
    ];
    for (name, content) in templates {
        let path = std::path::PathBuf::from("prompts").join(format!("{name}.txt"));
        if path.exists() {
            println!("{} already exists, skipping.", path.display());
        } else {
            std::fs::write(&path, content)?;
            println!("Created {}", path.display());
        }
    }

    println!("\nNext steps:");
    println!("  1. Edit viva.toml with your API key (or leave it for offline demo mode)");
    println!("  2. Run: viva validate --prompt-dir prompts");
    println!("  3. Run: viva run --student your-name");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# viva configuration

default_provider = "together"
temperature = 0.7
max_tokens = 2000
max_retries = 2
retry_delay_ms = 500
request_timeout_secs = 60
prompt_dir = "prompts"
data_dir = "viva-sessions"

[providers.together]
type = "together"
api_key = "${TOGETHER_API_KEY}"
model = "meta-llama/Llama-3.3-70B-Instruct-Turbo"

[exam]
question_count = 3
passing_threshold = 60.0
max_attempts = 2
topic = "Computer Science"
difficulty = "Intermediate"
"#;
