use std::io::Write;
use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};

use sectionx::llm::GREETING;
use sectionx::{LlmClient, SessionState, TurnDriver};

fn is_exit(prompt: &str) -> bool {
    matches!(prompt.to_ascii_lowercase().as_str(), "q" | "quit" | "exit")
}

/// Read prompts from stdin until `q`, `quit`, `exit` or end of input.
pub async fn run(driver: &TurnDriver, client: &dyn LlmClient, figure_dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(figure_dir)
        .with_context(|| format!("creating {}", figure_dir.display()))?;

    let mut session = SessionState::new();
    let mut figure_count = 0usize;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{}", GREETING.blue());

    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let prompt = line.trim();
        if prompt.is_empty() {
            continue;
        }
        if is_exit(prompt) {
            break;
        }

        let outcome = driver.run_turn(client, &mut session, prompt).await;
        for text in &outcome.interim {
            println!("{}", text.blue());
        }
        for call in &outcome.tool_calls {
            println!("{}", format!("Function call: {call}").bright_black());
        }
        for figure in &outcome.figures {
            figure_count += 1;
            let path = figure_dir.join(format!("figure-{figure_count:03}.svg"));
            std::fs::write(&path, &figure.svg)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("{}", format!("{} -> {}", figure.title, path.display()).bright_black());
        }
        println!("{}", outcome.reply.blue());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_words_are_case_insensitive() {
        assert!(is_exit("Quit"));
        assert!(is_exit("q"));
        assert!(!is_exit("quit please"));
    }
}
