//! `ragline ask`: run one question through the two-stage pipeline.

use std::path::PathBuf;
use std::sync::Arc;

use ragline_config::AppConfig;
use ragline_pipeline::{ConversationMemory, ResponsePipeline};

pub async fn run(
    question: String,
    passages_path: Option<PathBuf>,
    show_draft: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    let gateway = Arc::new(super::build_gateway(&config)?);

    let passages = match passages_path {
        Some(path) => load_passages(&path)?,
        None => Vec::new(),
    };

    if passages.is_empty() {
        println!("(no passages supplied: answering without document context)");
    } else {
        println!("Grounding in {} passage(s)", passages.len());
    }

    let memory = Arc::new(ConversationMemory::from_config(&config.memory));
    let pipeline = ResponsePipeline::new(gateway, memory, &config);

    let result = pipeline.process_query(&question, &passages, &[]).await?;

    if show_draft {
        println!();
        println!("── draft ──");
        println!("{}", result.first_stage_response);
    }

    println!();
    println!("{}", result.final_response);

    Ok(())
}

/// Read passages from a file, one per blank-line-separated block.
fn load_passages(path: &PathBuf) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;

    Ok(content
        .split("\n\n")
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passages_split_on_blank_lines() {
        let dir = std::env::temp_dir().join("ragline-ask-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("passages.txt");
        std::fs::write(&path, "First passage.\n\nSecond passage.\n\n\n").unwrap();

        let passages = load_passages(&path).unwrap();
        assert_eq!(passages, vec!["First passage.", "Second passage."]);
    }

    #[test]
    fn missing_passage_file_is_a_readable_error() {
        let err = load_passages(&PathBuf::from("/nonexistent/passages.txt")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/passages.txt"));
    }
}
