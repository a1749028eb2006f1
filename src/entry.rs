use serde::{Deserialize, Serialize};

const LINK_SUMMARY_CHARS: usize = 50;

/// Form-level check for a day's submission. Counts are unsigned, so the only
/// rejection left is an all-zero entry.
pub fn validate_entry(opened: u32, closed: u32, in_progress: u32) -> Result<(), String> {
    if opened == 0 && closed == 0 && in_progress == 0 {
        return Err("at least one value must be greater than zero".to_string());
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub index: usize,
    pub target: String,
    pub is_url: bool,
}

/// Newline-separated if the text has any newline, comma-separated otherwise.
pub fn split_links(text: &str) -> Vec<String> {
    let separator = if text.contains('\n') { '\n' } else { ',' };
    text.split(separator)
        .map(str::trim)
        .filter(|link| !link.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn parse_links(text: &str) -> Vec<Link> {
    split_links(text)
        .into_iter()
        .enumerate()
        .map(|(idx, target)| Link {
            index: idx + 1,
            is_url: target.starts_with("http"),
            target,
        })
        .collect()
}

/// Short form for table cells.
pub fn summarize_links(text: &str) -> String {
    if text.chars().count() > LINK_SUMMARY_CHARS {
        let head: String = text.chars().take(LINK_SUMMARY_CHARS).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}
