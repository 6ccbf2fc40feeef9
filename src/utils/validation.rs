use crate::utils::error::{BoardError, Result};
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn video_id_patterns() -> &'static [Regex; 3] {
    static PATTERNS: OnceLock<[Regex; 3]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            Regex::new(r"youtube\.com/watch\?v=([A-Za-z0-9_-]{6,})").unwrap(),
            Regex::new(r"youtu\.be/([A-Za-z0-9_-]{6,})").unwrap(),
            Regex::new(r"youtube\.com/embed/([A-Za-z0-9_-]{6,})").unwrap(),
        ]
    })
}

/// Extract the video id from any of the supported YouTube URL forms.
pub fn extract_video_id(url: &str) -> Option<&str> {
    video_id_patterns()
        .iter()
        .find_map(|p| p.captures(url))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// A claim's proof link: must be an http(s) URL in one of the recognized
/// YouTube forms.
pub fn validate_video_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(BoardError::ValidationError {
            field: field_name.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    let url = Url::parse(url_str).map_err(|e| BoardError::ValidationError {
        field: field_name.to_string(),
        reason: format!("Invalid URL format: {}", e),
    })?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(BoardError::ValidationError {
                field: field_name.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            })
        }
    }

    if extract_video_id(url_str).is_none() {
        return Err(BoardError::ValidationError {
            field: field_name.to_string(),
            reason: "Not a recognized YouTube video link".to_string(),
        });
    }

    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(BoardError::ValidationError {
            field: field_name.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_max_length(field_name: &str, value: &str, max: usize) -> Result<()> {
    if value.chars().count() > max {
        return Err(BoardError::ValidationError {
            field: field_name.to_string(),
            reason: format!("Value exceeds {} characters", max),
        });
    }
    Ok(())
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(BoardError::ValidationError {
            field: field_name.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(BoardError::ValidationError {
            field: field_name.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}
