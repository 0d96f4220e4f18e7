use std::path::{Path, PathBuf};

use openai_dive::v1::resources::chat::ChatCompletionParameters;
use tracing::{error, warn};

use crate::provider::LlmError;

/// Log a failed LLM request to a file for debugging
///
/// Configuration via environment variables:
/// - `TUBECHAT_LLM_LOGGING_ENABLED`: Set to "true" to enable error logging (default: false)
/// - `TUBECHAT_LLM_LOGGING_FOLDER`: Directory for error logs (default: `.tubechat/logs/`)
pub fn log_llm_error(request: &ChatCompletionParameters, error: &LlmError, provider_name: &str) {
    let enabled = std::env::var("TUBECHAT_LLM_LOGGING_ENABLED")
        .map(|v| v.to_lowercase() == "true")
        .unwrap_or(false);

    if !enabled {
        return;
    }

    let log_dir = std::env::var("TUBECHAT_LLM_LOGGING_FOLDER")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(".tubechat/logs/"));

    write_error_log(&log_dir, request, error, provider_name);
}

/// Write one error log under `log_dir`, returning its path on success
pub(crate) fn write_error_log(
    log_dir: &Path,
    request: &ChatCompletionParameters,
    error: &LlmError,
    provider_name: &str,
) -> Option<PathBuf> {
    if let Err(e) = std::fs::create_dir_all(log_dir) {
        error!("Failed to create error log directory: {}", e);
        return None;
    }

    let timestamp = chrono::Utc::now();
    let filename = format!(
        "error_{}_{}.log",
        timestamp.format("%Y%m%d_%H%M%S"),
        timestamp.format("%3f") // milliseconds
    );
    let log_path = log_dir.join(filename);

    let mut log_content = String::new();

    log_content.push_str("=== LLM Request Error Log ===\n");
    log_content.push_str(&format!("Timestamp: {}\n", timestamp.to_rfc3339()));
    log_content.push_str(&format!("Provider: {}\n", provider_name));
    log_content.push_str(&format!("Model: {}\n", request.model));

    log_content.push_str("\n=== REQUEST ===\n");
    match serde_json::to_string_pretty(request) {
        Ok(json) => log_content.push_str(&json),
        Err(e) => log_content.push_str(&format!("Failed to serialize request: {}", e)),
    }
    log_content.push('\n');

    log_content.push_str("\n=== ERROR ===\n");
    log_content.push_str(&format!("{}\n", error));

    match std::fs::write(&log_path, log_content) {
        Ok(()) => {
            warn!("LLM error logged to: {}", log_path.display());
            Some(log_path)
        }
        Err(e) => {
            error!("Failed to write error log to {}: {}", log_path.display(), e);
            None
        }
    }
}
