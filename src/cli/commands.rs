//! CLI command definitions and handlers

use clap::Subcommand;
use std::path::PathBuf;

/// Commands for the book translator client
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Translate a book and download the result
    Translate {
        /// Input EPUB file (required)
        #[arg(short, long)]
        file: PathBuf,

        /// Target language (defaults to the saved preference)
        #[arg(short, long)]
        language: Option<String>,

        /// Output file (default: {name}_{language}.epub)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// API key (defaults to the saved preference)
        #[arg(long)]
        api_key: Option<String>,
    },

    /// Check the status of a running task
    Status {
        /// Task identifier returned at submission
        #[arg(short, long)]
        task_id: String,
    },

    /// Download the artifact of a finished task
    Download {
        /// Task identifier returned at submission
        #[arg(short, long)]
        task_id: String,

        /// Output file (default: {task_id}.epub)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show or update saved preferences
    Settings {
        /// API key to save
        #[arg(long)]
        api_key: Option<String>,

        /// Target language to save
        #[arg(short, long)]
        language: Option<String>,

        /// Input token limit to save
        #[arg(long)]
        max_input_tokens: Option<u32>,

        /// Output token limit to save
        #[arg(long)]
        max_output_tokens: Option<u32>,

        /// Request rate limit to save
        #[arg(long)]
        max_requests_per_minute: Option<u32>,

        /// Token rate limit to save
        #[arg(long)]
        max_tokens_per_minute: Option<u32>,
    },
}

/// Build the client configuration from env, preferences and flags
fn resolve_config(
    store: &mut crate::core::prefs::FilePreferenceStore,
    api_key: Option<String>,
) -> anyhow::Result<crate::core::config::ClientConfig> {
    use crate::core::prefs::{
        PreferenceStore, KEY_API_KEY, KEY_MAX_INPUT_TOKENS, KEY_MAX_OUTPUT_TOKENS,
        KEY_MAX_REQUESTS_PER_MINUTE, KEY_MAX_TOKENS_PER_MINUTE,
    };

    let mut config = crate::core::config::ClientConfig::from_env()?;

    // An explicit key (flag or env var) always beats the saved preference
    if let Some(api_key) = api_key {
        config.api_key = api_key;
    } else if config.api_key.is_empty() {
        if let Some(saved) = store.get(KEY_API_KEY) {
            config.api_key = saved;
        }
    }

    if let Some(v) = store.get(KEY_MAX_INPUT_TOKENS).and_then(|v| v.parse().ok()) {
        config.max_input_tokens = v;
    }
    if let Some(v) = store.get(KEY_MAX_OUTPUT_TOKENS).and_then(|v| v.parse().ok()) {
        config.max_output_tokens = v;
    }
    if let Some(v) = store
        .get(KEY_MAX_REQUESTS_PER_MINUTE)
        .and_then(|v| v.parse().ok())
    {
        config.max_requests_per_minute = v;
    }
    if let Some(v) = store
        .get(KEY_MAX_TOKENS_PER_MINUTE)
        .and_then(|v| v.parse().ok())
    {
        config.max_tokens_per_minute = v;
    }

    Ok(config)
}

/// Handle book translation command
pub async fn handle_translate(
    file: PathBuf,
    language: Option<String>,
    output: Option<PathBuf>,
    api_key: Option<String>,
) -> anyhow::Result<()> {
    use crate::core::client::JobClient;
    use crate::core::models::{JobState, TranslationRequest};
    use crate::core::prefs::{
        FilePreferenceStore, PreferenceStore, DEFAULT_TTL_DAYS, KEY_TARGET_LANGUAGE,
    };
    use indicatif::{ProgressBar, ProgressStyle};
    use std::time::Instant;
    use tracing::info;

    let start_time = Instant::now();

    let mut store = FilePreferenceStore::open(FilePreferenceStore::default_path())?;

    let language = language
        .or_else(|| store.get(KEY_TARGET_LANGUAGE))
        .unwrap_or_else(|| "Polish".to_string());

    // Remember the chosen language for next time
    store.set(KEY_TARGET_LANGUAGE, &language, DEFAULT_TTL_DAYS)?;

    info!("Starting book translation");
    info!("Input: {}", file.display());
    info!("Target language: {}", language);

    let config = resolve_config(&mut store, api_key)?;
    let client = JobClient::new(config)?;

    let request = TranslationRequest::from_path(&file, language.as_str()).await?;
    let handle = client.submit(&request).await?;

    println!("📤 Submitted as task {}", handle.task_id());

    // Poll on the configured cadence until the job reaches a terminal state
    let pb = ProgressBar::new(100);
    pb.set_style(ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
        .unwrap()
        .progress_chars("=>-"));

    let mut poller = client.poll_status(&handle);
    let mut final_state = None;

    while let Some(status) = poller.next().await {
        let status = status?;
        pb.set_position(status.progress as u64);
        pb.set_message(status.state.to_string());
        final_state = Some(status.state);
    }

    pb.finish_and_clear();

    match final_state {
        Some(JobState::Succeeded) => {
            let artifact = client.fetch_artifact(&handle).await?;
            let output = output.unwrap_or_else(|| PathBuf::from(artifact.file_name.clone()));
            artifact.save(&output).await?;

            let duration = start_time.elapsed();
            info!("Completed task {} in {:?}", handle.task_id(), duration);

            println!("\n✅ Translation completed!");
            println!("   Saved: {}", output.display());
            println!("   Size: {} bytes", artifact.len());
            println!("   Time: {:?}", duration);

            Ok(())
        }
        Some(JobState::Failed) => anyhow::bail!("Translation failed"),
        _ => anyhow::bail!("Polling stopped before the job finished"),
    }
}

/// Handle status command
pub async fn handle_status(task_id: String) -> anyhow::Result<()> {
    use crate::core::client::JobClient;
    use crate::core::models::JobHandle;

    let client = JobClient::from_env()?;
    let handle = JobHandle::from_task_id(task_id);

    let status = client.check_status(&handle).await?;

    println!(
        "Task {}: {} ({}%)",
        handle.task_id(),
        status.state,
        status.progress
    );

    Ok(())
}

/// Handle download command
pub async fn handle_download(task_id: String, output: Option<PathBuf>) -> anyhow::Result<()> {
    use crate::core::client::JobClient;
    use crate::core::models::JobHandle;

    let client = JobClient::from_env()?;
    let handle = JobHandle::from_task_id(task_id);

    let artifact = client.fetch_artifact(&handle).await?;
    let output = output.unwrap_or_else(|| PathBuf::from(artifact.file_name.clone()));
    artifact.save(&output).await?;

    println!("✅ Downloaded {} bytes to {}", artifact.len(), output.display());

    Ok(())
}

/// Handle settings command
pub async fn handle_settings(
    api_key: Option<String>,
    language: Option<String>,
    max_input_tokens: Option<u32>,
    max_output_tokens: Option<u32>,
    max_requests_per_minute: Option<u32>,
    max_tokens_per_minute: Option<u32>,
) -> anyhow::Result<()> {
    use crate::core::prefs::{
        FilePreferenceStore, PreferenceStore, DEFAULT_TTL_DAYS, KEY_API_KEY,
        KEY_MAX_INPUT_TOKENS, KEY_MAX_OUTPUT_TOKENS, KEY_MAX_REQUESTS_PER_MINUTE,
        KEY_MAX_TOKENS_PER_MINUTE, KEY_TARGET_LANGUAGE,
    };

    let mut store = FilePreferenceStore::open(FilePreferenceStore::default_path())?;

    let updates: [(&str, Option<String>); 6] = [
        (KEY_API_KEY, api_key),
        (KEY_TARGET_LANGUAGE, language),
        (KEY_MAX_INPUT_TOKENS, max_input_tokens.map(|v| v.to_string())),
        (KEY_MAX_OUTPUT_TOKENS, max_output_tokens.map(|v| v.to_string())),
        (
            KEY_MAX_REQUESTS_PER_MINUTE,
            max_requests_per_minute.map(|v| v.to_string()),
        ),
        (
            KEY_MAX_TOKENS_PER_MINUTE,
            max_tokens_per_minute.map(|v| v.to_string()),
        ),
    ];

    let mut changed = 0;
    for (key, value) in updates {
        if let Some(value) = value {
            store.set(key, &value, DEFAULT_TTL_DAYS)?;
            changed += 1;
        }
    }

    if changed > 0 {
        println!("✅ Saved {} preference(s)", changed);
        return Ok(());
    }

    println!("Current preferences:");
    for key in [
        KEY_TARGET_LANGUAGE,
        KEY_API_KEY,
        KEY_MAX_INPUT_TOKENS,
        KEY_MAX_OUTPUT_TOKENS,
        KEY_MAX_REQUESTS_PER_MINUTE,
        KEY_MAX_TOKENS_PER_MINUTE,
    ] {
        match store.get(key) {
            Some(value) if key == KEY_API_KEY => {
                println!("   {}: {}", key, "*".repeat(value.len().min(8)))
            }
            Some(value) => println!("   {}: {}", key, value),
            None => println!("   {}: (not set)", key),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::prefs::{
        FilePreferenceStore, PreferenceStore, DEFAULT_TTL_DAYS, KEY_API_KEY,
    };
    use tempfile::tempdir;

    #[test]
    fn test_api_key_precedence() {
        let dir = tempdir().unwrap();
        let mut store = FilePreferenceStore::open(dir.path().join("prefs.json")).unwrap();
        store.set(KEY_API_KEY, "saved", DEFAULT_TTL_DAYS).unwrap();

        // Saved preference fills in when nothing else is given
        std::env::remove_var("TRANSLATOR_API_KEY");
        let config = resolve_config(&mut store, None).unwrap();
        assert_eq!(config.api_key, "saved");

        // The env var (also set by the global --api-key flag) beats it
        std::env::set_var("TRANSLATOR_API_KEY", "from_env");
        let config = resolve_config(&mut store, None).unwrap();
        assert_eq!(config.api_key, "from_env");

        // An explicit flag beats everything
        let config = resolve_config(&mut store, Some("from_flag".to_string())).unwrap();
        assert_eq!(config.api_key, "from_flag");

        std::env::remove_var("TRANSLATOR_API_KEY");
    }
}
