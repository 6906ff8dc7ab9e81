//! art-post - post a submission to multiple gallery websites

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use libartcast::accounts::{AccountId, CookieStore};
use libartcast::config::Config;
use libartcast::error::{ArtcastError, Result};
use libartcast::logging::{LogFormat, LoggingConfig};
use libartcast::poster::{PostTarget, Poster};
use libartcast::types::{PostResult, Rating, Submission, SubmissionFile, TagSet};
use libartcast::websites::{default_registry, Website};
use libartcast::SessionTransport;

#[derive(Parser, Debug)]
#[command(name = "art-post")]
#[command(about = "Post a submission to multiple gallery websites", long_about = None)]
struct Cli {
    /// File to post
    file: PathBuf,

    /// Submission title (defaults to the file name)
    #[arg(short, long)]
    title: Option<String>,

    /// Description (a small HTML subset: b/i/u/s, br, a)
    #[arg(short, long, default_value = "")]
    description: String,

    /// Content rating (general, mature, adult, extreme)
    #[arg(short, long, default_value = "general")]
    rating: String,

    /// Tag, repeatable
    #[arg(long = "tag")]
    tags: Vec<String>,

    /// Source URL, repeatable
    #[arg(long = "source")]
    sources: Vec<String>,

    /// Target website(s); defaults to the configured default set
    #[arg(short = 's', long = "site")]
    sites: Vec<String>,

    /// Validate against each website without posting
    #[arg(long)]
    validate_only: bool,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let format = std::env::var("ARTCAST_LOG_FORMAT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(LogFormat::Text);
    LoggingConfig::new(format, "warn".to_string(), cli.verbose).init();

    match run(cli).await {
        Ok(all_succeeded) => {
            if !all_succeeded {
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> Result<bool> {
    let config = load_config();
    let registry = default_registry();

    let site_names = if cli.sites.is_empty() {
        config.defaults.websites.clone()
    } else {
        cli.sites.clone()
    };
    if site_names.is_empty() {
        return Err(ArtcastError::InvalidInput(
            "No websites selected. Pass --site or configure defaults.websites.".to_string(),
        ));
    }

    let mut websites = Vec::new();
    for name in &site_names {
        match registry.get(name) {
            Some(website) => websites.push(website),
            None => {
                return Err(ArtcastError::InvalidInput(format!(
                    "Unknown website '{}'. Available: {}",
                    name,
                    registry.names().join(", ")
                )));
            }
        }
    }

    let submission = build_submission(&cli, &config)?;

    let cookies = Arc::new(CookieStore::new());
    let accounts = load_accounts(&config, &websites, &cookies)?;

    let transport = Arc::new(SessionTransport::new(
        cookies,
        config.network.user_agent.as_deref(),
        config.network.timeout_secs.map(std::time::Duration::from_secs),
    )?);

    if cli.validate_only {
        let mut clean = true;
        for website in &websites {
            let report = website.validate(&submission);
            if report.is_blocked() {
                clean = false;
            }
            print_validation(website.name(), &report, &cli.format);
        }
        return Ok(clean);
    }

    let poster = Poster::new(transport.clone());
    let mut results: Vec<PostResult> = Vec::new();
    let mut targets = Vec::new();

    for website in &websites {
        let account = accounts[website.name()].clone();
        match website.check_login_status(&transport, &account).await {
            Ok(status) if status.logged_in => {
                targets.push(PostTarget::new(website.clone(), account));
            }
            Ok(_) => {
                results.push(PostResult::failed(
                    website.name(),
                    "Not logged in; refresh the account's cookies".to_string(),
                ));
            }
            Err(e) => {
                results.push(PostResult::failed(website.name(), e.to_string()));
            }
        }
    }

    results.extend(poster.post_to_all(&submission, &targets).await);

    print_results(&results, &cli.format);
    Ok(results.iter().all(|r| r.success))
}

/// Missing config is not an error; everything has workable defaults.
fn load_config() -> Config {
    match Config::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::debug!("No usable config ({}), using defaults", e);
            Config::default()
        }
    }
}

fn build_submission(cli: &Cli, config: &Config) -> Result<Submission> {
    let data = std::fs::read(&cli.file).map_err(|e| {
        ArtcastError::InvalidInput(format!("Cannot read {}: {}", cli.file.display(), e))
    })?;
    let name = cli
        .file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "submission".to_string());
    let mime_type = guess_mime(&name);

    let file = SubmissionFile::new(name.clone(), mime_type, data);

    let title = cli.title.clone().unwrap_or_else(|| {
        name.rsplit_once('.')
            .map(|(stem, _)| stem.to_string())
            .unwrap_or(name)
    });

    let mut submission = Submission::new(title, file);
    submission.description = cli.description.clone();
    submission.rating = cli
        .rating
        .parse::<Rating>()
        .map_err(ArtcastError::InvalidInput)?;
    submission.sources = cli.sources.clone();
    submission.tags = TagSet {
        tags: cli.tags.clone(),
        extend_defaults: true,
        group: None,
    };
    if !config.defaults.tags.is_empty() {
        submission.tags.tags.extend(config.defaults.tags.clone());
    }
    Ok(submission)
}

/// Resolve each website's account and import its captured cookies.
fn load_accounts(
    config: &Config,
    websites: &[Arc<dyn Website>],
    cookies: &Arc<CookieStore>,
) -> Result<HashMap<String, AccountId>> {
    let mut accounts = HashMap::new();
    for website in websites {
        let name = website.name();
        let account = match config.websites.get(name) {
            Some(site_config) => {
                let account = AccountId::new(site_config.account.clone());
                if let Some(path) = site_config.expand_cookie_file_path()? {
                    let header = std::fs::read_to_string(&path).map_err(|e| {
                        ArtcastError::InvalidInput(format!(
                            "Cannot read cookie file {}: {}",
                            path.display(),
                            e
                        ))
                    })?;
                    cookies.import(&account, website.base_url(), header.trim());
                }
                account
            }
            None => AccountId::new("default"),
        };
        accounts.insert(name.to_string(), account);
    }
    Ok(accounts)
}

fn guess_mime(file_name: &str) -> String {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "webm" => "video/webm",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
    .to_string()
}

fn print_validation(website: &str, report: &libartcast::ValidationReport, format: &str) {
    if format == "json" {
        let value = serde_json::json!({
            "website": website,
            "problems": report.problems,
            "warnings": report.warnings,
        });
        println!("{}", value);
        return;
    }
    if report.problems.is_empty() && report.warnings.is_empty() {
        println!("{}: ok", website);
    }
    for problem in &report.problems {
        println!("{}: problem: {}", website, problem);
    }
    for warning in &report.warnings {
        println!("{}: warning: {}", website, warning);
    }
}

fn print_results(results: &[PostResult], format: &str) {
    if format == "json" {
        match serde_json::to_string_pretty(results) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to serialize results: {}", e),
        }
        return;
    }
    for result in results {
        if result.success {
            match &result.location {
                Some(location) => println!("{}: posted {}", result.website, location),
                None => println!("{}: posted", result.website),
            }
        } else {
            println!(
                "{}: failed: {}",
                result.website,
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_mime() {
        assert_eq!(guess_mime("a.PNG"), "image/png");
        assert_eq!(guess_mime("b.jpeg"), "image/jpeg");
        assert_eq!(guess_mime("clip.webm"), "video/webm");
        assert_eq!(guess_mime("mystery"), "application/octet-stream");
    }

    #[test]
    fn test_build_submission_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("flight.png");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();

        let cli = Cli::parse_from([
            "art-post",
            path.to_str().unwrap(),
            "--tag",
            "pony",
            "--tag",
            "oc",
            "--rating",
            "mature",
            "--source",
            "https://example.com/src",
        ]);
        let submission = build_submission(&cli, &Config::default()).unwrap();

        assert_eq!(submission.title, "flight");
        assert_eq!(submission.primary.mime_type, "image/png");
        assert_eq!(submission.primary.size, 3);
        assert_eq!(submission.rating, Rating::Mature);
        assert_eq!(submission.tags.tags, vec!["pony", "oc"]);
        assert_eq!(submission.sources, vec!["https://example.com/src"]);
    }

    #[test]
    fn test_build_submission_rejects_bad_rating() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("a.png");
        std::fs::write(&path, [0u8]).unwrap();

        let cli = Cli::parse_from(["art-post", path.to_str().unwrap(), "--rating", "spicy"]);
        let error = build_submission(&cli, &Config::default()).unwrap_err();
        assert_eq!(error.exit_code(), 3);
    }

    #[test]
    fn test_build_submission_missing_file() {
        let cli = Cli::parse_from(["art-post", "/nonexistent/file.png"]);
        assert!(build_submission(&cli, &Config::default()).is_err());
    }
}
