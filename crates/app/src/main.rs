use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use quiz_core::analytics::PacePolicy;
use quiz_core::model::{
    Depth, Difficulty, DocumentKind, QuestionKind, SessionId, SessionSettings, StudyMode,
};
use services::{Clock, HttpGenerator, ServiceConfig, StudyOrchestrator};
use storage::repository::Storage;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod quiz;
mod report;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidValue { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
    MissingFile,
    UnsupportedFile { path: PathBuf },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidValue { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::MissingFile => write!(f, "quiz requires --file <path>"),
            ArgsError::UnsupportedFile { path } => write!(
                f,
                "unsupported document type: {} (expected .pdf, .docx, .txt or .md)",
                path.display()
            ),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_flag<T: std::str::FromStr>(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<T, ArgsError> {
    let value = require_value(args, flag)?;
    value
        .trim()
        .parse()
        .map_err(|_| ArgsError::InvalidValue { flag, raw: value })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  studygen quiz    --file <path> [--mode practice|exam] [--count <3-50>]");
    eprintln!("                   [--kind multiple_choice|true_false|mixed]");
    eprintln!("                   [--difficulty easy|medium|hard] [--depth short|medium|long]");
    eprintln!("                   [--style <sample text>] [--db <sqlite_url>]");
    eprintln!("  studygen stats   [--pace include|exclude] [--db <sqlite_url>]");
    eprintln!("  studygen history [--limit <n>] [--id <session-id>] [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:studygen.sqlite3, --mode practice, --count 10");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  STUDYGEN_CONFIG, STUDYGEN_DB_URL, STUDYGEN_AI_API_KEY, STUDYGEN_AI_MODEL,");
    eprintln!("  STUDYGEN_AI_IMAGE_MODEL, STUDYGEN_AI_BASE_URL, STUDYGEN_REFERENCE_STYLE,");
    eprintln!("  STUDYGEN_PACE_POLICY, STUDYGEN_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Quiz,
    Stats,
    History,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "quiz" => Some(Self::Quiz),
            "stats" => Some(Self::Stats),
            "history" => Some(Self::History),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct QuizArgs {
    db_url: Option<String>,
    file: PathBuf,
    settings: SessionSettings,
    style: Option<String>,
}

impl QuizArgs {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = None;
        let mut file = None;
        let mut style = None;
        let mut mode = StudyMode::Practice;
        let mut kind = QuestionKind::MultipleChoice;
        let mut difficulty = Difficulty::Medium;
        let mut depth = Depth::Medium;
        let mut count = SessionSettings::DEFAULT_QUESTIONS;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => db_url = Some(parse_db(args)?),
                "--file" => file = Some(PathBuf::from(require_value(args, "--file")?)),
                "--style" => style = Some(require_value(args, "--style")?),
                "--mode" => mode = parse_flag(args, "--mode")?,
                "--kind" => kind = parse_flag(args, "--kind")?,
                "--difficulty" => difficulty = parse_flag(args, "--difficulty")?,
                "--depth" => depth = parse_flag(args, "--depth")?,
                "--count" => count = parse_flag(args, "--count")?,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let file = file.ok_or(ArgsError::MissingFile)?;
        let settings = SessionSettings::new(mode, kind, difficulty, depth, count).map_err(|_| {
            ArgsError::InvalidValue {
                flag: "--count",
                raw: count.to_string(),
            }
        })?;
        Ok(Self {
            db_url,
            file,
            settings,
            style,
        })
    }
}

#[derive(Debug, Default)]
struct ReportArgs {
    db_url: Option<String>,
    pace: Option<PacePolicy>,
    limit: Option<u32>,
    session: Option<SessionId>,
}

impl ReportArgs {
    fn parse(args: &mut impl Iterator<Item = String>, command: Command) -> Result<Self, ArgsError> {
        let mut parsed = Self::default();
        while let Some(arg) = args.next() {
            match (command, arg.as_str()) {
                (_, "--db") => parsed.db_url = Some(parse_db(args)?),
                (Command::Stats, "--pace") => {
                    let value = require_value(args, "--pace")?;
                    parsed.pace = Some(match value.as_str() {
                        "include" => PacePolicy::IncludeUntimed,
                        "exclude" => PacePolicy::ExcludeUntimed,
                        _ => {
                            return Err(ArgsError::InvalidValue {
                                flag: "--pace",
                                raw: value,
                            });
                        }
                    });
                }
                (Command::History, "--limit") => parsed.limit = Some(parse_flag(args, "--limit")?),
                (Command::History, "--id") => parsed.session = Some(parse_flag(args, "--id")?),
                (_, "--help" | "-h") => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }
        Ok(parsed)
    }
}

fn parse_db(args: &mut impl Iterator<Item = String>) -> Result<String, ArgsError> {
    let value = require_value(args, "--db")?;
    if value.trim().is_empty() {
        return Err(ArgsError::InvalidDbUrl { raw: value });
    }
    Ok(value)
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

async fn open_storage(
    config: &ServiceConfig,
    db_override: Option<String>,
) -> Result<Storage, Box<dyn std::error::Error>> {
    let db_url = normalize_sqlite_url(db_override.unwrap_or_else(|| config.database_url.clone()));
    prepare_sqlite_file(&db_url)?;
    let storage = Storage::sqlite(&db_url).await?;
    info!(db = %db_url, "history store opened");
    Ok(storage)
}

fn build_orchestrator(config: &ServiceConfig, storage: &Storage) -> StudyOrchestrator {
    let generator = Arc::new(HttpGenerator::new(config.generation()));
    if !generator.enabled() {
        warn!("no API key configured; question generation is disabled");
    }
    StudyOrchestrator::new(
        Clock::default(),
        generator.clone(),
        generator,
        Arc::clone(&storage.history),
    )
    .with_analytics(config.analytics)
    .with_reference_style(config.settings.reference_style().map(str::to_string))
}

async fn run_quiz(config: &ServiceConfig, args: QuizArgs) -> Result<(), Box<dyn std::error::Error>> {
    let name = args
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let kind = DocumentKind::from_file_name(&name).ok_or_else(|| ArgsError::UnsupportedFile {
        path: args.file.clone(),
    })?;
    let data = tokio::fs::read(&args.file).await?;

    let storage = open_storage(config, args.db_url).await?;
    let mut orch = build_orchestrator(config, &storage);
    orch.load_history().await?;
    let document = orch.add_document(name, kind, data);

    println!("Generating questions...");
    orch.create_session(document, args.settings, args.style.as_deref())
        .await?;

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    while let Some(done) = quiz::play(&mut orch, &mut input).await? {
        report::print_result(&done);
        println!("Retry this session? [y/N]");
        match input.next_line().await? {
            Some(answer) if answer.trim().eq_ignore_ascii_case("y") => {
                orch.retry(done.id())?;
            }
            _ => break,
        }
    }
    Ok(())
}

async fn run_stats(config: &ServiceConfig, args: ReportArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut analytics = config.analytics;
    if let Some(pace) = args.pace {
        analytics.pace = pace;
    }
    let storage = open_storage(config, args.db_url).await?;
    let mut orch = build_orchestrator(config, &storage).with_analytics(analytics);
    orch.load_history().await?;
    report::print_stats(&orch.stats());
    Ok(())
}

async fn run_history(
    config: &ServiceConfig,
    args: ReportArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let storage = open_storage(config, args.db_url).await?;
    if let Some(id) = args.session {
        let session = storage.history.get_session(id).await?;
        report::print_review(&session);
        return Ok(());
    }
    let sessions = storage.history.list_sessions(args.limit).await?;
    report::print_history(&sessions);
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("STUDYGEN_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);

    let cmd = match argv.next() {
        None => {
            print_usage();
            return Ok(());
        }
        Some(first) if first == "--help" || first == "-h" => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(&first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    let config = ServiceConfig::load()?;
    let reported = |e: ArgsError| {
        eprintln!("{e}");
        print_usage();
        e
    };

    match cmd {
        Command::Quiz => {
            let args = QuizArgs::parse(&mut argv).map_err(reported)?;
            run_quiz(&config, args).await
        }
        Command::Stats => {
            let args = ReportArgs::parse(&mut argv, cmd).map_err(reported)?;
            run_stats(&config, args).await
        }
        Command::History => {
            let args = ReportArgs::parse(&mut argv, cmd).map_err(reported)?;
            run_history(&config, args).await
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> std::vec::IntoIter<String> {
        raw.iter()
            .map(|s| (*s).to_string())
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn quiz_args_apply_defaults() {
        let parsed = QuizArgs::parse(&mut args(&["--file", "notes.md"])).unwrap();
        assert_eq!(parsed.file, PathBuf::from("notes.md"));
        assert_eq!(parsed.settings, SessionSettings::practice_default());
        assert_eq!(parsed.db_url, None);
    }

    #[test]
    fn quiz_args_parse_settings() {
        let parsed = QuizArgs::parse(&mut args(&[
            "--file", "law.pdf", "--mode", "exam", "--count", "20", "--difficulty", "hard",
        ]))
        .unwrap();
        assert_eq!(parsed.settings.mode(), StudyMode::Exam);
        assert_eq!(parsed.settings.question_count(), 20);
        assert_eq!(parsed.settings.difficulty(), Difficulty::Hard);
    }

    #[test]
    fn quiz_args_reject_out_of_range_count() {
        let err = QuizArgs::parse(&mut args(&["--file", "a.txt", "--count", "2"])).unwrap_err();
        assert!(matches!(err, ArgsError::InvalidValue { flag: "--count", .. }));
    }

    #[test]
    fn quiz_args_require_file() {
        let err = QuizArgs::parse(&mut args(&["--mode", "exam"])).unwrap_err();
        assert!(matches!(err, ArgsError::MissingFile));
    }

    #[test]
    fn report_flags_are_command_specific() {
        let stats = ReportArgs::parse(&mut args(&["--pace", "include"]), Command::Stats).unwrap();
        assert_eq!(stats.pace, Some(PacePolicy::IncludeUntimed));

        let err = ReportArgs::parse(&mut args(&["--pace", "include"]), Command::History)
            .unwrap_err();
        assert!(matches!(err, ArgsError::UnknownArg(_)));
    }

    #[test]
    fn relative_sqlite_paths_become_absolute() {
        let url = normalize_sqlite_url("sqlite:data/history.sqlite3".into());
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("data/history.sqlite3"));
        assert_eq!(normalize_sqlite_url("sqlite::memory:".into()), "sqlite::memory:");
    }
}
