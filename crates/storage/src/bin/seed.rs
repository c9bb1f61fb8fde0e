use std::fmt;

use chrono::{DateTime, Duration, Utc};
use quiz_core::model::{
    CompletedSession, Depth, Difficulty, Question, QuestionId, QuestionKind, SessionId,
    SessionInfo, StudyMode,
};
use storage::repository::Storage;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    sessions: u32,
    questions: u32,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidSessions { raw: String },
    InvalidQuestions { raw: String },
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidSessions { raw } => write!(f, "invalid --sessions value: {raw}"),
            ArgsError::InvalidQuestions { raw } => write!(f, "invalid --questions value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
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

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("STUDYGEN_DB_URL").unwrap_or_else(|_| "sqlite:studygen.sqlite3".into());
        let mut sessions = std::env::var("STUDYGEN_SEED_SESSIONS")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(8);
        let mut questions = std::env::var("STUDYGEN_SEED_QUESTIONS")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(10);
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--sessions" => {
                    let value = require_value(&mut args, "--sessions")?;
                    sessions = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidSessions { raw: value.clone() })?;
                }
                "--questions" => {
                    let value = require_value(&mut args, "--questions")?;
                    questions = value
                        .parse::<u32>()
                        .ok()
                        .filter(|n| *n > 0)
                        .ok_or_else(|| ArgsError::InvalidQuestions { raw: value.clone() })?;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            sessions,
            questions,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:studygen.sqlite3)");
    eprintln!("  --sessions <n>            Number of completed sessions to append (default: 8)");
    eprintln!("  --questions <n>           Questions per session (default: 10)");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  STUDYGEN_DB_URL, STUDYGEN_SEED_SESSIONS, STUDYGEN_SEED_QUESTIONS");
}

const TOPICS: [&str; 4] = ["Cell Biology", "Algebra", "Roman History", "Organic Chemistry"];

/// A deterministic completed session: the first `correct` answers are right.
fn demo_session(
    topic: &str,
    created_at: DateTime<Utc>,
    mode: StudyMode,
    total: u32,
    correct: u32,
    elapsed: u32,
) -> Result<CompletedSession, Box<dyn std::error::Error>> {
    let info = SessionInfo::for_topic(
        SessionId::generate(),
        topic,
        created_at,
        mode,
        Difficulty::Medium,
        Depth::Medium,
    );
    let questions = (0..total)
        .map(|i| {
            let answer = if i < correct { "True" } else { "False" };
            Question::from_persisted(
                QuestionId::positional(i as usize),
                format!("{topic}: statement {}", i + 1),
                QuestionKind::TrueFalse,
                vec!["True".into(), "False".into()],
                "True".into(),
                format!("Statement {} holds.", i + 1),
                Some(answer.into()),
                Some(i < correct),
            )
        })
        .collect();
    Ok(CompletedSession::from_persisted(
        info,
        questions,
        correct,
        Some(elapsed),
    )?)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    // Oldest first, so the newest seeded session ends up at the top of history.
    for i in 0..args.sessions {
        let days_ago = i64::from(args.sessions - i) * 2;
        let created_at = now - Duration::days(days_ago);
        let topic = TOPICS[(i as usize) % TOPICS.len()];
        let mode = if i % 3 == 0 {
            StudyMode::Exam
        } else {
            StudyMode::Practice
        };
        let correct = (args.questions * (40 + (i * 13) % 60)) / 100;
        let elapsed = args.questions * (20 + (i * 7) % 40);

        let session = demo_session(topic, created_at, mode, args.questions, correct, elapsed)?;
        storage.history.append_session(&session).await?;
    }

    println!(
        "Seeded {} completed sessions of {} questions into {}",
        args.sessions, args.questions, args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
