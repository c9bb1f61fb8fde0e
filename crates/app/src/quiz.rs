//! Terminal loop for one active session.
//!
//! The session clock advances once per second while waiting for input, so
//! time spent thinking counts towards the elapsed time.

use std::time::Duration;

use quiz_core::engine::{ActiveSession, ExamRun, PracticePhase, PracticeRun, SelectOutcome};
use quiz_core::model::{CompletedSession, StudyMode, format_elapsed};
use services::{OrchestratorError, PracticeStep, StudyOrchestrator};
use tokio::io::{BufReader, Lines, Stdin};
use tokio::time::{MissedTickBehavior, interval};

pub type Input = Lines<BufReader<Stdin>>;

enum Flow {
    Continue,
    Finished(CompletedSession),
    Abandoned,
}

/// Drive the active session until it is finished or abandoned.
///
/// Returns `None` when the learner quits or input ends.
pub async fn play(
    orch: &mut StudyOrchestrator,
    input: &mut Input,
) -> Result<Option<CompletedSession>, Box<dyn std::error::Error>> {
    render(orch);

    let mut ticker = interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                orch.tick();
            }
            line = input.next_line() => {
                let Some(line) = line? else {
                    orch.abandon();
                    return Ok(None);
                };
                match handle_line(orch, line.trim()).await? {
                    Flow::Continue => render(orch),
                    Flow::Finished(done) => return Ok(Some(done)),
                    Flow::Abandoned => {
                        println!("Session abandoned; nothing was recorded.");
                        return Ok(None);
                    }
                }
            }
        }
    }
}

async fn handle_line(orch: &mut StudyOrchestrator, line: &str) -> Result<Flow, OrchestratorError> {
    if matches!(line, "q" | "quit") {
        orch.abandon();
        return Ok(Flow::Abandoned);
    }
    match orch.active().map(ActiveSession::mode) {
        Some(StudyMode::Practice) => practice_input(orch, line).await,
        Some(StudyMode::Exam) => exam_input(orch, line).await,
        None => Ok(Flow::Abandoned),
    }
}

/// 1-based option number to option text for the given question.
fn option_at(options: &[String], raw: &str) -> Option<String> {
    let n: usize = raw.parse().ok()?;
    options.get(n.checked_sub(1)?).cloned()
}

async fn practice_input(orch: &mut StudyOrchestrator, line: &str) -> Result<Flow, OrchestratorError> {
    if line.is_empty() || line == "n" || line == "next" {
        return match orch.advance_practice().await? {
            PracticeStep::Next => Ok(Flow::Continue),
            PracticeStep::NotRevealed => {
                println!("Pick an option first.");
                Ok(Flow::Continue)
            }
            PracticeStep::Finished(done) => Ok(Flow::Finished(done)),
        };
    }

    let option = match orch.active() {
        Some(ActiveSession::Practice(run)) => option_at(&run.current_question().options, line),
        _ => None,
    };
    let Some(option) = option else {
        println!("Type an option number, [enter] to continue, or q to quit.");
        return Ok(Flow::Continue);
    };
    if let SelectOutcome::AlreadyRevealed = orch.select_practice(option)? {
        println!("Already answered. Press [enter] to continue.");
    }
    Ok(Flow::Continue)
}

async fn exam_input(orch: &mut StudyOrchestrator, line: &str) -> Result<Flow, OrchestratorError> {
    if line == "s" || line == "submit" {
        return Ok(Flow::Finished(orch.submit_exam().await?));
    }

    let selection = match (orch.active(), line.split_once(' ')) {
        (Some(ActiveSession::Exam(run)), Some((question, option))) => question
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|n| run.session().questions().get(n.checked_sub(1)?))
            .and_then(|q| Some((q.id.clone(), option_at(&q.options, option.trim())?))),
        _ => None,
    };
    match selection {
        Some((id, option)) => {
            orch.select_exam(&id, option)?;
        }
        None => println!("Type '<question> <option>', s to submit, or q to quit."),
    }
    Ok(Flow::Continue)
}

fn render(orch: &StudyOrchestrator) {
    match orch.active() {
        Some(ActiveSession::Practice(run)) => render_practice(run),
        Some(ActiveSession::Exam(run)) => render_exam(run),
        None => {}
    }
}

fn render_practice(run: &PracticeRun) {
    let progress = run.progress();
    let question = run.current_question();
    println!();
    println!(
        "[{}/{}] {}  ({})",
        run.phase().index() + 1,
        progress.total,
        run.session().info().title,
        format_elapsed(run.elapsed_secs())
    );
    println!("{}", question.text);
    for (i, option) in question.options.iter().enumerate() {
        println!("  {}. {option}", i + 1);
    }

    if let PracticePhase::Revealed { feedback, .. } = run.phase() {
        if feedback.is_correct {
            println!("Correct!");
        } else {
            println!("Incorrect. The answer is: {}", feedback.correct_answer);
        }
        println!("{}", feedback.explanation);
        if run.is_last_question() {
            println!("[enter] to see results");
        } else {
            println!("[enter] for the next question");
        }
    }
}

fn render_exam(run: &ExamRun) {
    let progress = run.progress();
    println!();
    println!(
        "{}  answered {}/{} ({}%)  ({})",
        run.session().info().title,
        progress.answered,
        progress.total,
        progress.percent_answered(),
        format_elapsed(run.elapsed_secs())
    );
    for (qi, question) in run.session().questions().iter().enumerate() {
        println!("{}. {}", qi + 1, question.text);
        let chosen = run.selection(&question.id);
        for (oi, option) in question.options.iter().enumerate() {
            let marker = if chosen == Some(option.as_str()) { '*' } else { ' ' };
            println!("  {marker}{}. {option}", oi + 1);
        }
    }
    println!("Type '<question> <option>' to answer, s to submit, q to quit.");
}

#[cfg(test)]
mod tests {
    use super::option_at;

    #[test]
    fn options_are_numbered_from_one() {
        let options = vec!["Paris".to_string(), "Lyon".to_string()];
        assert_eq!(option_at(&options, "1").as_deref(), Some("Paris"));
        assert_eq!(option_at(&options, "2").as_deref(), Some("Lyon"));
        assert_eq!(option_at(&options, "0"), None);
        assert_eq!(option_at(&options, "3"), None);
        assert_eq!(option_at(&options, "x"), None);
    }
}
