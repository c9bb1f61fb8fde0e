use quiz_core::analytics::HistoryStats;
use quiz_core::model::{CompletedSession, format_elapsed};

pub fn print_result(done: &CompletedSession) {
    println!();
    println!("{}", done.title());
    println!(
        "Score: {} ({}%)  correct {}  incorrect {}",
        done.raw_fraction(),
        done.percentage(),
        done.score(),
        done.incorrect_count()
    );
    if let Some(secs) = done.time_elapsed_secs() {
        println!(
            "Time: {}  pace {}s per question",
            format_elapsed(secs),
            done.pace_secs()
        );
    }
    println!("Session id: {}", done.id());
}

/// Question-by-question review of a finished session.
pub fn print_review(done: &CompletedSession) {
    print_result(done);
    for (i, question) in done.questions().iter().enumerate() {
        let mark = if question.is_correct() == Some(true) {
            "ok"
        } else {
            "x "
        };
        println!();
        println!("{mark} {}. {}", i + 1, question.text);
        println!(
            "   your answer: {}",
            question.user_answer().unwrap_or("(no answer)")
        );
        println!("   correct:     {}", question.correct_answer);
        if !question.explanation.is_empty() {
            println!("   {}", question.explanation);
        }
    }
}

pub fn print_history(sessions: &[CompletedSession]) {
    if sessions.is_empty() {
        println!("No sessions yet.");
        return;
    }
    for s in sessions {
        println!(
            "{}  {}  {:<8} {:>6} {:>4}%  {}",
            s.created_at().format("%Y-%m-%d %H:%M"),
            s.id(),
            s.mode().as_str(),
            s.raw_fraction(),
            s.percentage(),
            s.topic()
        );
    }
}

pub fn print_stats(stats: &HistoryStats) {
    if stats.is_empty() {
        println!("No sessions yet.");
        return;
    }
    let dash = || "-".to_string();

    println!("Sessions:   {}", stats.total_sessions);
    println!(
        "Accuracy:   {}",
        stats.accuracy.map_or_else(dash, |a| format!("{a}%"))
    );
    println!(
        "Pace:       {}",
        stats.pace_secs.map_or_else(dash, |p| format!("{p}s per question"))
    );
    println!(
        "Best topic: {}",
        stats.best_topic.clone().unwrap_or_else(dash)
    );

    println!();
    println!("Topics:");
    for t in &stats.topics {
        println!(
            "  {:<30} {:>4}%  {}/{} over {} session(s)",
            t.topic, t.percentage, t.correct, t.total_questions, t.session_count
        );
    }

    if !stats.weak_points.is_empty() {
        println!();
        println!("Needs work:");
        for t in &stats.weak_points {
            println!("  {:<30} {:>4}%", t.topic, t.percentage);
        }
    }

    println!();
    println!("Recent scores (oldest first):");
    for point in &stats.evolution {
        println!(
            "  #{:<3} {:>4}%  {:>6}  {}",
            point.index, point.percentage, point.raw_fraction, point.topic
        );
    }
}
