//! History analytics.
//!
//! Everything here is recomputed from the full history on each call; no
//! aggregate state is kept between calls.

use serde::{Deserialize, Serialize};

use crate::model::{CompletedSession, rounded_percentage, rounded_ratio};

/// How sessions without a recorded elapsed time enter the pace figure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacePolicy {
    /// Untimed sessions add their questions to the denominator and zero seconds
    /// to the numerator.
    IncludeUntimed,
    /// Untimed sessions are left out of both sums.
    #[default]
    ExcludeUntimed,
}

/// Tunables for [`summarize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsOptions {
    pub pace: PacePolicy,
    /// Topics strictly below this percentage are weak points.
    pub weak_threshold: u32,
    pub weak_limit: usize,
    pub evolution_window: usize,
}

impl Default for AnalyticsOptions {
    fn default() -> Self {
        Self {
            pace: PacePolicy::default(),
            weak_threshold: 75,
            weak_limit: 3,
            evolution_window: 15,
        }
    }
}

/// Per-topic totals across every session on that topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicStats {
    pub topic: String,
    pub total_questions: u32,
    pub correct: u32,
    pub session_count: u32,
    pub percentage: u32,
}

/// One point of the score trend, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvolutionPoint {
    /// 1-based position within the window.
    pub index: usize,
    pub percentage: u32,
    pub topic: String,
    pub raw_fraction: String,
}

/// Aggregate view over the whole history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryStats {
    pub total_sessions: usize,
    /// Mean per-session percentage; `None` when there is no history.
    pub accuracy: Option<u32>,
    /// Average seconds per question; `None` when no session qualifies.
    pub pace_secs: Option<u32>,
    /// Topics in first-seen order.
    pub topics: Vec<TopicStats>,
    pub best_topic: Option<String>,
    pub weak_points: Vec<TopicStats>,
    pub evolution: Vec<EvolutionPoint>,
}

impl HistoryStats {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_sessions == 0
    }
}

/// Summarize `history`, which is ordered most-recent-first.
#[must_use]
pub fn summarize(history: &[CompletedSession], options: &AnalyticsOptions) -> HistoryStats {
    let topics = topic_stats(history);
    let best_topic = best_topic(&topics).map(|t| t.topic.clone());
    let weak_points = weak_points(&topics, options.weak_threshold, options.weak_limit);

    HistoryStats {
        total_sessions: history.len(),
        accuracy: accuracy(history),
        pace_secs: pace_secs(history, options.pace),
        best_topic,
        weak_points,
        evolution: evolution(history, options.evolution_window),
        topics,
    }
}

/// Mean over sessions of `100 * score / total`, rounded.
#[must_use]
pub fn accuracy(history: &[CompletedSession]) -> Option<u32> {
    if history.is_empty() {
        return None;
    }
    let sum: f64 = history
        .iter()
        .map(|s| {
            let total = s.total_questions();
            if total == 0 {
                0.0
            } else {
                f64::from(s.score()) * 100.0 / f64::from(total)
            }
        })
        .sum();
    #[allow(clippy::cast_precision_loss)]
    let mean = sum / history.len() as f64;
    Some(round_non_negative(mean))
}

/// `round(total seconds / total questions)` under `policy`.
#[must_use]
pub fn pace_secs(history: &[CompletedSession], policy: PacePolicy) -> Option<u32> {
    let (seconds, questions) = history
        .iter()
        .filter(|s| policy == PacePolicy::IncludeUntimed || s.time_elapsed_secs().is_some())
        .fold((0_u64, 0_u64), |(secs, qs), s| {
            (
                secs + u64::from(s.time_elapsed_secs().unwrap_or(0)),
                qs + u64::from(s.total_questions()),
            )
        });
    (questions > 0).then(|| rounded_ratio(seconds, questions))
}

/// Group sessions by topic, keeping first-seen order.
#[must_use]
pub fn topic_stats(history: &[CompletedSession]) -> Vec<TopicStats> {
    let mut topics: Vec<TopicStats> = Vec::new();
    for session in history {
        let entry = match topics.iter().position(|t| t.topic == session.topic()) {
            Some(pos) => &mut topics[pos],
            None => {
                topics.push(TopicStats {
                    topic: session.topic().to_string(),
                    total_questions: 0,
                    correct: 0,
                    session_count: 0,
                    percentage: 0,
                });
                let last = topics.len() - 1;
                &mut topics[last]
            }
        };
        entry.total_questions = entry.total_questions.saturating_add(session.total_questions());
        entry.correct = entry.correct.saturating_add(session.score());
        entry.session_count += 1;
    }
    for entry in &mut topics {
        entry.percentage =
            rounded_percentage(u64::from(entry.correct), u64::from(entry.total_questions));
    }
    topics
}

/// Highest-percentage topic; the first one seen wins a tie.
#[must_use]
pub fn best_topic(topics: &[TopicStats]) -> Option<&TopicStats> {
    topics.iter().fold(None, |best: Option<&TopicStats>, t| match best {
        Some(b) if b.percentage >= t.percentage => Some(b),
        _ => Some(t),
    })
}

/// Topics strictly below `threshold`, lowest first, at most `limit`.
#[must_use]
pub fn weak_points(topics: &[TopicStats], threshold: u32, limit: usize) -> Vec<TopicStats> {
    let mut weak: Vec<TopicStats> = topics
        .iter()
        .filter(|t| t.percentage < threshold)
        .cloned()
        .collect();
    weak.sort_by_key(|t| t.percentage);
    weak.truncate(limit);
    weak
}

/// The last `window` sessions, oldest first.
#[must_use]
pub fn evolution(history: &[CompletedSession], window: usize) -> Vec<EvolutionPoint> {
    history
        .iter()
        .take(window)
        .rev()
        .enumerate()
        .map(|(i, s)| EvolutionPoint {
            index: i + 1,
            percentage: s.percentage(),
            topic: s.topic().to_string(),
            raw_fraction: s.raw_fraction(),
        })
        .collect()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round_non_negative(value: f64) -> u32 {
    value.round().clamp(0.0, f64::from(u32::MAX)) as u32
}
