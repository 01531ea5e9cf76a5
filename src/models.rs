//! Wire and view types
//!
//! Shapes exchanged with the speaking-practice API plus the small derived
//! types the console renders.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ClientError;

/// One of the three IELTS speaking test parts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Part {
    Part1,
    Part2,
    Part3,
}

impl Part {
    pub const ALL: [Part; 3] = [Part::Part1, Part::Part2, Part::Part3];

    /// Path/wire form, e.g. `part1`
    pub fn as_str(&self) -> &'static str {
        match self {
            Part::Part1 => "part1",
            Part::Part2 => "part2",
            Part::Part3 => "part3",
        }
    }

    /// Human label, e.g. `Part 1`
    pub fn label(&self) -> &'static str {
        match self {
            Part::Part1 => "Part 1",
            Part::Part2 => "Part 2",
            Part::Part3 => "Part 3",
        }
    }

    /// Capitalized path form used in page titles, e.g. `Part1`
    pub fn title(&self) -> &'static str {
        match self {
            Part::Part1 => "Part1",
            Part::Part2 => "Part2",
            Part::Part3 => "Part3",
        }
    }
}

impl fmt::Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Part {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "part1" | "1" => Ok(Part::Part1),
            "part2" | "2" => Ok(Part::Part2),
            "part3" | "3" => Ok(Part::Part3),
            _ => Err(ClientError::Validation(format!("Unknown part: {}", s))),
        }
    }
}

/// A question as returned by `GET /api/speaking/all-questions`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: u64,
    pub part: Part,
    pub question: String,
}

/// A cached question inside its part group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionEntry {
    pub id: u64,
    pub question: String,
}

impl From<Question> for QuestionEntry {
    fn from(q: Question) -> Self {
        Self {
            id: q.id,
            question: q.question,
        }
    }
}

/// Question totals per part
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionCounts {
    #[serde(default)]
    pub part1: u64,
    #[serde(default)]
    pub part2: u64,
    #[serde(default)]
    pub part3: u64,
}

impl QuestionCounts {
    pub fn get(&self, part: Part) -> u64 {
        match part {
            Part::Part1 => self.part1,
            Part::Part2 => self.part2,
            Part::Part3 => self.part3,
        }
    }

    pub fn get_mut(&mut self, part: Part) -> &mut u64 {
        match part {
            Part::Part1 => &mut self.part1,
            Part::Part2 => &mut self.part2,
            Part::Part3 => &mut self.part3,
        }
    }

    pub fn total(&self) -> u64 {
        self.part1 + self.part2 + self.part3
    }
}

/// Server acknowledgement of a create/update/delete
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Confirmation {
    #[serde(default)]
    pub message: String,
    /// Id of a newly created question, when the server reports it
    #[serde(default)]
    pub id: Option<u64>,
}

/// Treat an explicit JSON `null` like a missing field
///
/// SQL aggregates over an empty set come back as `null`.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Aggregated usage metrics from `GET /api/speaking/metrics`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MetricsSnapshot {
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_users: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_visits: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub average_time_spent: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub recent_visits: Vec<RecentVisit>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_durations: Vec<UserDuration>,
}

/// One row of the recent visits table
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RecentVisit {
    #[serde(default)]
    pub id: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub device_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub page: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub duration: Option<i64>,
}

/// Accumulated practice time for one user
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UserDuration {
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_duration: f64,
}

/// A labelled value for the duration-by-user chart
#[derive(Debug, Clone, PartialEq)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

/// A completed visit, as reported by the duration beacon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitRecord {
    pub user_id: String,
    pub device_id: String,
    pub part: Part,
    pub duration_seconds: u64,
}
