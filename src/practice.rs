//! Practice Pages
//!
//! Question navigation and read-aloud for one part, plus the page wrapper
//! that ties a practice session to a tracked visit.

use std::io::Write;
use std::sync::{Arc, Mutex};

use crate::models::Part;
use crate::visit::{VisitReport, VisitTracker};

/// A single read-aloud request
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub lang: String,
    pub rate: f32,
}

impl Utterance {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            lang: "en-US".to_string(),
            rate: 1.0,
        }
    }
}

/// Speech synthesis engine
pub trait Speaker: Send + Sync {
    fn speak(&self, utterance: &Utterance);

    /// Stop any in-progress utterance immediately
    fn cancel(&self);
}

/// Speaker that prints utterances to a writer (stdout by default)
pub struct ConsoleSpeaker {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSpeaker {
    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }
}

impl Speaker for ConsoleSpeaker {
    fn speak(&self, utterance: &Utterance) {
        if let Ok(mut out) = self.out.lock() {
            if let Err(e) = writeln!(out, "(speaking, {}) {}", utterance.lang, utterance.text) {
                tracing::warn!(error = %e, "Failed to write utterance");
            }
        }
    }

    fn cancel(&self) {
        tracing::debug!("Speech cancelled");
    }
}

/// Navigation and speech state for a list of questions
pub struct PracticeSession {
    part: Part,
    questions: Vec<String>,
    index: usize,
    speaking: bool,
    speaker: Arc<dyn Speaker>,
}

impl PracticeSession {
    pub fn new(part: Part, questions: Vec<String>, speaker: Arc<dyn Speaker>) -> Self {
        Self {
            part,
            questions,
            index: 0,
            speaking: false,
            speaker,
        }
    }

    pub fn part(&self) -> Part {
        self.part
    }

    pub fn questions(&self) -> &[String] {
        &self.questions
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking
    }

    pub fn current(&self) -> Option<&str> {
        self.questions.get(self.index).map(String::as_str)
    }

    /// Page heading, e.g. `Part1 Questions`
    pub fn title(&self) -> String {
        format!("{} Questions", self.part.title())
    }

    /// `Question i of n`, or the empty-state text when there are none
    pub fn progress(&self) -> String {
        if self.questions.is_empty() {
            format!("No questions available for {}.", self.part.title())
        } else {
            format!("Question {} of {}", self.index + 1, self.questions.len())
        }
    }

    pub fn has_next(&self) -> bool {
        self.index + 1 < self.questions.len()
    }

    pub fn has_previous(&self) -> bool {
        self.index > 0
    }

    /// Read the current question aloud; no-op with no questions or while speaking
    pub fn speak(&mut self) {
        if self.speaking {
            return;
        }
        if let Some(text) = self.questions.get(self.index) {
            self.speaker.speak(&Utterance::new(text));
            self.speaking = true;
        }
    }

    /// Cancel speech synchronously
    pub fn stop(&mut self) {
        self.speaker.cancel();
        self.speaking = false;
    }

    /// Called by the speech host when an utterance ends on its own
    pub fn speech_finished(&mut self) {
        self.speaking = false;
    }

    pub fn next(&mut self) -> bool {
        if !self.has_next() {
            return false;
        }
        self.index += 1;
        self.stop();
        true
    }

    pub fn previous(&mut self) -> bool {
        if !self.has_previous() {
            return false;
        }
        self.index -= 1;
        self.stop();
        true
    }
}

/// A mounted `/part/{part}` page
pub struct PartPage {
    tracker: VisitTracker,
    session: PracticeSession,
}

impl PartPage {
    /// Begin the visit and load the part's questions
    ///
    /// A failed fetch is logged and leaves the page empty.
    pub async fn mount(mut tracker: VisitTracker, part: Part, speaker: Arc<dyn Speaker>) -> Self {
        let questions = match tracker.begin(part).await {
            Ok(questions) => questions,
            Err(e) => {
                tracing::error!(part = %part, error = %e, "Failed to load practice questions");
                Vec::new()
            }
        };

        Self {
            tracker,
            session: PracticeSession::new(part, questions, speaker),
        }
    }

    pub fn session(&self) -> &PracticeSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut PracticeSession {
        &mut self.session
    }

    /// Stop speech and end the visit
    pub fn unmount(mut self) -> Option<VisitReport> {
        self.session.stop();
        self.tracker.end()
    }
}
