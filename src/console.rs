//! Admin Console
//!
//! View model behind `/admin`. Composes the session store, the remote
//! clients and the question bank cache. Every operation reports success as
//! a `bool`; failures land in a single dismissible error banner and never
//! propagate further.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::bank::QuestionBank;
use crate::error::{ClientError, ClientResult};
use crate::models::{ChartPoint, MetricsSnapshot, Part};
use crate::remote::{duration_series, ApiClient, MetricsClient, QuestionClient};
use crate::routes::Route;
use crate::session::{LoginStage, SessionStore};

/// Sidebar sections of the admin dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdminSection {
    #[default]
    Dashboard,
    AddQuestions,
    ViewQuestions,
}

/// Shared view of the console's in-flight flag
///
/// Cloned out of the console so a spinner can poll it while an operation
/// holds the console mutably.
#[derive(Debug, Clone, Default)]
pub struct BusyHandle(Arc<AtomicBool>);

impl BusyHandle {
    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn start(&self) -> BusyGuard {
        self.0.store(true, Ordering::SeqCst);
        BusyGuard(Arc::clone(&self.0))
    }
}

/// Clears the flag when the operation finishes or its future is dropped
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct AdminConsole {
    session: SessionStore,
    questions: QuestionClient,
    metrics: MetricsClient,
    bank: QuestionBank,
    snapshot: Option<MetricsSnapshot>,
    section: AdminSection,
    error: Option<String>,
    notice: Option<String>,
    busy: BusyHandle,
}

impl AdminConsole {
    pub fn new(session: SessionStore, api: ApiClient) -> Self {
        Self {
            session,
            questions: QuestionClient::new(api.clone()),
            metrics: MetricsClient::new(api),
            bank: QuestionBank::new(),
            snapshot: None,
            section: AdminSection::default(),
            error: None,
            notice: None,
            busy: BusyHandle::default(),
        }
    }

    // ---- view state ----

    pub fn stage(&self) -> LoginStage {
        self.session.stage()
    }

    pub fn section(&self) -> AdminSection {
        self.section
    }

    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    /// Last fetched metrics; dropped whenever another section is selected
    pub fn metrics(&self) -> Option<&MetricsSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn duration_chart(&self) -> Vec<ChartPoint> {
        self.snapshot.as_ref().map(duration_series).unwrap_or_default()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    pub fn busy_handle(&self) -> BusyHandle {
        self.busy.clone()
    }

    pub fn select(&mut self, section: AdminSection) {
        if section != self.section {
            self.snapshot = None;
        }
        self.section = section;
    }

    // ---- session ----

    pub fn restore(&mut self) -> bool {
        let result = self.session.restore();
        self.settle(result).is_some()
    }

    pub fn acknowledge_warning(&mut self) -> LoginStage {
        self.session.acknowledge_warning()
    }

    pub async fn login(&mut self, username: &str, password: &str) -> bool {
        let result = {
            let _busy = self.busy.start();
            self.session.login(username, password).await
        };
        self.settle(result).is_some()
    }

    /// Log out; the banner is cleared and the caller should navigate home
    pub fn logout(&mut self) -> Route {
        let result = self.session.logout();
        self.bank = QuestionBank::new();
        self.snapshot = None;
        self.section = AdminSection::default();
        self.error = None;
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to clear persisted token");
        }
        Route::Landing
    }

    // ---- data ----

    pub async fn load_counts(&mut self) -> bool {
        let Some(token) = self.token() else {
            return false;
        };
        let result = {
            let _busy = self.busy.start();
            self.questions.list_counts(&token).await
        };

        match self.settle(result) {
            Some(counts) => {
                self.bank.set_counts(counts);
                true
            }
            None => false,
        }
    }

    pub async fn load_questions(&mut self) -> bool {
        let Some(token) = self.token() else {
            return false;
        };
        let result = {
            let _busy = self.busy.start();
            self.questions.list_all(&token).await
        };

        match self.settle(result) {
            Some(questions) => {
                self.bank.replace_all(questions);
                true
            }
            None => false,
        }
    }

    pub async fn load_metrics(&mut self) -> bool {
        let Some(token) = self.token() else {
            return false;
        };
        let result = {
            let _busy = self.busy.start();
            self.metrics.fetch(&token).await
        };

        match self.settle(result) {
            Some(snapshot) => {
                self.snapshot = Some(snapshot);
                true
            }
            None => false,
        }
    }

    pub async fn add_question(&mut self, part: Part, text: &str) -> bool {
        let Some(token) = self.token() else {
            return false;
        };
        let result = {
            let _busy = self.busy.start();
            self.questions.create(&token, part, text).await
        };

        match self.settle(result) {
            Some((confirmation, patch)) => {
                self.bank.apply(&patch, &confirmation);
                self.notice = Some(confirmation.message);
                true
            }
            None => false,
        }
    }

    pub async fn edit_question(&mut self, part: Part, id: u64, text: &str) -> bool {
        let Some(token) = self.token() else {
            return false;
        };
        let result = {
            let _busy = self.busy.start();
            self.questions.update(&token, part, id, text).await
        };

        match self.settle(result) {
            Some((confirmation, patch)) => {
                self.bank.apply(&patch, &confirmation);
                self.notice = Some("Question updated successfully".to_string());
                true
            }
            None => false,
        }
    }

    pub async fn delete_question(&mut self, part: Part, id: u64) -> bool {
        let Some(token) = self.token() else {
            return false;
        };
        let result = {
            let _busy = self.busy.start();
            self.questions.delete(&token, part, id).await
        };

        match self.settle(result) {
            Some((confirmation, patch)) => {
                self.bank.apply(&patch, &confirmation);
                self.notice = Some("Question deleted successfully".to_string());
                true
            }
            None => false,
        }
    }

    fn token(&mut self) -> Option<String> {
        let result = self.session.bearer().map(str::to_string);
        self.settle(result)
    }

    /// Clear the banner on success, fill it on failure
    fn settle<T>(&mut self, result: ClientResult<T>) -> Option<T> {
        match result {
            Ok(value) => {
                self.error = None;
                Some(value)
            }
            Err(e) => {
                self.show_error(e);
                None
            }
        }
    }

    fn show_error(&mut self, error: ClientError) {
        if error.is_unauthorized() {
            tracing::warn!(
                status = error.status(),
                "Admin token rejected, log in again"
            );
        } else {
            tracing::debug!(error = %error, "Admin console error");
        }
        self.error = Some(error.to_string());
    }
}
