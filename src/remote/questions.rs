//! Question bank endpoints

use serde::Deserialize;
use serde_json::json;

use super::ApiClient;
use crate::bank::BankPatch;
use crate::error::{ClientError, ClientResult};
use crate::models::{Confirmation, Part, Question, QuestionCounts};
use crate::transport::ApiRequest;

const COUNT_PATH: &str = "/api/speaking/count";
const ALL_QUESTIONS_PATH: &str = "/api/speaking/all-questions";

/// Shown when a new question is submitted empty
pub const CREATE_REQUIRED: &str = "Please enter a question";

/// Shown when an edit is saved empty
pub const UPDATE_REQUIRED: &str = "Please enter a new question";

fn part_path(part: Part) -> String {
    format!("/api/speaking/{}", part)
}

fn question_path(part: Part, id: u64) -> String {
    format!("/api/speaking/{}/{}", part, id)
}

/// A mutation request paired with the cache patch to apply on success
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionCommand {
    pub request: ApiRequest,
    pub patch: BankPatch,
}

impl QuestionCommand {
    /// `POST /api/speaking/{part}`; fails without a request when `text` is empty
    pub fn create(part: Part, text: &str) -> ClientResult<Self> {
        let text = required(text, CREATE_REQUIRED)?;
        Ok(Self {
            request: ApiRequest::post(part_path(part), json!({ "question": text })),
            patch: BankPatch::Append {
                part,
                question: text.to_string(),
            },
        })
    }

    /// `PUT /api/speaking/{part}/{id}`; fails without a request when `text` is empty
    pub fn update(part: Part, id: u64, text: &str) -> ClientResult<Self> {
        let text = required(text, UPDATE_REQUIRED)?;
        Ok(Self {
            request: ApiRequest::put(question_path(part, id), json!({ "question": text })),
            patch: BankPatch::Replace {
                part,
                id,
                question: text.to_string(),
            },
        })
    }

    /// `DELETE /api/speaking/{part}/{id}`
    pub fn delete(part: Part, id: u64) -> Self {
        Self {
            request: ApiRequest::delete(question_path(part, id)),
            patch: BankPatch::Remove { part, id },
        }
    }
}

fn required<'a>(text: &'a str, message: &str) -> ClientResult<&'a str> {
    if text.trim().is_empty() {
        Err(ClientError::required(message))
    } else {
        Ok(text)
    }
}

#[derive(Debug, Deserialize)]
struct PracticeQuestions {
    #[serde(default)]
    questions: Vec<String>,
}

/// Client for the question bank endpoints
#[derive(Clone)]
pub struct QuestionClient {
    api: ApiClient,
}

impl QuestionClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// `GET /api/speaking/count`
    pub async fn list_counts(&self, token: &str) -> ClientResult<QuestionCounts> {
        self.api.execute(ApiRequest::get(COUNT_PATH).bearer(token)).await
    }

    /// `GET /api/speaking/all-questions`, in server order
    pub async fn list_all(&self, token: &str) -> ClientResult<Vec<Question>> {
        self.api
            .execute(ApiRequest::get(ALL_QUESTIONS_PATH).bearer(token))
            .await
    }

    /// Run a mutation and hand back the patch to apply on success
    pub async fn execute(
        &self,
        token: &str,
        command: QuestionCommand,
    ) -> ClientResult<(Confirmation, BankPatch)> {
        let QuestionCommand { request, patch } = command;
        let confirmation: Confirmation = self.api.execute(request.bearer(token)).await?;

        tracing::info!(part = %patch.part(), message = %confirmation.message, "Question mutation confirmed");

        Ok((confirmation, patch))
    }

    pub async fn create(
        &self,
        token: &str,
        part: Part,
        text: &str,
    ) -> ClientResult<(Confirmation, BankPatch)> {
        self.execute(token, QuestionCommand::create(part, text)?).await
    }

    pub async fn update(
        &self,
        token: &str,
        part: Part,
        id: u64,
        text: &str,
    ) -> ClientResult<(Confirmation, BankPatch)> {
        self.execute(token, QuestionCommand::update(part, id, text)?)
            .await
    }

    pub async fn delete(
        &self,
        token: &str,
        part: Part,
        id: u64,
    ) -> ClientResult<(Confirmation, BankPatch)> {
        self.execute(token, QuestionCommand::delete(part, id)).await
    }

    /// Public `GET /api/speaking/{part}` used by practice pages
    ///
    /// Carries the visitor identity; `duration` is set only on the closing
    /// call of a visit.
    pub async fn fetch_for_practice(
        &self,
        part: Part,
        user_id: &str,
        device_id: &str,
        duration: Option<u64>,
    ) -> ClientResult<Vec<String>> {
        let response: PracticeQuestions = self
            .api
            .execute(practice_request(part, user_id, device_id, duration))
            .await?;
        Ok(response.questions)
    }
}

/// The unauthenticated per-part fetch that doubles as the visit signal
pub fn practice_request(
    part: Part,
    user_id: &str,
    device_id: &str,
    duration: Option<u64>,
) -> ApiRequest {
    let request = ApiRequest::get(part_path(part))
        .query("user_id", user_id)
        .query("device_id", device_id);

    match duration {
        Some(seconds) => request.query("duration", seconds),
        None => request,
    }
}
