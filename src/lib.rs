//! # Speaking Console
//!
//! Client-side session, data-fetch and visit-telemetry lifecycle for the
//! IELTS speaking-practice console. The remote API does all the real work
//! (auth, persistence, metrics); this crate keeps local identity, drives the
//! admin gate, caches the question bank and reports practice visits.
//!
//! ## Modules
//!
//! - [`session`]: admin token and the warning → login → dashboard gate
//! - [`remote`]: question bank, metrics and auth endpoints
//! - [`bank`]: grouped question cache patched after server confirmation
//! - [`visit`]: per-page visit tracking with a fire-and-forget duration beacon
//! - [`console`], [`practice`]: admin and practice page view models
//! - [`transport`], [`local_storage`]: HTTP and persistence seams
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use speaking_console::{Config, ConsoleContext, Part};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ctx = ConsoleContext::from_config(Config::load_default())?;
//!
//!     // Anonymous practice visit
//!     let mut tracker = ctx.visit_tracker();
//!     let questions = tracker.begin(Part::Part1).await?;
//!     println!("{} questions", questions.len());
//!     tracker.end();
//!
//!     // Admin console
//!     let mut console = ctx.admin_console();
//!     console.restore();
//!     console.acknowledge_warning();
//!     if console.load_counts().await {
//!         println!("{:?}", console.bank().counts());
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod bank;
pub mod config;
pub mod console;
pub mod context;
pub mod error;
pub mod identity;
pub mod local_storage;
pub mod models;
pub mod practice;
pub mod remote;
pub mod routes;
pub mod session;
pub mod transport;
pub mod visit;

pub use bank::{group_by_part, BankPatch, GroupedQuestions, QuestionBank};

pub use config::{Config, ConfigError, LoadReport, LoggingConfig};

pub use console::{AdminConsole, AdminSection, BusyHandle};

pub use context::{ConsoleContext, InitError};

pub use error::{ClientError, ClientResult};

pub use identity::DeviceIdentity;

pub use local_storage::{FileStorage, LocalStorage, MemoryStorage, StorageError};

pub use models::{
    ChartPoint, Confirmation, MetricsSnapshot, Part, Question, QuestionCounts, QuestionEntry,
    RecentVisit, UserDuration, VisitRecord,
};

pub use practice::{ConsoleSpeaker, PartPage, PracticeSession, Speaker, Utterance};

pub use remote::{duration_series, ApiClient, AuthClient, MetricsClient, QuestionClient};

pub use routes::Route;

pub use session::{LoginStage, Session, SessionStore};

pub use transport::{ApiRequest, ApiResponse, HttpTransport, ReqwestTransport, TransportError};

pub use visit::{Clock, SystemClock, VisitReport, VisitState, VisitTracker};
