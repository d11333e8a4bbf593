//! Domain core of the Dekr chat client: message formatting, usage tracking,
//! alerts, debouncing, the exchange log and the session aggregate, plus the
//! traits the outer crates implement.

pub mod alert;
pub mod api;
pub mod debounce;
pub mod draft;
pub mod error;
pub mod event;
pub mod exchange;
pub mod format;
pub mod session;
pub mod usage;

pub use alert::{AlertEntry, AlertId, AlertQueue, AlertSeverity};
pub use api::{ChatApi, ChatStatus, SendMessageRequest, SendMessageResponse, Suggestions, UsageStats};
pub use debounce::Debouncer;
pub use draft::DraftStore;
pub use error::{ApiError, ChatError, DekrError, Result};
pub use event::{AlertRemoval, ChatEvent, EventBus};
pub use exchange::{ExchangeEntry, ExchangeLog, ResponseMetadata, Role};
pub use format::format_message;
pub use session::{ChatExport, SessionState, SubmissionGate, SubmissionPermit, SubmitRejection};
pub use usage::{DailyLimit, SeverityBand, Tier, UsageTracker};
