//! Request-independent services behind the HTTP routes.
//!
//! Each service holds explicit handles to the stores and the completion
//! client it needs; none of them touch process-wide state.

pub mod chat;
pub mod settings;
pub mod validation;

pub use chat::ChatService;
pub use settings::{Settings, SettingsError, SettingsService};
pub use validation::{ValidationError, ValidationService};
