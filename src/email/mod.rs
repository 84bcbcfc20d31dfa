//! Transactional email: templates and delivery.

mod mailer;
pub mod templates;

pub use mailer::*;
