//! Business logic services

pub mod bulk;
pub mod email_sender;
pub mod email_templates;
