//! Outbound services.

pub mod slack;

pub use slack::SlackNotifier;
