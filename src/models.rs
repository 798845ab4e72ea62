pub mod action;
pub mod auth;
pub mod gear;
pub mod import;
pub mod notifications;
pub mod policy;
pub mod reminders;
