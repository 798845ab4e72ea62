pub mod auth;
pub mod import_service;
pub mod mailer;
pub mod notification_service;
pub mod policy_service;
pub mod rate_limit;
pub mod reminder_service;
pub mod status_tracking_service;
