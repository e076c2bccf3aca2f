pub mod account_service;
pub mod email_change_service;
pub mod mail_templates;
pub mod mailer;
