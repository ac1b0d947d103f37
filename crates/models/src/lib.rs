pub mod errors;
pub mod db;
pub mod user;
pub mod user_credentials;
pub mod session;
pub mod tag;
pub mod service;
pub mod service_tag;
pub mod conversation;
pub mod conversation_participant;
pub mod message;
pub mod service_request;
pub mod time_account;
pub mod time_transaction;
pub mod thread;
pub mod post;
pub mod report;
pub mod moderation_action;
pub mod profile;
pub mod thank_you_note;

#[cfg(test)]
mod tests;
