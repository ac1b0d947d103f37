//! Business layer of The Hive.
//! - `lifecycle` drives service requests through their states and settles
//!   completed ones on the `ledger`.
//! - `moderation` turns member reports into staff actions.
//! - The remaining modules cover accounts, profiles, listings, messaging,
//!   thank-you notes and the forum.

pub mod errors;
pub mod actor;
pub mod locks;
pub mod auth;
pub mod users;
pub mod ledger;
pub mod messaging;
pub mod lifecycle;
pub mod profiles;
pub mod catalog;
pub mod forum;
pub mod thanks;
pub mod moderation;
pub mod admin;
#[cfg(test)]
pub mod test_support;
