//! IncognitoBox: anonymous messages behind a shareable username link.
//!
//! Accounts prove their email with a one-time code before they can sign in or
//! receive messages.

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod mailer;
pub mod messages;
pub mod response;
pub mod state;
pub mod store;
pub mod validation;
pub mod verification;
