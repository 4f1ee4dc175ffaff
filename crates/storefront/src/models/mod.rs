//! Types kept in the browser session.

pub mod session;

pub use session::{AccessToken, CurrentUser, Flash, FlashLevel, keys as session_keys};
