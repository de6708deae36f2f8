//! Browser-backed session management for the stock API.
//!
//! The stock API only accepts cookies minted by a real page load, so the
//! credential is harvested from a headless Chromium and renewed when it ages
//! out or the API rejects it.

pub mod browser;
pub mod session;

pub use browser::{BrowserDriver, ChromiumDriver, LaunchOptions, SessionCookie};
pub use session::{Credential, RefreshPolicy, SessionManager};
