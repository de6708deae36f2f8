//! HTTP clients for the three upstream sources.
//!
//! Only the primary stock API is load-bearing. The timer and image APIs are
//! best-effort enrichment: their clients log and fall back instead of
//! returning errors.

pub mod images;
pub mod primary;
pub mod timers;

#[cfg(test)]
mod test_support;

pub use images::ImageClient;
pub use primary::{with_reauth, StockApiClient};
pub use timers::TimerClient;
