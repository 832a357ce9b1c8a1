//! Data models for FareCard entities.
//!
//! This module contains the data structures exchanged with the FareCard
//! service:
//!
//! - `CardSummary`, `WalletBalance`, `TopUpOrder`: smart-card wallet state
//! - `NewsArticle`, `NewsPage`: service announcements feed
//! - `PaymentPoint`: physical top-up locations
//! - `Profile`, `Settings`: account data and preferences

pub mod news;
pub mod payment;
pub mod profile;
pub mod wallet;

pub use news::{NewsArticle, NewsPage};
pub use payment::PaymentPoint;
pub use profile::{Profile, Settings};
pub use wallet::{CardSummary, TopUpOrder, WalletBalance};
