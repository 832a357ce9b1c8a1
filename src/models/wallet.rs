// Allow dead code: API response structs have fields for completeness
#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered smart card and its wallet balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct CardSummary {
    #[serde(rename = "cardNumber")]
    pub card_number: String,
    #[serde(rename = "cardAlias")]
    pub alias: Option<String>,
    pub balance: WalletBalance,
    #[serde(rename = "validUntil")]
    pub valid_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct WalletBalance {
    /// Balance in minor currency units (cents)
    pub amount: i64,
    pub currency: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl WalletBalance {
    /// Format the balance for display, e.g. "12.50 EUR"
    pub fn display(&self) -> String {
        format!(
            "{}.{:02} {}",
            self.amount / 100,
            (self.amount % 100).abs(),
            self.currency
        )
    }
}

/// A top-up order accepted by the service.
/// Payment completion happens out of band; the order only records intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct TopUpOrder {
    #[serde(rename = "orderId")]
    pub order_id: String,
    /// Amount in minor currency units (cents)
    pub amount: i64,
    pub status: String,
    #[serde(rename = "paymentUrl")]
    pub payment_url: Option<String>,
}
