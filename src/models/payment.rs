// Allow dead code: API response structs have fields for completeness
#![allow(dead_code)]

use serde::{Deserialize, Serialize};

/// A physical location where a card can be topped up or purchased.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct PaymentPoint {
    pub id: i64,
    pub name: String,
    pub address: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "openingHours")]
    pub opening_hours: Option<String>,
    #[serde(rename = "acceptsCash", default)]
    pub accepts_cash: bool,
}

impl PaymentPoint {
    pub fn display_line(&self) -> String {
        match &self.address {
            Some(addr) => format!("{} - {}", self.name, addr),
            None => self.name.clone(),
        }
    }
}
