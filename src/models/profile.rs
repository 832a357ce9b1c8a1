// Allow dead code: API response structs have fields for completeness
#![allow(dead_code)]

use serde::{Deserialize, Serialize};

/// Account profile as returned by the service and cached locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Profile {
    pub id: i64,
    pub email: String,
    #[serde(rename = "firstName")]
    pub first_name: Option<String>,
    #[serde(rename = "lastName")]
    pub last_name: Option<String>,
    #[serde(rename = "phoneNumber")]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub settings: Settings,
}

impl Profile {
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (Some(first), None) => first.clone(),
            (None, Some(last)) => last.clone(),
            (None, None) => self.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Settings {
    #[serde(rename = "newsletterOptIn", default)]
    pub newsletter_opt_in: bool,
    #[serde(rename = "lowBalanceAlerts", default)]
    pub low_balance_alerts: bool,
    #[serde(rename = "preferredLanguage")]
    pub preferred_language: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_falls_back_to_email() {
        let profile = Profile {
            id: 7,
            email: "rider@example.com".to_string(),
            first_name: None,
            last_name: None,
            phone_number: None,
            settings: Settings::default(),
        };
        assert_eq!(profile.display_name(), "rider@example.com");
    }
}
