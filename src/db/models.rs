use crate::clock::parse_expire_date;
use crate::error::ValidationError;
use crate::layering::clamp_text;
use crate::lifecycle::{KeyType, StoredStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Minimum length of an acceptable connection string.
pub const MIN_KEY_STRING_LEN: usize = 8;

/// Provisioned access key
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct KeyRecord {
    pub id: i64,
    pub key_type: String,
    pub region_name: String,
    pub region_flag: String,
    pub gb_limit: i64,
    /// `YYYY-MM-DD`, or empty for keys that never expire
    pub expire_date: String,
    pub key_string: String,
    /// Stored flag; see `lifecycle` for the status users actually see
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Persisted key/value override
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SettingEntry {
    pub name: String,
    pub value: String,
}

/// Listing filter
#[derive(Debug, Clone, Default)]
pub struct KeyFilter {
    /// Exact type match; empty matches all
    pub key_type: String,
    /// Case-insensitive substring over region and type; empty matches all
    pub query: String,
}

/// Raw add-key form as posted by the dashboard
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewKeyForm {
    #[serde(default, rename = "type")]
    pub key_type: String,
    #[serde(default)]
    pub region_name: String,
    #[serde(default)]
    pub region_flag: String,
    #[serde(default)]
    pub gb_limit: String,
    #[serde(default)]
    pub expire_date: String,
    #[serde(default)]
    pub key_string: String,
    #[serde(default)]
    pub status: String,
}

/// Validated key ready for insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewKey {
    pub key_type: KeyType,
    pub region_name: String,
    pub region_flag: String,
    pub gb_limit: i64,
    pub expire_date: String,
    pub key_string: String,
    pub status: StoredStatus,
}

impl TryFrom<NewKeyForm> for NewKey {
    type Error = ValidationError;

    fn try_from(form: NewKeyForm) -> Result<Self, Self::Error> {
        let key_string = form.key_string.trim().to_string();
        if key_string.chars().count() < MIN_KEY_STRING_LEN {
            return Err(ValidationError::KeyStringInvalid);
        }

        let key_type = if form.key_type.trim().is_empty() {
            KeyType::V2ray
        } else {
            KeyType::parse(&form.key_type).ok_or(ValidationError::KeyTypeInvalid)?
        };

        let expire_date =
            parse_expire_date(&form.expire_date).ok_or(ValidationError::ExpireDateInvalid)?;

        let region_name = clamp_text(&form.region_name, 80);
        let region_name = if region_name.is_empty() {
            "Unknown".to_string()
        } else {
            region_name
        };

        Ok(Self {
            key_type,
            region_name,
            region_flag: clamp_text(&form.region_flag, 16),
            gb_limit: form.gb_limit.trim().parse::<i64>().unwrap_or(0).max(0),
            expire_date,
            key_string,
            status: StoredStatus::parse(&form.status),
        })
    }
}
