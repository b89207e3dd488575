//! Key status derivation.
//!
//! The stored flag is only advisory. What users see is the effective status,
//! recomputed on every read from the stored flag and today's date, and never
//! written back.

use crate::clock::is_before_today;
use crate::db::KeyRecord;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::cmp::Reverse;

/// Supported connection string flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum KeyType {
    Outline,
    V2ray,
}

impl KeyType {
    pub const ALL: [KeyType; 2] = [KeyType::Outline, KeyType::V2ray];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Outline => "OUTLINE",
            Self::V2ray => "V2RAY",
        }
    }

    /// Case-insensitive parse of admin input.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "OUTLINE" => Some(Self::Outline),
            "V2RAY" => Some(Self::V2ray),
            _ => None,
        }
    }
}

impl std::fmt::Display for KeyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Flag persisted with a key and flipped by the admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StoredStatus {
    Active,
    Inactive,
}

impl StoredStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
        }
    }

    /// Unknown or empty values normalize to `Active`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "INACTIVE" => Self::Inactive,
            _ => Self::Active,
        }
    }

    /// Flag a toggle writes over the raw stored value: `ACTIVE` (or an empty
    /// value, which reads as `ACTIVE`) becomes `Inactive`, anything else
    /// becomes `Active`. `KeyRepo::toggle` applies the same rule in SQL.
    pub fn toggle_target(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case("ACTIVE") {
            Self::Inactive
        } else {
            Self::Active
        }
    }
}

/// Status shown to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum EffectiveStatus {
    Active,
    Inactive,
    Expired,
}

impl EffectiveStatus {
    pub const ALL: [EffectiveStatus; 3] = [Self::Active, Self::Inactive, Self::Expired];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
            Self::Expired => "EXPIRED",
        }
    }

    /// Lowercase name for CSS classes.
    pub fn css_class(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Expired => "expired",
        }
    }

    /// Parse a listing filter value.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "ACTIVE" => Some(Self::Active),
            "INACTIVE" => Some(Self::Inactive),
            "EXPIRED" => Some(Self::Expired),
            _ => None,
        }
    }
}

impl std::fmt::Display for EffectiveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Derive the effective status. Expiry always wins over the stored flag; a
/// key expiring today is still live until the date moves on.
pub fn resolve_status(expire_date: &str, stored: &str, today: NaiveDate) -> EffectiveStatus {
    if is_before_today(expire_date, today) {
        return EffectiveStatus::Expired;
    }
    match StoredStatus::parse(stored) {
        StoredStatus::Active => EffectiveStatus::Active,
        StoredStatus::Inactive => EffectiveStatus::Inactive,
    }
}

impl KeyRecord {
    pub fn effective_status(&self, today: NaiveDate) -> EffectiveStatus {
        resolve_status(&self.expire_date, &self.status, today)
    }
}

/// Sort key for listings: status first, then newest first.
pub fn listing_order(
    status: EffectiveStatus,
    created_at: DateTime<Utc>,
    id: i64,
) -> (EffectiveStatus, Reverse<DateTime<Utc>>, Reverse<i64>) {
    (status, Reverse(created_at), Reverse(id))
}
