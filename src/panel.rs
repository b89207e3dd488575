//! View-models for the public and admin pages.
//!
//! Everything here is rebuilt per request from the deployment config, the
//! settings store and the current date.

use crate::clock::format_date_human;
use crate::config::AppConfig;
use crate::content::Announcement;
use crate::db::{DbPool, KeyRecord, SettingsRepo};
use crate::error::AppResult;
use crate::layering::{apply_template, UiText, UiTextLayer, UI_TEXT_SETTING};
use crate::lifecycle::{listing_order, EffectiveStatus, KeyType};
use chrono::NaiveDate;
use serde::Serialize;

/// Settings key for the announcement markdown.
pub const ANNOUNCE_MD_SETTING: &str = "announce_md";
/// Settings key for the announcement switch (`"1"` / `"0"`).
pub const ANNOUNCE_ENABLED_SETTING: &str = "announce_enabled";

/// Defaults pre-filled in the dashboard's add form.
pub const DEFAULT_NEW_KEY_TYPE: KeyType = KeyType::V2ray;
pub const DEFAULT_NEW_KEY_GB: i64 = 2048;

/// Values read from the settings store for one request.
#[derive(Debug, Clone, Default)]
pub struct StoredSettings {
    pub announce_md: String,
    pub announce_enabled: bool,
    pub ui_text_json: String,
}

impl StoredSettings {
    pub async fn load(pool: &DbPool) -> AppResult<Self> {
        Ok(Self {
            announce_md: SettingsRepo::get(pool, ANNOUNCE_MD_SETTING, "").await?,
            announce_enabled: SettingsRepo::get(pool, ANNOUNCE_ENABLED_SETTING, "0").await? == "1",
            ui_text_json: SettingsRepo::get(pool, UI_TEXT_SETTING, "").await?,
        })
    }
}

/// Panel-wide values every page renders.
#[derive(Debug, Clone, Serialize)]
pub struct PanelView {
    pub brand_name: String,
    pub announcement: String,
    pub telegram_admin_text: String,
    pub telegram_admin_url: String,
    pub telegram_channel_text: String,
    pub telegram_channel_url: String,
    pub announce_html: String,
    pub announce_version: String,
    pub ui_text: UiText,
}

/// [`PanelView`] plus what only the admin pages need.
#[derive(Debug, Clone)]
pub struct PanelData {
    pub view: PanelView,
    pub admin_path: String,
    /// External origin, e.g. `https://keys.example.com`
    pub origin: String,
    pub announce_md: String,
    pub announce_enabled: bool,
}

impl PanelData {
    /// Merge deployment config with the stored overrides. `request_origin`
    /// is the scheme and host the client used; a configured `base_url` wins.
    pub fn assemble(config: &AppConfig, stored: &StoredSettings, request_origin: &str) -> Self {
        let panel = &config.panel;
        let announcement = Announcement::resolve(&stored.announce_md, stored.announce_enabled);
        let ui_text = UiText::resolve(&panel.ui_text, &UiTextLayer::from_setting(&stored.ui_text_json));

        let origin = if !config.web.base_url.is_empty() {
            config.web.base_url.clone()
        } else {
            request_origin.to_string()
        };

        Self {
            view: PanelView {
                brand_name: panel.brand_name.clone(),
                announcement: panel.announcement.trim().to_string(),
                telegram_admin_text: panel.telegram_admin_text.trim().to_string(),
                telegram_admin_url: panel.telegram_admin_url.trim().to_string(),
                telegram_channel_text: panel.telegram_channel_text.trim().to_string(),
                telegram_channel_url: panel.telegram_channel_url.trim().to_string(),
                announce_html: announcement.html,
                announce_version: announcement.version,
                ui_text,
            },
            admin_path: config.admin.path.clone(),
            origin,
            announce_md: stored.announce_md.clone(),
            announce_enabled: stored.announce_enabled,
        }
    }

    /// Read the settings store and assemble.
    pub async fn load(pool: &DbPool, config: &AppConfig, request_origin: &str) -> AppResult<Self> {
        let stored = StoredSettings::load(pool).await?;
        Ok(Self::assemble(config, &stored, request_origin))
    }
}

/// One row of a key listing.
#[derive(Debug, Clone, Serialize)]
pub struct KeyListItem {
    pub record: KeyRecord,
    pub status: EffectiveStatus,
    pub link: String,
}

impl KeyListItem {
    pub fn new(record: KeyRecord, today: NaiveDate) -> Self {
        Self {
            status: record.effective_status(today),
            link: format!("/k/{}", record.id),
            record,
        }
    }
}

/// Public listing query (`?q=&type=&status=`).
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default, rename = "type")]
    pub key_type: String,
    #[serde(default)]
    pub status: String,
}

/// Filtered, ordered public listing.
#[derive(Debug, Clone)]
pub struct KeyListing {
    pub items: Vec<KeyListItem>,
    /// Distinct types among the rows before the status filter, sorted
    pub types: Vec<String>,
}

impl KeyListing {
    /// `rows` are already filtered by type and free text; this applies the
    /// effective-status filter and the status-then-newest ordering.
    pub fn build(rows: Vec<KeyRecord>, status_filter: &str, today: NaiveDate) -> Self {
        let mut types: Vec<String> = rows.iter().map(|r| r.key_type.clone()).collect();
        types.sort();
        types.dedup();

        let wanted = EffectiveStatus::parse(status_filter);
        let filter_active = !status_filter.trim().is_empty();

        let mut items: Vec<KeyListItem> = rows
            .into_iter()
            .map(|r| KeyListItem::new(r, today))
            .filter(|item| !filter_active || Some(item.status) == wanted)
            .collect();
        items.sort_by_key(|item| listing_order(item.status, item.record.created_at, item.record.id));

        Self { items, types }
    }
}

/// Client download link shown on the detail page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadApp {
    pub name: &'static str,
    pub sub: &'static str,
    pub icon: &'static str,
    pub url: &'static str,
}

const OUTLINE_APPS: [DownloadApp; 4] = [
    DownloadApp { name: "Windows", sub: "Outline Client", icon: "windows", url: "https://getoutline.org/" },
    DownloadApp { name: "macOS", sub: "Outline Client", icon: "apple", url: "https://getoutline.org/" },
    DownloadApp {
        name: "Android",
        sub: "Outline App",
        icon: "android",
        url: "https://play.google.com/store/apps/details?id=org.outline.android.client",
    },
    DownloadApp {
        name: "iPhone / iPad",
        sub: "Outline App",
        icon: "apple",
        url: "https://apps.apple.com/app/outline-app/id1356177741",
    },
];

const V2RAY_APPS: [DownloadApp; 4] = [
    DownloadApp { name: "Windows", sub: "V2Ray Client", icon: "windows", url: "https://github.com/2dust/v2rayN" },
    DownloadApp { name: "macOS", sub: "V2Ray Client", icon: "apple", url: "https://github.com/2dust/v2rayN" },
    DownloadApp { name: "Android", sub: "v2rayNG", icon: "android", url: "https://github.com/2dust/v2rayNG" },
    DownloadApp { name: "iPhone / iPad", sub: "Client (iOS)", icon: "apple", url: "https://apps.apple.com/" },
];

/// Clients for a stored type string. Anything that is not Outline gets the
/// V2Ray list.
pub fn download_apps(key_type: &str) -> &'static [DownloadApp] {
    if key_type.to_uppercase().contains(KeyType::Outline.as_str()) {
        &OUTLINE_APPS
    } else {
        &V2RAY_APPS
    }
}

/// Detail page model.
#[derive(Debug, Clone, Serialize)]
pub struct KeyDetail {
    pub record: KeyRecord,
    pub status: EffectiveStatus,
    pub expire_human: String,
    pub gb_info_text: String,
    pub expire_info_text: String,
    pub apps: &'static [DownloadApp],
}

impl KeyDetail {
    pub fn new(record: KeyRecord, ui_text: &UiText, today: NaiveDate) -> Self {
        let expire_human = format_date_human(&record.expire_date);
        let date = if !expire_human.is_empty() {
            expire_human.clone()
        } else {
            "-".to_string()
        };

        Self {
            status: record.effective_status(today),
            gb_info_text: apply_template(&ui_text.templates.gb_info, &[("gb", record.gb_limit.to_string())]),
            expire_info_text: apply_template(&ui_text.templates.expire_info, &[("date", date)]),
            apps: download_apps(&record.key_type),
            expire_human,
            record,
        }
    }
}
