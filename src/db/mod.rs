pub mod models;
pub mod queries;

pub use models::{KeyFilter, KeyRecord, NewKey, NewKeyForm, SettingEntry};
pub use queries::{init_db, DbPool, KeyRepo, SettingsRepo};
