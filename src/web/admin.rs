//! Admin surface under the configured secret path.
//!
//! Every handler first checks the path segment; a mismatch answers exactly
//! like an unrouted URL. Mutations then require a valid session token and
//! answer a bare 403 otherwise.

use crate::content::fingerprint;
use crate::db::{KeyRecord, KeyRepo, NewKey, NewKeyForm, SettingsRepo};
use crate::error::{AppError, AppResult};
use crate::layering::{
    clamp_optional, clamp_text, LabelsLayer, TemplatesLayer, UiTextLayer, UI_TEXT_SETTING,
};
use crate::lifecycle::KeyType;
use crate::panel::{
    KeyListItem, PanelData, ANNOUNCE_ENABLED_SETTING, ANNOUNCE_MD_SETTING, DEFAULT_NEW_KEY_GB,
    DEFAULT_NEW_KEY_TYPE,
};
use crate::session::SESSION_COOKIE;
use crate::web::state::{request_origin, user_agent, AppState};
use crate::web::templates::{render, AdminTemplate, SelectOption};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::cookie::{Cookie, SameSite, SignedCookieJar};
use serde::Deserialize;
use tracing::{info, warn};

/// Upper bound for stored announcement markdown, in characters.
const ANNOUNCE_MAX_CHARS: usize = 10_000;

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    #[serde(default)]
    pub err: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct AnnounceForm {
    #[serde(default)]
    pub announce_enabled: String,
    #[serde(default)]
    pub announce_md: String,
}

/// UI text editor form. Empty fields mean "not overridden".
#[derive(Debug, Default, Deserialize)]
pub struct UiTextForm {
    #[serde(default)]
    pub ui_reset: String,
    #[serde(default)]
    pub ui_back_text: String,
    #[serde(default)]
    pub ui_label_gb_short: String,
    #[serde(default)]
    pub ui_label_expire_short: String,
    #[serde(default)]
    pub ui_label_key_label: String,
    #[serde(default)]
    pub ui_label_copy_btn: String,
    #[serde(default)]
    pub ui_label_download_title: String,
    #[serde(default)]
    pub ui_tpl_gb_info: String,
    #[serde(default)]
    pub ui_tpl_expire_info: String,
}

impl UiTextForm {
    pub fn is_reset(&self) -> bool {
        self.ui_reset.trim() == "1"
    }

    pub fn into_layer(self) -> UiTextLayer {
        UiTextLayer {
            back_text: clamp_optional(&self.ui_back_text, 80),
            labels: LabelsLayer {
                gb_short: clamp_optional(&self.ui_label_gb_short, 20),
                expire_short: clamp_optional(&self.ui_label_expire_short, 20),
                key_label: clamp_optional(&self.ui_label_key_label, 30),
                copy_btn: clamp_optional(&self.ui_label_copy_btn, 30),
                download_title: clamp_optional(&self.ui_label_download_title, 60),
            },
            templates: TemplatesLayer {
                gb_info: clamp_optional(&self.ui_tpl_gb_info, 200),
                expire_info: clamp_optional(&self.ui_tpl_expire_info, 200),
            },
        }
    }
}

fn check_admin_path(state: &AppState, segment: &str) -> AppResult<()> {
    if segment.trim() == state.config.admin.path {
        Ok(())
    } else {
        Err(AppError::NotFound)
    }
}

fn require_auth(state: &AppState, jar: &SignedCookieJar, headers: &HeaderMap) -> AppResult<()> {
    if state.is_authed(jar, headers) {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

fn dashboard_redirect(state: &AppState) -> Redirect {
    Redirect::to(&format!("/{}", state.config.admin.path))
}

fn parse_id(id: &str) -> Option<i64> {
    id.trim().parse().ok()
}

fn admin_page(
    state: &AppState,
    panel: PanelData,
    login_mode: bool,
    error: String,
    keys: Vec<KeyRecord>,
) -> AdminTemplate {
    let today = state.clock.today();
    AdminTemplate {
        panel: panel.view,
        admin_path: panel.admin_path,
        login_mode,
        error,
        keys: keys.into_iter().map(|k| KeyListItem::new(k, today)).collect(),
        origin: panel.origin,
        key_types: SelectOption::list(KeyType::ALL.map(|t| t.as_str()), DEFAULT_NEW_KEY_TYPE.as_str()),
        default_gb_limit: DEFAULT_NEW_KEY_GB,
        default_expire_date: state.clock.today_iso(),
        announce_md: panel.announce_md,
        announce_enabled: panel.announce_enabled,
    }
}

/// Login form or dashboard, depending on the session
pub async fn dashboard(
    State(state): State<AppState>,
    Path(admin_path): Path<String>,
    Query(query): Query<DashboardQuery>,
    jar: SignedCookieJar,
    headers: HeaderMap,
) -> AppResult<Response> {
    check_admin_path(&state, &admin_path)?;
    let panel = PanelData::load(&state.pool, &state.config, &request_origin(&headers)).await?;

    if !state.is_authed(&jar, &headers) {
        let page = admin_page(&state, panel, true, String::new(), Vec::new());
        return Ok(render(&page)?.into_response());
    }

    let keys = KeyRepo::list_all(&state.pool).await?;
    let page = admin_page(&state, panel, false, query.err.trim().to_string(), keys);
    Ok(render(&page)?.into_response())
}

/// Check the password and issue a session cookie
pub async fn login(
    State(state): State<AppState>,
    Path(admin_path): Path<String>,
    jar: SignedCookieJar,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    check_admin_path(&state, &admin_path)?;

    let expected = &state.config.admin.password;
    if expected.is_empty() || form.password.trim() != expected.as_str() {
        warn!("Rejected admin login attempt");
        let panel = PanelData::load(&state.pool, &state.config, &request_origin(&headers)).await?;
        let page = admin_page(&state, panel, true, "Incorrect password.".to_string(), Vec::new());
        return Ok((StatusCode::UNAUTHORIZED, render(&page)?).into_response());
    }

    let token = state
        .sessions
        .mint(state.clock.now_millis(), user_agent(&headers));
    let cookie = Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::milliseconds(state.sessions.lifetime_ms()))
        .build();

    info!("Admin logged in");
    Ok((jar.add(cookie), dashboard_redirect(&state)).into_response())
}

/// Drop the session cookie
pub async fn logout(
    State(state): State<AppState>,
    Path(admin_path): Path<String>,
    jar: SignedCookieJar,
) -> AppResult<Response> {
    check_admin_path(&state, &admin_path)?;
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    Ok((jar, dashboard_redirect(&state)).into_response())
}

/// Create a key from the dashboard form
pub async fn add_key(
    State(state): State<AppState>,
    Path(admin_path): Path<String>,
    jar: SignedCookieJar,
    headers: HeaderMap,
    Form(form): Form<NewKeyForm>,
) -> AppResult<Redirect> {
    check_admin_path(&state, &admin_path)?;
    require_auth(&state, &jar, &headers)?;

    let new_key = match NewKey::try_from(form) {
        Ok(key) => key,
        Err(e) => {
            info!("Rejected new key: {}", e);
            return Ok(Redirect::to(&format!(
                "/{}?err={}",
                state.config.admin.path,
                e.code()
            )));
        }
    };

    let key = KeyRepo::insert(&state.pool, &new_key).await?;
    info!("Added key {} ({}, {})", key.id, key.key_type, key.region_name);
    Ok(dashboard_redirect(&state))
}

/// Remove a key
pub async fn delete_key(
    State(state): State<AppState>,
    Path((admin_path, id)): Path<(String, String)>,
    jar: SignedCookieJar,
    headers: HeaderMap,
) -> AppResult<Redirect> {
    check_admin_path(&state, &admin_path)?;
    require_auth(&state, &jar, &headers)?;

    if let Some(id) = parse_id(&id) {
        if KeyRepo::delete(&state.pool, id).await? {
            info!("Deleted key {}", id);
        }
    }
    Ok(dashboard_redirect(&state))
}

/// Flip a key's stored status flag
pub async fn toggle_key(
    State(state): State<AppState>,
    Path((admin_path, id)): Path<(String, String)>,
    jar: SignedCookieJar,
    headers: HeaderMap,
) -> AppResult<Redirect> {
    check_admin_path(&state, &admin_path)?;
    require_auth(&state, &jar, &headers)?;

    if let Some(id) = parse_id(&id) {
        if let Some(next) = KeyRepo::toggle(&state.pool, id).await? {
            info!("Key {} is now {}", id, next.as_str());
        }
    }
    Ok(dashboard_redirect(&state))
}

/// Save the announcement markdown and switch
pub async fn save_announcement(
    State(state): State<AppState>,
    Path(admin_path): Path<String>,
    jar: SignedCookieJar,
    headers: HeaderMap,
    Form(form): Form<AnnounceForm>,
) -> AppResult<Redirect> {
    check_admin_path(&state, &admin_path)?;
    require_auth(&state, &jar, &headers)?;

    let enabled = if form.announce_enabled.trim() == "1" { "1" } else { "0" };
    let markdown = clamp_text(&form.announce_md, ANNOUNCE_MAX_CHARS);

    SettingsRepo::set(&state.pool, ANNOUNCE_ENABLED_SETTING, enabled).await?;
    SettingsRepo::set(&state.pool, ANNOUNCE_MD_SETTING, &markdown).await?;

    info!("Announcement saved (enabled={}, version={})", enabled, fingerprint(&markdown));
    Ok(dashboard_redirect(&state))
}

/// Save or reset the UI text override
pub async fn save_ui_text(
    State(state): State<AppState>,
    Path(admin_path): Path<String>,
    jar: SignedCookieJar,
    headers: HeaderMap,
    Form(form): Form<UiTextForm>,
) -> AppResult<Redirect> {
    check_admin_path(&state, &admin_path)?;
    require_auth(&state, &jar, &headers)?;

    if form.is_reset() {
        SettingsRepo::set(&state.pool, UI_TEXT_SETTING, "").await?;
        info!("UI text override reset");
        return Ok(dashboard_redirect(&state));
    }

    let layer = form.into_layer();
    SettingsRepo::set(&state.pool, UI_TEXT_SETTING, &layer.to_setting()).await?;
    info!("UI text override saved");
    Ok(dashboard_redirect(&state))
}
