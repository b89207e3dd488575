//! Layered UI text resolution.
//!
//! Three layers, lowest to highest precedence:
//!
//! 1. built-in defaults ([`UiText::default`])
//! 2. deployment config (`[panel.ui_text]`, loaded once at startup)
//! 3. the admin override persisted under [`UI_TEXT_SETTING`], read per request
//!
//! Higher layers win field by field. `labels` and `templates` are merged one
//! field at a time, so overriding a single label keeps every other label from
//! the lower layers.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Settings key holding the persisted override as JSON.
pub const UI_TEXT_SETTING: &str = "ui_text_json";

/// Resolved short labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Labels {
    pub gb_short: String,
    pub expire_short: String,
    pub key_label: String,
    pub copy_btn: String,
    pub download_title: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            gb_short: "GB".to_string(),
            expire_short: "Expire".to_string(),
            key_label: "Key".to_string(),
            copy_btn: "Copy".to_string(),
            download_title: "Download Apps".to_string(),
        }
    }
}

/// Resolved sentence templates with `{name}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Templates {
    /// Uses `{gb}`.
    pub gb_info: String,
    /// Uses `{date}`.
    pub expire_info: String,
}

impl Default for Templates {
    fn default() -> Self {
        Self {
            gb_info: "ဒီ Key က {gb} GB သုံးနိုင်ပါတယ်။".to_string(),
            expire_info: "Key သက်တမ်း ကုန်ဆုံးရက်က {date} ပါ။".to_string(),
        }
    }
}

/// Effective UI text for the public pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UiText {
    pub back_text: String,
    pub labels: Labels,
    pub templates: Templates,
}

impl Default for UiText {
    fn default() -> Self {
        Self {
            back_text: "← Back".to_string(),
            labels: Labels::default(),
            templates: Templates::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelsLayer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gb_short: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expire_short: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy_btn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplatesLayer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gb_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expire_info: Option<String>,
}

/// One partial layer. `None` means "defer to the layer below".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiTextLayer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub back_text: Option<String>,
    #[serde(default)]
    pub labels: LabelsLayer,
    #[serde(default)]
    pub templates: TemplatesLayer,
}

impl UiTextLayer {
    /// Parse a persisted override. Empty or malformed input yields an empty
    /// layer so resolution falls through to the lower layers.
    pub fn from_setting(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return Self::default();
        }
        match serde_json::from_str(raw) {
            Ok(layer) => layer,
            Err(e) => {
                warn!("Ignoring malformed UI text override: {}", e);
                Self::default()
            }
        }
    }

    /// Serialize for the settings store.
    pub fn to_setting(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

fn overlay(target: &mut String, value: &Option<String>) {
    if let Some(v) = value {
        target.clone_from(v);
    }
}

impl Labels {
    fn apply(&mut self, layer: &LabelsLayer) {
        overlay(&mut self.gb_short, &layer.gb_short);
        overlay(&mut self.expire_short, &layer.expire_short);
        overlay(&mut self.key_label, &layer.key_label);
        overlay(&mut self.copy_btn, &layer.copy_btn);
        overlay(&mut self.download_title, &layer.download_title);
    }
}

impl Templates {
    fn apply(&mut self, layer: &TemplatesLayer) {
        overlay(&mut self.gb_info, &layer.gb_info);
        overlay(&mut self.expire_info, &layer.expire_info);
    }
}

impl UiText {
    /// Apply one layer on top of the current values.
    pub fn apply(&mut self, layer: &UiTextLayer) {
        overlay(&mut self.back_text, &layer.back_text);
        self.labels.apply(&layer.labels);
        self.templates.apply(&layer.templates);
    }

    /// Resolve built-in defaults, then `deployment`, then `persisted`.
    pub fn resolve(deployment: &UiTextLayer, persisted: &UiTextLayer) -> Self {
        let mut text = Self::default();
        text.apply(deployment);
        text.apply(persisted);
        text
    }
}

/// Trim and truncate request text to at most `max` characters.
pub fn clamp_text(input: &str, max: usize) -> String {
    input.trim().chars().take(max).collect()
}

/// Clamp, then turn an empty result into "not set".
pub fn clamp_optional(input: &str, max: usize) -> Option<String> {
    Some(clamp_text(input, max)).filter(|s| !s.is_empty())
}

/// Replace `{name}` tokens with the matching value. Unknown names become
/// empty strings; braces that do not enclose a word are copied verbatim.
pub fn apply_template(template: &str, vars: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template.trim();

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let name_len = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(after.len());

        if name_len > 0 && after[name_len..].starts_with('}') {
            let name = &after[..name_len];
            if let Some((_, value)) = vars.iter().find(|(k, _)| *k == name) {
                out.push_str(value);
            }
            rest = &after[name_len + 1..];
        } else {
            out.push('{');
            rest = after;
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(gb_short: Option<&str>, expire_short: Option<&str>) -> UiTextLayer {
        UiTextLayer {
            labels: LabelsLayer {
                gb_short: gb_short.map(String::from),
                expire_short: expire_short.map(String::from),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_only() {
        let text = UiText::resolve(&UiTextLayer::default(), &UiTextLayer::default());
        assert_eq!(text, UiText::default());
        assert_eq!(text.labels.copy_btn, "Copy");
    }

    #[test]
    fn test_precedence_per_field() {
        // defaults {gb_short: "GB", expire_short: "Expire"},
        // deployment {expire_short: "Until"}, persisted {gb_short: "Gigs"}
        let deployment = labels(None, Some("Until"));
        let persisted = labels(Some("Gigs"), None);

        let text = UiText::resolve(&deployment, &persisted);
        assert_eq!(text.labels.gb_short, "Gigs");
        assert_eq!(text.labels.expire_short, "Until");
    }

    #[test]
    fn test_single_label_keeps_siblings() {
        let persisted = labels(Some("Gigs"), None);
        let text = UiText::resolve(&UiTextLayer::default(), &persisted);
        assert_eq!(text.labels.gb_short, "Gigs");
        assert_eq!(text.labels.key_label, "Key");
        assert_eq!(text.labels.download_title, "Download Apps");
        assert_eq!(text.templates, Templates::default());
        assert_eq!(text.back_text, "← Back");
    }

    #[test]
    fn test_reset_restores_lower_layers() {
        let deployment = UiTextLayer {
            back_text: Some("Back home".to_string()),
            ..labels(None, Some("Until"))
        };
        let persisted = UiTextLayer {
            back_text: Some("Zurück".to_string()),
            ..labels(Some("Gigs"), Some("Bis"))
        };
        let overridden = UiText::resolve(&deployment, &persisted);
        assert_eq!(overridden.back_text, "Zurück");

        let reset = UiText::resolve(&deployment, &UiTextLayer::from_setting(""));
        assert_eq!(reset.back_text, "Back home");
        assert_eq!(reset.labels.expire_short, "Until");
        assert_eq!(reset.labels.gb_short, "GB");
    }

    #[test]
    fn test_setting_round_trip() {
        let layer = UiTextLayer {
            back_text: Some("Back".to_string()),
            ..labels(Some("Gigs"), None)
        };
        assert_eq!(UiTextLayer::from_setting(&layer.to_setting()), layer);
    }

    #[test]
    fn test_partial_json_override() {
        let layer = UiTextLayer::from_setting(r#"{"templates":{"gb_info":"{gb} GB left"}}"#);
        let text = UiText::resolve(&UiTextLayer::default(), &layer);
        assert_eq!(text.templates.gb_info, "{gb} GB left");
        assert_eq!(text.templates.expire_info, Templates::default().expire_info);
    }

    #[test]
    fn test_malformed_override_falls_back() {
        assert_eq!(UiTextLayer::from_setting("{not json"), UiTextLayer::default());
        assert_eq!(UiTextLayer::from_setting("42"), UiTextLayer::default());
        assert_eq!(UiTextLayer::from_setting("   "), UiTextLayer::default());
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let layer = UiTextLayer::from_setting(r#"{"back_text":"B","colour":"red"}"#);
        assert_eq!(layer.back_text.as_deref(), Some("B"));
    }

    #[test]
    fn test_clamp_text() {
        assert_eq!(clamp_text("  hello  ", 10), "hello");
        assert_eq!(clamp_text("abcdef", 3), "abc");
        assert_eq!(clamp_text("ကခဂဃ", 2), "ကခ");
        assert_eq!(clamp_optional("   ", 5), None);
        assert_eq!(clamp_optional(" x ", 5).as_deref(), Some("x"));
    }

    #[test]
    fn test_apply_template() {
        let vars = [("gb", "2048".to_string()), ("date", "25/03/2026".to_string())];
        assert_eq!(apply_template("{gb} GB until {date}", &vars), "2048 GB until 25/03/2026");
        assert_eq!(apply_template("{gb}{gb}", &vars), "20482048");
        assert_eq!(apply_template("missing: [{nope}]", &vars), "missing: []");
        assert_eq!(apply_template("literal { and {} and {a b}", &vars), "literal { and {} and {a b}");
        assert_eq!(apply_template("trailing {gb", &vars), "trailing {gb");
        assert_eq!(apply_template("", &vars), "");
        assert_eq!(apply_template("ဒီ Key က {gb} GB", &vars), "ဒီ Key က 2048 GB");
    }
}
