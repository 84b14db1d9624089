//! Localized strings used in notification content.
//!
//! The pipeline only needs a handful of keys. Lookups never fail: an unknown
//! locale falls back to the default locale and an unknown key renders as the
//! key itself.

use std::collections::HashMap;

/// Key for the label prefixed to web notification titles
pub const KEY_NOTIFICATION_POST: &str = "notification.post";
/// Key for the "view it" link text in emails
pub const KEY_EMAIL_SUBSCRIPTION_VIEW: &str = "email.subscription.view";
/// Key for the "change your preferences" link text in emails
pub const KEY_EMAIL_SUBSCRIPTION_CHANGE: &str = "email.subscription.change";

/// Resolves a message key into the string for a locale
pub trait Localizer: Send + Sync {
    fn translate(&self, locale: &str, key: &str) -> String;
}

/// In-memory translation catalog
#[derive(Debug, Clone)]
pub struct Catalog {
    default_locale: String,
    messages: HashMap<String, HashMap<String, String>>,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new(default_locale: impl Into<String>) -> Self {
        Self {
            default_locale: default_locale.into(),
            messages: HashMap::new(),
        }
    }

    /// Catalog preloaded with the strings shipped with the service
    pub fn builtin(default_locale: impl Into<String>) -> Self {
        Self::new(default_locale)
            .with_messages(
                "en",
                [
                    (KEY_NOTIFICATION_POST, "New Post"),
                    (KEY_EMAIL_SUBSCRIPTION_VIEW, "View it on your browser"),
                    (
                        KEY_EMAIL_SUBSCRIPTION_CHANGE,
                        "change your notification preferences",
                    ),
                ],
            )
            .with_messages(
                "pt-BR",
                [
                    (KEY_NOTIFICATION_POST, "Nova Postagem"),
                    (KEY_EMAIL_SUBSCRIPTION_VIEW, "Veja no seu navegador"),
                    (
                        KEY_EMAIL_SUBSCRIPTION_CHANGE,
                        "altere suas preferências de notificação",
                    ),
                ],
            )
    }

    /// Add or replace messages for a locale
    pub fn with_messages<K, V>(
        mut self,
        locale: &str,
        messages: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let entry = self.messages.entry(locale.to_string()).or_default();
        for (key, value) in messages {
            entry.insert(key.into(), value.into());
        }
        self
    }

    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    pub fn locales(&self) -> impl Iterator<Item = &str> {
        self.messages.keys().map(String::as_str)
    }

    fn lookup(&self, locale: &str, key: &str) -> Option<&str> {
        self.messages
            .get(locale)
            .and_then(|m| m.get(key))
            .map(String::as_str)
    }
}

impl Localizer for Catalog {
    fn translate(&self, locale: &str, key: &str) -> String {
        self.lookup(locale, key)
            .or_else(|| self.lookup(&self.default_locale, key))
            .unwrap_or(key)
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_known_locale() {
        let catalog = Catalog::builtin("en");
        assert_eq!(catalog.translate("en", KEY_NOTIFICATION_POST), "New Post");
        assert_eq!(
            catalog.translate("pt-BR", KEY_NOTIFICATION_POST),
            "Nova Postagem"
        );
    }

    #[test]
    fn test_unknown_locale_falls_back_to_default() {
        let catalog = Catalog::builtin("en");
        assert_eq!(
            catalog.translate("de", KEY_EMAIL_SUBSCRIPTION_VIEW),
            "View it on your browser"
        );
    }

    #[test]
    fn test_unknown_key_renders_as_key() {
        let catalog = Catalog::builtin("en");
        assert_eq!(catalog.translate("en", "email.unknown"), "email.unknown");
    }

    #[test]
    fn test_with_messages_overrides_existing() {
        let catalog = Catalog::builtin("en").with_messages("en", [(KEY_NOTIFICATION_POST, "Idea")]);
        assert_eq!(catalog.translate("en", KEY_NOTIFICATION_POST), "Idea");
        assert_eq!(catalog.locales().count(), 2);
    }
}
