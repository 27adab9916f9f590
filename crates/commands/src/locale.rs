//! Localized reply strings, one JSON file per locale.

use std::{collections::HashMap, path::Path};

use {serde_json::Value, tracing::debug};

use crate::descriptor::json_files;

/// Locale code → (key → text). Read-only once loaded.
#[derive(Debug, Clone, Default)]
pub struct LocaleBundle {
    default_locale: String,
    locales: HashMap<String, HashMap<String, String>>,
}

impl LocaleBundle {
    pub fn new(default_locale: impl Into<String>) -> Self {
        Self {
            default_locale: default_locale.into(),
            locales: HashMap::new(),
        }
    }

    /// Load `<dir>/<code>.json` files.
    ///
    /// Never fails: a missing directory yields an empty bundle and unreadable
    /// or malformed files are skipped. Non-string values are ignored.
    pub fn load(dir: &Path, default_locale: impl Into<String>) -> Self {
        let mut bundle = Self::new(default_locale);
        if !dir.is_dir() {
            debug!(dir = %dir.display(), "locales directory not found");
            return bundle;
        }
        let files = match json_files(dir) {
            Ok(files) => files,
            Err(e) => {
                debug!(dir = %dir.display(), error = %e, "cannot list locales");
                return bundle;
            },
        };

        for path in files {
            let Some(code) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let parsed = std::fs::read(&path)
                .map_err(|e| e.to_string())
                .and_then(|raw| serde_json::from_slice::<Value>(&raw).map_err(|e| e.to_string()));
            match parsed {
                Ok(Value::Object(map)) => {
                    let strings = map
                        .into_iter()
                        .filter_map(|(k, v)| match v {
                            Value::String(s) => Some((k, s)),
                            _ => None,
                        })
                        .collect();
                    bundle.locales.insert(code.to_string(), strings);
                },
                Ok(_) => debug!(path = %path.display(), "locale file is not an object, skipping"),
                Err(error) => debug!(path = %path.display(), %error, "skipping locale file"),
            }
        }

        debug!(count = bundle.locales.len(), "locales loaded");
        bundle
    }

    /// Add or replace one locale's strings.
    pub fn with_locale<K, V>(mut self, code: &str, entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.locales.insert(
            code.to_string(),
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    pub fn is_empty(&self) -> bool {
        self.locales.is_empty()
    }

    pub fn len(&self) -> usize {
        self.locales.len()
    }

    /// Text for `key`: the requested locale, then the default locale, then
    /// `fallback`.
    pub fn text(&self, locale: Option<&str>, key: &str, fallback: &str) -> String {
        locale
            .and_then(|code| self.lookup(code, key))
            .or_else(|| self.lookup(&self.default_locale, key))
            .unwrap_or(fallback)
            .to_string()
    }

    fn lookup(&self, code: &str, key: &str) -> Option<&str> {
        self.locales.get(code)?.get(key).map(String::as_str)
    }
}

/// Replace `{name}` placeholders in `template`.
pub fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |text, (name, value)| {
        text.replace(&format!("{{{name}}}"), value)
    })
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    fn bundle() -> LocaleBundle {
        LocaleBundle::new("en-US")
            .with_locale("en-US", [("help_text", "Help!"), ("only_en", "English")])
            .with_locale("fr", [("help_text", "Aide !")])
    }

    #[rstest]
    #[case::requested(Some("fr"), "help_text", "Aide !")]
    #[case::default_locale(Some("fr"), "only_en", "English")]
    #[case::unknown_locale(Some("de"), "help_text", "Help!")]
    #[case::no_locale(None, "help_text", "Help!")]
    #[case::literal(Some("fr"), "missing", "fallback")]
    fn lookup_falls_back(#[case] locale: Option<&str>, #[case] key: &str, #[case] want: &str) {
        assert_eq!(bundle().text(locale, key, "fallback"), want);
    }

    #[test]
    fn empty_bundle_uses_literal() {
        let bundle = LocaleBundle::new("en-US");
        assert_eq!(
            bundle.text(Some("en-US"), "help_text", "No help available"),
            "No help available"
        );
    }

    #[test]
    fn load_skips_bad_files() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("en-US.json"), r#"{"help_text": "Hi", "n": 3}"#).unwrap();
        std::fs::write(tmp.path().join("fr.json"), "{ broken").unwrap();
        std::fs::write(tmp.path().join("de.json"), "[1, 2]").unwrap();

        let bundle = LocaleBundle::load(tmp.path(), "en-US");
        assert_eq!(bundle.len(), 1);
        assert_eq!(bundle.text(Some("fr"), "help_text", "x"), "Hi");
        assert_eq!(bundle.text(None, "n", "x"), "x");
    }

    #[test]
    fn load_missing_dir_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(LocaleBundle::load(&tmp.path().join("locales"), "en-US").is_empty());
    }

    #[test]
    fn fill_replaces_placeholders() {
        assert_eq!(
            fill("Role {role} added to {role}s in {guild}", &[
                ("role", "<@&1>"),
                ("guild", "g")
            ]),
            "Role <@&1> added to <@&1>s in g"
        );
        assert_eq!(fill("no vars", &[("x", "y")]), "no vars");
    }
}
