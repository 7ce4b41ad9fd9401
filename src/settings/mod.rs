pub mod store;

pub use store::SettingsStore;

use serde::Serialize;
use std::collections::HashMap;

// Persisted option names.
pub const OPTION_SHOW_IN_TOOLBAR: &str = "show_in_toolbar";
pub const OPTION_REFRESH_INTERVAL: &str = "refresh_interval_seconds";

// Admin settings form field names.
pub const FIELD_SAVE_MARKER: &str = "force-refresh-admin-options-save";
pub const FIELD_SHOW_IN_TOOLBAR: &str = "show-in-wp-admin-bar";
pub const FIELD_REFRESH_INTERVAL: &str = "refresh-interval";

pub const ALLOWED_REFRESH_INTERVALS: [u32; 4] = [30, 60, 90, 120];

/// The two plugin options, typed. Strings exist only at the option-store
/// edge: booleans persist as `"true"`/`"false"`, intervals as numeric
/// strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Settings {
    pub show_in_toolbar: bool,
    pub refresh_interval_seconds: u32,
}

/// Reads both options with their fallback defaults: toolbar visibility
/// defaults to off, the interval to the configured default.
pub async fn load_settings(store: &SettingsStore, default_interval: u32) -> Settings {
    let show_in_toolbar = store
        .get_option(OPTION_SHOW_IN_TOOLBAR)
        .await
        .ok()
        .flatten()
        .map(|value| value == "true")
        .unwrap_or(false);

    let refresh_interval_seconds = store
        .get_option(OPTION_REFRESH_INTERVAL)
        .await
        .ok()
        .flatten()
        .and_then(|value| value.parse::<u32>().ok())
        .unwrap_or(default_interval);

    Settings {
        show_in_toolbar,
        refresh_interval_seconds,
    }
}

/// Applies an admin settings submission. A no-op unless the form carries the
/// save marker set to the literal `"true"`, so a stray resubmission never
/// mutates state. The toolbar flag is always written (an unchecked box comes
/// through absent and persists as `"false"`); the interval is written only
/// when present and non-empty.
///
/// Returns whether a save actually ran.
pub async fn save_settings(
    store: &SettingsStore,
    form: &HashMap<String, String>,
) -> anyhow::Result<bool> {
    if form.get(FIELD_SAVE_MARKER).map(String::as_str) != Some("true") {
        return Ok(false);
    }

    let show_in_toolbar = form
        .get(FIELD_SHOW_IN_TOOLBAR)
        .map(|raw| sanitize_field(raw) == "true")
        .unwrap_or(false);
    store
        .set_option(
            OPTION_SHOW_IN_TOOLBAR,
            if show_in_toolbar { "true" } else { "false" },
        )
        .await?;

    if let Some(raw) = form.get(FIELD_REFRESH_INTERVAL) {
        let interval = sanitize_field(raw);
        if !interval.is_empty() {
            store.set_option(OPTION_REFRESH_INTERVAL, &interval).await?;
        }
    }

    Ok(true)
}

/// Strips HTML tags and control characters and collapses whitespace.
pub fn sanitize_field(raw: &str) -> String {
    let mut stripped = String::with_capacity(raw.len());
    let mut in_tag = false;
    for ch in raw.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            c if !in_tag && !c.is_control() => stripped.push(c),
            _ => {}
        }
    }
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_store() -> SettingsStore {
        // A single connection keeps every query on the same in-memory db.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SettingsStore::new(pool);
        store.bootstrap().await.unwrap();
        store
    }

    fn form(fields: &[(&str, &str)]) -> HashMap<String, String> {
        fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_load_settings_falls_back_to_defaults() {
        let store = test_store().await;
        let settings = load_settings(&store, 60).await;
        assert!(!settings.show_in_toolbar);
        assert_eq!(settings.refresh_interval_seconds, 60);
    }

    #[tokio::test]
    async fn test_save_without_marker_is_a_no_op() {
        let store = test_store().await;
        store.set_option(OPTION_SHOW_IN_TOOLBAR, "true").await.unwrap();
        store.set_option(OPTION_REFRESH_INTERVAL, "90").await.unwrap();

        let saved = save_settings(
            &store,
            &form(&[(FIELD_SHOW_IN_TOOLBAR, "false"), (FIELD_REFRESH_INTERVAL, "30")]),
        )
        .await
        .unwrap();

        assert!(!saved);
        let settings = load_settings(&store, 60).await;
        assert!(settings.show_in_toolbar);
        assert_eq!(settings.refresh_interval_seconds, 90);
    }

    #[tokio::test]
    async fn test_missing_interval_field_leaves_prior_value() {
        let store = test_store().await;
        store.set_option(OPTION_REFRESH_INTERVAL, "120").await.unwrap();

        let saved = save_settings(
            &store,
            &form(&[(FIELD_SAVE_MARKER, "true"), (FIELD_SHOW_IN_TOOLBAR, "true")]),
        )
        .await
        .unwrap();

        assert!(saved);
        let settings = load_settings(&store, 60).await;
        assert!(settings.show_in_toolbar);
        assert_eq!(settings.refresh_interval_seconds, 120);
    }

    #[tokio::test]
    async fn test_missing_toolbar_field_resets_to_false() {
        let store = test_store().await;
        store.set_option(OPTION_SHOW_IN_TOOLBAR, "true").await.unwrap();

        save_settings(
            &store,
            &form(&[(FIELD_SAVE_MARKER, "true"), (FIELD_REFRESH_INTERVAL, "30")]),
        )
        .await
        .unwrap();

        let settings = load_settings(&store, 60).await;
        assert!(!settings.show_in_toolbar);
        assert_eq!(settings.refresh_interval_seconds, 30);
    }

    #[tokio::test]
    async fn test_empty_interval_field_leaves_prior_value() {
        let store = test_store().await;
        store.set_option(OPTION_REFRESH_INTERVAL, "90").await.unwrap();

        save_settings(
            &store,
            &form(&[(FIELD_SAVE_MARKER, "true"), (FIELD_REFRESH_INTERVAL, "  ")]),
        )
        .await
        .unwrap();

        let settings = load_settings(&store, 60).await;
        assert_eq!(settings.refresh_interval_seconds, 90);
    }

    #[tokio::test]
    async fn test_fields_are_sanitized_before_persisting() {
        let store = test_store().await;

        save_settings(
            &store,
            &form(&[
                (FIELD_SAVE_MARKER, "true"),
                (FIELD_SHOW_IN_TOOLBAR, " <b>true</b> "),
                (FIELD_REFRESH_INTERVAL, " <script>30</script> "),
            ]),
        )
        .await
        .unwrap();

        assert_eq!(
            store.get_option(OPTION_SHOW_IN_TOOLBAR).await.unwrap(),
            Some("true".to_string())
        );
        assert_eq!(
            store.get_option(OPTION_REFRESH_INTERVAL).await.unwrap(),
            Some("30".to_string())
        );
    }

    #[test]
    fn test_sanitize_field() {
        assert_eq!(sanitize_field("  60  "), "60");
        assert_eq!(sanitize_field("<em>true</em>"), "true");
        assert_eq!(sanitize_field("a\tb\nc"), "a b c");
        assert_eq!(sanitize_field("<div class=\"x\">"), "");
    }
}
