use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::settings::SettingsStore;

pub const OPTION_SITE_SIGNAL: &str = "site_refresh_signal";

/// A recorded refresh request. Clients poll the status endpoint and reload
/// when the id they last saw changes. Last-write-wins; there is no history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshSignal {
    pub id: Uuid,
    pub requested_at: DateTime<Utc>,
}

impl RefreshSignal {
    fn new() -> Self {
        RefreshSignal {
            id: Uuid::new_v4(),
            requested_at: Utc::now(),
        }
    }
}

pub fn page_signal_option(page_id: i64) -> String {
    format!("page_refresh_signal:{}", page_id)
}

pub async fn record_site_refresh(store: &SettingsStore) -> anyhow::Result<RefreshSignal> {
    let signal = RefreshSignal::new();
    store
        .set_option(OPTION_SITE_SIGNAL, &serde_json::to_string(&signal)?)
        .await?;
    Ok(signal)
}

pub async fn record_page_refresh(
    store: &SettingsStore,
    page_id: i64,
) -> anyhow::Result<RefreshSignal> {
    let signal = RefreshSignal::new();
    store
        .set_option(&page_signal_option(page_id), &serde_json::to_string(&signal)?)
        .await?;
    Ok(signal)
}

pub async fn site_signal(store: &SettingsStore) -> anyhow::Result<Option<RefreshSignal>> {
    read_signal(store, OPTION_SITE_SIGNAL).await
}

pub async fn page_signal(
    store: &SettingsStore,
    page_id: i64,
) -> anyhow::Result<Option<RefreshSignal>> {
    read_signal(store, &page_signal_option(page_id)).await
}

async fn read_signal(store: &SettingsStore, name: &str) -> anyhow::Result<Option<RefreshSignal>> {
    let Some(raw) = store.get_option(name).await? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(signal) => Ok(Some(signal)),
        Err(err) => {
            tracing::warn!("discarding malformed refresh signal {}: {}", name, err);
            Ok(None)
        }
    }
}
