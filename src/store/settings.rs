use crate::{
    clock::Clock,
    domain::Settings,
    notify::{ChangeEvent, ChangeKind, ChangeNotifier},
    storage::{BackendHandle, SETTINGS_KEY},
};
use std::sync::Arc;

/// Get/save over the persisted settings record.
///
/// Reads always merge onto the full default set, so callers never see a
/// partial settings object.
pub struct SettingsStore {
    backend: Arc<BackendHandle>,
    notifier: Arc<dyn ChangeNotifier>,
    clock: Arc<dyn Clock>,
}

impl SettingsStore {
    pub fn new(
        backend: Arc<BackendHandle>,
        notifier: Arc<dyn ChangeNotifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            backend,
            notifier,
            clock,
        }
    }

    /// Returns the stored settings merged onto defaults; full defaults
    /// when the record is absent or unreadable
    pub async fn get(&self) -> Settings {
        match self.backend.read(SETTINGS_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(settings) => settings,
                Err(err) => {
                    log::warn!("stored settings record is malformed ({err}), using defaults");
                    Settings::default()
                }
            },
            Ok(None) => Settings::default(),
            Err(err) => {
                log::warn!("failed to read settings record: {err}");
                Settings::default()
            }
        }
    }

    /// Persists the settings and emits a change event on success
    pub async fn save(&self, settings: Settings) -> bool {
        let json = match serde_json::to_string(&settings) {
            Ok(json) => json,
            Err(err) => {
                log::error!("failed to serialize settings: {err}");
                return false;
            }
        };

        if let Err(err) = self.backend.write(SETTINGS_KEY, &json).await {
            log::error!("failed to persist settings: {err}");
            return false;
        }

        self.notifier.notify(ChangeEvent::new(
            ChangeKind::SettingsSaved(settings),
            self.clock.now(),
        ));
        true
    }
}
