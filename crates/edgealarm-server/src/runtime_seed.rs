use edgealarm_storage::AlarmStore;

use crate::config::CertMonitorConfig;

pub const CERT_OVERDUE_PERIOD_KEY: &str = "cert_overdue_period_days";
pub const CERT_OVERDUE_THRESHOLD_KEY: &str = "cert_overdue_threshold_days";

/// Default monitor setting written on first start.
struct RuntimeSettingDef {
    config_key: &'static str,
    description: &'static str,
    default_value: u64,
}

fn default_runtime_settings(cert: &CertMonitorConfig) -> [RuntimeSettingDef; 2] {
    [
        RuntimeSettingDef {
            config_key: CERT_OVERDUE_PERIOD_KEY,
            description: "interval in days between certificate expiry checks",
            default_value: cert.default_period_days,
        },
        RuntimeSettingDef {
            config_key: CERT_OVERDUE_THRESHOLD_KEY,
            description: "days before expiry at which a certificate alarm is raised",
            default_value: cert.default_threshold_days,
        },
    ]
}

/// Writes every monitor setting that is not yet in the config store.
/// Existing values are left alone so operator changes survive restarts.
pub async fn init_default_runtime_settings(
    store: &AlarmStore,
    cert: &CertMonitorConfig,
) -> anyhow::Result<usize> {
    let mut inserted_count = 0;

    for def in default_runtime_settings(cert) {
        match store
            .seed_config(def.config_key, &def.default_value.to_string())
            .await
        {
            Ok(true) => {
                tracing::info!(
                    config_key = def.config_key,
                    value = def.default_value,
                    description = def.description,
                    "Initialized default runtime setting"
                );
                inserted_count += 1;
            }
            Ok(false) => {
                tracing::debug!(
                    config_key = def.config_key,
                    "Runtime setting already exists, skipping"
                );
            }
            Err(e) => {
                tracing::warn!(
                    config_key = def.config_key,
                    error = %e,
                    "Failed to insert default runtime setting"
                );
            }
        }
    }

    if inserted_count > 0 {
        tracing::info!(count = inserted_count, "Initialized default runtime settings");
    }

    Ok(inserted_count)
}
