//! sems-outbox-json
//!
//! Filesystem stand-in for the console's REST collaborators. Registrations
//! are written as one JSON file each, alerts live in a single list file that
//! updates rewrite in place, and postcode lookups read a fixture map.

use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use chrono::Utc;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sems_core::{AddressLookup, AlertDirectory, AlertUpdater, PortError, RegistrationSubmitter};
use sems_domain::{
    AddressCandidate, Alert, AlertUpdate, RegistrationRequest, SubmissionReceipt,
};
use tracing::{debug, info};
use uuid::Uuid;

const JSON_EXTENSION: &str = "json";
const TMP_SUFFIX: &str = "tmp";
const REGISTRATIONS_DIR: &str = "registrations";
const ALERTS_FILE: &str = "alerts.json";
const ADDRESSES_FILE: &str = "addresses.json";
const FILE_TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S";

/// A registration as written to the outbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRegistration {
    pub receipt: SubmissionReceipt,
    pub request: RegistrationRequest,
}

/// Directory-backed implementation of every collaborator port.
#[derive(Debug, Clone)]
pub struct JsonOutbox {
    root: PathBuf,
}

impl JsonOutbox {
    pub fn new(root: PathBuf) -> Result<Self, PortError> {
        fs::create_dir_all(root.join(REGISTRATIONS_DIR))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn registrations_dir(&self) -> PathBuf {
        self.root.join(REGISTRATIONS_DIR)
    }

    pub fn alerts_path(&self) -> PathBuf {
        self.root.join(ALERTS_FILE)
    }

    pub fn addresses_path(&self) -> PathBuf {
        self.root.join(ADDRESSES_FILE)
    }

    /// Registration files, oldest first.
    pub fn list_registrations(&self) -> Result<Vec<PathBuf>, PortError> {
        let dir = self.registrations_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file()
                && path.extension().and_then(|ext| ext.to_str()) == Some(JSON_EXTENSION)
            {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    pub fn load_registration(&self, path: &Path) -> Result<StoredRegistration, PortError> {
        read_json(path)
    }

    /// Replaces the alert list.
    pub fn save_alerts(&self, alerts: &[Alert]) -> Result<(), PortError> {
        write_json(&self.alerts_path(), &alerts)
    }

    pub fn load_alerts(&self) -> Result<Vec<Alert>, PortError> {
        let path = self.alerts_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        read_json(&path)
    }

    /// Replaces the postcode fixture map.
    pub fn save_addresses(
        &self,
        addresses: &BTreeMap<String, Vec<AddressCandidate>>,
    ) -> Result<(), PortError> {
        write_json(&self.addresses_path(), addresses)
    }
}

#[async_trait]
impl RegistrationSubmitter for JsonOutbox {
    async fn submit_registration(
        &self,
        request: &RegistrationRequest,
    ) -> Result<SubmissionReceipt, PortError> {
        let id = Uuid::new_v4();
        let submitted_at = Utc::now();
        let receipt = SubmissionReceipt {
            reference: format!("REG-{}", &id.simple().to_string()[..8].to_ascii_uppercase()),
            submitted_at,
        };
        let file_name = format!(
            "{}_{}.{}",
            submitted_at.format(FILE_TIMESTAMP_FORMAT),
            id,
            JSON_EXTENSION
        );
        let path = self.registrations_dir().join(file_name);
        write_json(
            &path,
            &StoredRegistration {
                receipt: receipt.clone(),
                request: request.clone(),
            },
        )?;
        info!(reference = %receipt.reference, path = %path.display(), "registration written to outbox");
        Ok(receipt)
    }
}

#[async_trait]
impl AlertUpdater for JsonOutbox {
    async fn update_alert(&self, update: &AlertUpdate) -> Result<(), PortError> {
        let mut alerts = self.load_alerts()?;
        let alert = alerts
            .iter_mut()
            .find(|alert| alert.id == update.alert_id)
            .ok_or_else(|| PortError::Rejected(format!("alert {} does not exist", update.alert_id)))?;
        update.apply_to(alert);
        self.save_alerts(&alerts)?;
        debug!(alert_id = update.alert_id, "alert updated in outbox");
        Ok(())
    }
}

#[async_trait]
impl AlertDirectory for JsonOutbox {
    async fn list_alerts(&self) -> Result<Vec<Alert>, PortError> {
        self.load_alerts()
    }
}

#[async_trait]
impl AddressLookup for JsonOutbox {
    async fn lookup_postcode(&self, post_code: &str) -> Result<Vec<AddressCandidate>, PortError> {
        let path = self.addresses_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let addresses: BTreeMap<String, Vec<AddressCandidate>> = read_json(&path)?;
        let needle = normalize_postcode(post_code);
        Ok(addresses
            .into_iter()
            .find(|(key, _)| normalize_postcode(key) == needle)
            .map(|(_, candidates)| candidates)
            .unwrap_or_default())
    }
}

/// Uppercase with all whitespace removed.
pub fn normalize_postcode(post_code: &str) -> String {
    post_code
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, PortError> {
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), PortError> {
    let json = serde_json::to_string_pretty(value)?;
    let tmp = tmp_path(path);
    write_atomic(&tmp, &json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_atomic(path: &Path, data: &str) -> Result<(), PortError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postcode_normalisation_ignores_case_and_spacing() {
        assert_eq!(normalize_postcode(" ba1  1aa "), "BA11AA");
        assert_eq!(normalize_postcode("BA11AA"), "BA11AA");
    }

    #[test]
    fn tmp_path_appends_suffix() {
        assert_eq!(
            tmp_path(Path::new("/x/alerts.json")),
            PathBuf::from("/x/alerts.json.tmp")
        );
    }
}
