//! School registration request types and the wizard's step names.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::*;

/// The pages of the school registration wizard, in navigation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStep {
    SchoolDetails,
    SchoolProfile,
    Contacts,
    EnergySupply,
}

impl RegistrationStep {
    /// 1-based position of the step within the wizard.
    pub fn number(self) -> usize {
        match self {
            Self::SchoolDetails => 1,
            Self::SchoolProfile => 2,
            Self::Contacts => 3,
            Self::EnergySupply => 4,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::SchoolDetails => "School Details",
            Self::SchoolProfile => "School Profile",
            Self::Contacts => "Contacts",
            Self::EnergySupply => "Energy Supply",
        }
    }
}

impl Keyed for RegistrationStep {
    const ALL: &'static [Self] = &[
        Self::SchoolDetails,
        Self::SchoolProfile,
        Self::Contacts,
        Self::EnergySupply,
    ];

    fn key(&self) -> &'static str {
        match self {
            Self::SchoolDetails => "school_details",
            Self::SchoolProfile => "school_profile",
            Self::Contacts => "contacts",
            Self::EnergySupply => "energy_supply",
        }
    }
}

impl fmt::Display for RegistrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Governance categories understood by the registration backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GovernanceType {
    Academy,
    LocalAuthority,
    FreeSchool,
    Independent,
    Unknown,
}

impl Keyed for GovernanceType {
    const ALL: &'static [Self] = &[
        Self::Academy,
        Self::LocalAuthority,
        Self::FreeSchool,
        Self::Independent,
        Self::Unknown,
    ];

    fn key(&self) -> &'static str {
        match self {
            Self::Academy => "academy",
            Self::LocalAuthority => "local_authority",
            Self::FreeSchool => "free_school",
            Self::Independent => "independent",
            Self::Unknown => "unknown",
        }
    }
}

/// Pupil headcount bands as stored by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PupilsSize {
    #[serde(rename = "under_100")]
    Under100,
    #[serde(rename = "between_100_and_199")]
    Between100And199,
    #[serde(rename = "between_200_and_499")]
    Between200And499,
    #[serde(rename = "over_500")]
    Over500,
}

impl Keyed for PupilsSize {
    const ALL: &'static [Self] = &[
        Self::Under100,
        Self::Between100And199,
        Self::Between200And499,
        Self::Over500,
    ];

    fn key(&self) -> &'static str {
        match self {
            Self::Under100 => "under_100",
            Self::Between100And199 => "between_100_and_199",
            Self::Between200And499 => "between_200_and_499",
            Self::Over500 => "over_500",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub line_1: String,
    #[serde(default)]
    pub line_2: Option<String>,
    pub city: String,
    pub post_code: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl Displayable for Address {
    fn display_label(&self) -> String {
        let mut parts = vec![self.line_1.as_str()];
        if let Some(line_2) = self.line_2.as_deref() {
            parts.push(line_2);
        }
        parts.push(self.city.as_str());
        parts.push(self.post_code.as_str());
        parts.join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub first_name: String,
    pub last_name: String,
    pub job_role: String,
    pub email: String,
    pub phone_number: String,
}

impl Displayable for Contact {
    fn display_label(&self) -> String {
        format!(
            "{} {} ({}) <{}>",
            self.first_name, self.last_name, self.job_role, self.email
        )
    }
}

/// The canonical request handed to the submission collaborator once every
/// wizard step has been completed. Energy figures are in watt-hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub school_name: String,
    pub email: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    pub address: Address,
    pub governance_type: GovernanceType,
    pub school_pupils_size: PupilsSize,
    #[serde(default)]
    pub company_number: Option<String>,
    #[serde(default)]
    pub local_authority: Option<String>,
    pub primary_contact: Contact,
    pub password: String,
    #[serde(default)]
    pub utilities_manager: Option<Contact>,
    #[serde(default)]
    pub electricity_supplier: Option<String>,
    #[serde(default)]
    pub gas_supplier: Option<String>,
    #[serde(default)]
    pub mpan: Option<String>,
    #[serde(default)]
    pub mprn: Option<String>,
    #[serde(default)]
    pub annual_consumption: Option<u64>,
    #[serde(default)]
    pub gas_annual_consumption: Option<u64>,
}

/// Acknowledgement returned by the submission collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub reference: String,
    pub submitted_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn step_keys_resolve_case_insensitively() {
        assert_eq!(
            RegistrationStep::from_key("Energy_Supply").unwrap(),
            RegistrationStep::EnergySupply
        );
        let err = RegistrationStep::from_key("review").unwrap_err();
        assert_eq!(err.kind, "RegistrationStep");
        assert!(err.to_string().contains("school_details"));
    }

    #[test]
    fn step_numbers_follow_declaration_order() {
        let numbers: Vec<_> = RegistrationStep::ALL.iter().map(|s| s.number()).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
        assert!(RegistrationStep::SchoolDetails < RegistrationStep::EnergySupply);
    }

    #[test]
    fn wire_names_match_keys() {
        for size in PupilsSize::ALL {
            assert_eq!(serde_json::to_value(size).unwrap(), json!(size.key()));
        }
        for governance in GovernanceType::ALL {
            assert_eq!(serde_json::to_value(governance).unwrap(), json!(governance.key()));
        }
    }

    #[test]
    fn request_deserializes_with_nullable_sections() {
        let value = json!({
            "school_name": "Oak Primary",
            "email": "office@oak.sch.uk",
            "address": {
                "line_1": "1 Acorn Way",
                "city": "Bath",
                "post_code": "BA1 1AA"
            },
            "governance_type": "academy",
            "school_pupils_size": "between_100_and_199",
            "primary_contact": {
                "first_name": "Ada",
                "last_name": "Lovelace",
                "job_role": "Bursar",
                "email": "ada@oak.sch.uk",
                "phone_number": "01225 000000"
            },
            "password": "correct horse",
            "utilities_manager": null
        });
        let request: RegistrationRequest = serde_json::from_value(value).unwrap();
        assert_eq!(request.governance_type, GovernanceType::Academy);
        assert!(request.utilities_manager.is_none());
        assert_eq!(request.address.display_label(), "1 Acorn Way, Bath, BA1 1AA");
    }
}
