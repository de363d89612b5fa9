//! The four school registration steps: their field forms, their payload
//! transformers, and conversion of the unioned payload into a
//! [`RegistrationRequest`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use sems_domain::{RegistrationRequest, RegistrationStep};

use crate::definition::{StepDefinition, WizardDefinition};
use crate::error::WizardError;
use crate::field_store::FieldStore;
use crate::transform::{
    decimal_or_null, kwh_to_wh, object, remap_choice, required_secret, required_text, text_or_null,
    PayloadFragment, TransformError,
};
use crate::validation::{FieldDescriptor, FieldKind, FormDescriptor, Validator};

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));
static PHONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9][0-9 ()-]{6,18}[0-9]$").expect("valid phone regex"));
static POSTCODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[A-Z]{1,2}[0-9][A-Z0-9]? ?[0-9][A-Z]{2}$").expect("valid postcode regex")
});
static COMPANY_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[A-Z0-9]{8}$").expect("valid company number regex"));

pub const GOVERNANCE_TYPES: &[(&str, &str)] = &[
    ("academy", "academy"),
    ("maintained", "local_authority"),
    ("free_school", "free_school"),
    ("independent", "independent"),
    ("dont_know", "unknown"),
];

pub const PUPIL_SIZES: &[(&str, &str)] = &[
    ("count_0_99", "under_100"),
    ("count_100_199", "between_100_and_199"),
    ("count_200_499", "between_200_and_499"),
    ("count_500_plus", "over_500"),
];

const MAX_CONSUMPTION_KWH: f64 = 100_000_000.0;

fn ui_keys(table: &[(&'static str, &'static str)]) -> Vec<&'static str> {
    table.iter().map(|(ui, _)| *ui).collect()
}

fn email_field(key: &'static str, label: &'static str) -> FieldDescriptor {
    FieldDescriptor::new(key, label, FieldKind::Text)
        .with_validator(Validator::pattern(&EMAIL, "Enter a valid email address"))
}

fn phone_field(key: &'static str, label: &'static str) -> FieldDescriptor {
    FieldDescriptor::new(key, label, FieldKind::Text)
        .with_validator(Validator::pattern(&PHONE, "Enter a valid phone number"))
}

fn name_field(key: &'static str, label: &'static str) -> FieldDescriptor {
    FieldDescriptor::new(key, label, FieldKind::Text).with_validator(Validator::MaxLength(100))
}

pub fn school_details_form() -> FormDescriptor {
    FormDescriptor::new(
        "School Details",
        vec![
            name_field("school_name", "School name"),
            email_field("email", "School email"),
            phone_field("phone_number", "School phone number").with_optional(),
            name_field("address_line_1", "Address line 1"),
            name_field("address_line_2", "Address line 2").with_optional(),
            name_field("city", "Town or city"),
            FieldDescriptor::new("post_code", "Postcode", FieldKind::Text)
                .with_validator(Validator::pattern(&POSTCODE, "Enter a valid UK postcode"))
                .with_help("Use `wizard lookup <postcode>` to pre-fill the address"),
            FieldDescriptor::new("latitude", "Latitude", FieldKind::Decimal)
                .with_optional()
                .with_validator(Validator::NumericRange {
                    min: -90.0,
                    max: 90.0,
                }),
            FieldDescriptor::new("longitude", "Longitude", FieldKind::Decimal)
                .with_optional()
                .with_validator(Validator::NumericRange {
                    min: -180.0,
                    max: 180.0,
                }),
        ],
    )
}

pub fn school_profile_form() -> FormDescriptor {
    FormDescriptor::new(
        "School Profile",
        vec![
            FieldDescriptor::new(
                "governance_type",
                "Governance type",
                FieldKind::Choice(ui_keys(GOVERNANCE_TYPES)),
            ),
            FieldDescriptor::new(
                "school_pupils_size",
                "Number of pupils",
                FieldKind::Choice(ui_keys(PUPIL_SIZES)),
            ),
            FieldDescriptor::new(
                "company_number_status",
                "Do you know the company number?",
                FieldKind::Choice(vec!["provided", "dont_know"]),
            ),
            FieldDescriptor::new("company_number", "Company number", FieldKind::Text)
                .required_unless("company_number_status", "dont_know")
                .with_validator(Validator::pattern(
                    &COMPANY_NUMBER,
                    "Company numbers are 8 letters or digits",
                )),
            name_field("local_authority", "Local authority").with_optional(),
        ],
    )
}

pub fn contacts_form() -> FormDescriptor {
    let manager = |key: &'static str, label: &'static str| {
        FieldDescriptor::new(key, label, FieldKind::Text)
            .required_when("has_utilities_manager", "true")
            .with_validator(Validator::MaxLength(100))
    };
    FormDescriptor::new(
        "Contacts",
        vec![
            name_field("first_name", "First name"),
            name_field("last_name", "Last name"),
            name_field("job_role", "Job role"),
            email_field("contact_email", "Email"),
            phone_field("contact_phone_number", "Phone number"),
            FieldDescriptor::new("password", "Password", FieldKind::Secret)
                .with_validator(Validator::MinLength(8)),
            FieldDescriptor::new("password_confirmation", "Confirm password", FieldKind::Secret)
                .with_validator(Validator::EqualsField {
                    field: "password",
                    message: "Passwords do not match",
                }),
            FieldDescriptor::new(
                "has_utilities_manager",
                "Is there a separate utilities manager?",
                FieldKind::Boolean,
            )
            .with_optional(),
            manager("manager_first_name", "Manager first name"),
            manager("manager_last_name", "Manager last name"),
            manager("manager_job_role", "Manager job role"),
            manager("manager_email", "Manager email")
                .with_validator(Validator::pattern(&EMAIL, "Enter a valid email address")),
            manager("manager_phone_number", "Manager phone number")
                .with_validator(Validator::pattern(&PHONE, "Enter a valid phone number")),
        ],
    )
}

pub fn energy_supply_form() -> FormDescriptor {
    let consumption = |key: &'static str, label: &'static str| {
        FieldDescriptor::new(key, label, FieldKind::Integer)
            .with_optional()
            .with_help("Annual figure in kWh")
            .with_validator(Validator::NumericRange {
                min: 0.0,
                max: MAX_CONSUMPTION_KWH,
            })
    };
    FormDescriptor::new(
        "Energy Supply",
        vec![
            name_field("electricity_supplier", "Electricity supplier").with_optional(),
            name_field("gas_supplier", "Gas supplier").with_optional(),
            FieldDescriptor::new("mpan", "Electricity meter (MPAN)", FieldKind::Text)
                .with_optional()
                .with_validator(Validator::MaxLength(21)),
            FieldDescriptor::new("mprn", "Gas meter (MPRN)", FieldKind::Text)
                .with_optional()
                .with_validator(Validator::MaxLength(10)),
            consumption("annual_consumption", "Annual electricity consumption (kWh)"),
            consumption("gas_annual_consumption", "Annual gas consumption (kWh)"),
        ],
    )
}

fn fragment(entries: Vec<(&str, Value)>) -> PayloadFragment {
    entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

pub fn transform_school_details(store: &FieldStore) -> Result<PayloadFragment, TransformError> {
    let address = object(vec![
        ("line_1", required_text(store, "address_line_1")?),
        ("line_2", text_or_null(store, "address_line_2")),
        ("city", required_text(store, "city")?),
        ("post_code", required_text(store, "post_code")?),
        ("latitude", decimal_or_null(store, "latitude")?),
        ("longitude", decimal_or_null(store, "longitude")?),
    ]);
    Ok(fragment(vec![
        ("school_name", required_text(store, "school_name")?),
        ("email", required_text(store, "email")?),
        ("phone_number", text_or_null(store, "phone_number")),
        ("address", address),
    ]))
}

pub fn transform_school_profile(store: &FieldStore) -> Result<PayloadFragment, TransformError> {
    let company_number = if store
        .text("company_number_status")
        .map_or(false, |status| status.eq_ignore_ascii_case("dont_know"))
    {
        Value::Null
    } else {
        text_or_null(store, "company_number")
    };
    Ok(fragment(vec![
        ("governance_type", remap_choice(store, "governance_type", GOVERNANCE_TYPES)?),
        ("school_pupils_size", remap_choice(store, "school_pupils_size", PUPIL_SIZES)?),
        ("company_number", company_number),
        ("local_authority", text_or_null(store, "local_authority")),
    ]))
}

pub fn transform_contacts(store: &FieldStore) -> Result<PayloadFragment, TransformError> {
    let primary_contact = object(vec![
        ("first_name", required_text(store, "first_name")?),
        ("last_name", required_text(store, "last_name")?),
        ("job_role", required_text(store, "job_role")?),
        ("email", required_text(store, "contact_email")?),
        ("phone_number", required_text(store, "contact_phone_number")?),
    ]);
    let utilities_manager = if store.flag("has_utilities_manager") {
        object(vec![
            ("first_name", required_text(store, "manager_first_name")?),
            ("last_name", required_text(store, "manager_last_name")?),
            ("job_role", required_text(store, "manager_job_role")?),
            ("email", required_text(store, "manager_email")?),
            ("phone_number", required_text(store, "manager_phone_number")?),
        ])
    } else {
        Value::Null
    };
    Ok(fragment(vec![
        ("primary_contact", primary_contact),
        ("password", required_secret(store, "password")?),
        ("utilities_manager", utilities_manager),
    ]))
}

pub fn transform_energy_supply(store: &FieldStore) -> Result<PayloadFragment, TransformError> {
    Ok(fragment(vec![
        ("electricity_supplier", text_or_null(store, "electricity_supplier")),
        ("gas_supplier", text_or_null(store, "gas_supplier")),
        ("mpan", text_or_null(store, "mpan")),
        ("mprn", text_or_null(store, "mprn")),
        ("annual_consumption", kwh_to_wh(store, "annual_consumption")?),
        ("gas_annual_consumption", kwh_to_wh(store, "gas_annual_consumption")?),
    ]))
}

/// The school registration wizard.
pub fn registration_wizard() -> Result<WizardDefinition<RegistrationStep>, WizardError> {
    WizardDefinition::new(vec![
        StepDefinition::new(
            RegistrationStep::SchoolDetails,
            school_details_form(),
            transform_school_details,
        ),
        StepDefinition::new(
            RegistrationStep::SchoolProfile,
            school_profile_form(),
            transform_school_profile,
        ),
        StepDefinition::new(RegistrationStep::Contacts, contacts_form(), transform_contacts),
        StepDefinition::new(
            RegistrationStep::EnergySupply,
            energy_supply_form(),
            transform_energy_supply,
        ),
    ])
}

/// Interprets the unioned payload as a typed request.
pub fn build_request(payload: &PayloadFragment) -> Result<RegistrationRequest, WizardError> {
    serde_json::from_value(Value::Object(payload.clone()))
        .map_err(|err| WizardError::Payload(err.to_string()))
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::field_store::FieldValue;
    use crate::validation::StepValidator;
    use serde_json::json;

    fn store(pairs: &[(&str, &str)]) -> FieldStore {
        pairs
            .iter()
            .map(|(key, value)| (*key, FieldValue::text(*value)))
            .collect()
    }

    #[test]
    fn school_details_builds_nested_address() {
        let raw = store(&[
            ("school_name", "Oak Primary"),
            ("email", "a@b.com"),
            ("address_line_1", "1 Acorn Way"),
            ("city", "Bath"),
            ("post_code", "BA1 1AA"),
            ("latitude", "51.38"),
        ]);
        assert!(StepValidator::new(&school_details_form(), &raw).is_valid());

        let payload = transform_school_details(&raw).unwrap();
        assert_eq!(payload["phone_number"], Value::Null);
        assert_eq!(
            payload["address"],
            json!({
                "line_1": "1 Acorn Way",
                "line_2": null,
                "city": "Bath",
                "post_code": "BA1 1AA",
                "latitude": 51.38,
                "longitude": null
            })
        );
    }

    #[test]
    fn school_profile_remaps_enums_and_nulls_unknown_company() {
        let raw = store(&[
            ("governance_type", "maintained"),
            ("school_pupils_size", "count_500_plus"),
            ("company_number_status", "dont_know"),
            ("company_number", "stale123"),
        ]);
        assert!(StepValidator::new(&school_profile_form(), &raw).is_valid());

        let payload = transform_school_profile(&raw).unwrap();
        assert_eq!(payload["governance_type"], json!("local_authority"));
        assert_eq!(payload["school_pupils_size"], json!("over_500"));
        assert_eq!(payload["company_number"], Value::Null);
    }

    #[test]
    fn company_number_required_when_status_provided() {
        let raw = store(&[
            ("governance_type", "academy"),
            ("school_pupils_size", "count_0_99"),
            ("company_number_status", "provided"),
        ]);
        let report = StepValidator::new(&school_profile_form(), &raw).validate();
        assert_eq!(
            report.message_for("company_number"),
            Some("Company number is required")
        );
    }

    #[test]
    fn contacts_nulls_declined_utilities_manager() {
        let mut raw = store(&[
            ("first_name", "Ada"),
            ("last_name", "Lovelace"),
            ("job_role", "Bursar"),
            ("contact_email", "ada@oak.sch.uk"),
            ("contact_phone_number", "01225 000000"),
            ("password", "correct horse"),
            ("password_confirmation", "correct horse"),
            ("manager_first_name", "Left over"),
        ]);
        raw.set("has_utilities_manager", FieldValue::Flag(false));
        assert!(StepValidator::new(&contacts_form(), &raw).is_valid());
        let payload = transform_contacts(&raw).unwrap();
        assert_eq!(payload["utilities_manager"], Value::Null);
        assert_eq!(payload["primary_contact"]["email"], json!("ada@oak.sch.uk"));

        raw.set("has_utilities_manager", FieldValue::Flag(true));
        let report = StepValidator::new(&contacts_form(), &raw).validate();
        assert!(report.message_for("manager_last_name").is_some());
        assert!(report.message_for("manager_first_name").is_none());
    }

    #[test]
    fn contacts_sends_the_password_that_was_validated() {
        let mut raw = store(&[
            ("first_name", "Ada"),
            ("last_name", "Lovelace"),
            ("job_role", "Bursar"),
            ("contact_email", "ada@oak.sch.uk"),
            ("contact_phone_number", "01225 000000"),
            ("password", "  pass12 "),
            ("password_confirmation", "  pass12 "),
        ]);
        raw.set("has_utilities_manager", FieldValue::Flag(false));
        assert!(StepValidator::new(&contacts_form(), &raw).is_valid());

        let payload = transform_contacts(&raw).unwrap();
        assert_eq!(payload["password"], json!("  pass12 "));
    }

    #[test]
    fn non_finite_coordinates_are_field_errors() {
        for raw_value in ["NaN", "inf", "-inf"] {
            let raw = store(&[
                ("school_name", "Oak Primary"),
                ("email", "a@b.com"),
                ("address_line_1", "1 Acorn Way"),
                ("city", "Bath"),
                ("post_code", "BA1 1AA"),
                ("latitude", raw_value),
            ]);
            let report = StepValidator::new(&school_details_form(), &raw).validate();
            assert_eq!(report.message_for("latitude"), Some("Enter a numeric value"));
            assert_eq!(report.len(), 1);
        }
    }

    #[test]
    fn energy_supply_converts_kwh_to_wh() {
        let raw = store(&[("annual_consumption", "1200"), ("mpan", "1200023305963")]);
        assert!(StepValidator::new(&energy_supply_form(), &raw).is_valid());
        let payload = transform_energy_supply(&raw).unwrap();
        assert_eq!(payload["annual_consumption"], json!(1_200_000));
        assert_eq!(payload["gas_annual_consumption"], Value::Null);
        assert_eq!(payload["mpan"], json!("1200023305963"));
    }

    #[test]
    fn wizard_lists_steps_in_order() {
        let definition = registration_wizard().unwrap();
        let steps: Vec<_> = definition.steps().collect();
        assert_eq!(
            steps,
            vec![
                RegistrationStep::SchoolDetails,
                RegistrationStep::SchoolProfile,
                RegistrationStep::Contacts,
                RegistrationStep::EnergySupply,
            ]
        );
        assert_eq!(
            definition.resolve("contacts").unwrap(),
            RegistrationStep::Contacts
        );
        assert_eq!(definition.resolve("4").unwrap(), RegistrationStep::EnergySupply);
        assert!(definition.resolve("review").is_err());
    }
}
