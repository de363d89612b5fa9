//! Alert applet entities, the editable draft that shadows them, and the
//! update shape sent back to the API.

use std::fmt;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::common::*;

pub type AlertId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    ElectricityConsumptionLevel,
    GasConsumptionLevel,
    ElectricityPercentageChange,
    GasPercentageChange,
}

impl AlertType {
    /// Percentage-change alerts compare against `percentage_limit` rather
    /// than an absolute energy figure.
    pub fn is_percentage_based(self) -> bool {
        matches!(
            self,
            Self::ElectricityPercentageChange | Self::GasPercentageChange
        )
    }
}

impl Keyed for AlertType {
    const ALL: &'static [Self] = &[
        Self::ElectricityConsumptionLevel,
        Self::GasConsumptionLevel,
        Self::ElectricityPercentageChange,
        Self::GasPercentageChange,
    ];

    fn key(&self) -> &'static str {
        match self {
            Self::ElectricityConsumptionLevel => "electricity_consumption_level",
            Self::GasConsumptionLevel => "gas_consumption_level",
            Self::ElectricityPercentageChange => "electricity_percentage_change",
            Self::GasPercentageChange => "gas_percentage_change",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitCondition {
    Above,
    Below,
}

impl Keyed for LimitCondition {
    const ALL: &'static [Self] = &[Self::Above, Self::Below];

    fn key(&self) -> &'static str {
        match self {
            Self::Above => "above",
            Self::Below => "below",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitDuration {
    Day,
    Week,
    Month,
}

impl Keyed for LimitDuration {
    const ALL: &'static [Self] = &[Self::Day, Self::Week, Self::Month];

    fn key(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        }
    }
}

/// A persisted alert applet as returned by the list collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    pub alert_type: AlertType,
    #[serde(default)]
    pub location_id: Option<i64>,
    #[serde(default)]
    pub meter_id: Option<i64>,
    #[serde(default)]
    pub limit_condition: Option<LimitCondition>,
    #[serde(default)]
    pub energy_limit: Option<f64>,
    #[serde(default)]
    pub limit_duration: Option<LimitDuration>,
    #[serde(default)]
    pub limit_period_start: Option<NaiveTime>,
    #[serde(default)]
    pub limit_period_end: Option<NaiveTime>,
    #[serde(default)]
    pub percentage_limit: Option<f64>,
}

impl Displayable for Alert {
    fn display_label(&self) -> String {
        let threshold = match (self.alert_type.is_percentage_based(), self) {
            (true, Alert {
                percentage_limit: Some(limit),
                ..
            }) => format!("{limit}%"),
            (false, Alert {
                energy_limit: Some(limit),
                ..
            }) => format!("{limit} kWh"),
            _ => "no limit".to_string(),
        };
        let condition = self
            .limit_condition
            .map(|condition| condition.key())
            .unwrap_or("any");
        format!(
            "#{} {} {} {}",
            self.id,
            self.alert_type.key(),
            condition,
            threshold
        )
    }
}

/// In-progress edits for one alert. Every field is optional relative to the
/// persisted entity; `alert_type` must be present before the draft can be
/// committed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertDraft {
    pub alert_type: Option<AlertType>,
    pub location_id: Option<i64>,
    pub meter_id: Option<i64>,
    pub limit_condition: Option<LimitCondition>,
    pub energy_limit: Option<f64>,
    pub limit_duration: Option<LimitDuration>,
    pub limit_period_start: Option<NaiveTime>,
    pub limit_period_end: Option<NaiveTime>,
    pub percentage_limit: Option<f64>,
}

impl AlertDraft {
    /// Replaces exactly one field, leaving the rest untouched.
    pub fn apply(&mut self, field: AlertField) {
        match field {
            AlertField::AlertType(value) => self.alert_type = Some(value),
            AlertField::Location(value) => self.location_id = value,
            AlertField::Meter(value) => self.meter_id = value,
            AlertField::LimitCondition(value) => self.limit_condition = value,
            AlertField::EnergyLimit(value) => self.energy_limit = value,
            AlertField::LimitDuration(value) => self.limit_duration = value,
            AlertField::LimitPeriodStart(value) => self.limit_period_start = value,
            AlertField::LimitPeriodEnd(value) => self.limit_period_end = value,
            AlertField::PercentageLimit(value) => self.percentage_limit = value,
        }
    }

    pub fn with(mut self, field: AlertField) -> Self {
        self.apply(field);
        self
    }
}

impl From<&Alert> for AlertDraft {
    fn from(alert: &Alert) -> Self {
        Self {
            alert_type: Some(alert.alert_type),
            location_id: alert.location_id,
            meter_id: alert.meter_id,
            limit_condition: alert.limit_condition,
            energy_limit: alert.energy_limit,
            limit_duration: alert.limit_duration,
            limit_period_start: alert.limit_period_start,
            limit_period_end: alert.limit_period_end,
            percentage_limit: alert.percentage_limit,
        }
    }
}

/// A single-field edit applied to an [`AlertDraft`].
#[derive(Debug, Clone, PartialEq)]
pub enum AlertField {
    AlertType(AlertType),
    Location(Option<i64>),
    Meter(Option<i64>),
    LimitCondition(Option<LimitCondition>),
    EnergyLimit(Option<f64>),
    LimitDuration(Option<LimitDuration>),
    LimitPeriodStart(Option<NaiveTime>),
    LimitPeriodEnd(Option<NaiveTime>),
    PercentageLimit(Option<f64>),
}

impl AlertField {
    pub const NAMES: &'static [&'static str] = &[
        "alert_type",
        "location",
        "meter",
        "limit_condition",
        "energy_limit",
        "limit_duration",
        "limit_period_start",
        "limit_period_end",
        "percentage_limit",
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::AlertType(_) => "alert_type",
            Self::Location(_) => "location",
            Self::Meter(_) => "meter",
            Self::LimitCondition(_) => "limit_condition",
            Self::EnergyLimit(_) => "energy_limit",
            Self::LimitDuration(_) => "limit_duration",
            Self::LimitPeriodStart(_) => "limit_period_start",
            Self::LimitPeriodEnd(_) => "limit_period_end",
            Self::PercentageLimit(_) => "percentage_limit",
        }
    }

    /// Parses a field name (snake_case or camelCase) and its textual value.
    /// `none` or an empty value clears nullable fields.
    pub fn parse(name: &str, value: &str) -> Result<Self, AlertFieldError> {
        let normalized: String = name
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        let canonical = Self::NAMES
            .iter()
            .copied()
            .find(|candidate| candidate.replace('_', "") == normalized)
            .ok_or_else(|| AlertFieldError::new(name, "unknown alert field"))?;

        let raw = value.trim();
        let cleared = raw.is_empty() || raw.eq_ignore_ascii_case("none");
        let field = match canonical {
            "alert_type" => Self::AlertType(
                AlertType::from_key(raw).map_err(|err| AlertFieldError::new(canonical, err))?,
            ),
            "location" => Self::Location(parse_optional(canonical, raw, cleared)?),
            "meter" => Self::Meter(parse_optional(canonical, raw, cleared)?),
            "limit_condition" => Self::LimitCondition(if cleared {
                None
            } else {
                Some(
                    LimitCondition::from_key(raw)
                        .map_err(|err| AlertFieldError::new(canonical, err))?,
                )
            }),
            "energy_limit" => Self::EnergyLimit(parse_limit(canonical, raw, cleared)?),
            "limit_duration" => Self::LimitDuration(if cleared {
                None
            } else {
                Some(
                    LimitDuration::from_key(raw)
                        .map_err(|err| AlertFieldError::new(canonical, err))?,
                )
            }),
            "limit_period_start" => Self::LimitPeriodStart(parse_time(canonical, raw, cleared)?),
            "limit_period_end" => Self::LimitPeriodEnd(parse_time(canonical, raw, cleared)?),
            _ => Self::PercentageLimit(parse_limit(canonical, raw, cleared)?),
        };
        Ok(field)
    }
}

fn parse_optional<T: std::str::FromStr>(
    field: &str,
    raw: &str,
    cleared: bool,
) -> Result<Option<T>, AlertFieldError> {
    if cleared {
        return Ok(None);
    }
    raw.parse::<T>()
        .map(Some)
        .map_err(|_| AlertFieldError::new(field, format!("`{raw}` is not a number")))
}

fn parse_limit(field: &str, raw: &str, cleared: bool) -> Result<Option<f64>, AlertFieldError> {
    match parse_optional::<f64>(field, raw, cleared)? {
        Some(value) if !value.is_finite() => Err(AlertFieldError::new(
            field,
            format!("`{raw}` is not a finite number"),
        )),
        value => Ok(value),
    }
}

fn parse_time(field: &str, raw: &str, cleared: bool) -> Result<Option<NaiveTime>, AlertFieldError> {
    if cleared {
        return Ok(None);
    }
    NaiveTime::parse_from_str(raw, "%H:%M")
        .map(Some)
        .map_err(|_| AlertFieldError::new(field, "use 24-hour HH:MM format"))
}

/// The full argument set accepted by the update-alert collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertUpdate {
    pub alert_id: AlertId,
    pub alert_type: AlertType,
    pub meter_id: Option<i64>,
    pub location_id: Option<i64>,
    pub limit_condition: Option<LimitCondition>,
    pub energy_limit: Option<f64>,
    pub limit_duration: Option<LimitDuration>,
    pub limit_period_start: Option<NaiveTime>,
    pub limit_period_end: Option<NaiveTime>,
    pub percentage_limit: Option<f64>,
}

impl AlertUpdate {
    /// Writes the update over a persisted alert.
    pub fn apply_to(&self, alert: &mut Alert) {
        alert.alert_type = self.alert_type;
        alert.meter_id = self.meter_id;
        alert.location_id = self.location_id;
        alert.limit_condition = self.limit_condition;
        alert.energy_limit = self.energy_limit;
        alert.limit_duration = self.limit_duration;
        alert.limit_period_start = self.limit_period_start;
        alert.limit_period_end = self.limit_period_end;
        alert.percentage_limit = self.percentage_limit;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertFieldError {
    pub field: String,
    pub message: String,
}

impl AlertFieldError {
    fn new(field: &str, message: impl fmt::Display) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

impl fmt::Display for AlertFieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for AlertFieldError {}
