use serde::{Deserialize, Serialize};

use crate::common::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeterKind {
    Electricity,
    Gas,
}

impl Keyed for MeterKind {
    const ALL: &'static [Self] = &[Self::Electricity, Self::Gas];

    fn key(&self) -> &'static str {
        match self {
            Self::Electricity => "electricity",
            Self::Gas => "gas",
        }
    }
}

/// A supply point registered at an address (MPAN for electricity, MPRN for
/// gas).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeterIdentifier {
    pub kind: MeterKind,
    pub identifier: String,
}

/// One result of a postcode lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressCandidate {
    pub line_1: String,
    #[serde(default)]
    pub line_2: Option<String>,
    pub city: String,
    pub post_code: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub meters: Vec<MeterIdentifier>,
}

impl AddressCandidate {
    /// First meter of the given kind, if the lookup returned one.
    pub fn first_meter(&self, kind: MeterKind) -> Option<&str> {
        self.meters
            .iter()
            .find(|meter| meter.kind == kind)
            .map(|meter| meter.identifier.as_str())
    }
}

impl Displayable for AddressCandidate {
    fn display_label(&self) -> String {
        match self.line_2.as_deref() {
            Some(line_2) => format!("{}, {}, {} {}", self.line_1, line_2, self.city, self.post_code),
            None => format!("{}, {} {}", self.line_1, self.city, self.post_code),
        }
    }
}
