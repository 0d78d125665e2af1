//! Niveles de precisión/velocidad y sus umbrales de convergencia.
//!
//! Los umbrales se envían tal cual al servicio de cómputo; el núcleo no los
//! interpreta.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationMode {
    Reckless,
    Rapid,
    Careful,
    Meticulous,
    Debug,
}

/// Umbrales en unidades atómicas (Hartree, Hartree/Bohr).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceThresholds {
    pub energy_delta: f64,
    pub max_gradient: f64,
    pub rms_gradient: f64,
}

impl CalculationMode {
    pub const ALL: [CalculationMode; 5] = [CalculationMode::Reckless,
                                           CalculationMode::Rapid,
                                           CalculationMode::Careful,
                                           CalculationMode::Meticulous,
                                           CalculationMode::Debug];

    pub fn as_str(self) -> &'static str {
        match self {
            CalculationMode::Reckless => "reckless",
            CalculationMode::Rapid => "rapid",
            CalculationMode::Careful => "careful",
            CalculationMode::Meticulous => "meticulous",
            CalculationMode::Debug => "debug",
        }
    }

    pub fn thresholds(self) -> ConvergenceThresholds {
        let (energy_delta, max_gradient, rms_gradient) = match self {
            CalculationMode::Reckless => (1e-4, 1e-2, 6e-3),
            CalculationMode::Rapid => (5e-5, 5e-3, 3.5e-3),
            CalculationMode::Careful => (1e-6, 9e-4, 6e-4),
            CalculationMode::Meticulous => (1e-6, 3e-4, 2e-4),
            CalculationMode::Debug => (1e-7, 1e-5, 5e-6),
        };
        ConvergenceThresholds { energy_delta,
                                max_gradient,
                                rms_gradient }
    }

    /// `auto` (o vacío) significa "sin nivel": lo decide el servicio remoto.
    pub fn parse_optional(raw: &str) -> Result<Option<Self>, DomainError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(None),
            other => other.parse().map(Some),
        }
    }
}

impl FromStr for CalculationMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        CalculationMode::ALL.into_iter()
                            .find(|m| m.as_str() == lowered)
                            .ok_or(DomainError::UnknownMode(s.to_string()))
    }
}

impl fmt::Display for CalculationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
