//! Paridad de electrones y multiplicidades de espín.
//!
//! Electrones pares admiten sólo multiplicidades impares (1, 3, 5, ...) y
//! electrones impares sólo pares (2, 4, 6, ...).
use chem_domain::{ElementClass, IssueKind, ValidationIssue};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parity {
    Odd,
    Even,
}

impl Parity {
    pub fn of(value: i64) -> Self {
        if value.rem_euclid(2) == 0 {
            Parity::Even
        } else {
            Parity::Odd
        }
    }

    /// Los `count` valores positivos más bajos con esta paridad.
    pub fn lowest(self, count: usize) -> Vec<u32> {
        let start = match self {
            Parity::Odd => 1,
            Parity::Even => 2,
        };
        (0..count as u32).map(|i| start + 2 * i).collect()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Parity::Odd => "odd",
            Parity::Even => "even",
        }
    }
}

/// Paridad de multiplicidad exigida por el número de electrones.
pub fn required_parity(electrons: i64) -> Parity {
    match Parity::of(electrons) {
        Parity::Even => Parity::Odd,
        Parity::Odd => Parity::Even,
    }
}

/// Paridad sugerida por la clase de elemento del centro metálico.
pub fn class_parity(class: ElementClass) -> Parity {
    match class {
        ElementClass::OddElectronMetal => Parity::Even,
        ElementClass::EvenElectronMetal | ElementClass::MainGroup => Parity::Odd,
    }
}

fn list(values: &[u32]) -> String {
    format!("[{}]", values.iter().map(u32::to_string).collect::<Vec<_>>().join(", "))
}

/// Revisa multiplicidades declaradas; devuelve todos los `bad-parity`.
pub fn check_multiplicities(electrons: i64, multiplicities: &[u32]) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    if electrons < 0 {
        issues.push(ValidationIssue::new(IssueKind::BadParity,
                                         format!("net charge leaves {electrons} electrons; the charge is larger than the nuclear charge"),
                                         "charge: 0").on_field("charge"));
        return issues;
    }
    let required = required_parity(electrons);

    let odd: Vec<u32> = multiplicities.iter().copied().filter(|m| m % 2 == 1).collect();
    let even: Vec<u32> = multiplicities.iter().copied().filter(|m| m % 2 == 0).collect();
    let offending = match required {
        Parity::Odd => &even,
        Parity::Even => &odd,
    };
    if offending.is_empty() {
        return issues;
    }

    let mut corrected: Vec<u32> = Vec::new();
    for m in multiplicities {
        // Vecino superior; el inferior sólo si el superior no cabe en u32.
        let fixed = if Parity::of(*m as i64) == required { *m } else { m.checked_add(1).unwrap_or(m - 1) };
        if !corrected.contains(&fixed) {
            corrected.push(fixed);
        }
    }
    let example = format!("multiplicities: {}", list(&corrected));

    if !odd.is_empty() && !even.is_empty() {
        issues.push(ValidationIssue::new(IssueKind::BadParity,
                                         format!("multiplicities mix odd {} and even {} values; all must share one parity",
                                                 list(&odd),
                                                 list(&even)),
                                         example.clone()).on_field("multiplicities"));
    }
    issues.push(ValidationIssue::new(IssueKind::BadParity,
                                     format!("{electrons} electrons ({}) allow only {} multiplicities; {} not allowed",
                                             Parity::of(electrons).as_str(),
                                             required.as_str(),
                                             list(offending)),
                                     example).on_field("multiplicities"));
    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_parity_is_opposite_of_electron_parity() {
        assert_eq!(required_parity(10), Parity::Odd);
        assert_eq!(required_parity(99), Parity::Even);
        assert_eq!(Parity::Even.lowest(3), vec![2, 4, 6]);
        assert_eq!(Parity::Odd.lowest(1), vec![1]);
        assert_eq!(class_parity(ElementClass::OddElectronMetal), Parity::Even);
    }

    #[test]
    fn odd_electrons_reject_odd_multiplicities_with_correction() {
        let issues = check_multiplicities(99, &[1, 3, 5]);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::BadParity);
        assert!(issues[0].explanation.contains("[1, 3, 5]"));
        assert_eq!(issues[0].example, "multiplicities: [2, 4, 6]");
        assert!(check_multiplicities(99, &[2, 4, 6]).is_empty());
    }

    #[test]
    fn mixed_parity_reports_both_problems() {
        let issues = check_multiplicities(10, &[1, 2, 3]);
        assert_eq!(issues.len(), 2);
        assert!(issues[0].explanation.contains("mix"));
        assert!(issues[1].explanation.contains("[2] not allowed"));
        assert_eq!(issues[1].example, "multiplicities: [1, 3]");
    }

    #[test]
    fn largest_multiplicity_is_corrected_downwards() {
        let issues = check_multiplicities(29, &[u32::MAX]);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].example, format!("multiplicities: [{}]", u32::MAX - 1));
    }

    #[test]
    fn negative_electron_count_is_reported() {
        let issues = check_multiplicities(-1, &[1]);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field.as_deref(), Some("charge"));
    }
}
