use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::structure::{parse_structure, Structure};
use crate::DomainError;

/// Notación declarada para la cadena estructural.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotationKind {
    /// Un único grafo covalente conexo.
    Covalent,
    /// Varios fragmentos cargados separados por `.` (iónica/fragmentada).
    Fragmented,
}

impl FromStr for NotationKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "covalent" => Ok(NotationKind::Covalent),
            "fragmented" | "ionic" => Ok(NotationKind::Fragmented),
            other => Err(DomainError::UnknownNotation(other.to_string())),
        }
    }
}

/// Molécula tal como la escribe el llamador: cadena estructural + notación.
///
/// No se valida químicamente aquí; eso lo hace el validador. Sólo se exige
/// que la cadena no esté vacía.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Molecule {
    structure: String,
    notation: NotationKind,
}

impl Molecule {
    /// Si no se declara notación se infiere: con `.` es fragmentada.
    pub fn new(structure: &str, notation: Option<NotationKind>) -> Result<Self, DomainError> {
        let structure = structure.trim();
        if structure.is_empty() {
            return Err(DomainError::InvalidStructure { input: String::new(),
                                                       position: 0,
                                                       reason: "empty structure".into() });
        }
        let notation = notation.unwrap_or(if structure.contains('.') {
                                   NotationKind::Fragmented
                               } else {
                                   NotationKind::Covalent
                               });
        Ok(Molecule { structure: structure.to_string(),
                      notation })
    }

    pub fn structure(&self) -> &str {
        &self.structure
    }

    pub fn notation(&self) -> NotationKind {
        self.notation
    }

    /// Reconstruye el grafo (no se cachea: la molécula es inmutable y barata).
    pub fn parse(&self) -> Result<Structure, DomainError> {
        parse_structure(&self.structure)
    }
}

impl fmt::Display for Molecule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{:?}: {}>", self.notation, self.structure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_notation_from_separators() {
        let m = Molecule::new("[Na+].[Cl-]", None).unwrap();
        assert_eq!(m.notation(), NotationKind::Fragmented);
        let m = Molecule::new(" CCO ", None).unwrap();
        assert_eq!(m.notation(), NotationKind::Covalent);
        assert_eq!(m.structure(), "CCO");
    }

    #[test]
    fn declared_notation_is_kept() {
        let m = Molecule::new("CCO", Some(NotationKind::Fragmented)).unwrap();
        assert_eq!(m.notation(), NotationKind::Fragmented);
    }

    #[test]
    fn empty_structure_is_rejected() {
        assert!(Molecule::new("   ", None).is_err());
        assert_eq!("ionic".parse::<NotationKind>().unwrap(), NotationKind::Fragmented);
        assert!("graph".parse::<NotationKind>().is_err());
    }
}
