//! Clasificación de notación estructural.
//!
//! Un complejo metálico con varios ligandos aniónicos idénticos debe
//! escribirse como fragmentos cargados (`[Cl-].[Cl-].[Cu+2]`), no como un
//! grafo covalente (`Cl[Cu](Cl)(Cl)Cl`) ni como fórmula condensada
//! (`CuCl4`). El validador sólo ve `classify`; la estrategia de detección
//! queda detrás de [`NotationClassifier`].
use chem_domain::elements::{atomic_number, is_transition_metal};
use chem_domain::structure::{parse_structure, Structure};
use serde::{Deserialize, Serialize};

use crate::ligands::{by_formula, common_oxidation_state, metal_fragment, Ligand};

/// Mayor número de ligandos que se reescriben alrededor de un metal.
pub const MAX_COORDINATION: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Notation {
    Covalent,
    Fragmented,
    /// La cadena no se puede usar tal cual; ver `reason`/`suggestion`.
    Ambiguous,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotationReport {
    pub notation: Notation,
    pub reason: Option<String>,
    /// Forma fragmentada equivalente, cuando se puede construir.
    pub suggestion: Option<String>,
}

impl NotationReport {
    fn plain(notation: Notation) -> Self {
        Self { notation,
               reason: None,
               suggestion: None }
    }

    fn ambiguous(reason: String, suggestion: Option<String>) -> Self {
        Self { notation: Notation::Ambiguous,
               reason: Some(reason),
               suggestion }
    }
}

/// Contrato de clasificación de notación.
pub trait NotationClassifier: Send + Sync {
    fn id(&self) -> &'static str;
    /// `charge` es la carga neta declarada por el llamador, si la hay; se usa
    /// para deducir el estado de oxidación del metal en la sugerencia.
    fn classify(&self, structure: &str, charge: Option<i32>) -> NotationReport;
}

/// Clasificador basado en el grafo del parser y en un reconocedor de
/// fórmulas condensadas.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedClassifier;

/// Atajo sin carga declarada.
pub fn classify_notation(structure: &str) -> Notation {
    RuleBasedClassifier.classify(structure, None).notation
}

impl NotationClassifier for RuleBasedClassifier {
    fn id(&self) -> &'static str {
        "rule_based"
    }

    fn classify(&self, structure: &str, charge: Option<i32>) -> NotationReport {
        match parse_structure(structure) {
            Ok(parsed) => classify_graph(structure, &parsed, charge),
            Err(parse_error) => match parse_condensed(structure) {
                Some(condensed) if condensed.coordination() > MAX_COORDINATION => {
                    NotationReport::ambiguous(format!("'{}' lists {} ligands around {}; no metal binds more than {MAX_COORDINATION}",
                                                      structure.trim(),
                                                      condensed.coordination(),
                                                      condensed.metal),
                                              None)
                }
                Some(condensed) => {
                    let reason = if condensed.ligands.is_empty() {
                        format!("'{}' is an element symbol, not a structural string", structure.trim())
                    } else {
                        format!("'{}' is a condensed formula; coordination complexes must be written as separate charged fragments",
                                structure.trim())
                    };
                    NotationReport::ambiguous(reason, condensed.rewrite(charge))
                }
                None => NotationReport::ambiguous(parse_error.to_string(), None),
            },
        }
    }
}

/// Complejo detectado dentro de un fragmento covalente.
struct CovalentComplex {
    metal: String,
    ligands: Vec<&'static Ligand>,
    repeated: &'static Ligand,
    repeats: usize,
}

fn find_complex(piece: &Structure) -> Option<CovalentComplex> {
    for center in piece.metal_centers() {
        let components = piece.ligands_of(center);
        let covered: usize = components.iter().map(Vec::len).sum::<usize>() + 1;
        if components.len() < 2 || covered != piece.atoms.len() {
            continue;
        }
        let ligands: Option<Vec<&'static Ligand>> =
            components.iter().map(|c| by_formula(&piece.formula(c))).collect();
        let Some(ligands) = ligands else {
            continue;
        };
        let repeated = ligands.iter()
                              .filter(|l| l.is_anionic())
                              .map(|l| (*l, ligands.iter().filter(|o| o.formula == l.formula).count()))
                              .max_by_key(|(_, n)| *n);
        if let Some((repeated, repeats)) = repeated.filter(|(_, n)| *n >= 2) {
            return Some(CovalentComplex { metal: piece.atoms[center].symbol.clone(),
                                          ligands,
                                          repeated,
                                          repeats });
        }
    }
    None
}

fn charge_sum(charges: impl IntoIterator<Item = i32>) -> Option<i32> {
    charges.into_iter().try_fold(0i32, |acc, c| acc.checked_add(c))
}

fn classify_graph(input: &str, parsed: &Structure, charge: Option<i32>) -> NotationReport {
    let pieces: Vec<&str> = input.trim().split('.').collect();
    let parsed_pieces: Vec<Option<Structure>> = pieces.iter().map(|p| parse_structure(p).ok()).collect();

    let mut rewritten = Vec::with_capacity(pieces.len());
    let mut reasons = Vec::new();
    for (i, (text, piece)) in pieces.iter().zip(&parsed_pieces).enumerate() {
        let complex = piece.as_ref().and_then(|p| find_complex(p).map(|c| (p, c)));
        let Some((piece, complex)) = complex else {
            rewritten.push(text.to_string());
            continue;
        };
        // Carga de este fragmento: la declarada menos la escrita en los demás.
        let written = piece.atoms.iter().any(|a| a.charge != 0);
        let ligand_charge = charge_sum(complex.ligands.iter().map(|l| l.charge));
        let metal_charge = match charge {
            Some(total) => {
                let others = charge_sum(parsed_pieces.iter()
                                                     .enumerate()
                                                     .filter(|(j, _)| *j != i)
                                                     .filter_map(|(_, p)| p.as_ref().map(|p| p.formal_charge())));
                others.zip(ligand_charge)
                      .and_then(|(others, ligands)| total.checked_sub(others)?.checked_sub(ligands))
            }
            None if written => ligand_charge.and_then(|ligands| piece.formal_charge().checked_sub(ligands)),
            None => Some(common_oxidation_state(&complex.metal)),
        };
        let Some(metal_charge) = metal_charge else {
            return NotationReport::ambiguous(format!("charge {charge:?} cannot be balanced over the fragments of '{}'",
                                                     input.trim()),
                                             None);
        };
        let mut fragments: Vec<String> = complex.ligands.iter().map(|l| l.fragment.to_string()).collect();
        fragments.push(metal_fragment(&complex.metal, metal_charge));
        rewritten.push(fragments.join("."));
        reasons.push(format!("{} is bound covalently to {} identical {} ligands",
                             complex.metal, complex.repeats, complex.repeated.fragment));
    }

    if reasons.is_empty() {
        return NotationReport::plain(if parsed.fragment_count() > 1 {
                                         Notation::Fragmented
                                     } else {
                                         Notation::Covalent
                                     });
    }
    NotationReport::ambiguous(format!("{}; anionic ligands must be written as separate charged fragments",
                                      reasons.join(", ")),
                              Some(rewritten.join(".")))
}

/// Fórmula condensada tipo `Mn(Cl)6`, `MnCl6`, `[MnCl6]4-` o `Mn`.
struct Condensed {
    metal: String,
    ligands: Vec<(&'static Ligand, usize)>,
    charge: Option<i32>,
}

impl Condensed {
    fn coordination(&self) -> usize {
        self.ligands.iter().fold(0usize, |acc, (_, n)| acc.saturating_add(*n))
    }

    /// `None` si la carga no cabe en `i32`. Se llama con la coordinación ya acotada.
    fn rewrite(&self, declared: Option<i32>) -> Option<String> {
        let ligand_charge = self.ligands
                                .iter()
                                .try_fold(0i32, |acc, (l, n)| acc.checked_add(l.charge.checked_mul(i32::try_from(*n).ok()?)?))?;
        let metal_charge = match self.charge.or(declared) {
            Some(total) => total.checked_sub(ligand_charge)?,
            None if self.ligands.is_empty() => 0,
            None => common_oxidation_state(&self.metal),
        };
        let mut fragments: Vec<&str> = Vec::with_capacity(self.coordination().min(MAX_COORDINATION) + 1);
        for (ligand, n) in &self.ligands {
            fragments.extend(std::iter::repeat(ligand.fragment).take(*n));
        }
        let metal = metal_fragment(&self.metal, metal_charge);
        fragments.push(&metal);
        Some(fragments.join("."))
    }
}

/// `4-`, `-4`, `2+`, `+`, `-`.
fn parse_charge_suffix(text: &str) -> Option<Option<i32>> {
    let text = text.trim();
    if text.is_empty() {
        return Some(None);
    }
    let sign = if text.contains('-') {
        -1
    } else if text.contains('+') {
        1
    } else {
        return None;
    };
    let digits = text.trim_matches(|c| c == '+' || c == '-');
    if digits.is_empty() {
        return Some(Some(sign));
    }
    digits.parse::<i32>().ok().map(|n| Some(sign * n))
}

fn read_symbol(chars: &[char], pos: &mut usize) -> Option<String> {
    let first = *chars.get(*pos).filter(|c| c.is_ascii_uppercase())?;
    if let Some(second) = chars.get(*pos + 1).filter(|c| c.is_ascii_lowercase()) {
        let two = format!("{first}{second}");
        if atomic_number(&two).is_some() {
            *pos += 2;
            return Some(two);
        }
    }
    let one = first.to_string();
    atomic_number(&one)?;
    *pos += 1;
    Some(one)
}

fn read_count(chars: &[char], pos: &mut usize) -> usize {
    let start = *pos;
    while chars.get(*pos).is_some_and(|c| c.is_ascii_digit()) {
        *pos += 1;
    }
    if start == *pos {
        return 1;
    }
    chars[start..*pos].iter().collect::<String>().parse().unwrap_or(usize::MAX)
}

fn parse_condensed(input: &str) -> Option<Condensed> {
    let trimmed = input.trim();
    let (body, charge) = match trimmed.strip_prefix('[') {
        Some(rest) => {
            let close = rest.find(']')?;
            (&rest[..close], parse_charge_suffix(&rest[close + 1..])?)
        }
        None => (trimmed, None),
    };
    let chars: Vec<char> = body.chars().collect();
    let mut pos = 0;
    let metal = read_symbol(&chars, &mut pos)?;
    if !atomic_number(&metal).is_some_and(is_transition_metal) {
        return None;
    }
    let mut ligands: Vec<(&'static Ligand, usize)> = Vec::new();
    while pos < chars.len() {
        let ligand = if chars[pos] == '(' {
            let close = chars[pos..].iter().position(|c| *c == ')')? + pos;
            let group: String = chars[pos + 1..close].iter().collect();
            pos = close + 1;
            by_formula(group.trim())?
        } else {
            let symbol = read_symbol(&chars, &mut pos)?;
            by_formula(&symbol)?
        };
        let count = read_count(&chars, &mut pos);
        match ligands.iter_mut().find(|(l, _)| l.formula == ligand.formula) {
            Some((_, n)) => *n = n.saturating_add(count),
            None => ligands.push((ligand, count)),
        }
    }
    Some(Condensed { metal, ligands, charge })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CU_FRAGMENTED: &str = "[Cl-].[Cl-].[Cl-].[Cl-].[Cu+2]";
    const MN_FRAGMENTED: &str = "[Cl-].[Cl-].[Cl-].[Cl-].[Cl-].[Cl-].[Mn+2]";

    #[test]
    fn plain_molecules_are_covalent_or_fragmented() {
        assert_eq!(classify_notation("CCO"), Notation::Covalent);
        assert_eq!(classify_notation("[Na+].[Cl-]"), Notation::Fragmented);
        assert_eq!(classify_notation(CU_FRAGMENTED), Notation::Fragmented);
    }

    #[test]
    fn covalent_complex_with_repeated_anions_is_ambiguous() {
        let report = RuleBasedClassifier.classify("Cl[Cu](Cl)(Cl)Cl", Some(-2));
        assert_eq!(report.notation, Notation::Ambiguous);
        assert_eq!(report.suggestion.as_deref(), Some(CU_FRAGMENTED));
        assert!(report.reason.unwrap().contains("4 identical [Cl-]"));
    }

    #[test]
    fn metal_charge_comes_from_written_charges_when_undeclared() {
        let report = RuleBasedClassifier.classify("Cl[Cu-2](Cl)(Cl)Cl", None);
        assert_eq!(report.suggestion.as_deref(), Some(CU_FRAGMENTED));
        let report = RuleBasedClassifier.classify("Cl[Fe](Cl)Cl", None);
        assert_eq!(report.suggestion.as_deref(), Some("[Cl-].[Cl-].[Cl-].[Fe+3]"));
    }

    #[test]
    fn other_fragments_are_kept_and_counted() {
        let report = RuleBasedClassifier.classify("[Na+].[Na+].Cl[Cu](Cl)(Cl)Cl", Some(0));
        assert_eq!(report.suggestion.as_deref(), Some("[Na+].[Na+].[Cl-].[Cl-].[Cl-].[Cl-].[Cu+2]"));
    }

    #[test]
    fn mixed_or_unknown_ligands_are_not_flagged() {
        // un solo cloruro
        assert_eq!(classify_notation("Cl[Cu]N"), Notation::Covalent);
        // ligando orgánico fuera de la tabla
        assert_eq!(classify_notation("Cl[Pd](Cl)c1ccccc1"), Notation::Covalent);
        // dos aminas neutras
        assert_eq!(classify_notation("N[Pt]N"), Notation::Covalent);
    }

    #[test]
    fn condensed_formulas_are_rewritten() {
        for (input, expected) in [("Mn(Cl)6", MN_FRAGMENTED),
                                  ("MnCl6", MN_FRAGMENTED),
                                  ("[MnCl6]4-", MN_FRAGMENTED),
                                  ("Fe(Cl)6", "[Cl-].[Cl-].[Cl-].[Cl-].[Cl-].[Cl-].[Fe+3]"),
                                  ("Mn", "[Mn]")]
        {
            let report = RuleBasedClassifier.classify(input, None);
            assert_eq!(report.notation, Notation::Ambiguous, "{input}");
            assert_eq!(report.suggestion.as_deref(), Some(expected), "{input}");
        }
    }

    #[test]
    fn condensed_with_declared_charge_and_mixed_ligands() {
        let report = RuleBasedClassifier.classify("Co(NH3)4Cl2", Some(1));
        assert_eq!(report.suggestion.as_deref(), Some("N.N.N.N.[Cl-].[Cl-].[Co+3]"));
    }

    #[test]
    fn oversized_ligand_counts_get_no_rewrite() {
        for input in ["MnCl99999999999", "MnCl999999999999999999999999", "Mn(Cl)7(Cl)6"] {
            let report = RuleBasedClassifier.classify(input, None);
            assert_eq!(report.notation, Notation::Ambiguous, "{input}");
            assert!(report.suggestion.is_none(), "{input}");
            assert!(report.reason.unwrap().contains("no metal binds more than 12"), "{input}");
        }
        let report = RuleBasedClassifier.classify("MnCl12", None);
        assert!(report.suggestion.is_some());
    }

    #[test]
    fn unbalanceable_declared_charge_gets_no_rewrite() {
        let report = RuleBasedClassifier.classify("Cl[Cu](Cl)(Cl)Cl", Some(i32::MAX));
        assert_eq!(report.notation, Notation::Ambiguous);
        assert!(report.suggestion.is_none());
        let report = RuleBasedClassifier.classify("MnCl6", Some(i32::MAX));
        assert_eq!(report.notation, Notation::Ambiguous);
        assert!(report.suggestion.is_none());
    }

    #[test]
    fn garbage_is_ambiguous_without_suggestion() {
        let report = RuleBasedClassifier.classify("C(C", None);
        assert_eq!(report.notation, Notation::Ambiguous);
        assert!(report.suggestion.is_none());
        assert!(report.reason.unwrap().contains("unclosed branch"));
    }
}
