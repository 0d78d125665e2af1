//! Parser de cadenas estructurales (subconjunto de SMILES).
//!
//! No pretende ser un parser químico completo: sólo reconstruye el grafo de
//! átomos/enlaces, los hidrógenos implícitos del subconjunto orgánico y las
//! cargas formales. Con eso alcanza para contar electrones, separar
//! fragmentos (`.`) y detectar centros metálicos con sus ligandos.
use std::collections::{BTreeMap, HashMap};

use crate::elements::{atomic_number, is_transition_metal};
use crate::DomainError;

/// Carga formal máxima admitida en un átomo entre corchetes.
pub const MAX_ATOM_CHARGE: u32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BondOrder {
    Single,
    Double,
    Triple,
    Quadruple,
    Aromatic,
}

impl BondOrder {
    /// Orden de enlace en medios (aromático = 1.5 → 3).
    fn halves(self) -> u32 {
        match self {
            BondOrder::Single => 2,
            BondOrder::Double => 4,
            BondOrder::Triple => 6,
            BondOrder::Quadruple => 8,
            BondOrder::Aromatic => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atom {
    pub symbol: String,
    pub atomic_number: u32,
    pub aromatic: bool,
    /// Escrito entre corchetes (`[Cu+2]`): hidrógenos y carga son explícitos.
    pub bracketed: bool,
    pub charge: i32,
    /// Hidrógenos explícitos (corchetes) o implícitos (subconjunto orgánico).
    pub hydrogens: u32,
    pub fragment: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bond {
    pub from: usize,
    pub to: usize,
    pub order: BondOrder,
}

/// Grafo molecular reconstruido desde la cadena estructural.
#[derive(Debug, Clone)]
pub struct Structure {
    pub atoms: Vec<Atom>,
    pub bonds: Vec<Bond>,
    fragments: usize,
}

impl Structure {
    /// Cantidad de fragmentos separados por `.`.
    pub fn fragment_count(&self) -> usize {
        self.fragments
    }

    /// Suma de cargas formales escritas en la cadena.
    pub fn formal_charge(&self) -> i32 {
        self.atoms.iter().fold(0i32, |acc, a| acc.saturating_add(a.charge))
    }

    /// Electrones totales = Σ Z (incluyendo hidrógenos) − carga neta.
    pub fn electron_count(&self, net_charge: i32) -> i64 {
        let nuclear: i64 = self.atoms.iter().map(|a| a.atomic_number as i64 + a.hydrogens as i64).sum();
        nuclear - net_charge as i64
    }

    pub fn neighbors(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        self.bonds.iter().filter_map(move |b| {
            if b.from == idx {
                Some(b.to)
            } else if b.to == idx {
                Some(b.from)
            } else {
                None
            }
        })
    }

    /// Índices de átomos que son metales de transición.
    pub fn metal_centers(&self) -> Vec<usize> {
        self.atoms
            .iter()
            .enumerate()
            .filter(|(_, a)| is_transition_metal(a.atomic_number))
            .map(|(i, _)| i)
            .collect()
    }

    /// Componentes conexos que quedan al retirar `center` del grafo,
    /// restringidos a los vecinos de `center` (es decir, sus ligandos).
    pub fn ligands_of(&self, center: usize) -> Vec<Vec<usize>> {
        let mut seen = vec![false; self.atoms.len()];
        seen[center] = true;
        let mut components = Vec::new();
        let starts: Vec<usize> = self.neighbors(center).collect();
        for start in starts {
            if seen[start] {
                continue;
            }
            let mut stack = vec![start];
            let mut component = Vec::new();
            seen[start] = true;
            while let Some(current) = stack.pop() {
                component.push(current);
                for next in self.neighbors(current) {
                    if !seen[next] {
                        seen[next] = true;
                        stack.push(next);
                    }
                }
            }
            component.sort_unstable();
            components.push(component);
        }
        components
    }

    /// Fórmula de Hill (C, H, resto alfabético) de un subconjunto de átomos.
    pub fn formula(&self, indices: &[usize]) -> String {
        let mut counts: BTreeMap<&str, u32> = BTreeMap::new();
        for &i in indices {
            let atom = &self.atoms[i];
            *counts.entry(atom.symbol.as_str()).or_insert(0) += 1;
            if atom.hydrogens > 0 {
                *counts.entry("H").or_insert(0) += atom.hydrogens;
            }
        }
        let mut out = String::new();
        let mut push = |sym: &str, n: u32| {
            out.push_str(sym);
            if n > 1 {
                out.push_str(&n.to_string());
            }
        };
        if let Some(c) = counts.remove("C") {
            push("C", c);
            if let Some(h) = counts.remove("H") {
                push("H", h);
            }
        }
        for (sym, n) in counts {
            push(sym, n);
        }
        out
    }
}

/// Valencias normales del subconjunto orgánico.
fn default_valences(symbol: &str) -> &'static [u32] {
    match symbol {
        "B" => &[3],
        "C" => &[4],
        "N" => &[3, 5],
        "O" => &[2],
        "P" => &[3, 5],
        "S" => &[2, 4, 6],
        "F" | "Cl" | "Br" | "I" => &[1],
        _ => &[],
    }
}

struct Parser<'a> {
    chars: Vec<char>,
    pos: usize,
    input: &'a str,
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
    prev: Option<usize>,
    branches: Vec<Option<usize>>,
    pending: Option<BondOrder>,
    rings: HashMap<u32, (usize, Option<BondOrder>)>,
    fragment: usize,
    fragment_has_atoms: bool,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { chars: input.chars().collect(),
               pos: 0,
               input,
               atoms: Vec::new(),
               bonds: Vec::new(),
               prev: None,
               branches: Vec::new(),
               pending: None,
               rings: HashMap::new(),
               fragment: 0,
               fragment_has_atoms: false }
    }

    fn error(&self, reason: impl Into<String>) -> DomainError {
        DomainError::InvalidStructure { input: self.input.to_string(),
                                        position: self.pos,
                                        reason: reason.into() }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn read_number(&mut self) -> Option<u32> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if start == self.pos {
            return None;
        }
        // Dígitos fuera de rango saturan; los llamadores acotan el valor.
        Some(self.chars[start..self.pos].iter().collect::<String>().parse().unwrap_or(u32::MAX))
    }

    fn run(mut self) -> Result<Structure, DomainError> {
        while let Some(c) = self.peek() {
            match c {
                '(' => {
                    if self.prev.is_none() {
                        return Err(self.error("branch opened without a preceding atom"));
                    }
                    self.branches.push(self.prev);
                    self.pos += 1;
                }
                ')' => {
                    let Some(back) = self.branches.pop() else {
                        return Err(self.error("unbalanced ')'"));
                    };
                    if self.pending.is_some() {
                        return Err(self.error("bond symbol before ')'"));
                    }
                    self.prev = back;
                    self.pos += 1;
                }
                '.' => {
                    if !self.branches.is_empty() || self.pending.is_some() {
                        return Err(self.error("fragment separator inside a branch or after a bond"));
                    }
                    if self.fragment_has_atoms {
                        self.fragment += 1;
                        self.fragment_has_atoms = false;
                    }
                    self.prev = None;
                    self.pos += 1;
                }
                '-' | '=' | '#' | '$' | ':' | '/' | '\\' => {
                    if self.pending.is_some() {
                        return Err(self.error("two consecutive bond symbols"));
                    }
                    self.pending = Some(match c {
                        '=' => BondOrder::Double,
                        '#' => BondOrder::Triple,
                        '$' => BondOrder::Quadruple,
                        ':' => BondOrder::Aromatic,
                        _ => BondOrder::Single,
                    });
                    self.pos += 1;
                }
                '%' => {
                    self.pos += 1;
                    let (Some(a), Some(b)) = (self.peek(), self.peek_at(1)) else {
                        return Err(self.error("'%' must be followed by two digits"));
                    };
                    let (Some(a), Some(b)) = (a.to_digit(10), b.to_digit(10)) else {
                        return Err(self.error("'%' must be followed by two digits"));
                    };
                    self.pos += 2;
                    self.ring_closure(a * 10 + b)?;
                }
                d if d.is_ascii_digit() => {
                    self.pos += 1;
                    self.ring_closure(d.to_digit(10).unwrap_or_default())?;
                }
                '[' => {
                    let atom = self.bracket_atom()?;
                    self.push_atom(atom);
                }
                c if c.is_ascii_alphabetic() => {
                    let atom = self.organic_atom()?;
                    self.push_atom(atom);
                }
                c if c.is_whitespace() => return Err(self.error("unexpected whitespace")),
                other => return Err(self.error(format!("unexpected character '{other}'"))),
            }
        }
        if !self.branches.is_empty() {
            return Err(self.error("unclosed branch"));
        }
        if self.pending.is_some() {
            return Err(self.error("dangling bond symbol"));
        }
        if let Some(n) = self.rings.keys().next() {
            return Err(self.error(format!("ring bond {n} never closed")));
        }
        if self.atoms.is_empty() {
            return Err(self.error("no atoms"));
        }
        let fragments = self.fragment + usize::from(self.fragment_has_atoms);
        let mut structure = Structure { atoms: self.atoms,
                                        bonds: self.bonds,
                                        fragments };
        assign_implicit_hydrogens(&mut structure);
        Ok(structure)
    }

    fn default_order(&self, a: usize, b: usize) -> BondOrder {
        if self.atoms[a].aromatic && self.atoms[b].aromatic {
            BondOrder::Aromatic
        } else {
            BondOrder::Single
        }
    }

    fn push_atom(&mut self, mut atom: Atom) {
        atom.fragment = self.fragment;
        let idx = self.atoms.len();
        self.atoms.push(atom);
        if let Some(p) = self.prev {
            let order = self.pending.take().unwrap_or_else(|| self.default_order(p, idx));
            self.bonds.push(Bond { from: p, to: idx, order });
        }
        self.prev = Some(idx);
        self.fragment_has_atoms = true;
    }

    fn ring_closure(&mut self, n: u32) -> Result<(), DomainError> {
        let Some(current) = self.prev else {
            return Err(self.error("ring bond without a preceding atom"));
        };
        let here = self.pending.take();
        match self.rings.remove(&n) {
            Some((other, there)) => {
                if other == current {
                    return Err(self.error("ring bond to the same atom"));
                }
                let order = here.or(there).unwrap_or_else(|| self.default_order(other, current));
                self.bonds.push(Bond { from: other, to: current, order });
            }
            None => {
                self.rings.insert(n, (current, here));
            }
        }
        Ok(())
    }

    fn organic_atom(&mut self) -> Result<Atom, DomainError> {
        let two: String = self.chars[self.pos..].iter().take(2).collect();
        let (symbol, aromatic, len) = match two.as_str() {
            "Cl" => ("Cl", false, 2),
            "Br" => ("Br", false, 2),
            _ => match self.chars[self.pos] {
                'B' => ("B", false, 1),
                'C' => ("C", false, 1),
                'N' => ("N", false, 1),
                'O' => ("O", false, 1),
                'P' => ("P", false, 1),
                'S' => ("S", false, 1),
                'F' => ("F", false, 1),
                'I' => ("I", false, 1),
                'b' => ("B", true, 1),
                'c' => ("C", true, 1),
                'n' => ("N", true, 1),
                'o' => ("O", true, 1),
                'p' => ("P", true, 1),
                's' => ("S", true, 1),
                _ => {
                    return Err(self.error("atom outside the organic subset must be written in brackets"));
                }
            },
        };
        self.pos += len;
        Ok(Atom { symbol: symbol.to_string(),
                  atomic_number: atomic_number(symbol).unwrap_or_default(),
                  aromatic,
                  bracketed: false,
                  charge: 0,
                  hydrogens: 0,
                  fragment: 0 })
    }

    fn bracket_atom(&mut self) -> Result<Atom, DomainError> {
        self.pos += 1; // '['
        let _isotope = self.read_number();

        let (symbol, aromatic) = match self.peek() {
            Some(c) if c.is_ascii_uppercase() => {
                let one = c.to_string();
                let two = self.peek_at(1).filter(|l| l.is_ascii_lowercase()).map(|l| format!("{c}{l}"));
                match two {
                    Some(two) if atomic_number(&two).is_some() => {
                        self.pos += 2;
                        (two, false)
                    }
                    _ => {
                        self.pos += 1;
                        (one, false)
                    }
                }
            }
            Some(c) if c.is_ascii_lowercase() => {
                let two: String = self.chars[self.pos..].iter().take(2).collect();
                if two == "se" || two == "as" {
                    self.pos += 2;
                    (format!("{}{}", two[..1].to_uppercase(), &two[1..]), true)
                } else if matches!(c, 'b' | 'c' | 'n' | 'o' | 'p' | 's') {
                    self.pos += 1;
                    (c.to_ascii_uppercase().to_string(), true)
                } else {
                    return Err(self.error(format!("'{c}' is not an aromatic element")));
                }
            }
            _ => return Err(self.error("missing element symbol inside brackets")),
        };
        let Some(z) = atomic_number(&symbol) else {
            return Err(self.error(format!("unknown element '{symbol}'")));
        };

        // Quiralidad: sólo se consume, no afecta al conteo.
        if self.peek() == Some('@') {
            self.pos += 1;
            if self.peek() == Some('@') {
                self.pos += 1;
            } else {
                let tag: String = self.chars[self.pos..].iter().take(2).collect();
                if matches!(tag.as_str(), "TH" | "AL" | "SP" | "TB" | "OH") {
                    self.pos += 2;
                    let _ = self.read_number();
                }
            }
        }

        let mut hydrogens = 0;
        if self.peek() == Some('H') {
            self.pos += 1;
            hydrogens = self.read_number().unwrap_or(1);
        }

        let mut charge = 0i32;
        if let Some(sign @ ('+' | '-')) = self.peek() {
            self.pos += 1;
            let unit = if sign == '+' { 1 } else { -1 };
            let magnitude = match self.read_number() {
                Some(n) => n,
                None => {
                    let mut n = 1u32;
                    while self.peek() == Some(sign) {
                        self.pos += 1;
                        n = n.saturating_add(1);
                    }
                    n
                }
            };
            if magnitude > MAX_ATOM_CHARGE {
                return Err(self.error(format!("charge {sign}{magnitude} on '{symbol}' exceeds {MAX_ATOM_CHARGE}")));
            }
            charge = unit * magnitude as i32;
        }

        if self.peek() == Some(':') {
            self.pos += 1;
            if self.read_number().is_none() {
                return Err(self.error("atom class ':' without a number"));
            }
        }

        if self.peek() != Some(']') {
            return Err(self.error(format!("unterminated bracket atom '{symbol}'")));
        }
        self.pos += 1;

        Ok(Atom { symbol,
                  atomic_number: z,
                  aromatic,
                  bracketed: true,
                  charge,
                  hydrogens,
                  fragment: 0 })
    }
}

fn assign_implicit_hydrogens(structure: &mut Structure) {
    let mut used = vec![0u32; structure.atoms.len()];
    for bond in &structure.bonds {
        used[bond.from] += bond.order.halves();
        used[bond.to] += bond.order.halves();
    }
    for (atom, halves) in structure.atoms.iter_mut().zip(used) {
        if atom.bracketed {
            continue;
        }
        let valence = halves / 2;
        atom.hydrogens = default_valences(&atom.symbol).iter()
                                                       .find(|v| **v >= valence)
                                                       .map(|v| v - valence)
                                                       .unwrap_or(0);
    }
}

/// Analiza una cadena estructural y devuelve su grafo.
pub fn parse_structure(input: &str) -> Result<Structure, DomainError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DomainError::InvalidStructure { input: input.to_string(),
                                                   position: 0,
                                                   reason: "empty structure".into() });
    }
    Parser::new(trimmed).run()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn water_and_ethanol_hydrogens() {
        let water = parse_structure("O").unwrap();
        assert_eq!(water.atoms[0].hydrogens, 2);
        assert_eq!(water.electron_count(0), 10);

        let ethanol = parse_structure("CCO").unwrap();
        let h: u32 = ethanol.atoms.iter().map(|a| a.hydrogens).sum();
        assert_eq!(h, 6);
        assert_eq!(ethanol.electron_count(0), 26);
    }

    #[test]
    fn benzene_aromatic_hydrogens() {
        let benzene = parse_structure("c1ccccc1").unwrap();
        assert_eq!(benzene.bonds.len(), 6);
        assert!(benzene.atoms.iter().all(|a| a.hydrogens == 1));
        assert_eq!(benzene.electron_count(0), 42);
    }

    #[test]
    fn naphthalene_junctions_have_no_hydrogen() {
        let naph = parse_structure("c1ccc2ccccc2c1").unwrap();
        let h: u32 = naph.atoms.iter().map(|a| a.hydrogens).sum();
        assert_eq!(h, 8);
    }

    #[test]
    fn bracket_atoms_and_fragments() {
        let s = parse_structure("[Cl-].[Cl-].[Cl-].[Cl-].[Cu+2]").unwrap();
        assert_eq!(s.fragment_count(), 5);
        assert_eq!(s.formal_charge(), -2);
        assert_eq!(s.electron_count(-2), 99);
        assert_eq!(s.metal_centers(), vec![4]);
    }

    #[test]
    fn charges_repeated_signs_and_hydrogen_counts() {
        let s = parse_structure("[NH4+].[O--].[Fe+++]").unwrap();
        assert_eq!(s.atoms[0].hydrogens, 4);
        assert_eq!(s.atoms[0].charge, 1);
        assert_eq!(s.atoms[1].charge, -2);
        assert_eq!(s.atoms[2].charge, 3);
    }

    #[test]
    fn oversized_atom_charges_are_rejected() {
        let err = parse_structure("[Cu-2147483648]").unwrap_err();
        assert!(err.to_string().contains("exceeds 15"), "{err}");
        assert!(parse_structure("[Cu+99999999999]").is_err());
        assert_eq!(parse_structure("[Os+8]").unwrap().atoms[0].charge, 8);
    }

    #[test]
    fn ligands_of_covalent_complex() {
        let s = parse_structure("Cl[Cu](Cl)(Cl)Cl").unwrap();
        let cu = s.metal_centers()[0];
        let ligands = s.ligands_of(cu);
        assert_eq!(ligands.len(), 4);
        assert!(ligands.iter().all(|l| s.formula(l) == "Cl"));
        assert_eq!(s.fragment_count(), 1);
    }

    #[test]
    fn hill_formula_puts_carbon_first() {
        let s = parse_structure("[Fe](C#N)(C#N)O").unwrap();
        let ligands = s.ligands_of(0);
        let formulas: Vec<String> = ligands.iter().map(|l| s.formula(l)).collect();
        assert_eq!(formulas, vec!["CN", "CN", "HO"]);
    }

    #[test]
    fn rejects_malformed_strings() {
        assert!(parse_structure("").is_err());
        assert!(parse_structure("C(C").is_err());
        assert!(parse_structure("C1CC").is_err());
        assert!(parse_structure("Mn(Cl)6").is_err());
        assert!(parse_structure("[Xx]").is_err());
        assert!(parse_structure("C C").is_err());
        assert!(parse_structure("C=").is_err());
    }

    #[test]
    fn ring_closure_with_percent_and_explicit_order() {
        let s = parse_structure("C%12CCCCC%12").unwrap();
        assert_eq!(s.bonds.len(), 6);
        let s = parse_structure("C=1CCCCC1").unwrap();
        assert!(s.bonds.iter().any(|b| b.order == BondOrder::Double));
    }
}
