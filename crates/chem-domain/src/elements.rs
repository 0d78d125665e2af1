//! Tabla periódica mínima para el conteo de electrones.
//!
//! Sólo necesitamos símbolo → número atómico y una clasificación gruesa de
//! metales de transición (para detectar complejos de coordinación y para la
//! tabla de multiplicidades por defecto).

/// Símbolos ordenados por número atómico (índice = Z - 1).
const SYMBOLS: [&str; 118] = [
    "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S", "Cl", "Ar", "K", "Ca", "Sc",
    "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As", "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr",
    "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In", "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr",
    "Nd", "Pm", "Sm", "Eu", "Gd", "Tb", "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt",
    "Au", "Hg", "Tl", "Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th", "Pa", "U", "Np", "Pu", "Am", "Cm", "Bk",
    "Cf", "Es", "Fm", "Md", "No", "Lr", "Rf", "Db", "Sg", "Bh", "Hs", "Mt", "Ds", "Rg", "Cn", "Nh", "Fl", "Mc", "Lv",
    "Ts", "Og",
];

/// Clase química usada por la tabla de multiplicidades por defecto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementClass {
    /// Metal de transición con número atómico impar (Sc, V, Mn, Co, Cu, ...).
    OddElectronMetal,
    /// Metal de transición con número atómico par (Ti, Cr, Fe, Ni, Zn, ...).
    EvenElectronMetal,
    /// Cualquier otro elemento.
    MainGroup,
}

/// Número atómico de un símbolo (sensible a mayúsculas: `Cl`, no `CL`).
pub fn atomic_number(symbol: &str) -> Option<u32> {
    SYMBOLS.iter().position(|s| *s == symbol).map(|i| i as u32 + 1)
}

/// Bloque d (grupos 3-12) incluyendo lantánidos/actínidos del bloque f, que
/// para efectos de coordinación se comportan igual.
pub fn is_transition_metal(z: u32) -> bool {
    matches!(z, 21..=30 | 39..=48 | 57..=80 | 89..=112)
}

pub fn element_class(z: u32) -> ElementClass {
    if !is_transition_metal(z) {
        ElementClass::MainGroup
    } else if z % 2 == 1 {
        ElementClass::OddElectronMetal
    } else {
        ElementClass::EvenElectronMetal
    }
}
