//! Ligandos conocidos y estados de oxidación habituales.
//!
//! Sólo se reescriben complejos cuyos ligandos estén en esta tabla: sin la
//! forma fragmentada de cada ligando no hay ejemplo corregido que ofrecer.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ligand {
    /// Fórmula de Hill tal como la calcula `Structure::formula`.
    pub formula: &'static str,
    /// Otras grafías aceptadas en fórmulas condensadas (`OH`, `NH3`).
    pub aliases: &'static [&'static str],
    /// Fragmento con carga explícita.
    pub fragment: &'static str,
    pub charge: i32,
}

impl Ligand {
    pub fn is_anionic(&self) -> bool {
        self.charge < 0
    }
}

const LIGANDS: [Ligand; 8] = [Ligand { formula: "Cl", aliases: &[], fragment: "[Cl-]", charge: -1 },
                              Ligand { formula: "Br", aliases: &[], fragment: "[Br-]", charge: -1 },
                              Ligand { formula: "I", aliases: &[], fragment: "[I-]", charge: -1 },
                              Ligand { formula: "F", aliases: &[], fragment: "[F-]", charge: -1 },
                              Ligand { formula: "HO", aliases: &["OH"], fragment: "[OH-]", charge: -1 },
                              Ligand { formula: "CN", aliases: &["NC"], fragment: "[C-]#N", charge: -1 },
                              // Escrito covalentemente el N unido al metal pierde un H implícito.
                              Ligand { formula: "H3N", aliases: &["NH3", "H2N"], fragment: "N", charge: 0 },
                              Ligand { formula: "H2O", aliases: &["OH2"], fragment: "O", charge: 0 }];

pub fn by_formula(formula: &str) -> Option<&'static Ligand> {
    LIGANDS.iter().find(|l| l.formula == formula || l.aliases.contains(&formula))
}

/// Estado de oxidación más frecuente; se usa cuando nadie declara la carga.
pub fn common_oxidation_state(metal: &str) -> i32 {
    match metal {
        "Sc" | "V" | "Cr" | "Fe" | "Y" | "Rh" | "Au" | "La" => 3,
        "Ti" | "Zr" | "Hf" | "Pt" => 4,
        "Ag" => 1,
        _ => 2,
    }
}

/// Fragmento de metal con carga explícita: `[Mn+2]`, `[Ag+]`, `[Fe]`.
pub fn metal_fragment(symbol: &str, charge: i32) -> String {
    match charge {
        0 => format!("[{symbol}]"),
        1 => format!("[{symbol}+]"),
        -1 => format!("[{symbol}-]"),
        c if c > 0 => format!("[{symbol}+{c}]"),
        c => format!("[{symbol}{c}]"),
    }
}
