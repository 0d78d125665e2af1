//! Alias de nombres de método y valores por defecto de la solicitud.

pub const DEFAULT_METHOD: &str = "uma_m_omol";
pub const DEFAULT_ENGINE: &str = "omol25";
pub const DEFAULT_TASKS: [&str; 1] = ["optimize"];

/// Variantes con guion bajo que los llamadores suelen escribir.
const METHOD_ALIASES: [(&str, &str); 7] = [("gfn2_xtb", "gfn2-xtb"),
                                           ("gfn1_xtb", "gfn1-xtb"),
                                           ("gfn0_xtb", "gfn0-xtb"),
                                           ("r2scan_3c", "r2scan-3c"),
                                           ("wb97x_d3", "wb97x-d3"),
                                           ("wb97m_d3bj", "wb97m-d3bj"),
                                           ("b3lyp_d3bj", "b3lyp-d3bj")];

/// Nombre canónico de un método (minúsculas, alias resueltos).
pub fn canonical_method(raw: &str) -> String {
    let lowered = raw.trim().to_ascii_lowercase();
    METHOD_ALIASES.iter()
                  .find(|(alias, _)| *alias == lowered)
                  .map(|(_, canonical)| canonical.to_string())
                  .unwrap_or(lowered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_resolve_case_insensitively() {
        assert_eq!(canonical_method("GFN2_xTB"), "gfn2-xtb");
        assert_eq!(canonical_method("b3lyp_d3bj"), "b3lyp-d3bj");
        assert_eq!(canonical_method(" uma_m_omol "), "uma_m_omol");
        assert_eq!(canonical_method("wB97X-D3"), "wb97x-d3");
    }
}
