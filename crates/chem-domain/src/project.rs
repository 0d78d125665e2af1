//! Proyectos: el contenedor más alto. Cada uno trae su carpeta raíz y su
//! repositorio de estructuras, que viven del lado del servicio.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectFilter {
    pub name_contains: Option<String>,
}

impl ProjectFilter {
    pub fn matches(&self, p: &Project) -> bool {
        self.name_contains
            .as_ref()
            .map_or(true, |n| p.name.to_lowercase().contains(&n.to_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_filter_ignores_case() {
        let project = Project { id: "p1".into(),
                                name: "BioArena Battles".into(),
                                created_at: None };
        let filter = ProjectFilter { name_contains: Some("arena".into()) };
        assert!(filter.matches(&project));
        assert!(ProjectFilter::default().matches(&project));
        let filter = ProjectFilter { name_contains: Some("docking".into()) };
        assert!(!filter.matches(&project));
    }
}
