//! Habitable planet catalog.
//!
//! The catalog is read once at startup from a JSON dump of Kepler objects of
//! interest. Only confirmed planets with an Earth-like stellar flux and radius
//! are kept; everything afterwards is a read-only membership check.
use crate::types::Planet;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

const CONFIRMED: &str = "CONFIRMED";
const MIN_INSOLATION: f64 = 0.36;
const MAX_INSOLATION: f64 = 1.11;
const MAX_PLANET_RADIUS: f64 = 1.6;

#[derive(thiserror::Error, Debug)]
pub enum PlanetError {
    #[error("could not read planet catalog: {0}")]
    Io(#[from] io::Error),
    #[error("could not parse planet catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Deserialize, Debug)]
struct KeplerRecord {
    kepler_name: Option<String>,
    koi_disposition: String,
    koi_insol: Option<f64>,
    koi_prad: Option<f64>,
}

impl KeplerRecord {
    fn is_habitable(&self) -> bool {
        let flux_ok = self
            .koi_insol
            .is_some_and(|insol| insol > MIN_INSOLATION && insol < MAX_INSOLATION);
        let radius_ok = self.koi_prad.is_some_and(|prad| prad < MAX_PLANET_RADIUS);

        self.koi_disposition == CONFIRMED && flux_ok && radius_ok
    }
}

/// Set of valid launch destinations.
#[derive(Debug, Default)]
pub struct PlanetLookup {
    names: HashSet<String>,
    planets: Vec<Planet>,
}

impl PlanetLookup {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut lookup = PlanetLookup::default();
        for name in names {
            lookup.insert(name.into());
        }
        lookup
    }

    /// Loads the habitable planets from a Kepler catalog file.
    pub fn load(path: &Path) -> Result<Self, PlanetError> {
        let file = File::open(path)?;
        let lookup = Self::from_reader(BufReader::new(file))?;
        tracing::info!(
            path = %path.display(),
            habitable = lookup.len(),
            "loaded planet catalog"
        );
        Ok(lookup)
    }

    fn from_reader<R: Read>(reader: R) -> Result<Self, PlanetError> {
        let records: Vec<KeplerRecord> = serde_json::from_reader(reader)?;
        let names = records
            .into_iter()
            .filter(KeplerRecord::is_habitable)
            .filter_map(|record| record.kepler_name)
            .filter(|name| !name.is_empty());
        Ok(Self::new(names))
    }

    fn insert(&mut self, name: String) {
        if self.names.insert(name.clone()) {
            self.planets.push(Planet::new(name));
        }
    }

    pub fn exists(&self, target: &str) -> bool {
        self.names.contains(target)
    }

    /// Planets in catalog order.
    pub fn planets(&self) -> &[Planet] {
        &self.planets
    }

    pub fn len(&self) -> usize {
        self.planets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.planets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CATALOG: &str = r#"[
        {"kepler_name": "Kepler-62 f", "koi_disposition": "CONFIRMED", "koi_insol": 0.41, "koi_prad": 1.41},
        {"kepler_name": "Kepler-442 b", "koi_disposition": "CONFIRMED", "koi_insol": 0.7, "koi_prad": 1.34},
        {"kepler_name": "Kepler-22 b", "koi_disposition": "CONFIRMED", "koi_insol": 1.11, "koi_prad": 2.1},
        {"kepler_name": null, "koi_disposition": "CANDIDATE", "koi_insol": 0.5, "koi_prad": 1.0},
        {"kepler_name": "Kepler-1649 b", "koi_disposition": "FALSE POSITIVE", "koi_insol": 0.75, "koi_prad": 1.06},
        {"kepler_name": "Kepler-296 A f", "koi_disposition": "CONFIRMED", "koi_insol": null, "koi_prad": 1.5},
        {"kepler_name": "Kepler-62 f", "koi_disposition": "CONFIRMED", "koi_insol": 0.41, "koi_prad": 1.41}
    ]"#;

    #[test]
    fn test_habitable_filter() {
        let lookup = PlanetLookup::from_reader(CATALOG.as_bytes()).unwrap();

        assert_eq!(
            lookup.planets(),
            &[Planet::new("Kepler-62 f"), Planet::new("Kepler-442 b")]
        );
        assert!(lookup.exists("Kepler-62 f"));
        assert!(lookup.exists("Kepler-442 b"));
        // Insolation bound is exclusive.
        assert!(!lookup.exists("Kepler-22 b"));
        assert!(!lookup.exists("Kepler-1649 b"));
        assert!(!lookup.exists("Kepler-296 A f"));
    }

    #[test]
    fn test_exact_match() {
        let lookup = PlanetLookup::new(["Kepler-62 f"]);
        assert!(lookup.exists("Kepler-62 f"));
        assert!(!lookup.exists("kepler-62 f"));
        assert!(!lookup.exists("Kepler-62 f "));
        assert!(!lookup.exists("Test planet"));
    }

    #[test]
    fn test_load_from_file() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        write!(tmp, "{CATALOG}").unwrap();

        let lookup = PlanetLookup::load(tmp.path()).unwrap();
        assert_eq!(lookup.len(), 2);
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = PlanetLookup::load(&dir.path().join("missing.json"));
        assert!(matches!(missing, Err(PlanetError::Io(_))));

        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        write!(tmp, "kepler_name,koi_disposition").unwrap();
        assert!(matches!(
            PlanetLookup::load(tmp.path()),
            Err(PlanetError::Parse(_))
        ));
    }

    #[test]
    fn test_bundled_catalog() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../data/kepler_planets.json");
        let lookup = PlanetLookup::load(&path).unwrap();

        assert_eq!(lookup.len(), 7);
        assert!(lookup.exists("Kepler-1652 b"));
        assert!(!lookup.exists("Kepler-1544 b"));
        assert!(!lookup.exists("Kepler-186 b"));
    }
}
