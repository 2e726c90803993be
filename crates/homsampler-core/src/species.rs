//! Species and release resolution against a host's schema catalog
//!
//! The catalog is the output of `SHOW DATABASES`. Core schemas are named
//! `<production_name>_core_<release>_<assembly>`, the compara schema
//! `ensembl_compara_<release>`. Users name species loosely ("Human",
//! "hsap", "Homo sapiens", or the schema itself), so names are normalized
//! and looked up through a built-in alias table before falling back to the
//! production name.

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;
use strsim::levenshtein;

use crate::error::ConfigError;
use crate::model::Species;
use crate::store::GenomeStore;

/// Maximum edit distance for "did you mean" suggestions
const SUGGESTION_DISTANCE: usize = 3;

/// `(production name, common name, taxon id, extra aliases)`
const KNOWN_SPECIES: &[(&str, &str, u32, &[&str])] = &[
    ("homo_sapiens", "Human", 9606, &["hsap"]),
    ("pan_troglodytes", "Chimp", 9598, &["chimpanzee"]),
    ("gorilla_gorilla", "Gorilla", 9595, &[]),
    ("pongo_abelii", "Orangutan", 9601, &[]),
    ("macaca_mulatta", "Macaque", 9544, &["rhesus"]),
    ("callithrix_jacchus", "Marmoset", 9483, &[]),
    ("mus_musculus", "Mouse", 10090, &[]),
    ("rattus_norvegicus", "Rat", 10116, &[]),
    ("cavia_porcellus", "Guinea Pig", 10141, &[]),
    ("oryctolagus_cuniculus", "Rabbit", 9986, &[]),
    ("canis_familiaris", "Dog", 9615, &[]),
    ("felis_catus", "Cat", 9685, &[]),
    ("bos_taurus", "Cow", 9913, &[]),
    ("sus_scrofa", "Pig", 9823, &[]),
    ("ovis_aries", "Sheep", 9940, &[]),
    ("equus_caballus", "Horse", 9796, &[]),
    ("loxodonta_africana", "Elephant", 9785, &[]),
    ("monodelphis_domestica", "Opossum", 13616, &[]),
    ("macropus_eugenii", "Wallaby", 9315, &[]),
    ("ornithorhynchus_anatinus", "Platypus", 9258, &[]),
    ("gallus_gallus", "Chicken", 9031, &[]),
    ("meleagris_gallopavo", "Turkey", 9103, &[]),
    ("taeniopygia_guttata", "Zebra Finch", 59729, &[]),
    ("anolis_carolinensis", "Anole Lizard", 28377, &["anole"]),
    ("xenopus_tropicalis", "Frog", 8364, &["xenopus"]),
    ("danio_rerio", "Zebrafish", 7955, &[]),
    ("takifugu_rubripes", "Fugu", 31033, &[]),
    ("oryzias_latipes", "Medaka", 8090, &[]),
    ("drosophila_melanogaster", "Fruit Fly", 7227, &["fly"]),
    ("caenorhabditis_elegans", "C. elegans", 6239, &["worm"]),
    ("saccharomyces_cerevisiae", "Yeast", 4932, &[]),
];

fn core_schema_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        #[allow(clippy::expect_used)]
        Regex::new(r"^(?P<species>[a-z0-9_]+?)_core_(?P<release>\d+)_(?P<assembly>\w+)$")
            .expect("core schema pattern is valid")
    })
}

/// Lowercase, with spaces, dots and hyphens folded to `_`
fn normalize(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| if matches!(c, ' ' | '.' | '-') { '_' } else { c })
        .collect()
}

/// `homo_sapiens` -> `hsap`
fn short_code(production_name: &str) -> Option<String> {
    let mut parts = production_name.split('_');
    let genus = parts.next()?;
    let species = parts.next()?;
    let g = genus.chars().next()?;
    let s: String = species.chars().take(3).collect();
    (s.len() == 3).then(|| format!("{}{}", g, s))
}

fn known(production_name: &str) -> Option<&'static (&'static str, &'static str, u32, &'static [&'static str])> {
    KNOWN_SPECIES.iter().find(|(name, ..)| *name == production_name)
}

/// Turn `monodelphis_domestica` into `Monodelphis domestica` for species
/// without a common name
fn display_name(production_name: &str) -> String {
    let mut name = production_name.replace('_', " ");
    if let Some(first) = name.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    name
}

/// One core schema parsed from the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreSchema {
    pub db_name: String,
    pub production_name: String,
    pub release: u32,
    pub assembly: String,
}

impl CoreSchema {
    pub fn parse(db_name: &str) -> Option<Self> {
        let caps = core_schema_pattern().captures(db_name)?;
        Some(Self {
            db_name: db_name.to_string(),
            production_name: caps["species"].to_string(),
            release: caps["release"].parse().ok()?,
            assembly: caps["assembly"].to_string(),
        })
    }

    fn to_species(&self) -> Species {
        let (common_name, taxon_id) = match known(&self.production_name) {
            Some((_, common, taxon, _)) => (common.to_string(), Some(*taxon)),
            None => (display_name(&self.production_name), None),
        };
        Species {
            name: self.production_name.clone(),
            common_name,
            core_db: self.db_name.clone(),
            taxon_id,
        }
    }

    /// Every normalized name this schema answers to, strongest first
    fn names(&self) -> Vec<String> {
        let mut names = Vec::new();
        if let Some((_, common, _, aliases)) = known(&self.production_name) {
            names.push(normalize(common));
            names.extend(aliases.iter().map(|a| normalize(a)));
        }
        names.push(self.production_name.clone());
        names.extend(short_code(&self.production_name));
        names.push(self.db_name.clone());
        names
    }
}

/// Row of `show_available_species`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailableSpecies {
    pub release: u32,
    pub species: Species,
}

/// Resolves user species names within one host's catalog
#[derive(Debug, Clone)]
pub struct SpeciesResolver {
    cores: Vec<CoreSchema>,
    compara: BTreeSet<u32>,
}

impl SpeciesResolver {
    pub fn new<I, S>(schema_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cores = Vec::new();
        let mut compara = BTreeSet::new();
        for name in schema_names {
            let name = name.as_ref();
            if let Some(core) = CoreSchema::parse(name) {
                cores.push(core);
            } else if let Some(release) = name
                .strip_prefix("ensembl_compara_")
                .and_then(|r| r.parse::<u32>().ok())
            {
                compara.insert(release);
            }
        }
        cores.sort_by(|a, b| a.release.cmp(&b.release).then(a.db_name.cmp(&b.db_name)));
        Self { cores, compara }
    }

    /// Releases with at least one core schema
    pub fn releases(&self) -> BTreeSet<u32> {
        self.cores.iter().map(|c| c.release).collect()
    }

    fn has_release(&self, release: u32) -> bool {
        self.compara.contains(&release) || self.cores.iter().any(|c| c.release == release)
    }

    /// Compara schema name for a release
    pub fn compara_db(&self, release: u32) -> Result<String, ConfigError> {
        if !self.has_release(release) {
            return Err(ConfigError::UnknownRelease(release));
        }
        if self.compara.contains(&release) {
            Ok(format!("ensembl_compara_{}", release))
        } else {
            Err(ConfigError::MissingCompara(release))
        }
    }

    /// Resolve one name within a release
    pub fn resolve_one(&self, name: &str, release: u32) -> Result<Species, ConfigError> {
        if !self.has_release(release) {
            return Err(ConfigError::UnknownRelease(release));
        }

        let wanted = normalize(name);
        let in_release: Vec<&CoreSchema> =
            self.cores.iter().filter(|c| c.release == release).collect();

        // Aliases and common names win over production names, which win over
        // schema names; names() lists them in that order for each schema.
        let best = in_release
            .iter()
            .filter_map(|core| {
                core.names()
                    .iter()
                    .position(|n| *n == wanted)
                    .map(|rank| (rank, *core))
            })
            .min_by_key(|(rank, _)| *rank);

        match best {
            Some((_, core)) => Ok(core.to_species()),
            None => Err(ConfigError::UnknownSpecies {
                name: name.to_string(),
                release,
                suggestions: self.suggestions(&wanted, &in_release),
            }),
        }
    }

    /// Resolve every name, preserving request order
    pub fn resolve<S: AsRef<str>>(&self, names: &[S], release: u32) -> Result<Vec<Species>, ConfigError> {
        names
            .iter()
            .map(|name| self.resolve_one(name.as_ref(), release))
            .collect()
    }

    fn suggestions(&self, wanted: &str, in_release: &[&CoreSchema]) -> Vec<String> {
        let mut scored: BTreeMap<(usize, String), ()> = BTreeMap::new();
        for core in in_release {
            let species = core.to_species();
            let best = core
                .names()
                .iter()
                .map(|n| levenshtein(wanted, n))
                .min()
                .unwrap_or(usize::MAX);
            if best <= SUGGESTION_DISTANCE {
                scored.insert((best, species.common_name), ());
            }
        }
        scored.into_keys().take(3).map(|(_, name)| name).collect()
    }

    /// Species with a core schema, optionally for one release only
    pub fn available(&self, release: Option<u32>) -> Vec<AvailableSpecies> {
        self.cores
            .iter()
            .filter(|c| release.map_or(true, |r| c.release == r))
            .map(|c| AvailableSpecies {
                release: c.release,
                species: c.to_species(),
            })
            .collect()
    }
}

/// Look up taxon ids the alias table does not know
pub async fn fill_taxon_ids(store: &dyn GenomeStore, species: &mut [Species]) {
    for sp in species.iter_mut().filter(|s| s.taxon_id.is_none()) {
        match store.taxon_id(&sp.core_db).await {
            Ok(taxon_id) => sp.taxon_id = taxon_id,
            Err(e) => tracing::warn!(species = %sp.name, error = %e, "No taxon id"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn resolver() -> SpeciesResolver {
        SpeciesResolver::new([
            "information_schema",
            "homo_sapiens_core_81_38",
            "mus_musculus_core_81_38",
            "monodelphis_domestica_core_81_5",
            "ailuropoda_melanoleuca_core_81_1",
            "homo_sapiens_core_82_38",
            "homo_sapiens_variation_81_38",
            "ensembl_compara_81",
        ])
    }

    #[test]
    fn test_parse_core_schema() {
        let core = CoreSchema::parse("monodelphis_domestica_core_81_5").unwrap();
        assert_eq!(core.production_name, "monodelphis_domestica");
        assert_eq!(core.release, 81);
        assert_eq!(core.assembly, "5");
        assert!(CoreSchema::parse("homo_sapiens_variation_81_38").is_none());
        assert!(CoreSchema::parse("ensembl_compara_81").is_none());
    }

    #[test]
    fn test_resolve_by_alias_latin_and_schema() {
        let r = resolver();
        for name in ["Human", "human", "hsap", "Homo sapiens", "homo_sapiens", "homo_sapiens_core_81_38"] {
            let sp = r.resolve_one(name, 81).unwrap();
            assert_eq!(sp.core_db, "homo_sapiens_core_81_38", "{}", name);
            assert_eq!(sp.common_name, "Human");
            assert_eq!(sp.taxon_id, Some(9606));
        }
    }

    #[test]
    fn test_resolve_keeps_request_order() {
        let species = resolver().resolve(&["opossum", "Human", "Mouse"], 81).unwrap();
        let names: Vec<_> = species.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["monodelphis_domestica", "homo_sapiens", "mus_musculus"]);
    }

    #[test]
    fn test_unlisted_species_falls_back_to_production_name() {
        let sp = resolver().resolve_one("Ailuropoda melanoleuca", 81).unwrap();
        assert_eq!(sp.common_name, "Ailuropoda melanoleuca");
        assert_eq!(sp.taxon_id, None);
    }

    #[test]
    fn test_unknown_species_suggests() {
        let err = resolver().resolve_one("huamn", 81).unwrap_err();
        match err {
            ConfigError::UnknownSpecies { suggestions, .. } => {
                assert_eq!(suggestions, vec!["Human".to_string()]);
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_release() {
        let r = resolver();
        assert!(matches!(r.resolve_one("human", 99), Err(ConfigError::UnknownRelease(99))));
        assert!(matches!(r.compara_db(99), Err(ConfigError::UnknownRelease(99))));
        assert!(matches!(r.compara_db(82), Err(ConfigError::MissingCompara(82))));
        assert_eq!(r.compara_db(81).unwrap(), "ensembl_compara_81");
    }

    #[test]
    fn test_available_species() {
        let r = resolver();
        assert_eq!(r.available(Some(81)).len(), 4);
        assert_eq!(r.available(None).len(), 5);
        assert_eq!(r.releases().into_iter().collect::<Vec<_>>(), vec![81, 82]);
    }
}
