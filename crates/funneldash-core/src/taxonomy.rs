use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// A manager code as it appears in campaign names, and the name shown in
/// the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerCode {
    pub code: String,
    pub name: String,
}

/// A token that, when present anywhere in a campaign name, attributes the
/// campaign to `name` regardless of the positional manager code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerAlias {
    pub token: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductNiche {
    pub product: String,
    pub niche: String,
}

fn default_advertiser_marker() -> String {
    "ADV".to_string()
}

fn default_variant_marker() -> String {
    "VSL".to_string()
}

/// Allow-lists and lookup tables used by the field extractors and the
/// RedTrack normalizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
    pub managers: Vec<ManagerCode>,
    #[serde(default)]
    pub manager_prefixes: Vec<String>,
    #[serde(default)]
    pub manager_aliases: Vec<ManagerAlias>,
    pub channels: Vec<String>,
    #[serde(default = "default_advertiser_marker")]
    pub advertiser_marker: String,
    #[serde(default = "default_variant_marker")]
    pub variant_marker: String,
    /// Ordered: the first product found in a landing string wins.
    pub products: Vec<ProductNiche>,
    #[serde(default)]
    pub redtrack_allowed_managers: Vec<String>,
}

/// Lowercase and drop all whitespace, the form product names are compared in.
#[must_use]
pub fn normalize_product_key(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

impl Taxonomy {
    /// Display name for a manager code, matched case-insensitively.
    #[must_use]
    pub fn manager_name(&self, code: &str) -> Option<&str> {
        self.managers
            .iter()
            .find(|m| m.code.eq_ignore_ascii_case(code))
            .map(|m| m.name.as_str())
    }

    /// Niche for a product name, compared case- and whitespace-insensitively.
    #[must_use]
    pub fn niche_for(&self, product: &str) -> Option<&str> {
        let key = normalize_product_key(product);
        if key.is_empty() {
            return None;
        }
        self.products
            .iter()
            .find(|p| normalize_product_key(&p.product) == key)
            .map(|p| p.niche.as_str())
    }

    /// Strip a configured manager prefix (`NTE-`, ...) from an uppercase token.
    #[must_use]
    pub fn strip_manager_prefix<'a>(&self, token: &'a str) -> &'a str {
        self.manager_prefixes
            .iter()
            .find_map(|prefix| token.strip_prefix(prefix.to_ascii_uppercase().as_str()))
            .unwrap_or(token)
    }

    #[must_use]
    pub fn is_redtrack_manager_allowed(&self, token: &str) -> bool {
        self.redtrack_allowed_managers
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(token))
    }
}

/// Load and validate the taxonomy from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_taxonomy(path: &Path) -> Result<Taxonomy, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::TaxonomyFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_taxonomy(&content)
}

/// Parse and validate taxonomy YAML.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_taxonomy(yaml: &str) -> Result<Taxonomy, ConfigError> {
    let taxonomy: Taxonomy = serde_yaml::from_str(yaml).map_err(ConfigError::TaxonomyFileParse)?;
    validate_taxonomy(&taxonomy)?;
    Ok(taxonomy)
}

fn validate_taxonomy(taxonomy: &Taxonomy) -> Result<(), ConfigError> {
    let non_empty = |kind: &str, value: &str| -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            Err(ConfigError::Validation(format!("{kind} must be non-empty")))
        } else {
            Ok(())
        }
    };

    let mut seen_codes = HashSet::new();
    for manager in &taxonomy.managers {
        non_empty("manager code", &manager.code)?;
        non_empty("manager name", &manager.name)?;
        if !seen_codes.insert(manager.code.to_ascii_uppercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate manager code: '{}'",
                manager.code
            )));
        }
    }

    for alias in &taxonomy.manager_aliases {
        non_empty("manager alias token", &alias.token)?;
        non_empty("manager alias name", &alias.name)?;
    }
    for prefix in &taxonomy.manager_prefixes {
        non_empty("manager prefix", prefix)?;
    }

    for channel in &taxonomy.channels {
        non_empty("channel code", channel)?;
    }

    non_empty("advertiser marker", &taxonomy.advertiser_marker)?;
    non_empty("variant marker", &taxonomy.variant_marker)?;

    let mut seen_products = HashSet::new();
    for entry in &taxonomy.products {
        non_empty("product", &entry.product)?;
        non_empty("niche", &entry.niche)?;
        if !seen_products.insert(normalize_product_key(&entry.product)) {
            return Err(ConfigError::Validation(format!(
                "duplicate product: '{}'",
                entry.product
            )));
        }
    }

    for allowed in &taxonomy.redtrack_allowed_managers {
        non_empty("redtrack allowed manager", allowed)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r"
managers:
  - { code: ERICK, name: Erick }
  - { code: BARROS, name: Barros }
manager_prefixes: [NTE-, NTM-]
manager_aliases:
  - { token: GB, name: Barros }
channels: [NB, TB]
products:
  - { product: memorylift, niche: Memória }
  - { product: memory lift, niche: Memória2 }
redtrack_allowed_managers: [NTE-ERICK]
";

    #[test]
    fn duplicate_product_after_normalization_is_rejected() {
        let err = parse_taxonomy(FIXTURE).unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation(ref msg) if msg.contains("duplicate product")),
            "got: {err:?}"
        );
    }

    fn fixture() -> Taxonomy {
        parse_taxonomy(&FIXTURE.replace("  - { product: memory lift, niche: Memória2 }\n", ""))
            .unwrap()
    }

    #[test]
    fn markers_default_when_omitted() {
        let taxonomy = fixture();
        assert_eq!(taxonomy.advertiser_marker, "ADV");
        assert_eq!(taxonomy.variant_marker, "VSL");
    }

    #[test]
    fn niche_lookup_ignores_case_and_whitespace() {
        let taxonomy = fixture();
        assert_eq!(taxonomy.niche_for("Memory Lift"), Some("Memória"));
        assert_eq!(taxonomy.niche_for("MEMORYLIFT"), Some("Memória"));
        assert_eq!(taxonomy.niche_for("unknown"), None);
        assert_eq!(taxonomy.niche_for("  "), None);
    }

    #[test]
    fn manager_prefix_is_stripped() {
        let taxonomy = fixture();
        assert_eq!(taxonomy.strip_manager_prefix("NTE-ERICK"), "ERICK");
        assert_eq!(taxonomy.strip_manager_prefix("ERICK"), "ERICK");
        assert_eq!(taxonomy.manager_name("erick"), Some("Erick"));
    }

    #[test]
    fn redtrack_allow_list_is_case_insensitive() {
        let taxonomy = fixture();
        assert!(taxonomy.is_redtrack_manager_allowed("nte-erick"));
        assert!(!taxonomy.is_redtrack_manager_allowed("NTE-LUIGI"));
    }

    #[test]
    fn empty_manager_code_is_rejected() {
        let yaml = "managers: [{ code: ' ', name: X }]\nchannels: []\nproducts: []\n";
        assert!(matches!(
            parse_taxonomy(yaml),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn load_taxonomy_reports_missing_file() {
        let err = load_taxonomy(Path::new("/nonexistent/taxonomy.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::TaxonomyFileIo { .. }));
    }
}
