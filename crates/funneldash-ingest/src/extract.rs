//! Field extractors: pull categorical attributes out of campaign,
//! pre-landing and landing strings.
//!
//! Every extractor is a pure function of its input and the injected
//! [`Taxonomy`]. A missing pattern yields `None`, never an error.

use regex::Regex;

use funneldash_core::taxonomy::{normalize_product_key, Taxonomy};
use funneldash_core::CampaignDelimiter;

/// Variant, product and niche read from a landing string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LandingFields {
    pub variant: Option<String>,
    pub product: Option<String>,
    pub niche: Option<String>,
}

/// Attributes read by position from a delimited campaign name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionalFields {
    pub manager: Option<String>,
    pub platform: Option<String>,
    pub niche: Option<String>,
    pub product: Option<String>,
    pub site: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FieldExtractor {
    taxonomy: Taxonomy,
    advertiser_re: Regex,
    variant_re: Regex,
    parenthesized_re: Regex,
}

fn non_empty(segment: Option<&str>) -> Option<String> {
    segment
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn marked_token(re: &Regex, marker: &str, text: &str) -> Option<String> {
    let id = re.captures(text)?.get(1)?.as_str().trim_end_matches('.');
    if id.is_empty() {
        return None;
    }
    Some(format!("{marker}{id}").to_lowercase())
}

impl FieldExtractor {
    /// Compile the marker patterns for `taxonomy`.
    ///
    /// # Errors
    ///
    /// Returns `regex::Error` if a pattern fails to compile. Markers are
    /// escaped, so this only happens for pathological marker lengths.
    pub fn new(taxonomy: Taxonomy) -> Result<Self, regex::Error> {
        let advertiser_re = Regex::new(&format!(
            r"(?i){}\s*([\d.]+)",
            regex::escape(&taxonomy.advertiser_marker)
        ))?;
        let variant_re = Regex::new(&format!(
            r"(?i){}\s*([\w.]+)",
            regex::escape(&taxonomy.variant_marker)
        ))?;
        let parenthesized_re = Regex::new(r"\(([^)]+)\)")?;

        Ok(Self {
            taxonomy,
            advertiser_re,
            variant_re,
            parenthesized_re,
        })
    }

    #[must_use]
    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    /// Manager display name from a campaign name.
    ///
    /// The campaign is split on `|` and `_`; segments are compared
    /// case-insensitively after stripping configured prefixes such as `NTE-`.
    /// An alias token anywhere in the name wins over manager codes.
    #[must_use]
    pub fn manager(&self, campaign: &str) -> Option<String> {
        let segments: Vec<String> = campaign
            .split(['|', '_'])
            .map(|s| s.trim().to_ascii_uppercase())
            .filter(|s| !s.is_empty())
            .collect();

        if let Some(alias) = self.taxonomy.manager_aliases.iter().find(|alias| {
            segments
                .iter()
                .any(|s| s.eq_ignore_ascii_case(alias.token.trim()))
        }) {
            return Some(alias.name.clone());
        }

        self.taxonomy
            .managers
            .iter()
            .find(|manager| {
                segments.iter().any(|s| {
                    self.taxonomy
                        .strip_manager_prefix(s)
                        .eq_ignore_ascii_case(manager.code.trim())
                })
            })
            .map(|manager| manager.name.clone())
    }

    /// Channel code from a campaign name, when one appears as its own
    /// pipe-delimited segment.
    #[must_use]
    pub fn channel(&self, campaign: &str) -> Option<String> {
        let segments: Vec<&str> = campaign.split('|').map(str::trim).collect();
        self.taxonomy
            .channels
            .iter()
            .find(|code| segments.iter().any(|s| s.eq_ignore_ascii_case(code)))
            .map(|code| code.to_ascii_uppercase())
    }

    /// Advertiser token from a pre-landing string, e.g. `"ADV 02"` → `adv02`.
    #[must_use]
    pub fn advertiser(&self, prelanding: &str) -> Option<String> {
        marked_token(
            &self.advertiser_re,
            &self.taxonomy.advertiser_marker,
            prelanding,
        )
    }

    /// Variant, product and niche from a landing string.
    ///
    /// The product is the parenthesized suffix when present, otherwise the
    /// first configured product contained in the string, compared with case
    /// and whitespace ignored.
    #[must_use]
    pub fn landing(&self, landing: &str) -> LandingFields {
        if landing.trim().is_empty() {
            return LandingFields::default();
        }

        let variant = marked_token(&self.variant_re, &self.taxonomy.variant_marker, landing);

        let product = match self.parenthesized_re.captures(landing) {
            Some(caps) => non_empty(caps.get(1).map(|m| m.as_str())).map(|p| p.to_lowercase()),
            None => {
                let key = normalize_product_key(landing);
                self.taxonomy
                    .products
                    .iter()
                    .map(|entry| normalize_product_key(&entry.product))
                    .find(|product| !product.is_empty() && key.contains(product.as_str()))
            }
        };

        let niche = product
            .as_deref()
            .and_then(|p| self.taxonomy.niche_for(p))
            .map(str::to_string);

        LandingFields {
            variant,
            product,
            niche,
        }
    }

    /// Read attributes by position from a delimited campaign name.
    ///
    /// Pipe convention: `[1]` manager (uppercased), `[3]` niche, `[4]`
    /// product, `[6]` site. Underscore convention with at least six
    /// segments: `[1]` manager, `[2]` platform, `[3]` niche, `[4]` site and
    /// the rest joined as product; shorter names map `[1]` manager, `[2]`
    /// niche and the rest as product. Missing segments yield `None`.
    #[must_use]
    pub fn positional(&self, campaign: &str, delimiter: CampaignDelimiter) -> PositionalFields {
        match delimiter {
            CampaignDelimiter::Pipe => {
                let parts: Vec<&str> = campaign.split('|').collect();
                let at = |i: usize| non_empty(parts.get(i).copied());
                PositionalFields {
                    manager: at(1).map(|m| m.to_ascii_uppercase()),
                    platform: None,
                    niche: at(3),
                    product: at(4),
                    site: at(6),
                }
            }
            CampaignDelimiter::Underscore => {
                let parts: Vec<&str> = campaign.split('_').map(str::trim).collect();
                let at = |i: usize| non_empty(parts.get(i).copied());
                let joined_from = |i: usize| {
                    let rest: Vec<&str> = parts
                        .iter()
                        .skip(i)
                        .copied()
                        .filter(|s| !s.is_empty())
                        .collect();
                    if rest.is_empty() {
                        None
                    } else {
                        Some(rest.join("_"))
                    }
                };

                if parts.len() >= 6 {
                    PositionalFields {
                        manager: at(1).map(|m| m.to_ascii_uppercase()),
                        platform: at(2),
                        niche: at(3),
                        site: at(4),
                        product: joined_from(5),
                    }
                } else {
                    PositionalFields {
                        manager: at(1).map(|m| m.to_ascii_uppercase()),
                        platform: None,
                        niche: at(2),
                        site: None,
                        product: joined_from(3),
                    }
                }
            }
        }
    }

    /// Resolve a positional manager token (e.g. `NTE-ERICK`) to its display
    /// name, falling back to the token itself.
    #[must_use]
    pub fn manager_display(&self, token: &str) -> String {
        let upper = token.trim().to_ascii_uppercase();
        self.taxonomy
            .manager_name(self.taxonomy.strip_manager_prefix(&upper))
            .map_or(upper.clone(), str::to_string)
    }
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
