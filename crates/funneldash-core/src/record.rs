use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money;

/// One campaign's performance on one calendar date.
///
/// Optional categorical fields stay `None` when the source did not carry
/// them; they are never replaced with placeholder strings. Money columns
/// carry two decimal places and `roi` carries four.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunnelRecord {
    pub campaign: String,
    pub manager: Option<String>,
    pub channel: Option<String>,
    pub niche: Option<String>,
    pub advertiser: Option<String>,
    pub variant: Option<String>,
    pub product: Option<String>,
    pub date: NaiveDate,
    pub cost: Decimal,
    pub profit: Decimal,
    pub roi: Decimal,
    pub purchases: u32,
    pub initiate_checkout_cpa: Decimal,
}

impl FunnelRecord {
    /// A record with no categorical fields and zeroed metrics.
    #[must_use]
    pub fn new(campaign: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            campaign: campaign.into(),
            manager: None,
            channel: None,
            niche: None,
            advertiser: None,
            variant: None,
            product: None,
            date,
            cost: money::money(Decimal::ZERO),
            profit: money::money(Decimal::ZERO),
            roi: money::ratio(Decimal::ZERO),
            purchases: 0,
            initiate_checkout_cpa: money::money(Decimal::ZERO),
        }
    }

    /// Value of a single categorical field.
    #[must_use]
    pub fn field(&self, field: IdentityField) -> Option<&str> {
        match field {
            IdentityField::Manager => self.manager.as_deref(),
            IdentityField::Channel => self.channel.as_deref(),
            IdentityField::Niche => self.niche.as_deref(),
            IdentityField::Advertiser => self.advertiser.as_deref(),
            IdentityField::Variant => self.variant.as_deref(),
            IdentityField::Product => self.product.as_deref(),
        }
    }
}

/// A categorical column that can participate in a funnel identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentityField {
    Manager,
    Channel,
    Niche,
    Advertiser,
    Variant,
    Product,
}

/// Which categorical fields a dashboard deployment reads, and therefore
/// which fields define a funnel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVersion {
    /// Sub-field based: manager, channel, niche, advertiser, variant, product.
    V1,
    /// Campaign-name based: manager, channel, niche, product.
    V2,
}

impl SchemaVersion {
    #[must_use]
    pub fn identity_fields(self) -> &'static [IdentityField] {
        match self {
            SchemaVersion::V1 => &[
                IdentityField::Manager,
                IdentityField::Channel,
                IdentityField::Niche,
                IdentityField::Advertiser,
                IdentityField::Variant,
                IdentityField::Product,
            ],
            SchemaVersion::V2 => &[
                IdentityField::Manager,
                IdentityField::Channel,
                IdentityField::Niche,
                IdentityField::Product,
            ],
        }
    }
}

impl std::fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaVersion::V1 => write!(f, "v1"),
            SchemaVersion::V2 => write!(f, "v2"),
        }
    }
}

impl std::str::FromStr for SchemaVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v1" => Ok(SchemaVersion::V1),
            "v2" => Ok(SchemaVersion::V2),
            other => Err(format!("expected v1 or v2; got {other:?}")),
        }
    }
}

/// Separator used by campaign names when decomposed positionally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CampaignDelimiter {
    Pipe,
    Underscore,
}

impl std::str::FromStr for CampaignDelimiter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pipe" | "|" => Ok(CampaignDelimiter::Pipe),
            "underscore" | "_" => Ok(CampaignDelimiter::Underscore),
            other => Err(format!("expected pipe or underscore; got {other:?}")),
        }
    }
}

/// The tuple of categorical values that defines one funnel.
///
/// Fields outside the active schema's identity are always `None`, so two
/// records project to the same identity exactly when they agree on every
/// identity field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FunnelIdentity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manager: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub niche: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advertiser: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
}

impl FunnelIdentity {
    #[must_use]
    pub fn project(record: &FunnelRecord, fields: &[IdentityField]) -> Self {
        let mut identity = Self::default();
        for field in fields {
            let value = record.field(*field).map(str::to_string);
            match field {
                IdentityField::Manager => identity.manager = value,
                IdentityField::Channel => identity.channel = value,
                IdentityField::Niche => identity.niche = value,
                IdentityField::Advertiser => identity.advertiser = value,
                IdentityField::Variant => identity.variant = value,
                IdentityField::Product => identity.product = value,
            }
        }
        identity
    }
}

/// Conjunctive filter over stored records. `None` means "any value".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunnelFilters {
    pub manager: Option<String>,
    pub channel: Option<String>,
    pub niche: Option<String>,
    pub advertiser: Option<String>,
    pub variant: Option<String>,
    pub product: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl FunnelFilters {
    /// Drop blank string filters, as sent by empty select boxes.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        for value in [
            &mut self.manager,
            &mut self.channel,
            &mut self.niche,
            &mut self.advertiser,
            &mut self.variant,
            &mut self.product,
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                *value = None;
            }
        }
        self
    }

    #[must_use]
    pub fn matches(&self, record: &FunnelRecord) -> bool {
        let field_ok = |wanted: &Option<String>, actual: &Option<String>| match wanted {
            Some(w) => actual.as_deref() == Some(w.as_str()),
            None => true,
        };

        field_ok(&self.manager, &record.manager)
            && field_ok(&self.channel, &record.channel)
            && field_ok(&self.niche, &record.niche)
            && field_ok(&self.advertiser, &record.advertiser)
            && field_ok(&self.variant, &record.variant)
            && field_ok(&self.product, &record.product)
            && self.start_date.is_none_or(|start| record.date >= start)
            && self.end_date.is_none_or(|end| record.date <= end)
    }
}

/// Distinct non-empty values per categorical field, each sorted ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub managers: Vec<String>,
    pub channels: Vec<String>,
    pub niches: Vec<String>,
    pub advertisers: Vec<String>,
    pub variants: Vec<String>,
    pub products: Vec<String>,
}

impl FilterOptions {
    /// Collect options from an in-memory record set.
    #[must_use]
    pub fn from_records(records: &[FunnelRecord]) -> Self {
        use std::collections::BTreeSet;

        let collect = |field: IdentityField| -> Vec<String> {
            records
                .iter()
                .filter_map(|r| r.field(field))
                .filter(|v| !v.trim().is_empty())
                .map(str::to_string)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        };

        Self {
            managers: collect(IdentityField::Manager),
            channels: collect(IdentityField::Channel),
            niches: collect(IdentityField::Niche),
            advertisers: collect(IdentityField::Advertiser),
            variants: collect(IdentityField::Variant),
            products: collect(IdentityField::Product),
        }
    }
}
