use funneldash_core::parse_taxonomy;

use super::*;

const TAXONOMY: &str = r"
managers:
  - { code: CARLOS, name: Carlos }
  - { code: LUIGI, name: Luigi }
  - { code: ERICK, name: Erick }
  - { code: BARROS, name: Barros }
manager_prefixes: [NTE-, NTM-]
manager_aliases:
  - { token: GB, name: Barros }
channels: [NB, TB, MG, RC, OB]
products:
  - { product: memorylift, niche: Memória }
  - { product: liporise, niche: Emagrecimento }
  - { product: glucosense, niche: Diabetes }
redtrack_allowed_managers: [NTE-ERICK, NTE-BARROS]
";

fn extractor() -> FieldExtractor {
    FieldExtractor::new(parse_taxonomy(TAXONOMY).unwrap()).unwrap()
}

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

#[test]
fn manager_from_prefixed_code() {
    assert_eq!(
        extractor().manager("NTE-ERICK | NB | Memória").as_deref(),
        Some("Erick")
    );
    assert_eq!(
        extractor().manager("ntm-luigi|TB|x").as_deref(),
        Some("Luigi")
    );
}

#[test]
fn manager_from_bare_segment() {
    assert_eq!(
        extractor().manager("CAMP|BARROS|..").as_deref(),
        Some("Barros")
    );
}

#[test]
fn manager_alias_overrides_positional_code() {
    assert_eq!(
        extractor().manager("NTE-CARLOS | GB | NB").as_deref(),
        Some("Barros")
    );
}

#[test]
fn manager_from_underscore_name() {
    assert_eq!(
        extractor().manager("NT_ERICK_FB_Memoria").as_deref(),
        Some("Erick")
    );
}

#[test]
fn manager_requires_whole_segment() {
    assert_eq!(extractor().manager("NTE-ERICKSON | NB"), None);
    assert_eq!(extractor().manager("GBX | NB"), None);
}

#[test]
fn manager_absent() {
    assert_eq!(extractor().manager(""), None);
    assert_eq!(extractor().manager("Some Campaign"), None);
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

#[test]
fn channel_between_pipes() {
    assert_eq!(
        extractor().channel("NTE-ERICK | nb | x").as_deref(),
        Some("NB")
    );
    assert_eq!(extractor().channel("A|OB|B").as_deref(), Some("OB"));
}

#[test]
fn channel_requires_exact_segment() {
    assert_eq!(extractor().channel("NTE-ERICK | NBX | x"), None);
    assert_eq!(extractor().channel("NB_ERICK"), None);
}

// ---------------------------------------------------------------------------
// Advertiser
// ---------------------------------------------------------------------------

#[test]
fn advertiser_with_space() {
    assert_eq!(extractor().advertiser("ADV 02").as_deref(), Some("adv02"));
}

#[test]
fn advertiser_with_decimal_and_trailing_dot() {
    assert_eq!(
        extractor().advertiser("pre adv03.02. copy").as_deref(),
        Some("adv03.02")
    );
    assert_eq!(extractor().advertiser("ADV02.").as_deref(), Some("adv02"));
}

#[test]
fn advertiser_absent() {
    assert_eq!(extractor().advertiser("no marker here"), None);
    assert_eq!(extractor().advertiser("ADV."), None);
    assert_eq!(extractor().advertiser(""), None);
}

// ---------------------------------------------------------------------------
// Landing
// ---------------------------------------------------------------------------

#[test]
fn landing_with_parenthesized_product() {
    assert_eq!(
        extractor().landing("VSL 70 (memorylift)"),
        LandingFields {
            variant: Some("vsl70".to_string()),
            product: Some("memorylift".to_string()),
            niche: Some("Memória".to_string()),
        }
    );
}

#[test]
fn landing_parenthesized_product_lookup_ignores_spacing() {
    let fields = extractor().landing("vsl36.ml1 ( Memory Lift )");
    assert_eq!(fields.variant.as_deref(), Some("vsl36.ml1"));
    assert_eq!(fields.product.as_deref(), Some("memory lift"));
    assert_eq!(fields.niche.as_deref(), Some("Memória"));
}

#[test]
fn landing_product_by_substring() {
    let fields = extractor().landing("LipoRise VSL 12");
    assert_eq!(fields.product.as_deref(), Some("liporise"));
    assert_eq!(fields.niche.as_deref(), Some("Emagrecimento"));
    assert_eq!(fields.variant.as_deref(), Some("vsl12"));
}

#[test]
fn landing_product_substring_ignores_spacing_and_case() {
    let fields = extractor().landing("VSL 70 Memory Lift");
    assert_eq!(fields.product.as_deref(), Some("memorylift"));
    assert_eq!(fields.niche.as_deref(), Some("Memória"));
    assert_eq!(fields.variant.as_deref(), Some("vsl70"));
}

#[test]
fn landing_unknown_product_has_no_niche() {
    let fields = extractor().landing("VSL 5 (mysterypill)");
    assert_eq!(fields.product.as_deref(), Some("mysterypill"));
    assert_eq!(fields.niche, None);
}

#[test]
fn landing_empty() {
    assert_eq!(extractor().landing("  "), LandingFields::default());
}

// ---------------------------------------------------------------------------
// Positional
// ---------------------------------------------------------------------------

#[test]
fn pipe_positional_full() {
    let fields = extractor().positional(
        "NT | nte-erick | FB | Memória | memorylift | x | site.com",
        CampaignDelimiter::Pipe,
    );
    assert_eq!(
        fields,
        PositionalFields {
            manager: Some("NTE-ERICK".to_string()),
            platform: None,
            niche: Some("Memória".to_string()),
            product: Some("memorylift".to_string()),
            site: Some("site.com".to_string()),
        }
    );
}

#[test]
fn pipe_positional_short_name_leaves_missing_fields_empty() {
    let fields = extractor().positional("NT | NTE-BARROS | FB", CampaignDelimiter::Pipe);
    assert_eq!(fields.manager.as_deref(), Some("NTE-BARROS"));
    assert_eq!(fields.niche, None);
    assert_eq!(fields.product, None);
    assert_eq!(fields.site, None);
}

#[test]
fn underscore_positional_full_joins_trailing_product() {
    let fields = extractor().positional(
        "NT_erick_FB_Memoria_site.com_memory_lift",
        CampaignDelimiter::Underscore,
    );
    assert_eq!(
        fields,
        PositionalFields {
            manager: Some("ERICK".to_string()),
            platform: Some("FB".to_string()),
            niche: Some("Memoria".to_string()),
            site: Some("site.com".to_string()),
            product: Some("memory_lift".to_string()),
        }
    );
}

#[test]
fn underscore_positional_partial() {
    let fields = extractor().positional("NT_ERICK_Memoria_gluco_sense", CampaignDelimiter::Underscore);
    assert_eq!(fields.manager.as_deref(), Some("ERICK"));
    assert_eq!(fields.niche.as_deref(), Some("Memoria"));
    assert_eq!(fields.product.as_deref(), Some("gluco_sense"));
    assert_eq!(fields.site, None);
}

#[test]
fn underscore_positional_too_short() {
    let fields = extractor().positional("NT", CampaignDelimiter::Underscore);
    assert_eq!(fields, PositionalFields::default());
}

#[test]
fn manager_display_resolves_prefixed_token() {
    assert_eq!(extractor().manager_display("nte-erick"), "Erick");
    assert_eq!(extractor().manager_display("NTE-ZED"), "NTE-ZED");
}
