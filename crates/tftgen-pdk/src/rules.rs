use tftgen_drc::{RuleDeck, RuleSpec};

/// Minimum feature size on every patterned layer.
pub const MIN_FEATURE: f64 = 2.0;
/// Metal overlap around each dielectric opening.
pub const VIA_ENCLOSURE: f64 = 1.0;

/// Rule deck every generated structure is checked against unless the mask
/// configuration supplies its own.
pub fn default_rules() -> RuleDeck {
    RuleDeck::new(
        "tft_pdk",
        vec![
            RuleSpec::min_width("W.W.1", "W_GATE", MIN_FEATURE),
            RuleSpec::min_spacing("W.S.1", "W_GATE", MIN_FEATURE),
            RuleSpec::min_width("NI.W.1", "NI_CONTACTS", MIN_FEATURE),
            RuleSpec::min_spacing("NI.S.1", "NI_CONTACTS", MIN_FEATURE),
            RuleSpec::min_width("ITO.W.1", "ITO_CHANNEL", MIN_FEATURE),
            RuleSpec::enclosure("VIA.EN.1", "AL2O3", "W_GATE", VIA_ENCLOSURE),
            RuleSpec::enclosure("VIA.EN.2", "AL2O3", "NI_CONTACTS", VIA_ENCLOSURE),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::layer_stack;
    use crate::via::{default_via, via};
    use tftgen_drc::check_cell;

    #[test]
    fn test_default_rules_resolve() {
        let rules = default_rules().resolve(&layer_stack()).unwrap();
        assert_eq!(rules.len(), 7);
    }

    #[test]
    fn test_via_enclosure() {
        let rules = default_rules().resolve(&layer_stack()).unwrap();
        assert!(check_cell(&default_via().unwrap(), &rules).is_clean());
        // An opening 0.5 inside the pads is under-enclosed by both metals.
        let report = check_cell(&via((20.0, 20.0), 0.5).unwrap(), &rules);
        assert_eq!(report.error_count(), 2);
    }
}
