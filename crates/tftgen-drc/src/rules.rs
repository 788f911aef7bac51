use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use tftgen_core::layer::LayerStack;
use tftgen_core::LayerId;

use crate::error::{DrcError, Result};
use crate::violation::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    MinWidth,
    MinSpacing,
    Enclosure,
}

/// One rule as written in a deck. Layers are referenced by name.
///
/// ```toml
/// [[rules]]
/// name = "W.S.1"
/// kind = "min_spacing"
/// layer = "W_GATE"
/// value = 2.0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub name: String,
    pub kind: RuleKind,
    /// Checked layer; the enclosed layer for enclosure rules.
    pub layer: String,
    /// Enclosing layer, enclosure rules only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outer: Option<String>,
    /// Width, spacing or enclosure margin in micrometres.
    pub value: f64,
    #[serde(default)]
    pub severity: Severity,
}

impl RuleSpec {
    pub fn min_width(name: &str, layer: &str, value: f64) -> Self {
        Self::new(name, RuleKind::MinWidth, layer, None, value)
    }

    pub fn min_spacing(name: &str, layer: &str, value: f64) -> Self {
        Self::new(name, RuleKind::MinSpacing, layer, None, value)
    }

    pub fn enclosure(name: &str, inner: &str, outer: &str, margin: f64) -> Self {
        Self::new(name, RuleKind::Enclosure, inner, Some(outer), margin)
    }

    fn new(name: &str, kind: RuleKind, layer: &str, outer: Option<&str>, value: f64) -> Self {
        Self {
            name: name.to_string(),
            kind,
            layer: layer.to_string(),
            outer: outer.map(str::to_string),
            value,
            severity: Severity::Error,
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

/// A named collection of rules, loadable from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDeck {
    pub name: String,
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

/// A rule with its layers resolved against a layer stack.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub name: String,
    pub severity: Severity,
    pub check: Check,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Check {
    MinWidth { layer: LayerId, value: f64 },
    MinSpacing { layer: LayerId, value: f64 },
    Enclosure { inner: LayerId, outer: LayerId, margin: f64 },
}

impl RuleDeck {
    pub fn new(name: &str, rules: Vec<RuleSpec>) -> Self {
        Self {
            name: name.to_string(),
            rules,
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Look every layer name up in `stack`.
    pub fn resolve(&self, stack: &LayerStack) -> Result<Vec<Rule>> {
        self.rules.iter().map(|spec| resolve_rule(spec, stack)).collect()
    }
}

fn layer_id(spec: &RuleSpec, name: &str, stack: &LayerStack) -> Result<LayerId> {
    stack
        .get_layer_by_name(name)
        .map(|l| l.id)
        .ok_or_else(|| DrcError::UnknownLayer {
            rule: spec.name.clone(),
            layer: name.to_string(),
        })
}

fn resolve_rule(spec: &RuleSpec, stack: &LayerStack) -> Result<Rule> {
    let value = spec.value;
    let invalid = match spec.kind {
        RuleKind::Enclosure => value < 0.0,
        _ => value <= 0.0,
    };
    if invalid || !value.is_finite() {
        return Err(DrcError::InvalidValue {
            rule: spec.name.clone(),
            value,
        });
    }

    let layer = layer_id(spec, &spec.layer, stack)?;
    let check = match spec.kind {
        RuleKind::MinWidth => Check::MinWidth { layer, value },
        RuleKind::MinSpacing => Check::MinSpacing { layer, value },
        RuleKind::Enclosure => {
            let outer = spec
                .outer
                .as_deref()
                .ok_or_else(|| DrcError::MissingOuterLayer(spec.name.clone()))?;
            Check::Enclosure {
                inner: layer,
                outer: layer_id(spec, outer, stack)?,
                margin: value,
            }
        }
    };
    Ok(Rule {
        name: spec.name.clone(),
        severity: spec.severity,
        check,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tftgen_core::layer::Layer;

    fn stack() -> LayerStack {
        let mut s = LayerStack::new();
        s.add_layer(Layer::new(LayerId::new(2, 0), "W_GATE"));
        s.add_layer(Layer::new(LayerId::new(3, 0), "AL2O3"));
        s
    }

    const DECK: &str = r#"
name = "test"

[[rules]]
name = "W.W.1"
kind = "min_width"
layer = "W_GATE"
value = 2.0

[[rules]]
name = "W.S.1"
kind = "min_spacing"
layer = "W_GATE"
value = 3.0
severity = "warning"

[[rules]]
name = "V.EN.1"
kind = "enclosure"
layer = "AL2O3"
outer = "W_GATE"
value = 1.0
"#;

    #[test]
    fn test_parse_and_resolve() {
        let deck = RuleDeck::from_toml_str(DECK).unwrap();
        assert_eq!(deck.rules.len(), 3);
        assert_eq!(deck.rules[0].severity, Severity::Error);
        assert_eq!(deck.rules[1].severity, Severity::Warning);

        let rules = deck.resolve(&stack()).unwrap();
        assert_eq!(
            rules[2].check,
            Check::Enclosure {
                inner: LayerId::new(3, 0),
                outer: LayerId::new(2, 0),
                margin: 1.0
            }
        );
    }

    #[test]
    fn test_unknown_layer_and_bad_values() {
        let deck = RuleDeck::new("d", vec![RuleSpec::min_width("X", "NOPE", 1.0)]);
        assert!(matches!(
            deck.resolve(&stack()),
            Err(DrcError::UnknownLayer { .. })
        ));

        let deck = RuleDeck::new("d", vec![RuleSpec::min_spacing("S", "W_GATE", 0.0)]);
        assert!(matches!(
            deck.resolve(&stack()),
            Err(DrcError::InvalidValue { .. })
        ));

        let mut spec = RuleSpec::enclosure("E", "AL2O3", "W_GATE", 1.0);
        spec.outer = None;
        assert!(matches!(
            RuleDeck::new("d", vec![spec]).resolve(&stack()),
            Err(DrcError::MissingOuterLayer(_))
        ));
    }

    #[test]
    fn test_deck_serializes_back_to_toml() {
        let deck = RuleDeck::from_toml_str(DECK).unwrap();
        let text = toml::to_string(&deck).unwrap();
        assert_eq!(RuleDeck::from_toml_str(&text).unwrap(), deck);
    }

    #[test]
    fn test_malformed_deck() {
        assert!(matches!(
            RuleDeck::from_toml_str("rules = 3"),
            Err(DrcError::Parse(_))
        ));
    }
}
