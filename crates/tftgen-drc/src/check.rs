use std::collections::HashMap;

use serde::Serialize;

use tftgen_core::geometry::{BBox, Rect, EPSILON};
use tftgen_core::spatial::{SpatialEntry, SpatialIndex};
use tftgen_core::{Cell, LayerId};

use crate::rules::{Check, Rule};
use crate::violation::{bbox_array, DrcViolation, Severity, ViolationType};

/// Outcome of checking one cell against a rule set.
#[derive(Debug, Clone, Serialize)]
pub struct DrcReport {
    pub cell: String,
    pub rules_checked: usize,
    pub violations: Vec<DrcViolation>,
}

impl DrcReport {
    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    fn count(&self, severity: Severity) -> usize {
        self.violations
            .iter()
            .filter(|v| v.severity == severity)
            .count()
    }

    /// No error-severity violations.
    pub fn is_clean(&self) -> bool {
        self.error_count() == 0
    }

    /// One line naming the first few failing rules.
    pub fn summary(&self) -> String {
        let mut rules: Vec<&str> = Vec::new();
        for v in &self.violations {
            if !rules.contains(&v.rule_name.as_str()) {
                rules.push(&v.rule_name);
            }
        }
        format!(
            "{}: {} errors, {} warnings ({})",
            self.cell,
            self.error_count(),
            self.warning_count(),
            rules.iter().take(5).copied().collect::<Vec<_>>().join(", ")
        )
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Flattened shapes of one layer with a spatial index over them.
struct LayerShapes {
    rects: Vec<Rect>,
    index: SpatialIndex<usize>,
}

impl LayerShapes {
    fn new(rects: Vec<Rect>) -> Self {
        let entries = rects
            .iter()
            .enumerate()
            .map(|(i, r)| SpatialEntry::new(r.bbox(), i))
            .collect();
        Self {
            rects,
            index: SpatialIndex::build(entries),
        }
    }
}

struct Checker<'a> {
    layers: HashMap<LayerId, LayerShapes>,
    violations: Vec<DrcViolation>,
    rule: Option<&'a Rule>,
}

impl<'a> Checker<'a> {
    fn report(
        &mut self,
        violation_type: ViolationType,
        layer_id: LayerId,
        region: BBox,
        geometry_indices: Vec<usize>,
        message: String,
    ) {
        let Some(rule) = self.rule else {
            return;
        };
        self.violations.push(DrcViolation {
            id: format!("V{}", self.violations.len() + 1),
            violation_type,
            severity: rule.severity,
            rule_name: rule.name.clone(),
            message,
            layer_id,
            bbox: bbox_array(&region),
            geometry_indices,
        });
    }

    fn min_width(&mut self, layer: LayerId, value: f64) {
        let Some(shapes) = self.layers.get(&layer) else {
            return;
        };
        let mut found = Vec::new();
        for (i, r) in shapes.rects.iter().enumerate() {
            let w = r.width().min(r.height());
            if w >= value - EPSILON {
                continue;
            }
            // A sliver inside a larger shape of the same layer is harmless.
            let covered = shapes
                .index
                .query_bbox(&r.bbox())
                .iter()
                .any(|e| e.item != i && shapes.rects[e.item].bbox().contains_bbox(&r.bbox()));
            if !covered {
                found.push((i, r.bbox(), w));
            }
        }
        for (i, bb, w) in found {
            self.report(
                ViolationType::MinWidth,
                layer,
                bb,
                vec![i],
                format!("width {:.3} < {:.3}", w, value),
            );
        }
    }

    fn min_spacing(&mut self, layer: LayerId, value: f64) {
        let Some(shapes) = self.layers.get(&layer) else {
            return;
        };
        let mut found = Vec::new();
        for (i, r) in shapes.rects.iter().enumerate() {
            let bb = r.bbox();
            for e in shapes.index.query_within(&bb, value) {
                let j = e.item;
                if j <= i {
                    continue;
                }
                let gap = bb.gap_to(&e.bbox);
                // Touching or overlapping shapes are one conductor.
                if gap > EPSILON && gap < value - EPSILON {
                    found.push((i, j, bb.union(&e.bbox), gap));
                }
            }
        }
        for (i, j, region, gap) in found {
            self.report(
                ViolationType::MinSpacing,
                layer,
                region,
                vec![i, j],
                format!("spacing {:.3} < {:.3}", gap, value),
            );
        }
    }

    fn enclosure(&mut self, inner: LayerId, outer: LayerId, margin: f64) {
        let Some(inner_shapes) = self.layers.get(&inner) else {
            return;
        };
        let outer_shapes = self.layers.get(&outer);
        let mut found = Vec::new();
        for (i, r) in inner_shapes.rects.iter().enumerate() {
            let need = r.bbox().expanded(margin);
            let enclosed = outer_shapes.is_some_and(|o| {
                o.index
                    .query_bbox(&r.bbox())
                    .iter()
                    .any(|e| e.bbox.contains_bbox(&need))
            });
            if !enclosed {
                found.push((i, r.bbox()));
            }
        }
        for (i, bb) in found {
            self.report(
                ViolationType::Enclosure,
                inner,
                bb,
                vec![i],
                format!("not enclosed by {} with margin {:.3}", outer, margin),
            );
        }
    }
}

/// Check `cell` (flattened) against `rules`.
pub fn check_cell(cell: &Cell, rules: &[Rule]) -> DrcReport {
    let mut by_layer: HashMap<LayerId, Vec<Rect>> = HashMap::new();
    for geom in cell.flatten() {
        by_layer.entry(geom.layer_id()).or_default().extend(geom.to_rects());
    }
    let mut checker = Checker {
        layers: by_layer
            .into_iter()
            .map(|(layer, rects)| (layer, LayerShapes::new(rects)))
            .collect(),
        violations: Vec::new(),
        rule: None,
    };

    for rule in rules {
        checker.rule = Some(rule);
        let before = checker.violations.len();
        match rule.check {
            Check::MinWidth { layer, value } => checker.min_width(layer, value),
            Check::MinSpacing { layer, value } => checker.min_spacing(layer, value),
            Check::Enclosure {
                inner,
                outer,
                margin,
            } => checker.enclosure(inner, outer, margin),
        }
        log::debug!(
            "{}: rule {} found {} violations",
            cell.name,
            rule.name,
            checker.violations.len() - before
        );
    }

    let report = DrcReport {
        cell: cell.name.clone(),
        rules_checked: rules.len(),
        violations: checker.violations,
    };
    if !report.violations.is_empty() {
        log::debug!("{}", report.summary());
    }
    report
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use tftgen_core::geometry::{GeomPrimitive, Path, Point};
    use tftgen_core::CellInstance;

    const W: LayerId = LayerId::new(2, 0);
    const OX: LayerId = LayerId::new(3, 0);

    fn rule(name: &str, check: Check) -> Rule {
        Rule {
            name: name.to_string(),
            severity: Severity::Error,
            check,
        }
    }

    #[test]
    fn test_min_width() {
        let mut cell = Cell::new("c");
        cell.add_rect(Rect::new(W, 0.0, 0.0, 10.0, 1.0));
        cell.add_rect(Rect::new(W, 20.0, 0.0, 30.0, 3.0));
        let report = check_cell(
            &cell,
            &[rule("W.W.1", Check::MinWidth { layer: W, value: 2.0 })],
        );
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.violations[0].violation_type, ViolationType::MinWidth);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_sliver_inside_larger_shape_passes() {
        let mut cell = Cell::new("c");
        cell.add_rect(Rect::new(W, 0.0, 0.0, 10.0, 10.0));
        cell.add_rect(Rect::new(W, 2.0, 2.0, 8.0, 3.0));
        let report = check_cell(
            &cell,
            &[rule("W.W.1", Check::MinWidth { layer: W, value: 2.0 })],
        );
        assert!(report.is_clean());
    }

    #[test]
    fn test_min_spacing_in_hierarchy() {
        let mut child = Cell::new("child");
        child.add_rect(Rect::new(W, 0.0, 0.0, 5.0, 5.0));
        let child = Arc::new(child);
        let mut top = Cell::new("top");
        top.add_instance(CellInstance::new(child.clone()));
        let mut near = CellInstance::new(child.clone());
        near.translate(6.0, 0.0);
        top.add_instance(near);
        let mut far = CellInstance::new(child);
        far.translate(20.0, 0.0);
        top.add_instance(far);

        let rules = [rule("W.S.1", Check::MinSpacing { layer: W, value: 2.0 })];
        let report = check_cell(&top, &rules);
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].geometry_indices.len(), 2);
        assert!((report.violations[0].bbox[2] - 11.0).abs() < 1e-9);
    }

    #[test]
    fn test_path_joints_are_not_spacing_errors() {
        let mut cell = Cell::new("c");
        cell.add_geometry(GeomPrimitive::Path(Path::new(
            W,
            vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(10.0, 10.0)],
            2.0,
        )));
        let rules = [
            rule("W.S.1", Check::MinSpacing { layer: W, value: 2.0 }),
            rule("W.W.1", Check::MinWidth { layer: W, value: 2.0 }),
        ];
        assert!(check_cell(&cell, &rules).violations.is_empty());
    }

    #[test]
    fn test_enclosure() {
        let mut cell = Cell::new("c");
        cell.add_rect(Rect::new(W, 0.0, 0.0, 10.0, 10.0));
        cell.add_rect(Rect::new(OX, 1.0, 1.0, 9.0, 9.0));
        cell.add_rect(Rect::new(OX, 9.5, 1.0, 12.0, 2.0));
        let mut warn = rule(
            "V.EN.1",
            Check::Enclosure {
                inner: OX,
                outer: W,
                margin: 1.0,
            },
        );
        warn.severity = Severity::Warning;
        let report = check_cell(&cell, &[warn]);
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.warning_count(), 1);
        assert!(report.is_clean());
        assert!(report.summary().contains("V.EN.1"));
    }
}
