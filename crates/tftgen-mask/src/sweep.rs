//! Variant enumeration and construction.

use std::sync::Arc;

use itertools::{iproduct, Itertools};

use tftgen_core::cell::cell_name;
use tftgen_core::components::array;
use tftgen_core::Cell;
use tftgen_drc::{check_cell, Rule};
use tftgen_pdk::{
    full_adder, inverter_test, resistor_ito_test, resistor_test, transistor_test,
    ItoResistorParams, LogicParams, ProbeParams, TransistorParams,
};

use crate::config::{ArraySpec, MaskConfig, ResistorKind};
use crate::error::{MaskError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Structure {
    Transistor(TransistorParams),
    Resistor { length: f64, width: f64 },
    ResistorIto(ItoResistorParams),
    Inverter(LogicParams),
    FullAdder(LogicParams),
}

/// One point of a parameter sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    pub name: String,
    pub structure: Structure,
    pub array: ArraySpec,
}

/// Every variant the configuration asks for, in sweep order.
pub fn enumerate_variants(config: &MaskConfig) -> Vec<Variant> {
    let mut variants = Vec::new();

    let t = &config.transistors;
    for (&l_mesa, &l_gate, &l_overlap, &w_mesa) in
        iproduct!(&t.l_mesa, &t.l_gate, &t.l_overlap, &t.w_mesa)
    {
        let params = TransistorParams::new(l_mesa, l_gate, l_overlap, w_mesa);
        variants.push(Variant {
            name: cell_name(
                "transistor",
                &[("LM", l_mesa), ("LG", l_gate), ("LO", l_overlap), ("WM", w_mesa)],
            ),
            structure: Structure::Transistor(params),
            array: t.array,
        });
    }

    let r = &config.resistors;
    for (kind, (&length, &width)) in r
        .kinds
        .iter()
        .unique()
        .cartesian_product(r.lengths.iter().cartesian_product(&r.widths))
    {
        let (prefix, structure) = match kind {
            ResistorKind::Meander => ("resistor", Structure::Resistor { length, width }),
            ResistorKind::Ito => (
                "resistor_ito",
                Structure::ResistorIto(ItoResistorParams {
                    length,
                    width,
                    contact_length: r.contact_length,
                    overlap: r.overlap,
                }),
            ),
        };
        variants.push(Variant {
            name: cell_name(prefix, &[("L", length), ("W", width)]),
            structure,
            array: r.array,
        });
    }

    for &load_length in &config.inverters.load_lengths {
        variants.push(Variant {
            name: cell_name("inverter", &[("RL", load_length)]),
            structure: Structure::Inverter(LogicParams {
                load_length,
                ..config.logic
            }),
            array: config.inverters.array,
        });
    }

    if config.full_adder {
        variants.push(Variant {
            name: "full_adder".to_string(),
            structure: Structure::FullAdder(config.logic),
            array: ArraySpec {
                columns: 1,
                rows: 1,
                spacing: 0.0,
            },
        });
    }

    log::debug!("{} variants enumerated", variants.len());
    variants
}

fn build_structure(structure: &Structure, probe: &ProbeParams) -> Result<Arc<Cell>> {
    let cell = match structure {
        Structure::Transistor(p) => transistor_test(p, probe)?,
        Structure::Resistor { length, width } => resistor_test(*length, *width, probe)?,
        Structure::ResistorIto(p) => resistor_ito_test(p, probe)?,
        Structure::Inverter(p) => inverter_test(p, probe)?,
        Structure::FullAdder(p) => full_adder(p)?,
    };
    Ok(cell)
}

/// Build the structure of `variant`, check it against `rules` and wrap it in
/// its array. A structure with error-severity violations is refused with
/// [`MaskError::DrcFailed`].
pub fn build_variant(variant: &Variant, probe: &ProbeParams, rules: &[Rule]) -> Result<Arc<Cell>> {
    let cell = build_structure(&variant.structure, probe)?;
    let report = check_cell(&cell, rules);
    if !report.is_clean() {
        return Err(MaskError::DrcFailed(report.summary()));
    }
    if report.warning_count() > 0 {
        log::warn!("{}: {}", variant.name, report.summary());
    }
    let a = variant.array;
    if a.columns * a.rows == 1 {
        return Ok(cell);
    }
    Ok(array(&cell, a.columns, a.rows, (a.spacing, a.spacing))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tftgen_drc::{RuleDeck, RuleSpec};
    use tftgen_pdk::Pdk;

    fn small_config() -> MaskConfig {
        let mut config = MaskConfig::default();
        config.transistors.l_mesa = vec![8.0];
        config.transistors.l_gate = vec![2.0, 10.0];
        config.transistors.w_mesa = vec![12.0];
        config.resistors.kinds = vec![ResistorKind::Ito, ResistorKind::Ito];
        config.resistors.lengths = vec![10.0];
        config.resistors.widths = vec![20.0];
        config.inverters.load_lengths = vec![];
        config.full_adder = false;
        config
    }

    #[test]
    fn test_enumerate_default_sweep() {
        let variants = enumerate_variants(&MaskConfig::default());
        // 3*3*1*2 transistors, 2*2*2 resistors, 2 inverters, 1 full adder.
        assert_eq!(variants.len(), 18 + 8 + 2 + 1);
        assert_eq!(variants[0].name, "transistor_LM8_LG2_LO2_WM12");
        assert_eq!(variants[1].name, "transistor_LM8_LG2_LO2_WM50");
        assert!(variants.iter().map(|v| &v.name).all_unique());
    }

    #[test]
    fn test_duplicate_kinds_are_swept_once() {
        let variants = enumerate_variants(&small_config());
        assert_eq!(variants.len(), 3);
        assert_eq!(variants[2].name, "resistor_ito_L10_W20");
    }

    #[test]
    fn test_build_variant_arrays_the_structure() {
        let rules = Pdk::default().resolve_rules().unwrap();
        let variants = enumerate_variants(&small_config());
        let cell = build_variant(&variants[0], &ProbeParams::default(), &rules).unwrap();
        assert_eq!(cell.instance_count(), 6);
        assert!(cell.name.starts_with("array_C3_R2"));
    }

    #[test]
    fn test_invalid_geometry_is_refused() {
        let rules = Pdk::default().resolve_rules().unwrap();
        let variants = enumerate_variants(&small_config());
        // Gate length 10 on an 8 long mesa.
        let err = build_variant(&variants[1], &ProbeParams::default(), &rules).unwrap_err();
        assert!(matches!(err, MaskError::Pdk(_)));
    }

    #[test]
    fn test_drc_failure_is_refused() {
        let pdk = Pdk::new(RuleDeck::new(
            "strict",
            vec![RuleSpec::min_width("NI.W.9", "NI_CONTACTS", 500.0)],
        ));
        let rules = pdk.resolve_rules().unwrap();
        let variants = enumerate_variants(&small_config());
        let err = build_variant(&variants[2], &ProbeParams::default(), &rules).unwrap_err();
        match err {
            MaskError::DrcFailed(summary) => assert!(summary.contains("NI.W.9")),
            other => panic!("unexpected error {other}"),
        }
    }
}
