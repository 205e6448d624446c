// ─────────────────────────────────────────────────────────────────────
// CryoSim Core — Property-Based Tests (proptest) for cryo-thermal
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Property-based tests for cryo-thermal using proptest.
//!
//! Covers: energy balance closure, series-conduction flux, re-solve
//! idempotence, exact radiation exchange, cooldown monotonicity, mesh
//! element counts, out-of-range property rejection.

use cryo_thermal::mesh::{build_mesh, refined_element_count};
use cryo_thermal::{solve_steady, solve_transient, Material, MaterialCatalog, ThermalProblem};
use cryo_types::config::{
    ComponentKind, ComponentSpec, GeometrySpec, MaterialCategory, MaterialSpec, SolverOptions,
    TransientOptions,
};
use cryo_types::constants::STEFAN_BOLTZMANN;
use cryo_types::error::CryoError;
use cryo_types::progress::NoopMonitor;
use cryo_types::state::{BoundaryCondition, Element, Mesh, Node};
use proptest::prelude::*;

fn constant(id: &str, k: f64, cp: f64) -> MaterialSpec {
    MaterialSpec {
        id: id.to_string(),
        category: MaterialCategory::Metal,
        density: 5000.0,
        conductivity: vec![[1.0, k], [400.0, k]],
        specific_heat: vec![[1.0, cp], [400.0, cp]],
    }
}

/// Straight chain, one material id per element.
fn chain(materials: &[String], length: f64, area: f64) -> Mesh {
    Mesh {
        nodes: (0..=materials.len())
            .map(|i| Node {
                index: i,
                position: [i as f64 * length, 0.0, 0.0],
            })
            .collect(),
        elements: materials
            .iter()
            .enumerate()
            .map(|(i, m)| Element {
                nodes: [i, i + 1],
                material: m.clone(),
                area,
                length,
            })
            .collect(),
    }
}

/// One distinct constant-k material per element.
fn graded_problem(
    ks: &[f64],
    boundaries: Vec<BoundaryCondition>,
    options: SolverOptions,
) -> ThermalProblem {
    let specs: Vec<MaterialSpec> = ks
        .iter()
        .enumerate()
        .map(|(i, &k)| constant(&format!("m{i}"), k, 300.0))
        .collect();
    let ids: Vec<String> = specs.iter().map(|s| s.id.clone()).collect();
    let catalog = MaterialCatalog::from_specs(&specs).unwrap();
    ThermalProblem::new(chain(&ids, 0.05, 1e-4), catalog, boundaries, options).unwrap()
}

// ── Steady state ─────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Without radiation or sources, boundary heat flows sum to zero.
    #[test]
    fn energy_balance_closes(
        ks in prop::collection::vec(0.1f64..1000.0, 2..8),
        t_hot in 50.0f64..350.0,
        t_cold in 2.0f64..40.0,
        h in 0.0f64..0.5,
        t_bath in 20.0f64..300.0,
    ) {
        let last = ks.len();
        let bcs = vec![
            BoundaryCondition::FixedTemperature { node: 0, value: t_hot },
            BoundaryCondition::FixedTemperature { node: last, value: t_cold },
            BoundaryCondition::Convection { node: last / 2, coefficient: h, ambient: t_bath },
        ];
        let problem = graded_problem(&ks, bcs, SolverOptions::default());
        let field = solve_steady(&problem, None, &mut NoopMonitor).unwrap();

        let scale = field
            .heat_flows
            .iter()
            .map(|f| f.heat_flow_w.abs())
            .fold(1e-12, f64::max);
        prop_assert!(
            field.net_heat_flow().abs() < 1e-6 * scale,
            "net = {:e} W, scale = {:e} W", field.net_heat_flow(), scale
        );
    }

    /// Two constant-k materials in series carry the analytical flux.
    #[test]
    fn two_material_flux_matches_series_resistance(
        k1 in 0.05f64..2000.0,
        k2 in 0.05f64..2000.0,
        t_hot in 20.0f64..350.0,
    ) {
        let t_cold = 4.2;
        let bcs = vec![
            BoundaryCondition::FixedTemperature { node: 0, value: t_hot },
            BoundaryCondition::FixedTemperature { node: 2, value: t_cold },
        ];
        let problem = graded_problem(&[k1, k2], bcs, SolverOptions::default());
        let field = solve_steady(&problem, None, &mut NoopMonitor).unwrap();

        let (area, length) = (1e-4, 0.05);
        let expected = (t_hot - t_cold) * area / (length / k1 + length / k2);
        let got = field.heat_flows[0].heat_flow_w;
        let rel = (got - expected).abs() / expected;
        prop_assert!(rel < 0.01, "Q = {got}, expected {expected}, rel = {rel:e}");
    }

    /// Feeding a converged field back in converges within two iterations.
    #[test]
    fn resolve_from_converged_field_is_immediate(
        ks in prop::collection::vec(0.5f64..500.0, 2..6),
        t_hot in 50.0f64..300.0,
        power in 0.0f64..0.01,
    ) {
        let last = ks.len();
        let bcs = vec![
            BoundaryCondition::FixedTemperature { node: 0, value: t_hot },
            BoundaryCondition::FixedTemperature { node: last, value: 4.2 },
            BoundaryCondition::HeatSource { node: 1, power },
        ];
        let mut options = SolverOptions::default();
        options.convergence_tolerance = 1e-8;
        let problem = graded_problem(&ks, bcs, options);
        let first = solve_steady(&problem, None, &mut NoopMonitor).unwrap();
        let again = solve_steady(&problem, Some(&first.temperatures), &mut NoopMonitor).unwrap();
        prop_assert!(again.metadata.iterations <= 2, "took {}", again.metadata.iterations);
    }

    /// A fixed node radiating to a cold enclosure loses exactly σA(T_h⁴ − T_c⁴).
    #[test]
    fn black_body_exchange_is_exact(
        t_hot in 10.0f64..400.0,
        t_cold in 1.0f64..10.0,
        area in 1e-4f64..1.0,
    ) {
        let bcs = vec![
            BoundaryCondition::FixedTemperature { node: 1, value: t_hot },
            BoundaryCondition::Radiation { node: 1, area, emissivity: 1.0, ambient: t_cold },
        ];
        let problem = graded_problem(&[400.0], bcs, SolverOptions::default());
        let field = solve_steady(&problem, None, &mut NoopMonitor).unwrap();

        let radiated = -field.heat_flows[1].heat_flow_w;
        let exact = STEFAN_BOLTZMANN * area * (t_hot.powi(4) - t_cold.powi(4));
        prop_assert!(
            (radiated - exact).abs() <= 4.0 * f64::EPSILON * exact,
            "radiated {radiated:e} W vs {exact:e} W"
        );
    }
}

// ── Transient ────────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Cooling toward a fixed cold sink never warms any node.
    #[test]
    fn cooldown_never_warms(
        ks in prop::collection::vec(1.0f64..500.0, 2..6),
        t_start in 100.0f64..350.0,
        t_sink in 4.0f64..80.0,
        tol in 0.5f64..10.0,
    ) {
        let bcs = vec![BoundaryCondition::FixedTemperature { node: 0, value: t_sink }];
        let mut options = SolverOptions::default();
        options.initial_temperature = t_start;
        let problem = graded_problem(&ks, bcs, options);
        let mut opts = TransientOptions::new(500.0);
        opts.timestep_tolerance = tol;
        let result = solve_transient(&problem, &opts, None, &mut NoopMonitor).unwrap();

        for node in 0..result.snapshots.ncols() {
            let column = result.snapshots.column(node).to_vec();
            for w in column.windows(2) {
                prop_assert!(w[1] <= w[0] + 1e-9, "node {node}: {} -> {}", w[0], w[1]);
                prop_assert!(w[1] >= t_sink - 1e-6);
            }
        }
    }
}

// ── Mesh and materials ───────────────────────────────────────────────

proptest! {
    /// Built element counts always match the router's size estimate.
    #[test]
    fn refined_count_matches_built_mesh(
        segments in prop::collection::vec(1usize..12, 1..5),
        level in 0u32..4,
    ) {
        let components: Vec<ComponentSpec> = segments
            .iter()
            .enumerate()
            .map(|(i, &s)| ComponentSpec {
                id: format!("c{i}"),
                kind: ComponentKind::Rod,
                material: "Cu".to_string(),
                start: [i as f64, 0.0, 0.0],
                direction: [0.0, 0.0, 1.0],
                length: 0.5,
                area: 1e-4,
                segments: s,
            })
            .collect();
        let geometry = GeometrySpec::Layout { components, connections: vec![] };
        let model = build_mesh(&geometry, level).unwrap();
        prop_assert_eq!(model.mesh.element_count(), refined_element_count(&geometry, level));
        let total: f64 = model.mesh.elements.iter().map(|e| e.length).sum();
        prop_assert!((total - 0.5 * segments.len() as f64).abs() < 1e-9);
    }

    /// One kelvin outside either table end is always rejected.
    #[test]
    fn out_of_range_never_extrapolates(
        t_min in 2.0f64..50.0,
        span in 10.0f64..300.0,
        k in 0.1f64..1000.0,
    ) {
        let t_max = t_min + span;
        let spec = MaterialSpec {
            id: "sensor".to_string(),
            category: MaterialCategory::Structural,
            density: 1000.0,
            conductivity: vec![[t_min, k], [t_max, 2.0 * k]],
            specific_heat: vec![[t_min, 1.0], [t_max, 100.0]],
        };
        let material = Material::from_spec(&spec).unwrap();
        let below = matches!(material.conductivity(t_min - 1.0), Err(CryoError::OutOfRange { .. }));
        let above = matches!(material.specific_heat(t_max + 1.0), Err(CryoError::OutOfRange { .. }));
        prop_assert!(below);
        prop_assert!(above);
        prop_assert!(material.conductivity(t_min).is_ok());
    }
}
