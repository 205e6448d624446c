// ─────────────────────────────────────────────────────────────────────
// CryoSim Core — Thermal Problem
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Validated, solver-ready thermal network.
//!
//! A `ThermalProblem` only exists after structural validation succeeded,
//! so the assembler and both solvers can index nodes and materials
//! without re-checking.

use cryo_types::config::{SolverOptions, SystemDescription};
use cryo_types::error::{CryoError, CryoResult};
use cryo_types::state::{BoundaryCondition, Mesh};
use ndarray::Array1;
use std::sync::Arc;

use crate::material::{Material, MaterialCatalog};
use crate::mesh::build_mesh;
use crate::validate;

#[derive(Debug, Clone)]
pub struct ThermalProblem {
    mesh: Mesh,
    catalog: MaterialCatalog,
    element_materials: Vec<Arc<Material>>,
    boundaries: Vec<BoundaryCondition>,
    fixed: Vec<Option<f64>>,
    /// Per node, the intersection of the adjacent materials' valid ranges.
    bounds: Vec<(f64, f64)>,
    options: SolverOptions,
}

impl ThermalProblem {
    /// Validate and assemble a problem from already-resolved parts.
    pub fn new(
        mesh: Mesh,
        catalog: MaterialCatalog,
        boundaries: Vec<BoundaryCondition>,
        options: SolverOptions,
    ) -> CryoResult<Self> {
        options.validate()?;
        validate::validate_mesh(&mesh, &catalog)?;
        validate::validate_boundaries(&mesh, &boundaries)?;
        validate::validate_fixed_values(&mesh, &catalog, &boundaries)?;

        let element_materials = mesh
            .elements
            .iter()
            .map(|e| catalog.require(&e.material))
            .collect::<CryoResult<Vec<_>>>()?;

        let mut fixed = vec![None; mesh.node_count()];
        for bc in &boundaries {
            if let BoundaryCondition::FixedTemperature { node, value } = *bc {
                fixed[node] = Some(value);
            }
        }

        let mut bounds = vec![(f64::NEG_INFINITY, f64::INFINITY); mesh.node_count()];
        for (element, material) in mesh.elements.iter().zip(&element_materials) {
            let (lo, hi) = material.valid_range();
            for &node in &element.nodes {
                let b = &mut bounds[node];
                *b = (b.0.max(lo), b.1.min(hi));
            }
        }
        if let Some(node) = bounds.iter().position(|(lo, hi)| lo > hi) {
            return Err(CryoError::Validation(format!(
                "node {node} joins materials with no common valid temperature range"
            )));
        }

        Ok(ThermalProblem {
            mesh,
            catalog,
            element_materials,
            boundaries,
            fixed,
            bounds,
            options,
        })
    }

    /// Build the catalog, mesh the geometry and resolve boundary targets.
    pub fn from_description(system: &SystemDescription) -> CryoResult<Self> {
        let catalog = MaterialCatalog::from_specs(&system.materials)?;
        Self::with_catalog(system, catalog)
    }

    /// Same as [`Self::from_description`] but sharing an existing catalog.
    pub fn with_catalog(system: &SystemDescription, catalog: MaterialCatalog) -> CryoResult<Self> {
        let geometry = system.geometry.as_ref().ok_or_else(|| {
            CryoError::Validation(format!(
                "system '{}' has no geometry; thermal analyses need a layout or mesh",
                system.name
            ))
        })?;
        let model = build_mesh(geometry, system.solver.mesh_refinement)?;
        let boundaries = model.resolve_boundaries(&system.boundary_conditions)?;
        Self::new(model.mesh, catalog, boundaries, system.solver.clone())
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn catalog(&self) -> &MaterialCatalog {
        &self.catalog
    }

    pub fn node_count(&self) -> usize {
        self.mesh.node_count()
    }

    pub fn element_material(&self, element: usize) -> &Material {
        &self.element_materials[element]
    }

    pub fn boundaries(&self) -> &[BoundaryCondition] {
        &self.boundaries
    }

    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    /// Tighten the wall-time ceiling; never loosens an existing one.
    pub fn limit_wall_time(&mut self, seconds: f64) {
        let limit = match self.options.max_wall_time_s {
            Some(existing) => existing.min(seconds),
            None => seconds,
        };
        self.options.max_wall_time_s = Some(limit);
    }

    pub fn fixed_value(&self, node: usize) -> Option<f64> {
        self.fixed[node]
    }

    pub fn is_fixed(&self, node: usize) -> bool {
        self.fixed[node].is_some()
    }

    pub fn free_nodes(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.fixed.len()).filter(|&i| self.fixed[i].is_none())
    }

    /// Starting field: caller guess or uniform `initial_temperature`, with
    /// Dirichlet nodes overwritten by their imposed values.
    pub fn initial_temperatures(&self, guess: Option<&Array1<f64>>) -> CryoResult<Array1<f64>> {
        let mut t = match guess {
            Some(g) => g.clone(),
            None => Array1::from_elem(self.node_count(), self.options.initial_temperature),
        };
        if t.len() != self.node_count() {
            return Err(CryoError::Validation(format!(
                "initial temperature field has {} entries but mesh has {} nodes",
                t.len(),
                self.node_count()
            )));
        }
        self.apply_fixed(&mut t);
        validate::validate_temperatures(&self.mesh, &self.catalog, &t, "initial temperature")?;
        Ok(t)
    }

    /// Valid temperature range at `node`.
    pub fn node_bounds(&self, node: usize) -> (f64, f64) {
        self.bounds[node]
    }

    /// Pull every node back inside its materials' valid range. Returns the
    /// number of nodes that were moved.
    pub fn clamp_to_valid(&self, temperatures: &mut Array1<f64>) -> usize {
        let mut clamped = 0;
        for (t, &(lo, hi)) in temperatures.iter_mut().zip(&self.bounds) {
            if *t < lo || *t > hi {
                *t = t.clamp(lo, hi);
                clamped += 1;
            }
        }
        clamped
    }

    /// Snap Dirichlet nodes to their exact imposed values.
    pub fn apply_fixed(&self, temperatures: &mut Array1<f64>) {
        for (t, fixed) in temperatures.iter_mut().zip(&self.fixed) {
            if let Some(value) = fixed {
                *t = *value;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::tests::constant_spec;
    use cryo_types::state::{Element, Node};

    fn bar(n_elements: usize) -> Mesh {
        Mesh {
            nodes: (0..=n_elements)
                .map(|i| Node {
                    index: i,
                    position: [i as f64, 0.0, 0.0],
                })
                .collect(),
            elements: (0..n_elements)
                .map(|i| Element {
                    nodes: [i, i + 1],
                    material: "Cu".to_string(),
                    area: 1e-4,
                    length: 0.1,
                })
                .collect(),
        }
    }

    fn catalog() -> MaterialCatalog {
        MaterialCatalog::from_specs(&[constant_spec("Cu", 400.0, 385.0, 8960.0)]).unwrap()
    }

    #[test]
    fn test_new_resolves_fixed_nodes() {
        let problem = ThermalProblem::new(
            bar(3),
            catalog(),
            vec![BoundaryCondition::FixedTemperature { node: 3, value: 4.2 }],
            SolverOptions::default(),
        )
        .unwrap();
        assert_eq!(problem.fixed_value(3), Some(4.2));
        assert!(!problem.is_fixed(0));
        assert_eq!(problem.free_nodes().collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(problem.element_material(0).id(), "Cu");
    }

    #[test]
    fn test_initial_field_snaps_fixed_nodes() {
        let problem = ThermalProblem::new(
            bar(2),
            catalog(),
            vec![BoundaryCondition::FixedTemperature { node: 0, value: 20.0 }],
            SolverOptions::default(),
        )
        .unwrap();
        let t = problem.initial_temperatures(None).unwrap();
        assert_eq!(t.to_vec(), vec![20.0, 300.0, 300.0]);

        let bad = Array1::from_vec(vec![300.0, 300.0]);
        assert!(problem.initial_temperatures(Some(&bad)).is_err());
    }

    #[test]
    fn test_initial_temperature_outside_material_range() {
        let mut options = SolverOptions::default();
        options.initial_temperature = 450.0;
        let problem = ThermalProblem::new(
            bar(2),
            catalog(),
            vec![BoundaryCondition::FixedTemperature { node: 0, value: 20.0 }],
            options,
        )
        .unwrap();
        let err = problem.initial_temperatures(None).unwrap_err();
        assert!(err.is_validation(), "{err}");
    }

    #[test]
    fn test_clamp_to_material_range() {
        let problem =
            ThermalProblem::new(bar(2), catalog(), vec![], SolverOptions::default()).unwrap();
        assert_eq!(problem.node_bounds(1), (1.0, 400.0));
        let mut t = Array1::from_vec(vec![0.5, 79_000.0, 250.0]);
        assert_eq!(problem.clamp_to_valid(&mut t), 2);
        assert_eq!(t.to_vec(), vec![1.0, 400.0, 250.0]);
    }

    #[test]
    fn test_disjoint_material_ranges_rejected() {
        let mut warm = constant_spec("Al", 200.0, 900.0, 2700.0);
        warm.conductivity = vec![[500.0, 200.0], [900.0, 200.0]];
        warm.specific_heat = vec![[500.0, 900.0], [900.0, 900.0]];
        let catalog = MaterialCatalog::from_specs(&[
            constant_spec("Cu", 400.0, 385.0, 8960.0),
            warm,
        ])
        .unwrap();
        let mut mesh = bar(2);
        mesh.elements[1].material = "Al".to_string();
        let err = ThermalProblem::new(mesh, catalog, vec![], SolverOptions::default()).unwrap_err();
        assert!(err.is_validation(), "{err}");
    }

    #[test]
    fn test_wall_time_limit_only_tightens() {
        let mut problem =
            ThermalProblem::new(bar(1), catalog(), vec![], SolverOptions::default()).unwrap();
        problem.limit_wall_time(5.0);
        assert_eq!(problem.options().max_wall_time_s, Some(5.0));
        problem.limit_wall_time(10.0);
        assert_eq!(problem.options().max_wall_time_s, Some(5.0));
    }
}
