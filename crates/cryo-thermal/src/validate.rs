// ─────────────────────────────────────────────────────────────────────
// CryoSim Core — Structural Validation
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Fail-fast checks run before any numerical work.
//!
//! Every function here returns [`CryoError::Validation`] with a message
//! naming the offending element, node or condition.

use cryo_types::error::{CryoError, CryoResult};
use cryo_types::state::{BoundaryCondition, Mesh};
use ndarray::Array1;
use std::collections::HashMap;

use crate::material::MaterialCatalog;

/// Element node indices, geometry and material references.
pub fn validate_mesh(mesh: &Mesh, catalog: &MaterialCatalog) -> CryoResult<()> {
    let n = mesh.node_count();
    if n == 0 || mesh.element_count() == 0 {
        return Err(CryoError::Validation(
            "mesh must contain at least one element".to_string(),
        ));
    }
    for (i, node) in mesh.nodes.iter().enumerate() {
        if node.index != i {
            return Err(CryoError::Validation(format!(
                "node at position {i} carries index {}",
                node.index
            )));
        }
        if node.position.iter().any(|v| !v.is_finite()) {
            return Err(CryoError::Validation(format!(
                "node {i} has a non-finite position"
            )));
        }
    }

    let mut used = vec![false; n];
    for (e, element) in mesh.elements.iter().enumerate() {
        let [a, b] = element.nodes;
        if a >= n || b >= n {
            return Err(CryoError::Validation(format!(
                "element {e} references node {} but mesh has {n} nodes",
                a.max(b)
            )));
        }
        if a == b {
            return Err(CryoError::Validation(format!(
                "element {e} connects node {a} to itself"
            )));
        }
        if !element.area.is_finite() || element.area <= 0.0 {
            return Err(CryoError::Validation(format!(
                "element {e}: area must be finite and > 0, got {}",
                element.area
            )));
        }
        if !element.length.is_finite() || element.length <= 0.0 {
            return Err(CryoError::Validation(format!(
                "element {e}: length must be finite and > 0, got {}",
                element.length
            )));
        }
        if catalog.get(&element.material).is_none() {
            return Err(CryoError::Validation(format!(
                "element {e} references unknown material '{}'",
                element.material
            )));
        }
        used[a] = true;
        used[b] = true;
    }
    if let Some(orphan) = used.iter().position(|u| !u) {
        return Err(CryoError::Validation(format!(
            "node {orphan} does not belong to any element"
        )));
    }
    Ok(())
}

/// Node range, parameter sanity and Dirichlet uniqueness.
pub fn validate_boundaries(mesh: &Mesh, boundaries: &[BoundaryCondition]) -> CryoResult<()> {
    let n = mesh.node_count();
    let mut fixed: HashMap<usize, usize> = HashMap::new();

    for (i, bc) in boundaries.iter().enumerate() {
        let node = *bc.node();
        if node >= n {
            return Err(CryoError::Validation(format!(
                "boundary condition {i} ({}) targets node {node} but mesh has {n} nodes",
                bc.kind()
            )));
        }
        match *bc {
            BoundaryCondition::FixedTemperature { value, .. } => {
                positive(i, "value", value)?;
                if let Some(first) = fixed.insert(node, i) {
                    return Err(CryoError::Validation(format!(
                        "node {node} carries two fixed-temperature conditions ({first} and {i})"
                    )));
                }
            }
            BoundaryCondition::Radiation {
                area,
                emissivity,
                ambient,
                ..
            } => {
                non_negative(i, "area", area)?;
                if !(0.0..=1.0).contains(&emissivity) {
                    return Err(CryoError::Validation(format!(
                        "boundary condition {i}: emissivity must be in [0, 1], got {emissivity}"
                    )));
                }
                positive(i, "ambient", ambient)?;
            }
            BoundaryCondition::Convection {
                coefficient,
                ambient,
                ..
            } => {
                non_negative(i, "coefficient", coefficient)?;
                positive(i, "ambient", ambient)?;
            }
            BoundaryCondition::HeatSource { power, .. } => {
                if !power.is_finite() {
                    return Err(CryoError::Validation(format!(
                        "boundary condition {i}: power must be finite, got {power}"
                    )));
                }
            }
        }
    }
    Ok(())
}

fn positive(i: usize, name: &str, value: f64) -> CryoResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(CryoError::Validation(format!(
            "boundary condition {i}: {name} must be finite and > 0, got {value}"
        )));
    }
    Ok(())
}

fn non_negative(i: usize, name: &str, value: f64) -> CryoResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(CryoError::Validation(format!(
            "boundary condition {i}: {name} must be finite and >= 0, got {value}"
        )));
    }
    Ok(())
}

/// Every node temperature must lie inside the range of each material touching it.
pub fn validate_temperatures(
    mesh: &Mesh,
    catalog: &MaterialCatalog,
    temperatures: &Array1<f64>,
    what: &str,
) -> CryoResult<()> {
    if temperatures.len() != mesh.node_count() {
        return Err(CryoError::Validation(format!(
            "{what} has {} entries but mesh has {} nodes",
            temperatures.len(),
            mesh.node_count()
        )));
    }
    for element in &mesh.elements {
        let Some(material) = catalog.get(&element.material) else {
            continue;
        };
        let (lo, hi) = material.valid_range();
        for &node in &element.nodes {
            let t = temperatures[node];
            if !(t >= lo && t <= hi) {
                return Err(CryoError::Validation(format!(
                    "{what} at node {node} is {t} K, outside the valid range \
                     [{lo}, {hi}] K of material '{}'",
                    material.id()
                )));
            }
        }
    }
    Ok(())
}

/// Fixed values must lie inside the range of every material at that node.
pub fn validate_fixed_values(
    mesh: &Mesh,
    catalog: &MaterialCatalog,
    boundaries: &[BoundaryCondition],
) -> CryoResult<()> {
    for element in &mesh.elements {
        let Some(material) = catalog.get(&element.material) else {
            continue;
        };
        let (lo, hi) = material.valid_range();
        for bc in boundaries {
            if let BoundaryCondition::FixedTemperature { node, value } = *bc {
                if element.nodes.contains(&node) && !(value >= lo && value <= hi) {
                    return Err(CryoError::Validation(format!(
                        "fixed temperature {value} K at node {node} is outside the valid \
                         range [{lo}, {hi}] K of material '{}'",
                        material.id()
                    )));
                }
            }
        }
    }
    Ok(())
}

/// Steady state needs each connected cluster tied to an absolute temperature.
pub fn validate_anchoring(mesh: &Mesh, boundaries: &[BoundaryCondition]) -> CryoResult<()> {
    let n = mesh.node_count();
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];
    for element in &mesh.elements {
        let [a, b] = element.nodes;
        adjacency[a].push(b);
        adjacency[b].push(a);
    }

    let mut anchored = vec![false; n];
    for bc in boundaries {
        if bc.anchors_temperature() && anchors_with_conductance(bc) {
            anchored[*bc.node()] = true;
        }
    }

    let mut cluster = vec![usize::MAX; n];
    let mut stack = Vec::new();
    for seed in 0..n {
        if cluster[seed] != usize::MAX {
            continue;
        }
        let mut has_anchor = false;
        stack.push(seed);
        cluster[seed] = seed;
        while let Some(i) = stack.pop() {
            has_anchor |= anchored[i];
            for &j in &adjacency[i] {
                if cluster[j] == usize::MAX {
                    cluster[j] = seed;
                    stack.push(j);
                }
            }
        }
        if !has_anchor {
            return Err(CryoError::Validation(format!(
                "node cluster containing node {seed} has no fixed-temperature, convection \
                 or radiation condition; the steady state is undetermined"
            )));
        }
    }
    Ok(())
}

/// Zero-strength convection or radiation cannot anchor a cluster.
fn anchors_with_conductance(bc: &BoundaryCondition) -> bool {
    match *bc {
        BoundaryCondition::FixedTemperature { .. } => true,
        BoundaryCondition::Radiation {
            area, emissivity, ..
        } => area > 0.0 && emissivity > 0.0,
        BoundaryCondition::Convection { coefficient, .. } => coefficient > 0.0,
        BoundaryCondition::HeatSource { .. } => false,
    }
}
