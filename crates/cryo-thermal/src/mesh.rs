// ─────────────────────────────────────────────────────────────────────
// CryoSim Core — Mesh Builder
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Component layout → node/element mesh.
//!
//! Each layout component becomes a chain of two-node bars. Connections
//! fuse component ends into a single node. Refinement level `l` splits
//! every base segment into `2^l` bars, for layouts and explicit meshes
//! alike.

use cryo_types::config::{
    BoundarySpec, ComponentEnd, ComponentSpec, ElementSpec, EndSide, GeometrySpec, NodeTarget,
};
use cryo_types::constants::MAX_REFINEMENT_LEVEL;
use cryo_types::error::{CryoError, CryoResult};
use cryo_types::state::{BoundaryCondition, Element, Mesh, Node};
use std::collections::HashMap;

/// Mesh plus the lookup needed to resolve `{component, end}` targets.
#[derive(Debug, Clone)]
pub struct MeshModel {
    pub mesh: Mesh,
    component_ends: HashMap<String, [usize; 2]>,
}

impl MeshModel {
    pub fn node_of(&self, end: &ComponentEnd) -> CryoResult<usize> {
        let ends = self.component_ends.get(&end.component).ok_or_else(|| {
            CryoError::Validation(format!(
                "boundary or connection references unknown component '{}'",
                end.component
            ))
        })?;
        Ok(match end.end {
            EndSide::Start => ends[0],
            EndSide::End => ends[1],
        })
    }

    /// Index targets pass through unchanged; range is checked by validation.
    pub fn resolve_target(&self, target: &NodeTarget) -> CryoResult<usize> {
        match target {
            NodeTarget::Index(i) => Ok(*i),
            NodeTarget::End(end) => self.node_of(end),
        }
    }

    pub fn resolve_boundaries(&self, specs: &[BoundarySpec]) -> CryoResult<Vec<BoundaryCondition>> {
        specs
            .iter()
            .map(|bc| bc.try_map_node(|target| self.resolve_target(target)))
            .collect()
    }
}

fn check_refinement(level: u32) -> CryoResult<usize> {
    if level > MAX_REFINEMENT_LEVEL {
        return Err(CryoError::Validation(format!(
            "mesh_refinement must be <= {MAX_REFINEMENT_LEVEL}, got {level}"
        )));
    }
    Ok(1usize << level)
}

/// Element count after refinement, without building anything.
pub fn refined_element_count(geometry: &GeometrySpec, level: u32) -> usize {
    let factor = 1usize << level.min(MAX_REFINEMENT_LEVEL);
    match geometry {
        GeometrySpec::Layout { components, .. } => components
            .iter()
            .map(|c| c.segments.max(1).saturating_mul(factor))
            .fold(0, usize::saturating_add),
        GeometrySpec::Mesh { elements, .. } => elements.len().saturating_mul(factor),
    }
}

pub fn build_mesh(geometry: &GeometrySpec, level: u32) -> CryoResult<MeshModel> {
    let factor = check_refinement(level)?;
    match geometry {
        GeometrySpec::Layout {
            components,
            connections,
        } => {
            let pairs: Vec<(&ComponentEnd, &ComponentEnd)> =
                connections.iter().map(|c| (&c.a, &c.b)).collect();
            build_layout(components, &pairs, factor)
        }
        GeometrySpec::Mesh { nodes, elements } => build_explicit(nodes, elements, factor),
    }
}

fn unit_direction(component: &ComponentSpec) -> CryoResult<[f64; 3]> {
    let d = component.direction;
    let norm = (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt();
    if !norm.is_finite() || norm < 1e-12 {
        return Err(CryoError::Validation(format!(
            "component '{}': direction must be a non-zero finite vector",
            component.id
        )));
    }
    Ok([d[0] / norm, d[1] / norm, d[2] / norm])
}

fn check_component(component: &ComponentSpec) -> CryoResult<()> {
    if component.id.trim().is_empty() {
        return Err(CryoError::Validation(
            "component id must not be empty".to_string(),
        ));
    }
    if !component.length.is_finite() || component.length <= 0.0 {
        return Err(CryoError::Validation(format!(
            "component '{}': length must be finite and > 0, got {}",
            component.id, component.length
        )));
    }
    if !component.area.is_finite() || component.area <= 0.0 {
        return Err(CryoError::Validation(format!(
            "component '{}': area must be finite and > 0, got {}",
            component.id, component.area
        )));
    }
    if component.segments == 0 {
        return Err(CryoError::Validation(format!(
            "component '{}': segments must be >= 1",
            component.id
        )));
    }
    if component.start.iter().any(|v| !v.is_finite()) {
        return Err(CryoError::Validation(format!(
            "component '{}': start position must be finite",
            component.id
        )));
    }
    Ok(())
}

/// Union-find over raw node indices.
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        DisjointSet {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    /// Smaller index becomes the root so merged nodes keep the earlier position.
    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[hi] = lo;
        }
    }
}

fn build_layout(
    components: &[ComponentSpec],
    connections: &[(&ComponentEnd, &ComponentEnd)],
    factor: usize,
) -> CryoResult<MeshModel> {
    if components.is_empty() {
        return Err(CryoError::Validation(
            "layout must contain at least one component".to_string(),
        ));
    }

    let mut positions: Vec<[f64; 3]> = Vec::new();
    let mut raw_elements: Vec<([usize; 2], &ComponentSpec, f64)> = Vec::new();
    let mut raw_ends: HashMap<String, [usize; 2]> = HashMap::with_capacity(components.len());

    for component in components {
        check_component(component)?;
        let dir = unit_direction(component)?;
        let segments = component.segments.checked_mul(factor).ok_or_else(|| {
            CryoError::Validation(format!(
                "component '{}': {} segments overflow at refinement x{factor}",
                component.id, component.segments
            ))
        })?;
        let seg_len = component.length / segments as f64;
        let first = positions.len();

        for s in 0..=segments {
            let d = seg_len * s as f64;
            positions.push([
                component.start[0] + dir[0] * d,
                component.start[1] + dir[1] * d,
                component.start[2] + dir[2] * d,
            ]);
        }
        for s in 0..segments {
            raw_elements.push(([first + s, first + s + 1], component, seg_len));
        }
        if raw_ends
            .insert(component.id.clone(), [first, first + segments])
            .is_some()
        {
            return Err(CryoError::Validation(format!(
                "component id '{}' is used more than once",
                component.id
            )));
        }
    }

    let mut sets = DisjointSet::new(positions.len());
    for (a, b) in connections {
        let node_a = raw_end(&raw_ends, a)?;
        let node_b = raw_end(&raw_ends, b)?;
        sets.union(node_a, node_b);
    }

    // Compact roots to 0..n in order of first appearance.
    let mut compact = vec![usize::MAX; positions.len()];
    let mut nodes = Vec::new();
    for raw in 0..positions.len() {
        let root = sets.find(raw);
        if compact[root] == usize::MAX {
            compact[root] = nodes.len();
            nodes.push(Node {
                index: nodes.len(),
                position: positions[root],
            });
        }
        compact[raw] = compact[root];
    }

    let elements = raw_elements
        .into_iter()
        .map(|(pair, component, length)| Element {
            nodes: [compact[pair[0]], compact[pair[1]]],
            material: component.material.clone(),
            area: component.area,
            length,
        })
        .collect();

    let component_ends = raw_ends
        .into_iter()
        .map(|(id, [s, e])| (id, [compact[s], compact[e]]))
        .collect();

    Ok(MeshModel {
        mesh: Mesh { nodes, elements },
        component_ends,
    })
}

fn raw_end(ends: &HashMap<String, [usize; 2]>, end: &ComponentEnd) -> CryoResult<usize> {
    let pair = ends.get(&end.component).ok_or_else(|| {
        CryoError::Validation(format!(
            "connection references unknown component '{}'",
            end.component
        ))
    })?;
    Ok(match end.end {
        EndSide::Start => pair[0],
        EndSide::End => pair[1],
    })
}

fn build_explicit(
    node_positions: &[[f64; 3]],
    elements: &[ElementSpec],
    factor: usize,
) -> CryoResult<MeshModel> {
    let mut nodes: Vec<Node> = node_positions
        .iter()
        .enumerate()
        .map(|(index, &position)| Node { index, position })
        .collect();
    let mut out = Vec::with_capacity(elements.len() * factor);

    for (e, spec) in elements.iter().enumerate() {
        let [a, b] = match spec.nodes.as_slice() {
            [a, b] => [*a, *b],
            other => {
                return Err(CryoError::Validation(format!(
                    "element {e}: expected 2 nodes, got {}",
                    other.len()
                )))
            }
        };
        if factor == 1 {
            out.push(Element {
                nodes: [a, b],
                material: spec.material.clone(),
                area: spec.area,
                length: spec.length,
            });
            continue;
        }

        let (pa, pb) = match (node_positions.get(a), node_positions.get(b)) {
            (Some(pa), Some(pb)) => (*pa, *pb),
            _ => {
                return Err(CryoError::Validation(format!(
                    "element {e} references node outside 0..{}",
                    node_positions.len()
                )))
            }
        };
        let mut chain = Vec::with_capacity(factor + 1);
        chain.push(a);
        for s in 1..factor {
            let f = s as f64 / factor as f64;
            let index = nodes.len();
            nodes.push(Node {
                index,
                position: [
                    pa[0] + f * (pb[0] - pa[0]),
                    pa[1] + f * (pb[1] - pa[1]),
                    pa[2] + f * (pb[2] - pa[2]),
                ],
            });
            chain.push(index);
        }
        chain.push(b);
        for w in chain.windows(2) {
            out.push(Element {
                nodes: [w[0], w[1]],
                material: spec.material.clone(),
                area: spec.area,
                length: spec.length / factor as f64,
            });
        }
    }

    Ok(MeshModel {
        mesh: Mesh {
            nodes,
            elements: out,
        },
        component_ends: HashMap::new(),
    })
}
