// ─────────────────────────────────────────────────────────────────────
// CryoSim Core — Material Properties
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Temperature-dependent k(T) and Cp(T) with strict domain checking.
//!
//! Cryogenic property curves span several decades between 4 K and room
//! temperature, so queries outside the sampled range fail with
//! [`CryoError::OutOfRange`] instead of extrapolating.

use cryo_math::interp::MonotoneCubic;
use cryo_types::config::{MaterialCategory, MaterialSpec};
use cryo_types::error::{CryoError, CryoResult};
use std::collections::HashMap;
use std::sync::Arc;

/// One catalog material, immutable once built.
#[derive(Debug, Clone)]
pub struct Material {
    id: String,
    category: MaterialCategory,
    density: f64,
    conductivity: MonotoneCubic,
    specific_heat: MonotoneCubic,
}

impl Material {
    pub fn from_spec(spec: &MaterialSpec) -> CryoResult<Self> {
        if spec.id.trim().is_empty() {
            return Err(CryoError::Validation(
                "material id must not be empty".to_string(),
            ));
        }
        if !spec.density.is_finite() || spec.density <= 0.0 {
            return Err(CryoError::Validation(format!(
                "material '{}': density must be finite and > 0, got {}",
                spec.id, spec.density
            )));
        }
        let conductivity = property_table(&spec.id, "conductivity", &spec.conductivity)?;
        let specific_heat = property_table(&spec.id, "specific_heat", &spec.specific_heat)?;

        Ok(Material {
            id: spec.id.clone(),
            category: spec.category,
            density: spec.density,
            conductivity,
            specific_heat,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn category(&self) -> MaterialCategory {
        self.category
    }

    /// [kg/m³]
    pub fn density(&self) -> f64 {
        self.density
    }

    /// k(T) [W/(m·K)].
    pub fn conductivity(&self, temperature: f64) -> CryoResult<f64> {
        self.lookup(&self.conductivity, "conductivity", temperature)
    }

    /// Cp(T) [J/(kg·K)].
    pub fn specific_heat(&self, temperature: f64) -> CryoResult<f64> {
        self.lookup(&self.specific_heat, "specific_heat", temperature)
    }

    /// Range where both properties are defined.
    pub fn valid_range(&self) -> (f64, f64) {
        let (k_lo, k_hi) = self.conductivity.domain();
        let (c_lo, c_hi) = self.specific_heat.domain();
        (k_lo.max(c_lo), k_hi.min(c_hi))
    }

    pub fn contains(&self, temperature: f64) -> bool {
        let (lo, hi) = self.valid_range();
        temperature >= lo && temperature <= hi
    }

    /// ρ·∫Cp dT from `t1` to `t2` [J/m³].
    pub fn volumetric_enthalpy(&self, t1: f64, t2: f64) -> CryoResult<f64> {
        for t in [t1, t2] {
            self.lookup(&self.specific_heat, "specific_heat", t)?;
        }
        let integral = self
            .specific_heat
            .integrate(t1, t2)
            .ok_or_else(|| self.out_of_range(&self.specific_heat, "specific_heat", t2))?;
        Ok(self.density * integral)
    }

    fn lookup(&self, table: &MonotoneCubic, property: &'static str, t: f64) -> CryoResult<f64> {
        table
            .eval(t)
            .ok_or_else(|| self.out_of_range(table, property, t))
    }

    fn out_of_range(&self, table: &MonotoneCubic, property: &'static str, t: f64) -> CryoError {
        let (t_min, t_max) = table.domain();
        CryoError::OutOfRange {
            material: self.id.clone(),
            property,
            temperature: t,
            t_min,
            t_max,
        }
    }
}

fn property_table(id: &str, property: &str, samples: &[[f64; 2]]) -> CryoResult<MonotoneCubic> {
    if let Some(bad) = samples.iter().find(|s| s[0] <= 0.0 || s[1] <= 0.0) {
        return Err(CryoError::Validation(format!(
            "material '{id}': {property} sample ({}, {}) must be positive",
            bad[0], bad[1]
        )));
    }
    MonotoneCubic::from_pairs(samples).map_err(|e| match e {
        CryoError::Validation(msg) => {
            CryoError::Validation(format!("material '{id}': {property}: {msg}"))
        }
        other => other,
    })
}

/// Shared read-only material table; clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MaterialCatalog {
    materials: Arc<HashMap<String, Arc<Material>>>,
}

impl MaterialCatalog {
    pub fn from_specs(specs: &[MaterialSpec]) -> CryoResult<Self> {
        let mut materials = HashMap::with_capacity(specs.len());
        for spec in specs {
            let material = Material::from_spec(spec)?;
            if materials
                .insert(spec.id.clone(), Arc::new(material))
                .is_some()
            {
                return Err(CryoError::Validation(format!(
                    "material '{}' is defined more than once",
                    spec.id
                )));
            }
        }
        Ok(MaterialCatalog {
            materials: Arc::new(materials),
        })
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Material>> {
        self.materials.get(id)
    }

    pub fn require(&self, id: &str) -> CryoResult<Arc<Material>> {
        self.get(id)
            .cloned()
            .ok_or_else(|| CryoError::Validation(format!("unknown material '{id}'")))
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}
