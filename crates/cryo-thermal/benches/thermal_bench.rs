// -------------------------------------------------------------------------
// CryoSim Core -- Thermal Solver Benchmark
// Steady Newton solve and adaptive backward-Euler cooldown on a support
// rod + copper strap layout at increasing mesh refinement.
// -------------------------------------------------------------------------

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use cryo_thermal::mesh::build_mesh;
use cryo_thermal::{solve_steady, solve_transient, MaterialCatalog, ThermalProblem};
use cryo_types::config::{
    ComponentEnd, ComponentKind, ComponentSpec, ConnectionSpec, EndSide, GeometrySpec,
    MaterialCategory, MaterialSpec, SolverOptions, TransientOptions,
};
use cryo_types::progress::NoopMonitor;
use cryo_types::state::BoundaryCondition;
use std::hint::black_box;

fn materials() -> Vec<MaterialSpec> {
    vec![
        MaterialSpec {
            id: "OFHC-Cu".into(),
            category: MaterialCategory::Metal,
            density: 8960.0,
            conductivity: vec![
                [4.0, 320.0],
                [10.0, 780.0],
                [20.0, 1200.0],
                [40.0, 1000.0],
                [77.0, 550.0],
                [300.0, 400.0],
            ],
            specific_heat: vec![
                [4.0, 0.09],
                [10.0, 0.86],
                [20.0, 7.7],
                [40.0, 60.0],
                [77.0, 192.0],
                [300.0, 385.0],
            ],
        },
        MaterialSpec {
            id: "G-10CR".into(),
            category: MaterialCategory::Insulator,
            density: 1900.0,
            conductivity: vec![[4.0, 0.07], [20.0, 0.18], [77.0, 0.28], [300.0, 0.6]],
            specific_heat: vec![[4.0, 2.0], [20.0, 45.0], [77.0, 300.0], [300.0, 999.0]],
        },
    ]
}

fn component(id: &str, material: &str, start: [f64; 3], length: f64, area: f64) -> ComponentSpec {
    ComponentSpec {
        id: id.into(),
        kind: ComponentKind::Support,
        material: material.into(),
        start,
        direction: [0.0, 0.0, 1.0],
        length,
        area,
        segments: 4,
    }
}

fn end(component: &str, end: EndSide) -> ComponentEnd {
    ComponentEnd {
        component: component.into(),
        end,
    }
}

/// G-10 support in series with a copper strap, 300 K → 4.2 K.
fn make_problem(level: u32) -> ThermalProblem {
    let geometry = GeometrySpec::Layout {
        components: vec![
            component("support", "G-10CR", [0.0; 3], 0.2, 1e-4),
            component("strap", "OFHC-Cu", [0.0, 0.0, 0.2], 0.1, 2e-5),
        ],
        connections: vec![ConnectionSpec {
            a: end("support", EndSide::End),
            b: end("strap", EndSide::Start),
        }],
    };
    let model = build_mesh(&geometry, level).expect("layout meshes");
    let boundaries = vec![
        BoundaryCondition::FixedTemperature {
            node: model.node_of(&end("support", EndSide::Start)).expect("support"),
            value: 300.0,
        },
        BoundaryCondition::FixedTemperature {
            node: model.node_of(&end("strap", EndSide::End)).expect("strap"),
            value: 4.2,
        },
    ];
    let catalog = MaterialCatalog::from_specs(&materials()).expect("catalog");
    let options = SolverOptions {
        mesh_refinement: level,
        ..SolverOptions::default()
    };
    ThermalProblem::new(model.mesh, catalog, boundaries, options).expect("valid problem")
}

fn bench_steady(c: &mut Criterion) {
    let mut group = c.benchmark_group("steady_support_strap");
    for level in [0u32, 2, 4] {
        let problem = make_problem(level);
        group.bench_with_input(
            BenchmarkId::from_parameter(problem.mesh().element_count()),
            &problem,
            |b, p| {
                b.iter(|| {
                    let field = solve_steady(black_box(p), None, &mut NoopMonitor)
                        .expect("steady solve");
                    black_box(field.metadata.iterations);
                })
            },
        );
    }
    group.finish();
}

fn bench_transient(c: &mut Criterion) {
    let problem = make_problem(1);
    let mut opts = TransientOptions::new(3600.0);
    opts.timestep_tolerance = 2.0;

    let mut group = c.benchmark_group("transient_support_strap");
    group.sample_size(10);
    group.bench_function("one_hour", |b| {
        b.iter(|| {
            let result = solve_transient(black_box(&problem), &opts, None, &mut NoopMonitor)
                .expect("transient solve");
            black_box(result.times.len());
        })
    });
    group.finish();
}

criterion_group!(benches, bench_steady, bench_transient);
criterion_main!(benches);
