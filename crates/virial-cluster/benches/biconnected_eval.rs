use criterion::{criterion_group, criterion_main, Criterion};
use virial_cluster::{f_bond, Cluster, ClusterIntegrand, LennardJones};
use virial_core::{ClusterBox, Molecule, Vec3};

fn bench_biconnected(c: &mut Criterion) {
    let lj = LennardJones {
        sigma: 1.0,
        epsilon: 1.0,
    };
    for n in [4usize, 6, 8] {
        let molecules = (0..n)
            .map(|k| {
                let angle = k as f64 * 2.0 * std::f64::consts::PI / n as f64;
                Molecule::atom(Vec3::new(angle.cos(), angle.sin(), 0.1 * k as f64))
            })
            .collect();
        let mut cluster_box = ClusterBox::new(molecules).unwrap();
        let mut cluster = Cluster::biconnected(n, f_bond(lj)).unwrap();
        c.bench_function(&format!("biconnected_n{n}"), |b| {
            b.iter(|| {
                cluster.invalidate();
                cluster.value(&cluster_box.geometry())
            })
        });
    }
}

criterion_group!(benches, bench_biconnected);
criterion_main!(benches);
