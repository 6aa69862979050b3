use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};

use envsim::{
    AmbientContext, InMemoryAmbient, InMemoryServices, PageRecord, SimError, SimulationOptions,
    Simulator, Site, SiteLanguage,
};

fn make_simulator() -> (Simulator, Arc<InMemoryAmbient>) {
    let services = InMemoryServices::default();
    services
        .sites
        .insert(Site::new(
            "intl",
            1,
            vec![
                SiteLanguage::new(0, "en", "English", "en_US.UTF-8"),
                SiteLanguage::new(1, "de", "German", "de_DE.UTF-8"),
            ],
        ))
        .unwrap();

    // A 16-level deep page tree so root-line building has real work.
    for uid in 1..=16u32 {
        services
            .pages
            .insert(PageRecord::new(uid, uid - 1, format!("Page {uid}")))
            .unwrap();
    }

    let ambient = Arc::new(InMemoryAmbient::new());
    let sim = Simulator::new(ambient.clone(), services.services()).unwrap();
    (sim, ambient)
}

fn bench_memoized_render_context(c: &mut Criterion) {
    let (sim, ambient) = make_simulator();
    let options = SimulationOptions::new().site("intl").page(16).language("de");

    let mut group = c.benchmark_group("simulate");
    group.throughput(Throughput::Elements(1));
    group.bench_function("site_language_page", |b| {
        b.iter(|| {
            sim.run(&options, || {
                Ok::<_, SimError>(black_box(ambient.render_context()?.is_some()))
            })
            .unwrap()
        });
    });
    group.bench_function("privileged_visibility", |b| {
        let options = SimulationOptions::new()
            .as_privileged_user(true)
            .include_hidden_pages(true)
            .include_deleted_records(true);
        b.iter(|| {
            sim.run(&options, || Ok::<_, SimError>(black_box(ambient.user()?.is_some())))
                .unwrap()
        });
    });
    group.finish();
}

fn bench_nested_short_circuit(c: &mut Criterion) {
    let (sim, _ambient) = make_simulator();
    let outer = SimulationOptions::new().site("intl");
    let inner = SimulationOptions::new().ignore_when_already_nested(true);

    c.bench_function("simulate/nested_short_circuit", |b| {
        sim.run(&outer, || {
            b.iter(|| {
                sim.run(&inner, || Ok::<_, SimError>(black_box(1u32)))
                    .unwrap()
            });
            Ok::<_, SimError>(())
        })
        .unwrap();
    });
}

criterion_group!(
    simulate,
    bench_memoized_render_context,
    bench_nested_short_circuit
);
criterion_main!(simulate);
