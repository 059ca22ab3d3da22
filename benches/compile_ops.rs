//! Benchmarks for intent extraction and query compilation.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use habit_intent::compile::{FixedIds, Namespaces, QueryCompiler};
use habit_intent::intent::IntentAnalyzer;
use habit_intent::knowledge::DomainKnowledge;
use habit_intent::memory::{ContextMemory, SystemClock};

const COMMANDS: [&str; 4] = [
    "ajoute une habitude sommeil avec 8 heures",
    "trouve les habitudes nutrition entre 300 et 600 calories",
    "supprime toutes les habitudes stress",
    "analyse mes dernières activités de la semaine",
];

fn setup() -> (IntentAnalyzer, QueryCompiler) {
    let knowledge = Arc::new(DomainKnowledge::bundled().unwrap());
    let analyzer = IntentAnalyzer::new(
        Arc::clone(&knowledge),
        Arc::new(ContextMemory::with_capacity(64)),
        Arc::new(SystemClock),
    );
    let compiler = QueryCompiler::new(knowledge, Namespaces::default())
        .with_ids(Arc::new(FixedIds("bench".into())));
    (analyzer, compiler)
}

fn bench_analyze(c: &mut Criterion) {
    let (analyzer, _) = setup();
    c.bench_function("analyze_4_commands", |bench| {
        bench.iter(|| {
            for text in COMMANDS {
                black_box(analyzer.analyze(text, Some("42")));
            }
        })
    });
}

fn bench_compile(c: &mut Criterion) {
    let (analyzer, compiler) = setup();
    let intents: Vec<_> = COMMANDS
        .iter()
        .map(|text| analyzer.analyze(text, Some("42")))
        .collect();
    c.bench_function("compile_4_intents", |bench| {
        bench.iter(|| {
            for intent in &intents {
                black_box(compiler.compile(intent).unwrap());
            }
        })
    });
}

criterion_group!(benches, bench_analyze, bench_compile);
criterion_main!(benches);
