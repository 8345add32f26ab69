use criterion::{Criterion, black_box, criterion_group, criterion_main};

use parley::{Category, KnowledgeBase};

fn words(text: &str) -> Vec<String> {
    text.split_whitespace().map(|w| w.to_string()).collect()
}

fn bench_matching(c: &mut Criterion) {
    let kb = KnowledgeBase::new();
    for i in 0..1000 {
        kb.add_category(Category::new(
            &format!("FACT {} IS *", i),
            "A fact template.",
        ));
    }
    kb.add_category(Category::new("MY NAME IS *", "Hello <star/>."));

    let input = words("my name is Bob");
    c.bench_function("find_match_1k_categories", |b| {
        b.iter(|| kb.find_match(black_box(&input), &[], &[]))
    });

    let miss = words("entirely unmatched words here");
    c.bench_function("find_match_miss", |b| {
        b.iter(|| kb.find_match(black_box(&miss), &[], &[]))
    });
}

criterion_group!(benches, bench_matching);
criterion_main!(benches);
