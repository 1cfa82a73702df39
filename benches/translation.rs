//! Translation Benchmarks
//!
//! Path building and full CFI <-> XPointer conversion over a synthetic
//! chapter.
//!
//! Run with: `cargo bench --bench translation`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use roxmltree::Document;

use amnesia_xpointer::document::{section_body, SectionStore};
use amnesia_xpointer::xpointer::{build_path, build_path_for_offset, resolve_path, XPointer};
use amnesia_xpointer::{normalize_xpointer, LocationTranslator};

/// Chapter with `paragraphs` paragraphs, each with an inline run
fn create_chapter(paragraphs: usize) -> String {
    let mut body = String::new();
    body.push_str("<h1>Chapter</h1>");
    for i in 0..paragraphs {
        body.push_str(&format!(
            "<p>Paragraph {} opens here, <em>continues in emphasis</em> and ends plainly.</p>",
            i
        ));
    }
    format!(
        "<html xmlns=\"http://www.w3.org/1999/xhtml\"><head><title>Bench</title></head><body><section>{}</section></body></html>",
        body
    )
}

fn bench_path_building(c: &mut Criterion) {
    let mut group = c.benchmark_group("path_building");

    for size in [10usize, 100, 1000] {
        let content = create_chapter(size);
        let doc = Document::parse(&content).expect("valid chapter");
        let section = section_body(&doc)
            .and_then(|b| b.first_element_child())
            .expect("section element");
        let last = section.last_element_child().expect("last paragraph");

        group.bench_with_input(BenchmarkId::new("build_path", size), &last, |b, el| {
            b.iter(|| build_path(black_box(*el), 4))
        });

        group.bench_with_input(BenchmarkId::new("build_path_for_offset", size), &section, |b, el| {
            b.iter(|| build_path_for_offset(black_box(*el), black_box(size * 40), 4))
        });

        let xpointer: XPointer = build_path(last, 4).to_string().parse().expect("valid xpointer");
        group.bench_with_input(BenchmarkId::new("resolve_path", size), &xpointer, |b, xp| {
            b.iter(|| resolve_path(&doc, black_box(&xp.path)))
        });
    }

    group.finish();
}

fn bench_conversion(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    let store = SectionStore::from_sections((0..20).map(|i| (format!("ch{:02}.xhtml", i), create_chapter(200))));
    let translator = LocationTranslator::new(store);

    let mut group = c.benchmark_group("conversion");

    group.bench_function("cfi_to_xpointer", |b| {
        b.iter(|| {
            runtime.block_on(translator.cfi_to_xpointer(black_box("epubcfi(/6/20!/4/2/200/3:10)")))
        })
    });

    group.bench_function("xpointer_to_cfi", |b| {
        b.iter(|| {
            runtime.block_on(
                translator.xpointer_to_cfi(black_box("/body/DocFragment[10]/body/section/p[100]/text().30")),
            )
        })
    });

    group.bench_function("normalize", |b| {
        b.iter(|| normalize_xpointer(black_box("/body/DocFragment[10]/body/section/p[100]/text().30")))
    });

    group.finish();
}

criterion_group!(benches, bench_path_building, bench_conversion);
criterion_main!(benches);
