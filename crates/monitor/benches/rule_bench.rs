//! 룰 매칭 / 인증서 디코딩 벤치마크
//!
//! 필터 워커가 엔트리 하나를 처리하는 비용을 단계별로 측정합니다.

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use ctwatch_monitor::{
    CertKind, ChannelSink, DecodedCertificate, Diagnostics, FilterContext, MatchTarget, RawEntry,
    RulePack,
};

fn fixture(name: &str) -> Vec<u8> {
    let path = format!("{}/tests/fixtures/{name}.pem", env!("CARGO_MANIFEST_DIR"));
    let pem = std::fs::read(path).expect("read fixture");
    let (_, parsed) = x509_parser::pem::parse_x509_pem(&pem).expect("parse pem");
    parsed.contents
}

/// 카테고리 수만큼 매칭되지 않는 룰을 만들고 마지막에 하나만 매칭되게 합니다.
fn rule_pack(size: usize) -> RulePack {
    let mut patterns: Vec<(String, String)> = (0..size.saturating_sub(1))
        .map(|i| (format!("brand-{i:04}"), format!(r"(^|\.)brand{i}-(login|secure)\.")))
        .collect();
    patterns.push(("zz-test".to_owned(), r"^test\.".to_owned()));
    RulePack::compile(patterns).expect("valid rules")
}

fn bench_first_match(c: &mut Criterion) {
    let mut group = c.benchmark_group("rule_first_match");
    group.throughput(Throughput::Elements(1));

    for size in [1usize, 10, 100] {
        let pack = rule_pack(size);
        group.bench_with_input(BenchmarkId::new("hit_last", size), &pack, |b, pack| {
            b.iter(|| pack.first_match(black_box(&["test.example.com"])))
        });
        group.bench_with_input(BenchmarkId::new("miss", size), &pack, |b, pack| {
            b.iter(|| pack.first_match(black_box(&["unrelated.example.org"])))
        });
    }

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let der = fixture("test.example.com");

    let mut group = c.benchmark_group("certificate_decode");
    group.throughput(Throughput::Bytes(der.len() as u64));
    group.bench_function("from_der", |b| {
        b.iter(|| DecodedCertificate::from_der(black_box(&der)).expect("decode"))
    });
    group.finish();
}

fn bench_evaluate(c: &mut Criterion) {
    let (sink, _rx) = ChannelSink::channel(1);
    let context = FilterContext::new(
        Arc::new(rule_pack(10)),
        Arc::new(sink),
        Diagnostics::default(),
        MatchTarget::CommonName,
        true,
    );
    let log: Arc<str> = Arc::from("https://ct.example.net/");
    let der = fixture("test.example.com");

    let mut group = c.benchmark_group("filter_evaluate");
    group.throughput(Throughput::Elements(1));
    group.bench_function("match", |b| {
        b.iter(|| {
            let entry = RawEntry::with_certificate(Arc::clone(&log), 0, CertKind::X509, der.clone());
            context.evaluate(black_box(entry))
        })
    });
    group.bench_function("no_certificate", |b| {
        b.iter(|| context.evaluate(black_box(RawEntry::empty(Arc::clone(&log), 0))))
    });
    group.finish();
}

criterion_group!(benches, bench_first_match, bench_decode, bench_evaluate);
criterion_main!(benches);
