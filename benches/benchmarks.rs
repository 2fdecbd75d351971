// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use scrapegen::{
    CompileOptions, Credentials, Endpoint, FailurePolicy, KeySelector, ScrapeTarget,
    SecretOrConfigMap, TlsConfig, compile, generate_scrape_config, parse_input
};

fn benchmark_single_endpoint(c: &mut Criterion) {
    let target = ScrapeTarget {
        namespace: "default".to_owned(),
        name: "test-scrape".to_owned(),
        endpoints: vec![Endpoint {
            tls_config: Some(TlsConfig {
                ca: SecretOrConfigMap::secret(KeySelector::new("tls-secret", "ca")),
                ..TlsConfig::default()
            }),
            bearer_token_file: Some("/var/run/token".to_owned()),
            ..Endpoint::on_port("8080")
        }],
        ..ScrapeTarget::default()
    };
    let options = CompileOptions::default();
    let credentials = Credentials::default();

    c.bench_function("generate_scrape_config", |b| {
        b.iter(|| {
            generate_scrape_config(
                black_box(&target),
                black_box(&target.endpoints[0]),
                0,
                &options,
                &credentials
            )
            .expect("compile failed")
        })
    });
}

fn benchmark_render_single_endpoint(c: &mut Criterion) {
    let target = ScrapeTarget {
        namespace: "default".to_owned(),
        name: "web".to_owned(),
        endpoints: vec![Endpoint::on_port("http")],
        ..ScrapeTarget::default()
    };
    let document = generate_scrape_config(
        &target,
        &target.endpoints[0],
        0,
        &CompileOptions::default(),
        &Credentials::default()
    )
    .expect("compile failed");

    c.bench_function("render_scrape_config", |b| {
        b.iter(|| black_box(&document).to_yaml().expect("render failed"))
    });
}

fn benchmark_large_bundle(c: &mut Criterion) {
    let mut yaml = String::from("targets:\n");
    for i in 0..100 {
        yaml.push_str(&format!(
            "  - namespace: team{i}\n    name: service{i}\n    endpoints:\n      - port: http\n      - port: 9100\n"
        ));
    }
    let input = parse_input(&yaml).expect("parse failed");
    let options = CompileOptions::default();

    c.bench_function("compile_100_targets", |b| {
        b.iter(|| {
            compile(black_box(&input), &options, FailurePolicy::FailFast)
                .and_then(|compiled| compiled.render())
                .expect("compile failed")
        })
    });
}

criterion_group!(
    benches,
    benchmark_single_endpoint,
    benchmark_render_single_endpoint,
    benchmark_large_bundle
);
criterion_main!(benches);
