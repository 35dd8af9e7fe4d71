// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for placement in the qrplace-document crate.
// Measures the empty-region search on a dense text page and the full
// detect-and-stamp pipeline on a single-page marker document.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use qrplace_core::{PlacementConfig, QrPayload};
use qrplace_document::testing::{PdfBuilder, marker_document, text_at};
use qrplace_document::{PdfReader, StampOptions, detect_and_add_qr, find_empty_region};

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Empty-region search on a letter page with 50 lines of body text.
fn bench_empty_region(c: &mut Criterion) {
    let mut content = String::new();
    for line in 0..50 {
        let y = 740.0 - f64::from(line) * 13.0;
        content.push_str(&text_at(72.0, y, 10.0, "Lorem ipsum dolor sit amet, consectetur adipiscing elit"));
    }
    let pdf = PdfBuilder::letter().page(content.as_bytes()).build();
    let reader = PdfReader::from_bytes(&pdf).expect("bench fixture parses");
    let layout = reader.layout().expect("bench fixture lays out");
    let config = PlacementConfig::default();

    c.bench_function("find_empty_region (50 lines)", |b| {
        b.iter(|| {
            let placement = find_empty_region(black_box(&layout.pages), 100.0, 100.0, &config);
            black_box(placement);
        });
    });
}

/// Full pipeline: parse, locate the marker, encode, stamp, serialise.
fn bench_detect_and_add(c: &mut Criterion) {
    let pdf = marker_document("[[SIGN_HERE]]", 72.0, 200.0);
    let payload = QrPayload::new("https://verify.example.com/c/42").with_certificate_id("CERT-42");
    let config = PlacementConfig::default();
    let options = StampOptions::default();

    c.bench_function("detect_and_add_qr (marker)", |b| {
        b.iter(|| {
            let outcome = detect_and_add_qr(black_box(&pdf), "[[SIGN_HERE]]", &payload, &options, &config);
            black_box(outcome.map(|o| o.pdf.len()).ok());
        });
    });
}

criterion_group!(benches, bench_empty_region, bench_detect_and_add);
criterion_main!(benches);
