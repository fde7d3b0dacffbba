use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use editor_tokens::{
    LineTokens, SemanticTokenStore, TextEdit, TokenMetadata, TokenPosition, TokenRange,
    TokenRangeOverlay,
};

/// Three tokens on every line of `lines` lines starting at `base_line`.
fn dense_overlay(base_line: u32, lines: u32, metadata: u32) -> TokenRangeOverlay {
    let mut raw = Vec::with_capacity(lines as usize * 12);
    for line in 0..lines {
        raw.extend_from_slice(&[
            line, 4, 9, metadata, //
            line, 12, 20, metadata, //
            line, 24, 31, metadata,
        ]);
    }
    TokenRangeOverlay::from_raw(base_line, &raw).unwrap()
}

fn bench_partial_pushes(c: &mut Criterion) {
    c.bench_function("set_partial/200_viewport_pushes", |b| {
        b.iter_batched(
            || {
                let mut store = SemanticTokenStore::new();
                store.set(vec![dense_overlay(0, 50_000, (1 << 14) | 8)]).unwrap();
                store
            },
            |mut store| {
                for push in 0..200u32 {
                    let start = (push * 997) % 49_900;
                    store
                        .set_partial(
                            TokenRange::new(start, 0, start + 60, 0),
                            vec![dense_overlay(start, 60, ((push % 500) << 14) | 8)],
                        )
                        .unwrap();
                }
                black_box(store.len());
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_typing(c: &mut Criterion) {
    c.bench_function("accept_edit/100_keystrokes", |b| {
        b.iter_batched(
            || {
                let mut store = SemanticTokenStore::new();
                let overlays = (0..500)
                    .map(|chunk| dense_overlay(chunk * 100, 100, (1 << 14) | 8))
                    .collect();
                store.set(overlays).unwrap();
                store
            },
            |mut store| {
                for column in 0..100u32 {
                    store
                        .accept_edit(&TextEdit::insert(
                            TokenPosition::new(25_000, 40 + column),
                            "x",
                        ))
                        .unwrap();
                }
                black_box(store.len());
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_merge(c: &mut Criterion) {
    let mut store = SemanticTokenStore::new();
    store.set(vec![dense_overlay(0, 1_000, (5 << 14) | 8)]).unwrap();
    let baseline = LineTokens::from_raw(&[
        3,
        TokenMetadata::DEFAULT_BASELINE.raw(),
        10,
        TokenMetadata::DEFAULT_BASELINE.raw(),
        22,
        TokenMetadata::DEFAULT_BASELINE.raw(),
        40,
        TokenMetadata::DEFAULT_BASELINE.raw(),
    ])
    .unwrap();

    c.bench_function("merge_line_tokens/60_lines", |b| {
        b.iter(|| {
            for line in 500..560 {
                black_box(store.merge_line_tokens(line, black_box(&baseline)));
            }
        })
    });
}

criterion_group!(benches, bench_partial_pushes, bench_typing, bench_merge);
criterion_main!(benches);
