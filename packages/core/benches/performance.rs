//! Performance benchmarks for Folio core operations
//!
//! Run with: `cargo bench -p folio-core`
//!
//! These benchmarks measure the editor's hot paths:
//! - Codec encode/decode of a large page (runs on every load and save)
//! - Block toggles over a long selection
//! - Palette filtering (runs on every keystroke while the menu is open)
//! - Debounced saves through a session on the in-memory store

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use folio_core::codec;
use folio_core::db::{MemoryPageStore, PageStore};
use folio_core::models::{
    Document, Mark, MarkKind, NewPage, Node, NodeKind, PageIdentifier, Position, Selection,
};
use folio_core::operations::{filter, EditorCommand, DEFAULT_CATALOG};
use folio_core::services::{NoopNavigator, PageSession, SessionEvent};
use folio_core::SessionConfig;
use std::sync::Arc;
use tokio::runtime::Runtime;

/// Generate a page with N top-level blocks of mixed kinds
fn generate_large_document(block_count: usize) -> Document {
    let blocks = (0..block_count)
        .map(|i| match i % 5 {
            0 => Node::heading(
                ((i / 5) % 3 + 1) as u8,
                vec![Node::text(&format!("Section {}", i))],
            ),
            1 => Node::paragraph_with(vec![
                Node::text("Paragraph with "),
                Node::text_with_marks("bold", vec![Mark::Bold]),
                Node::text(" and "),
                Node::text_with_marks("a link", vec![Mark::link("https://example.com")]),
            ]),
            2 => Node::with_children(
                NodeKind::TaskList,
                vec![
                    Node::task_item(i % 2 == 0, vec![Node::paragraph_with_text("Task")]),
                    Node::task_item(false, vec![Node::paragraph_with_text("Another task")]),
                ],
            ),
            3 => Node::code_block("fn main() {\n    println!(\"hi\");\n}"),
            _ => Node::paragraph_with_text("Plain paragraph of descriptive text."),
        })
        .collect();
    Document::new(blocks)
}

fn bench_codec(c: &mut Criterion) {
    let document = generate_large_document(1000);
    let encoded = codec::encode(&document).unwrap();
    let text = codec::encode_to_string(&document).unwrap();

    let mut group = c.benchmark_group("codec");
    group.sample_size(20);

    group.bench_function("encode_1000_blocks", |b| {
        b.iter(|| codec::encode(black_box(&document)).unwrap())
    });

    group.bench_function("decode_1000_blocks", |b| {
        b.iter(|| codec::decode(black_box(&encoded)))
    });

    group.bench_function("decode_str_1000_blocks", |b| {
        b.iter(|| codec::decode_str(black_box(&text)))
    });

    group.finish();
}

fn bench_commands(c: &mut Criterion) {
    let document = Document::new(
        (0..200)
            .map(|i| Node::paragraph_with_text(&format!("Line {}", i)))
            .collect(),
    );
    let selection = Selection::range(Position::new(vec![0], 0), Position::new(vec![199], 3));

    c.bench_function("toggle_bullet_list_200_paragraphs", |b| {
        b.iter(|| EditorCommand::ToggleBulletList.apply(black_box(&document), Some(&selection)))
    });

    c.bench_function("toggle_bold_200_paragraphs", |b| {
        b.iter(|| {
            EditorCommand::ToggleMark {
                mark: MarkKind::Bold,
            }
            .apply(black_box(&document), Some(&selection))
        })
    });
}

fn bench_palette_filter(c: &mut Criterion) {
    c.bench_function("palette_filter", |b| {
        b.iter(|| {
            for query in ["", "h", "head", "list", "zzz"] {
                black_box(filter(black_box(query), &DEFAULT_CATALOG));
            }
        })
    });
}

/// Time from first edit to confirmed save with a zero-length debounce
fn bench_session_save_cycle(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let config = SessionConfig {
        save_debounce_ms: 0,
        slug_debounce_ms: 0,
        ..Default::default()
    };

    let (store, page_id) = rt.block_on(async {
        let store = Arc::new(MemoryPageStore::new());
        let page = store
            .create_page(NewPage::new(
                "bench",
                "Bench",
                "bench",
                codec::encode(&Document::empty()).unwrap(),
            ))
            .await
            .unwrap();
        (store, page.id)
    });

    let mut group = c.benchmark_group("session");
    group.sample_size(20);

    let mut revision = 0u64;
    group.bench_function("edit_to_saved", |b| {
        b.iter(|| {
            revision += 1;
            rt.block_on(async {
                let session = PageSession::open(
                    store.clone(),
                    Arc::new(NoopNavigator),
                    PageIdentifier::by_id(&page_id),
                    config.clone(),
                )
                .unwrap();
                session.wait_until_loaded().await.unwrap();

                let mut document = generate_large_document(50);
                document
                    .children
                    .push(Node::paragraph_with_text(&format!("Revision {}", revision)));
                let mut events = session.subscribe();
                session.update_content(document).unwrap();

                while let Ok(event) = events.recv().await {
                    if matches!(event, SessionEvent::Saved { .. }) {
                        break;
                    }
                }
                session.close().await;
            })
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_codec,
    bench_commands,
    bench_palette_filter,
    bench_session_save_cycle
);
criterion_main!(benches);
