use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use dom::{DomArena, NodeId};
use snapshot::css::absolutize;
use snapshot::{rebuild, snapshot, RebuildOptions, SerializeOptions, Session, SlimDomOptions};

const SMALL_CARDS: usize = 64;
const LARGE_CARDS: usize = 5_000;

/// `<div class=card><h2>title</h2><p>body <a href=..>link</a></p><img src=..></div>` per card
fn make_page(cards: usize) -> (DomArena, NodeId) {
    let mut arena = DomArena::with_capacity(cards * 9 + 8);
    let doc = arena.create_document("https://example.com/catalog/index.html");
    let html = arena.create_element("html");
    let head = arena.create_element("head");
    let style = arena.create_element("style");
    let css = arena.create_text(".card:hover { background: url(img/hover.png) }");
    let body = arena.create_element("body");
    arena.append_child(doc, html).unwrap();
    arena.append_child(html, head).unwrap();
    arena.append_child(head, style).unwrap();
    arena.append_child(style, css).unwrap();
    arena.append_child(html, body).unwrap();

    for i in 0..cards {
        let card = arena.create_element("div");
        let title = arena.create_element("h2");
        let title_text = arena.create_text(&format!("Item {i}"));
        let para = arena.create_element("p");
        let para_text = arena.create_text("Lorem ipsum dolor sit amet ");
        let link = arena.create_element("a");
        let link_text = arena.create_text("details");
        let img = arena.create_element("img");

        arena.append_child(body, card).unwrap();
        arena.append_child(card, title).unwrap();
        arena.append_child(title, title_text).unwrap();
        arena.append_child(card, para).unwrap();
        arena.append_child(para, para_text).unwrap();
        arena.append_child(para, link).unwrap();
        arena.append_child(link, link_text).unwrap();
        arena.append_child(card, img).unwrap();

        arena.set_attribute(card, "class", "card").unwrap();
        arena.set_attribute(link, "href", &format!("../item/{i}")).unwrap();
        arena.set_attribute(img, "src", &format!("img/{i}.png")).unwrap();
        arena
            .set_attribute(img, "srcset", &format!("img/{i}@2x.png 2x, img/{i}@3x.png 3x"))
            .unwrap();
    }
    (arena, doc)
}

fn bench_snapshot_small(c: &mut Criterion) {
    let (arena, doc) = make_page(SMALL_CARDS);
    let options = SerializeOptions::default();
    c.bench_function("bench_snapshot_small", |b| {
        b.iter(|| {
            let mut session = Session::new();
            let (sn, _) = snapshot(black_box(&arena), doc, &mut session, &options);
            black_box(sn);
        });
    });
}

fn bench_snapshot_large(c: &mut Criterion) {
    let (arena, doc) = make_page(LARGE_CARDS);
    let options = SerializeOptions::default();
    c.bench_function("bench_snapshot_large", |b| {
        b.iter(|| {
            let mut session = Session::new();
            let (sn, _) = snapshot(black_box(&arena), doc, &mut session, &options);
            black_box(sn);
        });
    });
}

fn bench_snapshot_slim_large(c: &mut Criterion) {
    let (arena, doc) = make_page(LARGE_CARDS);
    let options = SerializeOptions {
        slim_dom: SlimDomOptions::all(),
        preserve_white_space: false,
        ..Default::default()
    };
    c.bench_function("bench_snapshot_slim_large", |b| {
        b.iter(|| {
            let mut session = Session::new();
            let (sn, _) = snapshot(black_box(&arena), doc, &mut session, &options);
            black_box(sn);
        });
    });
}

fn bench_to_json_large(c: &mut Criterion) {
    let (arena, doc) = make_page(LARGE_CARDS);
    let mut session = Session::new();
    let sn = snapshot(&arena, doc, &mut session, &SerializeOptions::default())
        .0
        .unwrap();
    c.bench_function("bench_to_json_large", |b| {
        b.iter(|| black_box(sn.to_json().unwrap().len()));
    });
}

fn bench_rebuild_large(c: &mut Criterion) {
    let (arena, doc) = make_page(LARGE_CARDS);
    let mut session = Session::new();
    let sn = snapshot(&arena, doc, &mut session, &SerializeOptions::default())
        .0
        .unwrap();
    c.bench_function("bench_rebuild_large", |b| {
        b.iter_batched(
            || {
                let mut replica = DomArena::with_capacity(arena.len());
                let target = replica.create_document("about:blank");
                (replica, target)
            },
            |(mut replica, target)| {
                let mut replay = Session::new();
                let result = rebuild(
                    black_box(&sn),
                    target,
                    &mut replica,
                    &mut replay,
                    RebuildOptions::default(),
                );
                black_box(result.map(|(_, map)| map.len()).unwrap_or_default());
            },
            BatchSize::LargeInput,
        );
    });
}

fn bench_absolutize(c: &mut Criterion) {
    let css: String = (0..500)
        .map(|i| format!(".r{i} {{ background: url(../img/{i}.png) }} .q{i} {{ src: url('fonts/{i}.woff') }}\n"))
        .collect();
    c.bench_function("bench_absolutize", |b| {
        b.iter(|| black_box(absolutize(black_box(&css), "https://cdn.example.com/a/b/site.css")));
    });
}

criterion_group!(
    benches,
    bench_snapshot_small,
    bench_snapshot_large,
    bench_snapshot_slim_large,
    bench_to_json_large,
    bench_rebuild_large,
    bench_absolutize
);
criterion_main!(benches);
