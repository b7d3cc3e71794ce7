use criterion::{criterion_group, criterion_main, Criterion};
use linetree::{EndOfLine, PieceTree};

const CAP: usize = 1_000_000;

fn filled() -> PieceTree {
    let mut pt = PieceTree::new(EndOfLine::Lf);
    let paragraph = "lorem ipsum dolor sit amet\n".repeat(64);
    while pt.len() < CAP {
        pt.insert(pt.len() / 2, &paragraph, true);
    }
    pt
}

fn insert(c: &mut Criterion) {
    c.bench_function("insert_start", |bench| {
        let mut pt = PieceTree::new(EndOfLine::Lf);
        bench.iter(move || {
            if pt.len() >= CAP {
                pt = PieceTree::new(EndOfLine::Lf);
            }

            pt.insert(0, "a", true)
        });
    });

    c.bench_function("insert_middle", |bench| {
        let mut pt = PieceTree::new(EndOfLine::Lf);
        bench.iter(move || {
            if pt.len() >= CAP {
                pt = PieceTree::new(EndOfLine::Lf);
            }

            pt.insert((pt.len() + 1) / 2, "a", true)
        });
    });
}

fn delete(c: &mut Criterion) {
    c.bench_function("delete_middle", |bench| {
        let mut pt = filled();
        bench.iter(move || {
            if pt.is_empty() {
                pt = filled();
            }

            pt.delete(pt.len() / 2, 1)
        });
    });
}

fn queries(c: &mut Criterion) {
    c.bench_function("position_at", |bench| {
        let pt = filled();
        let mut offset = 0;
        bench.iter(move || {
            offset = (offset + 4099) % pt.len();
            pt.position_at(offset)
        });
    });

    c.bench_function("line_content", |bench| {
        let pt = filled();
        let mut line = 1;
        bench.iter(move || {
            line = line % pt.line_count() + 1;
            pt.line_content(line)
        });
    });
}

criterion_group!(benches, insert, delete, queries);
criterion_main!(benches);
