use criterion::{black_box, criterion_group, criterion_main, Criterion};
use vesper::letroot;
use vesper::options::RuntimeOptions;
use vesper::prelude::*;

fn bench_put_get(c: &mut Criterion) {
    let mut rt = Runtime::new(RuntimeOptions::default());
    let stack = rt.shadowstack();
    letroot!(object = stack, JsObject::new_empty(&mut rt));
    let key = "key".intern();
    object.put(&mut rt, key, JsValue::new(1i32), false).unwrap();
    c.bench_function("put existing named property", |b| {
        b.iter(|| {
            object
                .put(&mut rt, key, black_box(JsValue::new(2i32)), false)
                .unwrap();
        })
    });
    c.bench_function("get named property", |b| {
        b.iter(|| black_box(object.get(&mut rt, key).unwrap()))
    });
}

fn bench_indexed(c: &mut Criterion) {
    let mut rt = Runtime::new(RuntimeOptions::default());
    let stack = rt.shadowstack();
    letroot!(object = stack, JsObject::new_empty(&mut rt));
    for i in 0..128u32 {
        object
            .put(&mut rt, Symbol::Index(i), JsValue::new(i), false)
            .unwrap();
    }
    c.bench_function("get dense element", |b| {
        b.iter(|| black_box(object.get(&mut rt, Symbol::Index(64)).unwrap()))
    });
}

fn bench_transitions(c: &mut Criterion) {
    c.bench_function("build object with eight properties", |b| {
        let mut rt = Runtime::new(RuntimeOptions::default());
        let names: Vec<Symbol> = (0..8).map(|i| format!("p{}", i).intern()).collect();
        b.iter(|| {
            let stack = rt.shadowstack();
            letroot!(object = stack, JsObject::new_empty(&mut rt));
            for (i, name) in names.iter().enumerate() {
                object
                    .put(&mut rt, *name, JsValue::new(i as i32), false)
                    .unwrap();
            }
            black_box(*object);
        })
    });
}

criterion_group!(benches, bench_put_get, bench_indexed, bench_transitions);
criterion_main!(benches);
