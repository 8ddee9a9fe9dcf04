use criterion::{Criterion, black_box, criterion_group, criterion_main};
use fastpath::container::{fast_aref, fast_aset};
use fastpath::ivar::{ivar_get, ivar_set};
use fastpath::numeric::{fast_lt, fast_plus};
use fastpath::sandbox::{ClassLayout, Sandbox, SandboxCreateInfo};
use fastpath::scope::{ConstLookup, get_const, set_const};
use fastpath::{ConstCache, IvarCache, SendCache, Value};

const ITERS_PER_SAMPLE: usize = 1000;

fn bench_sandbox() -> Sandbox {
    Sandbox::new(SandboxCreateInfo {
        arena_capacity: Some(64 * 1024),
        ..Default::default()
    })
}

/// Runs `op` once with the fast path allowed and once with the operator
/// treated as redefined.
fn run_pair(
    c: &mut Criterion,
    name: &str,
    sb: &mut Sandbox,
    mut op: impl FnMut(&mut Sandbox, &mut SendCache, bool) -> Value,
) {
    let mut cache = SendCache::new();
    black_box(op(sb, &mut cache, false));

    c.bench_function(&format!("{name}_fast_path"), |b| {
        b.iter(|| {
            for _ in 0..ITERS_PER_SAMPLE {
                black_box(op(sb, &mut cache, false));
            }
        })
    });

    c.bench_function(&format!("{name}_dispatched"), |b| {
        b.iter(|| {
            for _ in 0..ITERS_PER_SAMPLE {
                black_box(op(sb, &mut cache, true));
            }
        })
    });
}

fn bench_numeric(c: &mut Criterion) {
    let mut sb = bench_sandbox();
    run_pair(c, "fixnum_plus", &mut sb, |sb, cache, overridden| {
        fast_plus(sb, cache, Value::from_i64(20), Value::from_i64(22), overridden)
            .expect("plus")
    });
    run_pair(c, "float_lt", &mut sb, |sb, cache, overridden| {
        fast_lt(sb, cache, Value::from_f64(1.5), Value::from_i64(2), overridden).expect("lt")
    });
}

// Every value handed to the kernel below is allocated in the bench sandbox.

fn bench_containers(c: &mut Criterion) {
    let mut sb = bench_sandbox();
    let items: Vec<Value> = (0..64).map(Value::from_i64).collect();
    let ary = sb.new_array(&items);
    run_pair(c, "array_aref", &mut sb, |sb, cache, overridden| {
        unsafe { fast_aref(sb, cache, ary, Value::from_i64(17), overridden) }.expect("aref")
    });

    let hash = sb.new_hash();
    let key = sb.symbol("key");
    let mut cache = SendCache::new();
    unsafe { fast_aset(&mut sb, &mut cache, hash, key, Value::TRUE, false) }.expect("aset");
    run_pair(c, "hash_aref", &mut sb, |sb, cache, overridden| {
        unsafe { fast_aref(sb, cache, hash, key, overridden) }.expect("aref")
    });
}

fn bench_caches(c: &mut Criterion) {
    let mut sb = bench_sandbox();
    let point = sb.define_class("Point", None, ClassLayout::Slots);
    let obj = sb.new_object(point);
    let x = sb.intern("@x");
    let mut warm = IvarCache::default();
    unsafe { ivar_set(&mut sb, obj, x, Value::from_i64(1), &mut warm) }.expect("ivar set");

    c.bench_function("ivar_get_cached", |b| {
        b.iter(|| {
            for _ in 0..ITERS_PER_SAMPLE {
                black_box(unsafe { ivar_get(&mut sb, obj, x, &mut warm) });
            }
        })
    });
    c.bench_function("ivar_get_uncached", |b| {
        b.iter(|| {
            for _ in 0..ITERS_PER_SAMPLE {
                let mut cold = IvarCache::Uncacheable;
                black_box(unsafe { ivar_get(&mut sb, obj, x, &mut cold) });
            }
        })
    });

    let object = sb.classes().object;
    let limit = sb.intern("LIMIT");
    set_const(&mut sb, object, limit, Value::from_i64(10), false).expect("set const");
    let mut cache = ConstCache::new();
    c.bench_function("const_get_cached", |b| {
        b.iter(|| {
            for _ in 0..ITERS_PER_SAMPLE {
                black_box(get_const(&mut sb, object, &mut cache, limit, ConstLookup::LEXICAL))
                    .expect("get const");
            }
        })
    });
    c.bench_function("const_get_uncached", |b| {
        b.iter(|| {
            for _ in 0..ITERS_PER_SAMPLE {
                let mut cold = ConstCache::new();
                black_box(get_const(&mut sb, object, &mut cold, limit, ConstLookup::LEXICAL))
                    .expect("get const");
            }
        })
    });
}

criterion_group!(benches, bench_numeric, bench_containers, bench_caches);
criterion_main!(benches);
