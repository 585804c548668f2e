use kard_core::{ComparableValue, DataCell, PropertyName, Quantity};
use kard_dataselect::{select, DataSelectQuery};
use std::time::Instant;

#[derive(Clone)]
struct Synthetic {
    name: String,
    namespace: String,
    created: i64,
    capacity: Quantity,
}

impl DataCell for Synthetic {
    const SUPPORTED: &'static [PropertyName] = &[
        PropertyName::Name,
        PropertyName::Namespace,
        PropertyName::CreationTimestamp,
        PropertyName::Capacity,
    ];

    fn property(&self, name: PropertyName) -> Option<ComparableValue> {
        match name {
            PropertyName::Name => Some(self.name.as_str().into()),
            PropertyName::Namespace => Some(self.namespace.as_str().into()),
            PropertyName::CreationTimestamp => chrono::DateTime::from_timestamp(self.created, 0).map(Into::into),
            PropertyName::Capacity => Some(self.capacity.clone().into()),
            _ => None,
        }
    }
}

fn gen_obj(i: usize) -> Synthetic {
    let unit = match i % 3 {
        0 => "Mi",
        1 => "Gi",
        _ => "Ki",
    };
    Synthetic {
        name: format!("obj-{:06}", (i * 7919) % 1_000_000),
        namespace: format!("ns{}", i % 10),
        created: 1_577_836_800 + (i as i64 % 86_400),
        capacity: Quantity::parse(&format!("{}{}", i % 512, unit)).unwrap_or_else(|_| Quantity::parse("0").unwrap()),
    }
}

fn percentile_us(xs: &mut [u128], p: f64) -> u128 {
    xs.sort_unstable();
    let idx = ((xs.len() as f64 - 1.0) * p).round() as usize;
    xs[idx]
}

fn main() {
    let n: usize = std::env::var("KARD_BENCH_DOCS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(100_000);
    let rounds: usize = std::env::var("KARD_BENCH_ROUNDS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(20);

    eprintln!("building collection: {} objects", n);
    let t0 = Instant::now();
    let objs: Vec<Synthetic> = (0..n).map(gen_obj).collect();
    let build_ms = t0.elapsed().as_secs_f64() * 1_000.0;

    let queries: Vec<(&str, DataSelectQuery)> = vec![
        ("page_only", DataSelectQuery::from_params([("itemsPerPage", "50"), ("page", "3")]).unwrap()),
        ("sort_name", DataSelectQuery::from_params([("sortBy", "a,name"), ("itemsPerPage", "50")]).unwrap()),
        ("sort_multi", DataSelectQuery::from_params([("sortBy", "a,namespace,d,creationTimestamp"), ("itemsPerPage", "50")]).unwrap()),
        ("filter_sort", DataSelectQuery::from_params([("filterBy", "namespace,ns3"), ("sortBy", "d,capacity"), ("limit", "50")]).unwrap()),
    ];

    println!("collection_build: {:.1}ms docs={}", build_ms, n);
    for (label, q) in &queries {
        let mut times: Vec<u128> = Vec::with_capacity(rounds);
        let mut total = 0;
        for _ in 0..rounds {
            let cells = objs.clone();
            let t = Instant::now();
            let sel = select(cells, q);
            times.push(t.elapsed().as_micros());
            total = sel.list_meta.total_items;
        }
        let p50 = percentile_us(&mut times.clone(), 0.50) as f64 / 1000.0;
        let p99 = percentile_us(&mut times, 0.99) as f64 / 1000.0;
        println!("{}: p50={:.3}ms p99={:.3}ms total={} ({} rounds)", label, p50, p99, total, rounds);
    }
}
