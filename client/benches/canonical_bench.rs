// Canonicalization & payload signing benchmarks.
//
// Covers canonical form construction for flat and nested payloads, value
// encoding, and the sign step a record performs before every submission.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::{json, Map, Value};
use std::sync::Arc;

use ledgerline_client::codec::{canonicalize, encode, ValueType};
use ledgerline_client::crypto::Keypair;
use ledgerline_client::network::{MockTransport, Transport};
use ledgerline_client::transaction::{Payload, TransactionRecord, TxInfo};

fn transfer(kp: &Keypair) -> TxInfo {
    TxInfo::new(kp.public_key().to_hex(), "currency", "transfer", 50_000)
        .kwarg("to", json!("ab".repeat(32)))
        .kwarg("amount", json!({"__fixed__": "100.5"}))
        .nonce(42)
        .processor("89f67bb871351a1629d66676e4bd92bbacb23bd0649b890542ef98f1b664a497")
}

fn bench_canonicalize_payload(c: &mut Criterion) {
    let kp = Keypair::generate();
    let info = transfer(&kp);

    c.bench_function("canonical/payload", |b| {
        b.iter(|| Payload::new(&info).canonicalize());
    });
}

fn bench_canonicalize_nested(c: &mut Criterion) {
    let mut group = c.benchmark_group("canonical/nested_kwargs");

    for width in [4usize, 32, 256] {
        let mut kwargs = Map::new();
        for i in 0..width {
            kwargs.insert(
                format!("k{:04}", width - i),
                json!({"z": i, "a": [i, {"y": "v", "b": true}]}),
            );
        }
        let value = Value::Object(kwargs);

        group.throughput(Throughput::Elements(width as u64));
        group.bench_with_input(BenchmarkId::from_parameter(width), &value, |b, v| {
            b.iter(|| canonicalize(v));
        });
    }

    group.finish();
}

fn bench_encode_float(c: &mut Criterion) {
    let value = json!("1234567.123456789012345678901234567890");

    c.bench_function("encoder/float", |b| {
        b.iter(|| encode(ValueType::Float, &value));
    });
}

fn bench_sign_record(c: &mut Criterion) {
    let kp = Keypair::generate();
    let transport: Arc<dyn Transport> = Arc::new(MockTransport::new());
    let signer = Arc::new(kp.clone());

    c.bench_function("record/sign", |b| {
        b.iter(|| {
            let mut record = TransactionRecord::new(transport.clone(), transfer(&kp))
                .expect("valid transaction");
            record.sign(signer.clone()).expect("signable");
        });
    });
}

criterion_group!(
    benches,
    bench_canonicalize_payload,
    bench_canonicalize_nested,
    bench_encode_float,
    bench_sign_record
);
criterion_main!(benches);
