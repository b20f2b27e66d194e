use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use iam_drift::iam::{
    aggregate, classify, compare, ClassificationCache, Normalizer, PolicyAttachment,
    PolicyDocument, Principal,
};
use serde_json::json;

const ACTIONS: [&str; 10] = [
    "s3:GetObject",
    "s3:PutObject",
    "s3:ListBucket",
    "ec2:DescribeInstances",
    "iam:PassRole",
    "iam:CreatePolicy",
    "lambda:TagResource",
    "dynamodb:*",
    "*",
    "NotAnAction",
];

/// A principal with a handful of policies touching several services
fn create_policies(variant: usize) -> Vec<PolicyAttachment> {
    let grants = PolicyDocument::from_value(&json!({
        "Version": "2012-10-17",
        "Statement": [
            { "Effect": "Allow", "Action": ["s3:GetObject", "s3:PutObject", "s3:ListBucket"], "Resource": format!("arn:aws:s3:::bucket-{}/*", variant) },
            { "Effect": "Allow", "Action": ["ec2:Describe*", "ec2:StartInstances"], "Resource": "*" },
            { "Effect": "Allow", "Action": "iam:PassRole", "Resource": "*" }
        ]
    }));
    let guardrail = PolicyDocument::from_value(&json!({
        "Statement": { "Effect": "Deny", "Action": ["s3:DeleteBucket", "iam:CreatePolicy"], "Resource": "*" }
    }));

    vec![
        PolicyAttachment::new("Grants", "Inline", grants),
        PolicyAttachment::new("Guardrail", "Attached", guardrail),
    ]
}

/// Benchmark classification without the cache
fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify");
    group.throughput(Throughput::Elements(ACTIONS.len() as u64));

    group.bench_function("uncached", |b| {
        b.iter(|| {
            for action in ACTIONS {
                black_box(classify(black_box(action)));
            }
        });
    });

    group.bench_function("cached", |b| {
        let mut cache = ClassificationCache::default();
        b.iter(|| {
            for action in ACTIONS {
                black_box(cache.classify(black_box(action)));
            }
        });
    });

    group.finish();
}

/// Benchmark normalize + aggregate over a growing principal population
fn bench_matrix(c: &mut Criterion) {
    let principal_counts = vec![10, 100, 1_000];

    let mut group = c.benchmark_group("matrix");

    for count in principal_counts {
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let principals: Vec<(Principal, Vec<PolicyAttachment>)> = (0..count)
                .map(|i| {
                    let principal = Principal::user(format!("user-{}", i)).unwrap();
                    (principal, create_policies(i % 7))
                })
                .collect();

            b.iter(|| {
                let mut normalizer = Normalizer::default();
                let records: Vec<_> = principals
                    .iter()
                    .flat_map(|(p, policies)| normalizer.normalize_principal(p, policies))
                    .collect();
                black_box(aggregate(&records));
            });
        });
    }

    group.finish();
}

/// Benchmark drift comparison between two large matrices
fn bench_drift(c: &mut Criterion) {
    let mut normalizer = Normalizer::default();
    let build = |normalizer: &mut Normalizer, offset: usize| {
        let records: Vec<_> = (0..1_000)
            .flat_map(|i| {
                let principal = Principal::role(format!("role-{}", i)).unwrap();
                normalizer.normalize_principal(&principal, &create_policies((i + offset) % 5))
            })
            .collect();
        aggregate(&records)
    };

    let day1 = build(&mut normalizer, 0);
    let day2 = build(&mut normalizer, 1);

    c.bench_function("drift_compare_1000", |b| {
        b.iter(|| black_box(compare(&day1, &day2)));
    });
}

criterion_group!(benches, bench_classify, bench_matrix, bench_drift);
criterion_main!(benches);
