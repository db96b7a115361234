use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use roster_import::entity::{Entity, SchoolClass};
use roster_import::pipeline::{ImportJob, ImportOptions, Importer};
use roster_import::records::ImportKind;
use roster_import::store::MemoryStore;
use roster_import::tabular::{Document, DocumentFormat, SheetSelection, read_document};
use roster_import::types::TenantId;

const TENANT: TenantId = TenantId(1);

fn student_csv(rows: usize) -> Document {
    let mut text = String::from(
        "FirstName,LastName,StudentId,Email,Class,RollNumber,DateOfBirth,ParentFirstName,ParentEmail\n",
    );
    for n in 0..rows {
        // Every fourth student shares a parent with the previous one.
        let parent = n - n % 4 / 3;
        text.push_str(&format!(
            "First{n},Last{n},S-{n:06},student{n}@school.org,Grade {},{},2014-06-23,Parent{parent},parent{parent}@home.org\n",
            n % 8 + 1,
            n + 1
        ));
    }
    Document::new(DocumentFormat::Csv, text)
}

fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    for grade in 1..=8 {
        let _ = store.seed(Entity::SchoolClass(SchoolClass {
            tenant_id: TENANT,
            name: format!("Grade {grade}"),
        }));
    }
    store
}

fn bench_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_document");
    for rows in [1_000usize, 10_000] {
        let doc = student_csv(rows);
        group.throughput(Throughput::Elements(rows as u64));
        group.bench_with_input(BenchmarkId::new("csv", rows), &doc, |b, doc| {
            b.iter(|| black_box(read_document(doc, &SheetSelection::First).unwrap().row_count()))
        });
    }
    group.finish();
}

fn bench_import(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("student_import");
    group.sample_size(20);

    for rows in [1_000usize, 10_000] {
        let doc = student_csv(rows);
        group.throughput(Throughput::Elements(rows as u64));

        let validate = ImportJob::new(ImportKind::Student, TENANT).with_options(ImportOptions {
            validate_only: true,
            ..ImportOptions::default()
        });
        let importer = Importer::new(seeded_store());
        group.bench_with_input(BenchmarkId::new("validate_only", rows), &doc, |b, doc| {
            b.iter(|| {
                let outcome = rt.block_on(importer.run(&validate, doc)).unwrap();
                black_box(outcome.success)
            })
        });

        let job = ImportJob::new(ImportKind::Student, TENANT);
        group.bench_with_input(BenchmarkId::new("commit", rows), &doc, |b, doc| {
            b.iter(|| {
                let importer = Importer::new(seeded_store());
                let outcome = rt.block_on(importer.run(&job, doc)).unwrap();
                black_box(outcome.success)
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_read, bench_import);
criterion_main!(benches);
