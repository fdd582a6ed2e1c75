use adql_expr::{
    ast::{ComparisonOperator, Condition, Operand, OperationType, Query, SelectItem},
    feature::{FeatureSet, LanguageVersion},
    geometry::{CircleFunction, GeometryFunction, GeometryValue, PointFunction},
    translate::{postgres::PostgresTranslator, sqlite::SqliteTranslator, translate_query},
    validate::check_features,
};
use criterion::{Criterion, criterion_group, criterion_main};

fn cone_search() -> Query {
    let point = PointFunction::new(None, Operand::column("ra"), Operand::column("dec"))
        .expect("numeric coordinates");
    let circle = CircleFunction::new(
        None,
        Operand::numeric("10.68"),
        Operand::numeric("41.27"),
        Operand::numeric("0.5"),
    )
    .expect("numeric coordinates");
    let contains = GeometryFunction::contains(
        GeometryValue::Function(Box::new(point.into())),
        GeometryValue::Function(Box::new(circle.into())),
    );
    Query::select_from(
        vec![
            SelectItem::operand(Operand::column("id")),
            SelectItem::operand(Operand::op(
                Operand::column("flux"),
                OperationType::Mult,
                Operand::numeric("0x10"),
            )),
        ],
        "stars",
    )
    .with_top(100)
    .with_where(Condition::compare(
        Operand::from(contains),
        ComparisonOperator::Eq,
        Operand::numeric("1"),
    ))
    .with_offset(20)
}

fn deep_sum() -> Query {
    let mut expr = Operand::column("a");
    for i in 0..200 {
        expr = Operand::op(expr, OperationType::Sum, Operand::numeric(i.to_string()));
    }
    Query::select_from(vec![SelectItem::operand(expr)], "t")
}

fn criterion_benchmark(c: &mut Criterion) {
    let queries = [cone_search(), deep_sum()];
    let features = FeatureSet::for_version(LanguageVersion::V2_1);
    let postgres = PostgresTranslator::default();
    let sqlite = SqliteTranslator::default();

    c.bench_function("validate", |b| {
        b.iter(|| {
            for query in queries.iter() {
                _ = std::hint::black_box(check_features(query, &features));
            }
        })
    });
    c.bench_function("postgres", |b| {
        b.iter(|| {
            for query in queries.iter() {
                _ = std::hint::black_box(translate_query(query, &postgres));
            }
        })
    });
    c.bench_function("sqlite", |b| {
        b.iter(|| {
            for query in queries.iter() {
                _ = std::hint::black_box(translate_query(query, &sqlite));
            }
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
