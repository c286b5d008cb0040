use blueprint_dsl::parser::parse;
use blueprint_dsl::{refresh_all_relationships, DescendantLookup, DslParser, EntityNode};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const EXPR_MIN: &str = r#"$brooklyn:self().attributeWhenReady("http.port")"#;

const EXPR_NESTED: &str = r#"$brooklyn:formatString("%s:%s", $brooklyn:component("db").attributeWhenReady("host.address"), $brooklyn:parent().sibling("nginx").config("http.port"))"#;

const BLUEPRINT: &str = r#"
id: app
services:
  - id: db
  - id: nginx
    brooklyn.config:
      http.port: 8080+
  - id: web
    brooklyn.config:
      db.url: $brooklyn:formatString("mysql://%s/", $brooklyn:component("db").attributeWhenReady("host.address"))
      proxy: $brooklyn:sibling("nginx").config("http.port")
"#;

fn bench_parse(c: &mut Criterion) {
    c.bench_function("dsl/parse_min", |b| {
        b.iter(|| {
            let dsl = parse(black_box(EXPR_MIN)).expect("parse DSL");
            black_box(dsl.param_count());
        });
    });

    c.bench_function("dsl/round_trip_nested", |b| {
        b.iter(|| {
            let dsl = parse(black_box(EXPR_NESTED)).expect("parse DSL");
            black_box(dsl.to_expression().expect("generate DSL"));
        });
    });
}

fn bench_resolve(c: &mut Criterion) {
    let root = EntityNode::from_yaml_str(BLUEPRINT).expect("load blueprint");
    let web = root.find("web").expect("web entity").as_entity();
    let lookup = DescendantLookup::new(root.as_entity());
    let parser = DslParser::default();

    c.bench_function("dsl/relationships_nested", |b| {
        b.iter(|| {
            let dsl = parser
                .parse_with(black_box(EXPR_NESTED), &web, &lookup)
                .expect("parse DSL");
            black_box(dsl.relationships().len());
        });
    });

    c.bench_function("blueprint/refresh_all", |b| {
        b.iter(|| {
            let refreshed = refresh_all_relationships(&parser, &root);
            black_box(refreshed.len());
        });
    });
}

criterion_group!(benches, bench_parse, bench_resolve);
criterion_main!(benches);
