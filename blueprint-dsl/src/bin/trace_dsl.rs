/// DSL Expression Tracer - Shows the flow through Tokenizer → Dsl graph → relationships
///
/// Usage:
///   cargo run --bin trace_dsl <expression> [blueprint.yaml [base-entity-id]]
///   cargo run --bin trace_dsl --refresh <blueprint.yaml>
///
/// Logging follows RUST_LOG (default `blueprint_dsl=info`). A TOML parser
/// config is read from the file named by BLUEPRINT_DSL_CONFIG, if set.

use blueprint_dsl::{
    refresh_all_relationships, DescendantLookup, Dsl, DslConfig, DslParser, EntityNode,
    Reference, CONFIG_ENV_VAR,
};
use std::fs;
use std::process;
use std::rc::Rc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() {
    init_tracing();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        usage();
    }

    let parser = DslParser::new(load_config());

    if args[1] == "--refresh" {
        match args.get(2) {
            Some(path) => trace_refresh(&parser, path),
            None => usage(),
        }
        return;
    }

    trace_expression(&parser, &args[1], args.get(2), args.get(3));
}

fn usage() -> ! {
    eprintln!("Usage: cargo run --bin trace_dsl <expression> [blueprint.yaml [base-entity-id]]");
    eprintln!("       cargo run --bin trace_dsl --refresh <blueprint.yaml>");
    eprintln!();
    eprintln!("Example:");
    eprintln!("  cargo run --bin trace_dsl '$brooklyn:component(\"db\").attributeWhenReady(\"host.address\")' blueprint.yaml web");
    process::exit(1);
}

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("blueprint_dsl=info"));
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn load_config() -> DslConfig {
    let Ok(path) = std::env::var(CONFIG_ENV_VAR) else {
        return DslConfig::default();
    };
    let source = match fs::read_to_string(&path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("❌ Failed to read {} ({}): {}", path, CONFIG_ENV_VAR, e);
            process::exit(1);
        }
    };
    match DslConfig::from_toml_str(&source) {
        Ok(config) => {
            tracing::info!(path = %path, ?config, "Loaded parser config");
            config
        }
        Err(e) => {
            eprintln!("❌ {}: {}", path, e);
            process::exit(1);
        }
    }
}

fn load_blueprint(path: &str) -> Rc<EntityNode> {
    let source = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("❌ Failed to read {}: {}", path, e);
            process::exit(1);
        }
    };
    match EntityNode::from_yaml_str(&source) {
        Ok(root) => root,
        Err(e) => {
            eprintln!("❌ {}: {}", path, e);
            process::exit(1);
        }
    }
}

fn banner(title: &str) {
    println!("╔═══════════════════════════════════════════════════════════════");
    println!("║ {}", title);
    println!("╚═══════════════════════════════════════════════════════════════\n");
}

fn section(title: &str) {
    println!("{}", title);
    println!("─────────────────────────────────────────────────────────────");
}

fn trace_expression(
    parser: &DslParser,
    expression: &str,
    blueprint: Option<&String>,
    base_id: Option<&String>,
) {
    banner("DSL EXPRESSION TRACER");

    println!("📝 INPUT:");
    println!("{}\n", expression);

    let dsl = match parser.parse(expression) {
        Ok(dsl) => dsl,
        Err(e) => {
            eprintln!("❌ PARSE ERROR: {}", e);
            process::exit(1);
        }
    };

    section("🌳 EXPRESSION GRAPH:");
    print_tree(&dsl, 0);
    println!();

    section("🔄 CANONICAL FORM:");
    match dsl.to_expression() {
        Ok(text) => {
            println!("{}", text);
            if text == expression.trim() {
                println!("✅ Round trip is exact");
            } else {
                println!("⚠️  Input was normalised");
            }
        }
        Err(e) => println!("❌ {}", e),
    }
    println!();

    section("🔗 REFERENCES:");
    let references = dsl.references();
    if references.is_empty() {
        println!("(none)");
    }
    for reference in &references {
        match reference {
            Reference::Target(target) => {
                println!("  target  {}", target.to_expression().unwrap_or_default())
            }
            Reference::Entity(entity) => println!("  entity  {}", entity.id()),
        }
    }
    println!();

    let Some(path) = blueprint else {
        return;
    };
    let root = load_blueprint(path);
    let base = match base_id {
        Some(id) => match root.find(id) {
            Some(node) => node,
            None => {
                eprintln!("❌ No entity with id {} in {}", id, path);
                process::exit(1);
            }
        },
        None => root.clone(),
    };
    let lookup = DescendantLookup::new(root.as_entity());
    let relationships = dsl.relationships_for(&base.as_entity(), &lookup);

    section(&format!("🧭 RELATIONSHIPS (from {}):", base_id.map_or("root", |s| s.as_str())));
    if relationships.is_empty() {
        println!("(none)");
    }
    for entity in &relationships {
        println!("  → {}", entity.id());
    }
    println!();

    print_issues(&dsl);
}

fn trace_refresh(parser: &DslParser, path: &str) {
    banner("BLUEPRINT RELATIONSHIP REFRESH");

    let root = load_blueprint(path);
    for entity in refresh_all_relationships(parser, &root) {
        section(&format!("📦 {}", entity.entity_id));
        for config in &entity.config {
            let targets: Vec<&str> = config.relationships.iter().map(|e| e.id()).collect();
            println!(
                "  {} ({} expressions) → [{}]",
                config.key,
                config.expressions.len(),
                targets.join(", ")
            );
            for issue in &config.issues {
                println!("    ⚠️  {}", issue);
            }
        }
        println!();
    }
}

fn print_tree(dsl: &Dsl, mut indent: usize) {
    let mut current = Some(dsl.clone());
    while let Some(node) = current {
        let pad = "  ".repeat(indent);
        println!("{}{} {}", pad, node.kind().description(), node.name());
        for param in node.params() {
            print_tree(&param, indent + 2);
        }
        current = node.next();
        indent += 1;
    }
}

fn print_issues(dsl: &Dsl) {
    section("⚠️  ISSUES:");
    let issues = dsl.all_issues();
    if issues.is_empty() {
        println!("✅ No issues");
    }
    for issue in issues {
        println!("  {}", issue);
    }
}
