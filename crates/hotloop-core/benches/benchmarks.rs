use std::hint::black_box;
use std::time::Instant;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use hotloop_core::Analyzer;
use hotloop_core::directives::DirectiveIndex;
use hotloop_core::exclude::PathFilter;
use hotloop_core::parser::SourceFile;
use hotloop_core::reach::InvocationGraph;
use hotloop_core::rules::RuleCtx;
use hotloop_core::sem::{DeclRef, MemberTarget};
use hotloop_core::syntax::{NodeId, NodeKind, Span};
use hotloop_core::workspace::Workspace;

const FIXTURES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../tests/fixtures");

fn generate_behaviour_script() -> String {
    let mut code = String::with_capacity(20_000);
    code.push_str("using Arc;\n\n");

    for i in 0..25 {
        code.push_str(&format!(
            r#"class Actor{i} : Behaviour {{
  Transform target;
  float speed{i} = 1.5;

  void Start() {{
    target = transform;
  }}

  void Update() {{
    var pos = target.position;
    Advance{i}(pos);
  }}

  void Advance{i}(float pos) {{
    if (Input.pressed()) {{
      Debug.Log(pos);
    }}
  }}
}}

"#
        ));
    }

    code
}

fn generate_project_files(count: usize) -> Vec<(String, String)> {
    (0..count)
        .map(|i| {
            let filename = format!("actor_{i}.arc");
            let content = format!(
                r#"using Arc;

class Actor{i} : Behaviour {{
  Camera cam;

  void Start() {{
    cam = Camera.main;
  }}

  void Update() {{
    Step{i}();
  }}

  void Step{i}() {{
    Debug.Log(cam.transform);
  }}
}}
"#
            );
            (filename, content)
        })
        .collect()
}

fn chain_source(depth: usize) -> String {
    let mut code = String::from("class Chain : Behaviour {\n  void Update() {\n    M0();\n  }\n");
    for i in 0..depth {
        code.push_str(&format!("  void M{i}() {{\n    M{}();\n  }}\n", i + 1));
    }
    code.push_str(&format!(
        "  void M{depth}() {{\n    var cam = Camera.main;\n  }}\n}}\n"
    ));
    code
}

fn guarded_source(regions: usize) -> String {
    let mut code = String::from("class Overlay : Behaviour {\n");
    for i in 0..regions {
        code.push_str(&format!(
            "#if ARC_EDITOR\n  string label{i};\n#endif\n  int frame{i};\n"
        ));
    }
    code.push_str("  void Update() {\n    Debug.Log(1);\n  }\n}\n");
    code
}

fn read_fixture(path: &str) -> String {
    std::fs::read_to_string(format!("{}/{}", FIXTURES_DIR, path))
        .unwrap_or_else(|_| panic!("Failed to read fixture: {}", path))
}

fn finds_camera_main(ctx: &RuleCtx<'_>, decl: DeclRef) -> Option<NodeId> {
    let tree = ctx.file(decl.file).tree();
    let body = tree.method(decl.decl).body;
    tree.descendants(body)
        .filter(|node| matches!(node.kind, NodeKind::Member { .. }))
        .find(|node| {
            matches!(
                ctx.model().resolve_member_access(decl, node.id),
                Some(MemberTarget::Builtin(member)) if member.qualified_name() == "Arc.Camera.main"
            )
        })
        .map(|node| node.id)
}

fn decl_of(ws: &Workspace, class: &str, method: &str) -> DeclRef {
    let index = ws.index();
    let sym = index
        .method_by_key(&format!("{class}.{method}/0"))
        .unwrap_or_else(|| panic!("no method {class}.{method}"));
    index.method(sym).primary_decl()
}

fn bench_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("parsing");

    let script = generate_behaviour_script();
    let script_lines = script.lines().count();

    group.throughput(Throughput::Elements(script_lines as u64));
    group.bench_function("parse_500_loc", |b| {
        b.iter(|| SourceFile::parse(black_box("actors.arc"), black_box(&script)))
    });

    let hazards = read_fixture("perf/frame_hazards.arc");
    let hazard_lines = hazards.lines().count();

    group.throughput(Throughput::Elements(hazard_lines as u64));
    group.bench_function("parse_hazards_fixture", |b| {
        b.iter(|| SourceFile::parse(black_box("hazards.arc"), black_box(&hazards)))
    });

    let overlay = read_fixture("editor/editor_overlay.arc");
    let overlay_lines = overlay.lines().count();

    group.throughput(Throughput::Elements(overlay_lines as u64));
    group.bench_function("parse_editor_fixture", |b| {
        b.iter(|| SourceFile::parse(black_box("overlay.arc"), black_box(&overlay)))
    });

    group.finish();
}

fn bench_reachability(c: &mut Criterion) {
    let mut group = c.benchmark_group("reachability");

    let source = chain_source(10);
    let mut ws = Workspace::new();
    ws.upsert_file("chain.arc", &source);
    let directives = DirectiveIndex::new();
    let filter = PathFilter::empty();

    {
        let ctx = RuleCtx::new(&ws, &directives, &filter);
        let decl = decl_of(&ws, "Chain", "Update");

        group.bench_function("cold_search_depth_10", |b| {
            b.iter(|| {
                let mut graph = InvocationGraph::new("B001", finds_camera_main);
                black_box(graph.search(&ctx, decl))
            })
        });

        let mut graph = InvocationGraph::new("B001", finds_camera_main);
        graph.search(&ctx, decl);

        group.bench_function("cached_replay_depth_10", |b| {
            b.iter(|| black_box(graph.search(&ctx, decl)))
        });
    }

    let mut graph = InvocationGraph::new("B001", finds_camera_main);
    {
        let ctx = RuleCtx::new(&ws, &directives, &filter);
        graph.search(&ctx, decl_of(&ws, "Chain", "Update"));
    }

    group.bench_function("invalidate_and_requery_depth_10", |b| {
        b.iter(|| {
            ws.upsert_file("chain.arc", &source);
            let ctx = RuleCtx::new(&ws, &directives, &filter);
            let class = ws.index().class_named("Chain").unwrap();
            graph.mark_class_dirty(&ctx, class);
            black_box(graph.search(&ctx, decl_of(&ws, "Chain", "Update")))
        })
    });

    group.finish();
}

fn bench_directives(c: &mut Criterion) {
    let mut group = c.benchmark_group("directives");

    let source = guarded_source(50);
    let mut ws = Workspace::new();
    let file_id = ws.upsert_file("overlay.arc", &source);
    let file = ws.file(file_id);
    let class = file.tree().classes().next().unwrap();
    let spans: Vec<Span> = class
        .fields
        .iter()
        .map(|&f| file.tree().field(f).span)
        .collect();

    group.throughput(Throughput::Elements(spans.len() as u64));
    group.bench_function("scope_queries_cached", |b| {
        let directives = DirectiveIndex::new();
        directives.is_within_scope(file_id, file, spans[0], "ARC_EDITOR");
        b.iter(|| {
            let mut hits = 0;
            for &span in &spans {
                if directives.is_within_scope(file_id, file, span, "ARC_EDITOR") {
                    hits += 1;
                }
            }
            black_box(hits)
        })
    });

    group.throughput(Throughput::Elements(spans.len() as u64));
    group.bench_function("scope_queries_cold", |b| {
        b.iter(|| {
            let directives = DirectiveIndex::new();
            let mut hits = 0;
            for &span in &spans {
                if directives.is_within_scope(file_id, file, span, "ARC_EDITOR") {
                    hits += 1;
                }
            }
            black_box(hits)
        })
    });

    group.finish();
}

fn bench_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("analysis");

    let script = generate_behaviour_script();
    let mut analyzer = Analyzer::new();
    let file = analyzer.upsert_file("actors.arc", &script);
    analyzer.analyze_file(file);

    group.bench_function("analyze_500_loc_cached", |b| {
        b.iter(|| black_box(analyzer.analyze_file(file)))
    });

    group.bench_function("edit_and_reanalyze_500_loc", |b| {
        b.iter(|| {
            let file = analyzer.upsert_file("actors.arc", &script);
            black_box(analyzer.analyze_file(file))
        })
    });

    let hazards = read_fixture("perf/frame_hazards.arc");
    let mut hazard_analyzer = Analyzer::new();
    let hazard_file = hazard_analyzer.upsert_file("hazards.arc", &hazards);
    hazard_analyzer.analyze_file(hazard_file);

    group.bench_function("analyze_hazards_fixture", |b| {
        b.iter(|| black_box(hazard_analyzer.analyze_file(hazard_file)))
    });

    for size in [10, 25, 50, 100] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("project_size", size), &size, |b, &size| {
            let mut analyzer = Analyzer::new();
            for (name, content) in generate_project_files(size) {
                analyzer.upsert_file(&name, &content);
            }
            analyzer.analyze_all();
            b.iter(|| black_box(analyzer.analyze_all()))
        });
    }

    group.finish();
}

fn bench_latency_percentiles(c: &mut Criterion) {
    let mut group = c.benchmark_group("latency");

    let script = generate_behaviour_script();

    group.bench_function("p95_edit_reanalyze_500_loc", |b| {
        let mut analyzer = Analyzer::new();
        let file = analyzer.upsert_file("actors.arc", &script);
        analyzer.analyze_file(file);
        b.iter_custom(|iters| {
            let mut durations: Vec<_> = (0..iters)
                .map(|_| {
                    let start = Instant::now();
                    let file = analyzer.upsert_file(black_box("actors.arc"), black_box(&script));
                    let _ = analyzer.analyze_file(file);
                    start.elapsed()
                })
                .collect();
            durations.sort();
            let p95_idx = ((iters as f64) * 0.95) as usize;
            let p95_idx = p95_idx.min(durations.len().saturating_sub(1));
            durations[p95_idx]
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_parsing,
    bench_reachability,
    bench_directives,
    bench_analysis,
    bench_latency_percentiles
);
criterion_main!(benches);
