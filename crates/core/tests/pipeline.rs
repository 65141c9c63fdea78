//! End-to-end properties of the compiler: round-trip through the text
//! renderer, idempotence, per-scope error reporting, grouping, forecast
//! spans, table soundness and range defaults.

use pixql_core::grammar::{builder, definition, Grammar, GrammarLoadError, SYNTAX_DEFINITION};
use pixql_core::semantic::{Bound, Filter, FilterValue};
use pixql_core::translator::ForecastContext;
use pixql_core::{
    Compiler, CompilerOptions, Diagnose, MetaKind, MetadataSnapshot, OptionsPatch, QueryPlan,
    RangeBounds, TextRange,
};
use serde_json::json;

fn snapshot() -> MetadataSnapshot {
    MetadataSnapshot::from_json(
        r#"{
            "tags": [
                { "id": 1, "name": "animal" },
                { "id": 2, "name": "cat", "other_names": ["neko"], "parent": 1 },
                { "id": 3, "name": "dog", "parent": 1 },
                { "id": 4, "name": "sky" }
            ],
            "topics": [
                { "id": 30, "name": "fox" },
                { "id": 31, "name": "food" },
                { "id": 32, "name": "Touhou Project" }
            ],
            "authors": [
                { "id": 10, "name": "mori" }
            ],
            "source_tags": [
                { "id": 20, "site": "pixiv", "name": "landscape" }
            ]
        }"#,
    )
    .unwrap()
}

fn compiler() -> Compiler {
    Compiler::load(CompilerOptions::default()).unwrap()
}

fn plan(text: &str) -> QueryPlan {
    let r = compiler().compile(text, &snapshot());
    assert!(r.errors.is_empty(), "{text}: {:?}", r.errors);
    r.result.unwrap()
}

// ──────────────────────────────────────────────
// Round-trip and idempotence
// ──────────────────────────────────────────────

#[test]
fn rendered_plans_compile_back_to_themselves() {
    let queries = [
        "$cat|dog -@mori #`Touhou Project`",
        "^pixiv.landscape 'open sky' -\"exact words\"",
        "order:-score,^id,ct score>3 size:[10,2000) -favorite",
        "ext:{jpg, png}|description~*sun* tagme:{tag, author}",
        "pt:2024.01.02 ^site:pixiv ct<=2024-12-31",
    ];
    for query in queries {
        let first = plan(query);
        let text = pixql_core::to_query_text(&first);
        let second = plan(&text);
        assert_eq!(first, second, "{query} -> {text}");
    }
}

/// Two tags named `cat` under different parents.
fn twins() -> MetadataSnapshot {
    MetadataSnapshot::from_json(
        r#"{
            "tags": [
                { "id": 1, "name": "animal" },
                { "id": 2, "name": "cat", "parent": 1 },
                { "id": 5, "name": "plant" },
                { "id": 6, "name": "cat", "parent": 5 },
                { "id": 7, "name": "fox", "parent": 1 },
                { "id": 8, "name": "foxtail", "parent": 5 }
            ]
        }"#,
    )
    .unwrap()
}

#[test]
fn same_named_tags_round_trip_through_their_address() {
    let c = compiler();
    let lookup = twins();
    for query in ["$plant.cat", "$cat", "-animal.cat|fox"] {
        let first = c.compile(query, &lookup).result.unwrap();
        let text = pixql_core::to_query_text(&first);
        let second = c.compile(&text, &lookup).result.unwrap();
        assert_eq!(first, second, "{query} -> {text}");
    }
    let p = c.compile("$plant.cat", &lookup).result.unwrap();
    assert_eq!(pixql_core::to_query_text(&p), "$plant.cat");
    let p = c.compile("$cat", &lookup).result.unwrap();
    assert_eq!(pixql_core::to_query_text(&p), "$animal.cat|plant.cat");
}

#[test]
fn compiling_twice_is_stable() {
    let c = compiler();
    let lookup = snapshot();
    let query = "cat -dog food score:1..5";
    assert_eq!(c.compile(query, &lookup), c.compile(query, &lookup));
    assert_eq!(c.forecast("#fo", 3, &lookup), c.forecast("#fo", 3, &lookup));
}

// ──────────────────────────────────────────────
// Error multiplicity
// ──────────────────────────────────────────────

#[test]
fn each_failing_scope_reports_once() {
    let r = compiler().compile("topic:missing1 author:missing2", &snapshot());
    assert!(r.result.is_none());
    let codes: Vec<u16> = r.errors.iter().map(|e| e.code()).collect();
    assert_eq!(codes, vec![3026, 3026]);
}

#[test]
fn errors_carry_ranges() {
    let r = compiler().compile("cat topic:missing", &snapshot());
    let range = r.errors[0].range().unwrap();
    assert_eq!(range, TextRange::new(10, 17));
}

// ──────────────────────────────────────────────
// Grouping
// ──────────────────────────────────────────────

#[test]
fn juxtaposed_names_intersect_in_one_group() {
    let p = plan("cat dog");
    assert_eq!(p.elements.len(), 1);
    assert_eq!(p.elements[0].items.len(), 2);
    let p = plan("cat -dog");
    assert!(!p.elements[0].items[0].exclude);
    assert!(p.elements[0].items[1].exclude);
}

#[test]
fn nesting_is_group_then_item_then_union() {
    let p = plan("$cat|neko|dog -#fox & $sky");
    let value = serde_json::to_value(&p).unwrap();
    let ids = |group: usize, item: usize| -> Vec<u64> {
        value["elements"][group]["items"][item]["union"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["id"].as_u64().unwrap())
            .collect()
    };
    assert_eq!(value["elements"][0]["kind"], json!("tag"));
    assert_eq!(value["elements"][1]["kind"], json!("topic"));
    assert_eq!(ids(0, 0), vec![2, 3]);
    assert_eq!(ids(0, 1), vec![4]);
    assert_eq!(ids(1, 0), vec![30]);
    assert_eq!(value["elements"][0]["items"][1]["exclude"], json!(false));
    assert_eq!(value["elements"][1]["items"][0]["exclude"], json!(true));
}

// ──────────────────────────────────────────────
// Forecast
// ──────────────────────────────────────────────

#[test]
fn forecast_replaces_the_word_under_the_cursor() {
    let f = compiler().forecast("topic:fo", 8, &snapshot()).unwrap();
    assert_eq!(f.span, TextRange::new(6, 8));
    assert_eq!(
        f.context,
        ForecastContext::Meta {
            kind: MetaKind::Topic
        }
    );
    let names: Vec<&str> = f.suggestions.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["food", "fox"]);
}

#[test]
fn forecast_follows_the_typed_address() {
    let c = compiler();
    let lookup = twins();
    let ids = |text: &str| -> Vec<u64> {
        let f = c.forecast(text, text.chars().count(), &lookup).unwrap();
        f.suggestions.iter().filter_map(|s| s.id).collect()
    };
    assert_eq!(ids("$plant.fo"), vec![8]);
    assert_eq!(ids("$animal.fo"), vec![7]);
    assert_eq!(ids("$fo"), vec![7, 8]);
}

#[test]
fn no_forecast_away_from_words() {
    assert_eq!(compiler().forecast("cat ", 4, &snapshot()), None);
    assert_eq!(compiler().forecast("'fo'", 2, &snapshot()), None);
}

// ──────────────────────────────────────────────
// Table soundness
// ──────────────────────────────────────────────

#[test]
fn ambiguous_grammar_fails_to_build() {
    let expressions = definition::parse_definition("E -> E + E\nE -> id").unwrap();
    let Err(builder::BuildError::Conflicts(conflicts)) = builder::build(&expressions) else {
        panic!("expected a conflict");
    };
    assert!(conflicts.iter().any(|c| c.is_shift_reduce() && c.lookahead == "+"));
    assert!(matches!(
        Grammar::from_definition("E -> E + E\nE -> id"),
        Err(GrammarLoadError::Build(_))
    ));
}

#[test]
fn query_grammar_is_conflict_free() {
    let expressions = definition::parse_definition(SYNTAX_DEFINITION).unwrap();
    let table = builder::build(&expressions).unwrap();
    assert_eq!(&table, Grammar::load().unwrap().table());
}

// ──────────────────────────────────────────────
// Ranges
// ──────────────────────────────────────────────

fn size_range(c: &Compiler) -> (bool, bool) {
    let r = c.compile("size:10..20", &snapshot());
    let p = r.result.unwrap();
    let Filter::Range {
        begin: Some(Bound {
            value: begin,
            inclusive: include_begin,
        }),
        end: Some(Bound {
            value: end,
            inclusive: include_end,
        }),
        ..
    } = &p.filters[0].union[0]
    else {
        panic!("expected a closed range");
    };
    assert_eq!(begin, &FilterValue::Size(10));
    assert_eq!(end, &FilterValue::Size(20));
    (*include_begin, *include_end)
}

#[test]
fn dotted_ranges_default_to_inclusive() {
    assert_eq!(size_range(&compiler()), (true, true));
}

#[test]
fn dotted_range_bounds_are_configurable() {
    let mut options = CompilerOptions::default();
    let patch: OptionsPatch = serde_json::from_value(json!({
        "range_bounds": { "include_begin": true, "include_end": false }
    }))
    .unwrap();
    options.apply(patch);
    assert_eq!(
        options.range_bounds,
        RangeBounds {
            include_begin: true,
            include_end: false
        }
    );
    assert_eq!(size_range(&Compiler::load(options).unwrap()), (true, false));
}
