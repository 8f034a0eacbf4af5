//! Round-trip tests between KQL, the query tree, and the query DSL

use serde_json::json;

use kuery::{parse_es, parse_kql, render_as_kql};

/// Sources already in canonical form: parse then render reproduces them
/// exactly.
#[test]
fn test_canonical_kql_round_trips() {
    let sources = [
        "*",
        "hello",
        "hello world",
        "\"hello world\"",
        "a: b",
        "a: \"b c\"",
        "a: *",
        "status: 4*",
        "a.b.c: value",
        "datastream.*: logs",
        "a: b and c: d",
        "a: b or c: d",
        "not a: b",
        "a: b and not c: d",
        "a: b or c: d and e: f",
        "(a: b or c: d) and e: f",
        "not (a: b and c: d)",
        "year > 1999",
        "year > 1999 and year <= 2020",
        "user: { name: \"John\" }",
        "user: { names: { first: \"John\" } }",
        "a: b and (c: d or e: f)",
        r"referrer: https\://example.com",
    ];
    for source in sources {
        let query = parse_kql(source).unwrap();
        let rendered = render_as_kql(&query).unwrap();
        assert_eq!(rendered, source, "render drifted for {source:?}");
    }
}

/// Non-canonical sources render to an equivalent canonical spelling.
#[test]
fn test_kql_canonicalization() {
    let pairs = [
        ("a : b", "a: b"),
        ("a:b", "a: b"),
        ("A AND b", "A and b"),
        ("a: (b or c)", "a: b or a: c"),
        ("a: (b and c)", "a: b and a: c"),
        ("status: >= 400", "status >= 400"),
        ("((a: b))", "a: b"),
        ("\"f\": v", "f: v"),
        ("*: *", "*"),
        ("*: hello", "hello"),
    ];
    for (source, canonical) in pairs {
        let query = parse_kql(source).unwrap();
        assert_eq!(
            render_as_kql(&query).unwrap(),
            canonical,
            "unexpected canonical form for {source:?}"
        );
    }
}

/// Rendered KQL parses back to the same tree.
#[test]
fn test_render_parse_fixpoint() {
    let sources = [
        "a: b and c: d or not e: f",
        "user: { a: 1 or b: 2 }",
        "x > 1 and x < 9",
        "a: (b or not c)",
        "f: w1 w2 w3",
        "n: 4* or m: *",
    ];
    for source in sources {
        let once = parse_kql(source).unwrap();
        let rendered = render_as_kql(&once).unwrap();
        let twice = parse_kql(&rendered).unwrap();
        assert_eq!(once, twice, "tree drifted through {source:?} -> {rendered:?}");
    }
}

#[test]
fn test_es_dsl_to_kql() {
    let cases = [
        (json!({"match_all": {}}), "*"),
        (json!({"exists": {"field": "a"}}), "a: *"),
        (json!({"match": {"a": "b"}}), "a: b"),
        (json!({"match_phrase": {"a": "b c"}}), "a: \"b c\""),
        (
            json!({"multi_match": {"query": "hello"}}),
            "hello",
        ),
        (
            json!({"bool": {"must_not": {"match": {"a": "b"}}}}),
            "not a: b",
        ),
        (
            json!({"bool": {
                "should": [{"match": {"a": "b"}}, {"match": {"c": "d"}}],
                "minimum_should_match": 1,
            }}),
            "a: b or c: d",
        ),
        (
            json!({"bool": {
                "should": [{"match": {"a": "b"}}, {"match": {"c": "d"}}],
                "minimum_should_match": 2,
            }}),
            "a: b and c: d",
        ),
        (
            json!({"nested": {
                "path": "user",
                "query": {"match_phrase": {"user.name": "John"}},
                "score_mode": "none",
            }}),
            "user: { name: \"John\" }",
        ),
        (
            json!({"range": {"year": {"gt": 1999, "lte": 2020}}}),
            "year > 1999 and year <= 2020",
        ),
        (
            json!({"wildcard": {"status": {"value": "4*"}}}),
            "status: 4*",
        ),
    ];
    for (dsl, expected) in cases {
        let query = parse_es(&dsl).unwrap();
        assert_eq!(render_as_kql(&query).unwrap(), expected, "for {dsl}");
    }
}

#[test]
fn test_es_dsl_not_representable_in_kql() {
    let cases = [
        json!({"match_none": {}}),
        json!({"term": {"a": {"value": "b"}}}),
        json!({"fuzzy": {"a": {"value": "b", "fuzziness": 2}}}),
        json!({"regexp": {"a": {"value": "b.*"}}}),
        json!({"prefix": {"a": {"value": "b"}}}),
        json!({"match_phrase_prefix": {"a": "b"}}),
        json!({"multi_match": {"query": "x", "fields": ["a", "b"]}}),
        json!({"nested": {"path": "u", "query": {"match": {"u.a": "b"}}, "score_mode": "avg"}}),
        json!({"bool": {
            "should": [{"match": {"a": "1"}}, {"match": {"b": "2"}}, {"match": {"c": "3"}}],
            "minimum_should_match": 2,
        }}),
    ];
    for dsl in cases {
        let query = parse_es(&dsl).unwrap();
        let err = render_as_kql(&query).unwrap_err();
        assert!(
            err.message.contains("not representable in KQL"),
            "unexpected message for {dsl}: {}",
            err.message
        );
    }
}

/// KQL -> tree -> DSL -> tree -> KQL, crossing every layer of the crate.
#[test]
fn test_full_cycle_through_the_dsl() {
    let sources = [
        "a: b and not c: d",
        "year > 1999 and year <= 2020",
        "user: { name: \"John\" }",
        "a: b or c: d",
    ];
    for source in sources {
        let query = parse_kql(source).unwrap();
        let reloaded = parse_es(&query.render()).unwrap();
        assert_eq!(query, reloaded, "DSL decode drifted for {source:?}");
        assert_eq!(render_as_kql(&reloaded).unwrap(), source);
    }
}
