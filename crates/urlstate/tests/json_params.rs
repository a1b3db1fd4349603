use std::rc::Rc;

use pretty_assertions::assert_eq;
use serde::{Deserialize, Serialize};
use urlstate::serializer::Json;
use urlstate::{Host, MemoryHost, SearchParamOptions, UrlContext};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct Filter {
    field: String,
    op: String,
    value: i64,
}

fn client(href: &str) -> (Rc<MemoryHost>, UrlContext) {
    let host = Rc::new(MemoryHost::new(href));
    let ctx = UrlContext::new(host.clone());
    (host, ctx)
}

#[test]
fn json_object_is_percent_encoded_by_the_url_layer() {
    let (host, ctx) = client("https://app.test/p");
    let filter = ctx.search_param(
        "filter",
        SearchParamOptions::new().with_serializer(Json::<Filter>::new()),
    );
    assert_eq!(filter.get(), None);

    let value = Filter {
        field: "age & size".into(),
        op: ">=".into(),
        value: 18,
    };
    filter.set(Some(value.clone()));
    host.flush();

    assert_eq!(
        host.href(),
        "https://app.test/p?filter=%7B%22field%22%3A%22age+%26+size%22%2C%22op%22%3A%22%3E%3D%22%2C%22value%22%3A18%7D"
    );
    assert_eq!(
        ctx.params().get("filter"),
        Some(r#"{"field":"age & size","op":">=","value":18}"#)
    );
    assert_eq!(filter.get(), Some(value));
}

#[test]
fn json_reads_from_initial_url() {
    let (_host, ctx) = client("https://app.test/p?cfg=%7B%22a%22%3A%5B1%2C2%5D%7D");
    let cfg = ctx.search_param(
        "cfg",
        SearchParamOptions::new().with_serializer(Json::<serde_json::Value>::new()),
    );
    assert_eq!(cfg.get(), Some(serde_json::json!({ "a": [1, 2] })));
}

#[test]
fn malformed_json_reads_as_absent() {
    let (_host, ctx) = client("https://app.test/p?cfg=%7Bnot-json");
    let cfg = ctx.search_param(
        "cfg",
        SearchParamOptions::new().with_serializer(Json::<serde_json::Value>::new()),
    );
    assert_eq!(cfg.get(), None);
    assert_eq!(cfg.raw().as_deref(), Some("{not-json"));
}

#[test]
fn json_array_elements() {
    let (host, ctx) = client("https://app.test/p");
    let points = ctx.search_param_array(
        "pt",
        SearchParamOptions::new().with_serializer(Json::<(i32, i32)>::new()),
    );
    points.set(vec![(1, 2), (3, 4)]);
    host.flush();
    assert_eq!(host.href(), "https://app.test/p?pt=%5B1%2C2%5D&pt=%5B3%2C4%5D");
    assert_eq!(points.get(), vec![(1, 2), (3, 4)]);
}

#[test]
fn navigation_config_deserializes() {
    let config: urlstate::NavigationConfig =
        serde_json::from_str(r#"{ "mode": "push", "target": "fragment" }"#).unwrap();
    assert_eq!(config.mode, urlstate::HistoryMode::Push);
    assert_eq!(config.target, urlstate::UrlTarget::Fragment);

    let partial: urlstate::NavigationConfig =
        serde_json::from_str(r#"{ "mode": "push" }"#).unwrap();
    assert_eq!(partial.target, urlstate::UrlTarget::Query);
}
