#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Declaration rules and reference document generation.

use std::sync::Arc;

use apiref::{
    ApiBuilder, EntryOptions, Error, Output, ParamValidator, RouteError, SchemaPathError,
    ScopeExpression, ScopeExpressionValidator, ServiceDescriptor, Stability,
};
use serde_json::json;

fn descriptor() -> ServiceDescriptor {
    ServiceDescriptor::builder()
        .title("Queue API")
        .description("The queue service")
        .service_name("queue")
        .api_version("v1")
        .build()
        .unwrap()
}

fn api() -> ApiBuilder {
    ApiBuilder::new(descriptor())
}

/// A complete GET declaration; tests change the field under test.
fn entry(name: &str, route: &str) -> EntryOptions {
    EntryOptions::get(route)
        .name(name)
        .title("Title")
        .description("Description")
        .category("Tasks")
        .no_scopes()
}

#[test]
fn fresh_registry_publishes_only_builtins() {
    let doc = api().reference();
    let names: Vec<_> = doc.entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["ping", "lbheartbeat", "version"]);
    for e in &doc.entries {
        assert_eq!(e.category, "Monitoring");
        assert_eq!(e.stability, Stability::Stable);
        assert!(e.scopes.is_none());
    }
}

#[test]
fn reference_preserves_declaration_order_and_skips_unpublished() {
    let mut api = api();
    api.declare(entry("zeta", "/zeta")).unwrap();
    api.declare(entry("hidden", "/hidden").no_publish()).unwrap();
    api.declare(entry("alpha", "/alpha")).unwrap();

    let doc = api.reference();
    let names: Vec<_> = doc.entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["ping", "lbheartbeat", "version", "zeta", "alpha"]
    );
    // unpublished entries are still registered
    assert!(api.entry("hidden").is_some());
    assert_eq!(api.entries().len(), 6);
}

#[test]
fn same_route_and_method_is_duplicate_route() {
    let mut api = api();
    api.declare(entry("a", "/task/:taskId")).unwrap();
    let err = api.declare(entry("b", "/task/:taskId")).unwrap_err();
    assert!(matches!(err, Error::DuplicateRoute { ref entry, .. } if entry == "b"));

    // same route, different method is fine
    api.declare(
        EntryOptions::post("/task/:taskId")
            .name("c")
            .title("t")
            .description("d")
            .category("c")
            .no_scopes(),
    )
    .unwrap();
}

#[test]
fn builtin_route_cannot_be_redeclared() {
    let err = api().declare(entry("myPing", "/ping")).unwrap_err();
    assert!(matches!(err, Error::DuplicateRoute { .. }));
}

#[test]
fn routes_cleaning_to_the_same_path_are_duplicates() {
    let mut api = api();
    api.declare(entry("a", "/task/:taskId")).unwrap();
    let err = api.declare(entry("b", "/task/:taskId([a-z]+)")).unwrap_err();
    assert!(matches!(err, Error::DuplicateRoute { .. }));
}

#[test]
fn same_shape_with_different_param_names_conflicts() {
    let mut api = api();
    api.declare(entry("a", "/task/:taskId")).unwrap();
    let err = api.declare(entry("b", "/task/:id")).unwrap_err();
    match err {
        Error::ConflictingRoute {
            entry,
            route,
            existing,
        } => {
            assert_eq!(entry, "b");
            assert_eq!(route, "/task/<id>");
            assert_eq!(existing, "/task/<taskId>");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn same_name_is_duplicate_name() {
    let mut api = api();
    api.declare(entry("task", "/task/a")).unwrap();
    let err = api.declare(entry("task", "/task/b")).unwrap_err();
    assert!(matches!(err, Error::DuplicateName { ref entry } if entry == "task"));

    let err = api.declare(entry("ping", "/other-ping")).unwrap_err();
    assert!(matches!(err, Error::DuplicateName { .. }));
}

#[test]
fn failed_declaration_leaves_registry_unchanged() {
    let mut api = api();
    api.declare(entry("a", "/a")).unwrap();
    let before = api.reference();
    assert!(api.declare(entry("a", "/b")).is_err());
    assert_eq!(api.reference(), before);
    // the rejected route is still free
    api.declare(entry("b", "/b")).unwrap();
}

#[test]
fn required_options() {
    let cases = [
        (EntryOptions::get("/x").title("t").description("d").category("c").no_scopes(), "name"),
        (EntryOptions::get("").name("x").title("t").description("d").category("c").no_scopes(), "route"),
        (EntryOptions::get("/x").name("x").description("d").category("c").no_scopes(), "title"),
        (EntryOptions::get("/x").name("x").title("t").category("c").no_scopes(), "description"),
        (EntryOptions::get("/x").name("x").title("t").description("d").no_scopes(), "category"),
        (EntryOptions::get("/x").name("x").title("t").description("d").category("c"), "scopes"),
    ];
    for (options, missing) in cases {
        let err = api().declare(options).unwrap_err();
        assert!(
            matches!(err, Error::MissingOption { option, .. } if option == missing),
            "expected missing {missing}, got {err}"
        );
    }
}

#[test]
fn empty_strings_count_as_missing() {
    let err = api().declare(entry("x", "/x").title("")).unwrap_err();
    assert!(matches!(err, Error::MissingOption { option: "title", .. }));
}

#[test]
fn null_scopes_accepted_and_omitted() {
    let mut api = api();
    api.declare(entry("open", "/open")).unwrap();
    let value = api.reference().to_value().unwrap();
    assert!(value["entries"][3].get("scopes").is_none());
}

#[test]
fn scopes_published_verbatim() {
    let mut api = api();
    let scopes = ScopeExpression::all_of([
        ScopeExpression::scope("queue:create-task:<taskId>"),
        ScopeExpression::scope("queue:scheduler-id:<schedulerId>"),
    ]);
    api.declare(
        EntryOptions::put("/task/:taskId")
            .name("createTask")
            .title("Create Task")
            .description("Create a new task")
            .category("Tasks")
            .scopes(scopes),
    )
    .unwrap();
    let value = api.reference().to_value().unwrap();
    assert_eq!(
        value["entries"][3]["scopes"],
        json!({"AllOf": ["queue:create-task:<taskId>", "queue:scheduler-id:<schedulerId>"]})
    );
}

#[test]
fn malformed_scope_template_rejected() {
    let err = api()
        .declare(entry("x", "/x").scopes(ScopeExpression::from_value(json!({"AllOf": "nope"}))))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidScopeExpression { .. }));
}

struct RejectAll;

impl ScopeExpressionValidator for RejectAll {
    fn validate(&self, _expression: &ScopeExpression) -> bool {
        false
    }
}

#[test]
fn injected_scope_validator_is_consulted_for_non_null_scopes() {
    let mut api = ApiBuilder::with_scope_validator(descriptor(), Arc::new(RejectAll));
    let err = api.declare(entry("a", "/a").scopes("queue:a")).unwrap_err();
    assert!(matches!(err, Error::InvalidScopeExpression { .. }));
    // null scopes never reach the validator
    api.declare(entry("b", "/b")).unwrap();
}

#[test]
fn stability_defaults_and_validation() {
    let mut api = api();
    api.declare(entry("a", "/a")).unwrap();
    assert_eq!(api.entry("a").unwrap().stability(), Stability::Experimental);

    api.declare(entry("b", "/b").stability(Stability::Deprecated))
        .unwrap();
    assert_eq!(api.reference().entry("b").unwrap().stability, Stability::Deprecated);

    let err = api
        .declare(entry("c", "/c").stability_named("beta"))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidStability { ref value, .. } if value == "beta"));
}

#[test]
fn get_with_input_is_method_schema_conflict() {
    let err = api()
        .declare(entry("x", "/x").input("foo.yaml"))
        .unwrap_err();
    assert!(matches!(err, Error::MethodSchemaConflict { .. }));
}

#[test]
fn schema_paths_normalized_and_flag_set() {
    let mut api = api();
    assert!(!api.requires_schemas());
    api.declare(
        EntryOptions::post("/x")
            .name("x")
            .title("t")
            .description("d")
            .category("c")
            .no_scopes()
            .input("foo.yaml")
            .output("bar.yml"),
    )
    .unwrap();
    let e = api.entry("x").unwrap();
    assert_eq!(e.input(), Some("v1/foo.json#"));
    assert_eq!(e.output(), Some(&Output::Schema("v1/bar.json#".to_owned())));
    assert!(api.requires_schemas());
}

#[test]
fn blob_output_does_not_require_schemas() {
    let mut api = api();
    api.declare(entry("artifact", "/artifact").blob_output())
        .unwrap();
    assert_eq!(api.entry("artifact").unwrap().output(), Some(&Output::Blob));
    assert!(!api.requires_schemas());
    assert_eq!(
        api.reference().entry("artifact").unwrap().output.as_deref(),
        Some("blob")
    );
}

#[test]
fn absolute_schema_url_rejected() {
    let err = api()
        .declare(entry("x", "/x").output("https://example.com/schemas/x.json"))
        .unwrap_err();
    match err {
        Error::InvalidSchemaPath { field, source, .. } => {
            assert_eq!(field, "output");
            assert!(matches!(source, SchemaPathError::AbsoluteUrl(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn route_params_extracted_in_order() {
    let mut api = api();
    api.declare(entry("act", "/object/:id/action/:param"))
        .unwrap();
    let e = api.entry("act").unwrap();
    assert_eq!(e.route_params(), ["id", "param"]);
    let r = api.reference();
    let published = r.entry("act").unwrap();
    assert_eq!(published.route, "/object/<id>/action/<param>");
    assert_eq!(published.args, vec!["id", "param"]);
}

#[test]
fn duplicate_route_param_rejected() {
    let err = api().declare(entry("x", "/a/:id/b/:id")).unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidRoute {
            source: RouteError::DuplicateParameter { .. },
            ..
        }
    ));
}

#[test]
fn entry_params_override_service_defaults() {
    let d = ServiceDescriptor::builder()
        .title("t")
        .description("d")
        .service_name("svc")
        .api_version("v1")
        .param_pattern("taskId", "^[a-z]+$")
        .param_pattern("runId", "^[0-9]+$")
        .build()
        .unwrap();
    let mut api = ApiBuilder::new(d);
    api.declare(
        entry("x", "/task/:taskId/runs/:runId")
            .param("taskId", ParamValidator::predicate(|v| {
                (v.len() != 22).then(|| "taskId must be 22 characters".to_owned())
            })),
    )
    .unwrap();

    let params = api.entry("x").unwrap().params();
    assert!(params["taskId"].validate("abc").is_err());
    assert!(params["taskId"].validate("fN1SbArXTPSVFNUvaOlinQ").is_ok());
    assert!(params["runId"].validate("0").is_ok());
    assert!(params["runId"].validate("x").is_err());
}

#[test]
fn bad_validator_patterns_rejected() {
    let err = api()
        .declare(entry("x", "/x").query_pattern("limit", "[0-9"))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidQueryValidator { ref key, .. } if key == "limit"));

    let err = api()
        .declare(entry("x", "/x/:id").param_pattern("id", "(unclosed"))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidParamValidator { .. }));
}

#[test]
fn query_names_published_in_insertion_order() {
    let mut api = api();
    api.declare(
        entry("list", "/list")
            .query_pattern("continuationToken", "^.+$")
            .query_pattern("limit", "^[0-9]+$"),
    )
    .unwrap();
    assert_eq!(
        api.reference().entry("list").unwrap().query,
        vec!["continuationToken", "limit"]
    );
}

#[test]
#[allow(deprecated)]
fn defer_auth_rejected() {
    let err = api().declare(entry("x", "/x").defer_auth()).unwrap_err();
    assert!(matches!(
        err,
        Error::DeprecatedOptionUsed {
            option: "deferAuth",
            ..
        }
    ));
}

#[test]
fn unroutable_method_rejected() {
    let err = api()
        .declare(
            EntryOptions::new(http::Method::from_bytes(b"PURGE").unwrap(), "/x")
                .name("x")
                .title("t")
                .description("d")
                .category("c")
                .no_scopes(),
        )
        .unwrap_err();
    assert!(matches!(err, Error::InvalidMethod { ref method, .. } if method == "PURGE"));
    assert_eq!(err.entry(), Some("x"));
}

#[test]
fn unroutable_segments_rejected_at_declaration() {
    async fn noop() {}

    let mut api = api();
    for (name, route, segment) in [("files", "/files/*path", "*path"), ("dash", "/x/:-y", ":-y")] {
        let err = api
            .declare(entry(name, route).handler(noop))
            .unwrap_err();
        assert!(
            matches!(
                err,
                Error::InvalidRoute {
                    source: RouteError::UnroutableSegment { segment: ref s, .. },
                    ..
                } if s == segment
            ),
            "{route}: {err}"
        );
        assert_eq!(err.entry(), Some(name));
    }
    assert!(api.entry("files").is_none());
    assert!(api.reference().entry("dash").is_none());
}

#[test]
fn declare_all_reports_every_failure() {
    let mut api = api();
    let errs = api
        .declare_all([
            entry("a", "/a"),
            entry("a", "/a2"),
            entry("b", "/b").input("b.yml"),
            entry("c", "/c"),
        ])
        .unwrap_err();
    assert_eq!(errs.errors().len(), 2);
    assert!(matches!(errs.errors()[0], Error::DuplicateName { .. }));
    assert!(matches!(errs.errors()[1], Error::MethodSchemaConflict { .. }));
    assert!(api.entry("a").is_some());
    assert!(api.entry("c").is_some());
}

#[test]
fn reference_document_shape() {
    let mut api = api();
    api.declare(
        EntryOptions::get("/task/:taskId")
            .name("task")
            .title("Get Task Definition")
            .description("Fetch a task definition")
            .category("Tasks")
            .stability(Stability::Stable)
            .no_scopes()
            .output("task.yml"),
    )
    .unwrap();

    let value = api.reference().to_value().unwrap();
    assert_eq!(value["$schema"], "/schemas/common/api-reference-v0.json#");
    assert_eq!(value["title"], "Queue API");
    assert_eq!(value["description"], "The queue service");
    assert_eq!(value["serviceName"], "queue");
    assert_eq!(value["apiVersion"], "v1");
    assert_eq!(
        value["entries"][3],
        json!({
            "type": "function",
            "method": "get",
            "route": "/task/<taskId>",
            "query": [],
            "args": ["taskId"],
            "name": "task",
            "stability": "stable",
            "title": "Get Task Definition",
            "output": "v1/task.json#",
            "description": "Fetch a task definition",
            "category": "Tasks",
        })
    );
}

#[test]
fn reference_is_deterministic() {
    let build = || {
        let mut api = api();
        api.declare(entry("b", "/b").query_pattern("z", "x").query_pattern("a", "y"))
            .unwrap();
        api.declare(entry("a", "/a").scopes("queue:a")).unwrap();
        api.reference().to_json_pretty().unwrap()
    };
    assert_eq!(build(), build());
}

#[test]
fn descriptor_name_and_version_formats() {
    let build = |name: &str, version: &str| {
        ServiceDescriptor::builder()
            .title("t")
            .description("d")
            .service_name(name)
            .api_version(version)
            .build()
    };
    assert!(matches!(build("Foo", "v1"), Err(Error::InvalidFormat { .. })));
    assert!(build("foo-bar2", "v1").is_ok());
    assert!(matches!(build("foo", "1"), Err(Error::InvalidFormat { .. })));
    assert!(matches!(build("foo", "version1"), Err(Error::InvalidFormat { .. })));
}

#[test]
fn descriptor_error_codes() {
    let d = ServiceDescriptor::builder()
        .title("t")
        .description("d")
        .service_name("svc")
        .api_version("v1")
        .error_code("TooManyTasks", 429)
        .error_code("ResourceNotFound", 410)
        .build()
        .unwrap();
    assert_eq!(d.error_codes()["TooManyTasks"], 429);
    assert_eq!(d.error_codes()["ResourceNotFound"], 410);
    assert_eq!(d.error_codes()["InternalServerError"], 500);

    let bad = ServiceDescriptor::builder()
        .title("t")
        .description("d")
        .service_name("svc")
        .api_version("v1")
        .error_code("lowercase", 400)
        .build();
    assert!(matches!(bad, Err(Error::InvalidFormat { .. })));
}
