use serde_json::Value;

#[test]
fn openapi_documents_scoped_endpoints() -> anyhow::Result<()> {
    let doc = office_scope::docs::build_openapi(8000)?;
    let v = serde_json::to_value(&doc)?;

    let paths = v.get("paths").and_then(Value::as_object).expect("paths must exist");
    for path in [
        "/me/access",
        "/records/{collection}",
        "/records/{collection}/count",
        "/records/{collection}/export",
        "/records/{collection}/{id}",
        "/records/{collection}/bulk-delete",
        "/records/{collection}/bulk-priority",
        "/view-mode/{collection}",
    ] {
        assert!(paths.contains_key(path), "OpenAPI missing path '{}'", path);
    }

    let view_mode = paths["/view-mode/{collection}"].as_object().expect("path item");
    assert!(view_mode.contains_key("get") && view_mode.contains_key("put"));

    assert!(
        v.pointer("/components/securitySchemes/bearerAuth").is_some(),
        "bearerAuth security scheme missing"
    );

    let report = v
        .pointer("/components/schemas/BulkReport/properties")
        .and_then(Value::as_object)
        .expect("components.schemas.BulkReport.properties must exist");
    for key in ["applied", "rejected", "partial"] {
        assert!(report.contains_key(key), "BulkReport schema missing '{}'", key);
    }

    Ok(())
}
