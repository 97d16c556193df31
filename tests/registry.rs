use stem_separator_client::registry::{registry, resolve_model};

#[test]
fn empty_name_resolves_to_the_default_model() {
    assert_eq!(resolve_model("").unwrap(), "htdemucs");
}

#[test]
fn known_models_resolve_to_themselves() {
    assert_eq!(resolve_model("htdemucs_ft").unwrap(), "htdemucs_ft");
    assert_eq!(resolve_model("mdx_extra_q").unwrap(), "mdx_extra_q");
}

#[test]
fn unknown_model_is_rejected() {
    let err = resolve_model("spleeter").expect_err("unknown model must not resolve");
    assert!(err.to_string().contains("not found in registry"));
}

#[test]
fn default_is_listed_in_the_registry() {
    let reg = registry().unwrap();
    assert!(reg.models.iter().any(|m| m.name == reg.default));
}
