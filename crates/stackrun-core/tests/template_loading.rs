//! Loading templates and single instances from directories.

mod support;

use std::collections::HashMap;
use std::path::Path;

use serde_json::json;
use stackrun_core::config::{ConfigCache, ConfigLoader, DefaultsSection, LoadOverrides};
use stackrun_core::error::StackError;
use stackrun_core::template::{Template, is_template_dir, load_template, resolve_template};
use stackrun_core::types::Operation;
use tempfile::TempDir;

use support::write_instance;

fn loader() -> ConfigLoader {
    ConfigLoader::new(ConfigCache::new()).with_env(HashMap::new())
}

fn load(root: &Path, loader: &mut ConfigLoader) -> Result<Option<Template>, StackError> {
    load_template(root, loader, &LoadOverrides::new(), Operation::Deploy)
}

fn resolve(root: &Path, loader: &mut ConfigLoader) -> Result<Template, StackError> {
    resolve_template(root, loader, &LoadOverrides::new(), Operation::Deploy)
}

#[test]
fn subdirectories_form_a_template() {
    let temp = TempDir::new().unwrap();
    write_instance(
        temp.path(),
        "db",
        "name: db\ncomponent: postgres\norg: acme\napp: shop\ninputs:\n  size: small\n",
    );
    write_instance(
        temp.path(),
        "api",
        "name: api\ncomponent: scf\norg: acme\napp: shop\ninputs:\n  db: ${output:db.url}\n",
    );
    write_instance(
        temp.path(),
        ".hidden",
        "name: ghost\ncomponent: scf\norg: acme\n",
    );
    std::fs::create_dir_all(temp.path().join("docs")).unwrap();

    let mut loader = loader();
    let template = load(temp.path(), &mut loader).unwrap().unwrap();

    assert_eq!(template.instance_names(), vec!["api", "db"]);
    assert_eq!(template.org.as_deref(), Some("acme"));
    assert_eq!(template.app.as_deref(), Some("shop"));
    assert_eq!(template.stage.as_deref(), Some("dev"));
    assert_eq!(template.get("db").unwrap().inputs, json!({"size": "small"}));
    assert!(is_template_dir(temp.path(), &mut loader));
}

#[test]
fn mismatched_identity_is_rejected() {
    let temp = TempDir::new().unwrap();
    write_instance(
        temp.path(),
        "a",
        "name: a\ncomponent: scf\norg: acme\napp: shop\n",
    );
    write_instance(
        temp.path(),
        "b",
        "name: b\ncomponent: scf\norg: acme\napp: shop\nstage: prod\n",
    );

    let err = load(temp.path(), &mut loader()).unwrap_err();

    match err {
        StackError::TemplateConsistency {
            instance, field, ..
        } => {
            assert_eq!(instance, "b");
            assert_eq!(field, "stage");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn cli_overrides_unify_identity() {
    let temp = TempDir::new().unwrap();
    write_instance(
        temp.path(),
        "a",
        "name: a\ncomponent: scf\norg: acme\nstage: dev\n",
    );
    write_instance(
        temp.path(),
        "b",
        "name: b\ncomponent: scf\norg: acme\nstage: prod\n",
    );

    let overrides = LoadOverrides::new().with_stage("qa").with_app("shop");
    let template = load_template(temp.path(), &mut loader(), &overrides, Operation::Deploy)
        .unwrap()
        .unwrap();

    assert_eq!(template.stage.as_deref(), Some("qa"));
    assert_eq!(template.app.as_deref(), Some("shop"));
}

#[test]
fn root_file_supplies_identity_to_instances() {
    let temp = TempDir::new().unwrap();
    std::fs::write(
        temp.path().join("serverless.yml"),
        "org: acme\napp: shop\nstage: prod\n",
    )
    .unwrap();
    write_instance(temp.path(), "a", "name: a\ncomponent: scf\napp: other\n");

    let mut loader = loader();
    let template = resolve(temp.path(), &mut loader).unwrap();

    let a = template.get("a").unwrap();
    assert_eq!(
        (a.org.as_str(), a.app.as_str(), a.stage.as_str()),
        ("acme", "shop", "prod")
    );
}

#[test]
fn deployable_root_is_a_single_instance() {
    let temp = TempDir::new().unwrap();
    std::fs::write(
        temp.path().join("serverless.yml"),
        "name: site\ncomponent: website\norg: acme\n",
    )
    .unwrap();
    write_instance(temp.path(), "child", "name: child\ncomponent: scf\norg: acme\n");

    let mut loader = loader();
    assert!(!is_template_dir(temp.path(), &mut loader));

    let template = resolve(temp.path(), &mut loader).unwrap();
    assert_eq!(template.name, "site");
    assert_eq!(template.instance_names(), vec!["site"]);
    assert_eq!(template.app.as_deref(), Some("site"));
}

#[test]
fn empty_directory_is_not_an_instance() {
    let temp = TempDir::new().unwrap();
    std::fs::create_dir_all(temp.path().join("empty")).unwrap();

    let mut loader = loader();
    assert!(load(temp.path(), &mut loader).unwrap().is_none());
    let err = resolve(temp.path(), &mut loader).unwrap_err();
    assert!(matches!(err, StackError::NotAnInstance { .. }));
}

#[test]
fn default_org_fills_missing_org() {
    let temp = TempDir::new().unwrap();
    write_instance(temp.path(), "a", "name: a\ncomponent: scf\n");

    let mut loader = ConfigLoader::new(ConfigCache::new()).with_defaults(DefaultsSection {
        org: Some("fallback".into()),
        stage: None,
    });
    let template = load_template(temp.path(), &mut loader, &LoadOverrides::new(), Operation::Remove)
        .unwrap()
        .unwrap();
    assert_eq!(template.org.as_deref(), Some("fallback"));
}

#[test]
fn command_inputs_and_env_are_applied() {
    let temp = TempDir::new().unwrap();
    write_instance(
        temp.path(),
        "api",
        "name: api\ncomponent: scf\norg: acme\ninputs:\n  memory: 128\n  region: ${env:REGION}\ncommandInputs:\n  deploy:\n    memory: 512\n",
    );

    let mut loader = ConfigLoader::new(ConfigCache::new())
        .with_env(HashMap::from([("REGION".to_string(), "ap-guangzhou".to_string())]));
    let overrides = LoadOverrides::new().with_inputs(json!({"timeout": 10}));
    let template = load_template(temp.path(), &mut loader, &overrides, Operation::Deploy)
        .unwrap()
        .unwrap();

    assert_eq!(
        template.get("api").unwrap().inputs,
        json!({"memory": 512, "region": "ap-guangzhou", "timeout": 10})
    );
}

#[test]
fn legacy_variables_are_rejected() {
    let temp = TempDir::new().unwrap();
    write_instance(
        temp.path(),
        "api",
        "name: api\ncomponent: scf\norg: acme\ninputs:\n  stage: ${opt:stage}\n",
    );

    let err = load(temp.path(), &mut loader()).unwrap_err();
    assert!(matches!(err, StackError::UnsupportedVariable { .. }));
}

#[test]
fn json_instance_files_are_read() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("api");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("serverless.json"),
        r#"{"name": "api", "component": "scf", "org": "acme", "inputs": {"n": 1}}"#,
    )
    .unwrap();

    let template = load(temp.path(), &mut loader()).unwrap().unwrap();
    assert_eq!(template.get("api").unwrap().inputs, json!({"n": 1}));
}

#[test]
fn non_component_subdirectory_rules_out_the_template() {
    let temp = TempDir::new().unwrap();
    write_instance(temp.path(), "api", "name: api\ncomponent: scf\norg: acme\n");
    write_instance(temp.path(), "shared", "name: shared\norg: acme\n");

    let mut loader = loader();
    assert!(!is_template_dir(temp.path(), &mut loader));
    assert!(load(temp.path(), &mut loader).unwrap().is_none());

    let err = resolve(temp.path(), &mut loader).unwrap_err();
    assert!(matches!(err, StackError::NotAnInstance { .. }));
}
