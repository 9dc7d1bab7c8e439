use pretty_assertions::assert_eq;
use sitecfg_cli::{cli, failure_message, run, StoreFile};
use sitecfg_core::StoreSnapshot;
use sitecfg_model::HandlerMapping;
use sitecfg_test_utils::{recorded_config, recorded_snapshot, RECORDED_SITE, RECORDED_WEBSPACE};
use std::path::Path;

fn seed_store(dir: &Path, name: &str) -> StoreFile {
    let file = StoreFile::new(dir.join(name));
    file.save(&recorded_snapshot()).unwrap();
    file
}

async fn sitecfg(store: &StoreFile, args: &[&str]) -> anyhow::Result<String> {
    let store_path = store.path().to_string_lossy().to_string();
    let mut argv = vec!["sitecfg", "--store", store_path.as_str()];
    argv.extend_from_slice(args);
    let matches = cli::build().try_get_matches_from(argv)?;
    run(&matches).await
}

fn stored_mappings(snapshot: &StoreSnapshot) -> Option<Vec<HandlerMapping>> {
    snapshot
        .sites
        .iter()
        .find(|r| r.site.name == RECORDED_SITE)
        .and_then(|r| r.config.handler_mappings.clone())
}

#[tokio::test]
async fn test_webspace_list_prints_service_order() {
    let dir = tempfile::tempdir().unwrap();
    let store = seed_store(dir.path(), "store.json");

    let text = sitecfg(&store, &["webspace", "list"]).await.unwrap();
    let names: Vec<&str> = text
        .lines()
        .map(|l| l.split('\t').next().unwrap_or_default())
        .collect();
    assert_eq!(names.len(), 6);
    assert_eq!(names[0], "eastasiawebspace");
    assert!(text.contains("East US\tReady"));
}

#[tokio::test]
async fn test_geo_regions_listed() {
    let dir = tempfile::tempdir().unwrap();
    let store = seed_store(dir.path(), "store.json");

    let text = sitecfg(&store, &["webspace", "list", "--geo-regions"])
        .await
        .unwrap();
    assert!(text.lines().any(|l| l == "North Europe"));
}

#[tokio::test]
async fn test_site_locate_names_webspace() {
    let dir = tempfile::tempdir().unwrap();
    let store = seed_store(dir.path(), "store.json");

    let text = sitecfg(&store, &["site", "locate", RECORDED_SITE])
        .await
        .unwrap();
    assert!(text.starts_with("clitsts1 is in eastuswebspace"));
}

#[tokio::test]
async fn test_handler_add_list_delete_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = seed_store(dir.path(), "store.json");

    sitecfg(
        &store,
        &["handler", "add", RECORDED_SITE, ".js", "c:\\node\\node.exe"],
    )
    .await
    .unwrap();
    assert_eq!(
        stored_mappings(&store.load().unwrap()),
        Some(vec![HandlerMapping::new(".js", "c:\\node\\node.exe")])
    );

    let listed = sitecfg(&store, &["--json", "handler", "list", RECORDED_SITE])
        .await
        .unwrap();
    let listed: Vec<HandlerMapping> = serde_json::from_str(&listed).unwrap();
    assert_eq!(listed.len(), 1);

    sitecfg(&store, &["handler", "delete", RECORDED_SITE, ".js", "--verify"])
        .await
        .unwrap();
    let snapshot = store.load().unwrap();
    assert_eq!(stored_mappings(&snapshot), None);
    assert_eq!(snapshot, recorded_snapshot());
}

#[tokio::test]
async fn test_yaml_store_is_supported() {
    let dir = tempfile::tempdir().unwrap();
    let store = seed_store(dir.path(), "store.yaml");

    sitecfg(
        &store,
        &["handler", "add", RECORDED_SITE, ".php", "php-cgi.exe", "--arguments", "-q"],
    )
    .await
    .unwrap();

    let mapping = HandlerMapping::new(".php", "php-cgi.exe").with_arguments("-q");
    assert_eq!(stored_mappings(&store.load().unwrap()), Some(vec![mapping]));
}

#[tokio::test]
async fn test_json_report_describes_update() {
    let dir = tempfile::tempdir().unwrap();
    let store = seed_store(dir.path(), "store.json");

    let text = sitecfg(
        &store,
        &["--json", "handler", "add", RECORDED_SITE, ".js", "node.exe"],
    )
    .await
    .unwrap();
    let report: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(report["webspace"], RECORDED_WEBSPACE);
    assert_eq!(report["change"], "added");
    assert_eq!(report["written"], true);
}

#[tokio::test]
async fn test_unknown_site_fails_and_keeps_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = seed_store(dir.path(), "store.json");
    let before = std::fs::read_to_string(store.path()).unwrap();

    let err = sitecfg(&store, &["handler", "delete", "nonexistent", ".js"])
        .await
        .unwrap_err();
    assert_eq!(
        failure_message(&err),
        "site 'nonexistent' not found across 6 webspaces"
    );
    assert_eq!(std::fs::read_to_string(store.path()).unwrap(), before);
}

#[tokio::test]
async fn test_empty_processor_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = seed_store(dir.path(), "store.json");

    let err = sitecfg(&store, &["handler", "add", RECORDED_SITE, ".js", " "])
        .await
        .unwrap_err();
    assert!(failure_message(&err).starts_with("invalid handler mapping change"));
    assert_eq!(store.load().unwrap(), recorded_snapshot());
}

#[tokio::test]
async fn test_missing_store_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let store = StoreFile::new(dir.path().join("absent.json"));

    let err = sitecfg(&store, &["webspace", "list"]).await.unwrap_err();
    assert!(failure_message(&err).contains("absent.json"));
}

#[tokio::test]
async fn test_other_fields_survive_cli_update() {
    let dir = tempfile::tempdir().unwrap();
    let store = seed_store(dir.path(), "store.json");

    sitecfg(&store, &["handler", "add", RECORDED_SITE, ".js", "node.exe"])
        .await
        .unwrap();

    let snapshot = store.load().unwrap();
    let record = snapshot
        .sites
        .iter()
        .find(|r| r.site.name == RECORDED_SITE)
        .unwrap();
    let mut expected = recorded_config();
    expected.handler_mappings = Some(vec![HandlerMapping::new(".js", "node.exe")]);
    assert_eq!(record.config, expected);
}
