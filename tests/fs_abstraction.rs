use std::sync::Arc;

use sitedag::dag::NodeId;
use sitedag::fs::mock::MockFileSystem;
use sitedag::fs::{FileSystem, RealFileSystem};
use sitedag::resource::{FileProvider, ResourceProvider};
use sitedag::rules::RuleSet;
use sitedag::store::{FileStore, Store, FINGERPRINT_NAMESPACE};
use sitedag_test_utils::builders::{ConfigFileBuilder, RuleConfigBuilder};

#[test]
fn file_store_persists_across_instances_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);

    let store = FileStore::new(fs.clone(), dir.path().join(".sitedag"));
    store.set(FINGERPRINT_NAMESPACE, "posts/a.md@tags", b"abc").unwrap();

    let reopened = FileStore::new(fs, dir.path().join(".sitedag"));
    assert_eq!(
        reopened.get(FINGERPRINT_NAMESPACE, "posts/a.md@tags").unwrap(),
        Some(b"abc".to_vec())
    );
    assert_eq!(reopened.get(FINGERPRINT_NAMESPACE, "posts/a.md").unwrap(), None);
}

#[test]
fn real_provider_walks_nested_directories_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let content = dir.path().join("content");
    std::fs::create_dir_all(content.join("b/c")).unwrap();
    std::fs::write(content.join("b/c/deep.md"), "d").unwrap();
    std::fs::write(content.join("a.md"), "a").unwrap();

    let provider = FileProvider::new(Arc::new(RealFileSystem), &content);
    assert_eq!(
        provider.enumerate().unwrap(),
        vec![NodeId::new("a.md"), NodeId::new("b/c/deep.md")]
    );
}

#[test]
fn first_rule_by_name_claims_each_resource() {
    let fs = MockFileSystem::new();
    fs.add_file("content/posts/a.md", "a");
    fs.add_file("content/posts/draft.md", "d");
    fs.add_file("content/style.css", "s");
    fs.add_file("content/notes.txt", "n");

    let cfg = ConfigFileBuilder::new()
        .with_rule("a_posts", RuleConfigBuilder::copy("posts/*.md").exclude("**/draft.md").build())
        .with_rule("b_everything_md", RuleConfigBuilder::copy("**/*.md").route("none").build())
        .with_rule("c_css", RuleConfigBuilder::copy("*.css").build())
        .build();
    let rules = RuleSet::from_config(&cfg).unwrap();
    let provider = FileProvider::new(Arc::new(fs), "content");

    let claimed: Vec<(String, &'static str)> = rules
        .registrations(&provider)
        .unwrap()
        .into_iter()
        .map(|r| (r.id.to_string(), r.unit.kind()))
        .collect();
    assert_eq!(
        claimed,
        vec![
            ("posts/a.md".to_string(), "copy"),
            ("posts/draft.md".to_string(), "copy"),
            ("style.css".to_string(), "copy"),
        ]
    );

    assert_eq!(rules.claim("posts/draft.md").map(|r| r.name.as_str()), Some("b_everything_md"));
    let routes = rules.routes();
    assert_eq!(routes.route(&NodeId::new("posts/draft.md")), None);
    assert_eq!(
        routes.route(&NodeId::new("posts/a.md")),
        Some(std::path::PathBuf::from("posts/a.md"))
    );
}
