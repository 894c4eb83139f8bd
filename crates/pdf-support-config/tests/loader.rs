use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use pdf_support_config::{Config, ConfigError, ConfigSourceKind, LoadOptions};
use tempfile::TempDir;

fn write_file(path: impl AsRef<Path>, contents: &str) {
    let mut file = fs::File::create(path).expect("create config");
    file.write_all(contents.as_bytes()).expect("write config");
}

fn canonical(path: impl AsRef<Path>) -> PathBuf {
    fs::canonicalize(path).expect("canonicalize path")
}

#[test]
fn loads_defaults_when_no_files_present() {
    let temp = TempDir::new().expect("tempdir");
    let working_dir = canonical(temp.path());

    let config = Config::load(LoadOptions::default().with_working_dir(working_dir.clone()))
        .expect("load defaults");

    assert_eq!(
        config.directories.support_directory_path,
        PathBuf::from("pdfkit")
    );
    assert_eq!(
        config.directories.default_directory_path,
        PathBuf::from("documents")
    );
    assert_eq!(config.logging.filter, "warn");
    assert_eq!(config.sources.working_directory, working_dir);
    assert_eq!(config.sources.layers.len(), 1);
    assert_eq!(config.sources.layers[0].kind, ConfigSourceKind::Default);
}

#[test]
fn applies_precedence_and_merges_fields() {
    let temp = TempDir::new().expect("tempdir");
    let git_root = canonical(temp.path());
    fs::create_dir(git_root.join(".git")).expect("create .git");

    write_file(
        git_root.join(".pdf-support.toml"),
        r#"
        [directories]
        default_directory_path = "root-documents"
        support_directory_path = "root-scratch"

        [logging]
        filter = "debug"
        "#,
    );

    let workspace = git_root.join("workspace");
    fs::create_dir(&workspace).expect("create workspace");

    write_file(
        workspace.join(".pdf-support.toml"),
        r#"
        [directories]
        support_directory_path = "local-scratch"
        "#,
    );

    let override_path = workspace.join("override.toml");
    write_file(
        &override_path,
        r#"
        [logging]
        filter = "pdf_support_core=trace"
        "#,
    );

    let config = Config::load(
        LoadOptions::default()
            .with_working_dir(&workspace)
            .with_override_path(&override_path),
    )
    .expect("load layered config");

    assert_eq!(
        config.directories.default_directory_path,
        git_root.join("root-documents")
    );
    assert_eq!(
        config.directories.support_directory_path,
        workspace.join("local-scratch")
    );
    assert_eq!(config.logging.filter, "pdf_support_core=trace");

    let kinds: Vec<_> = config.sources.layers.iter().map(|layer| layer.kind).collect();
    assert_eq!(
        kinds,
        vec![
            ConfigSourceKind::Default,
            ConfigSourceKind::GitRoot,
            ConfigSourceKind::Local,
            ConfigSourceKind::Override,
        ]
    );
}

#[test]
fn absolute_paths_are_used_verbatim() {
    let temp = TempDir::new().expect("tempdir");
    let working_dir = canonical(temp.path());
    let scratch = working_dir.join("elsewhere").join("scratch");

    write_file(
        working_dir.join(".pdf-support.toml"),
        &format!(
            "[directories]\nsupport_directory_path = {:?}\n",
            scratch.display().to_string()
        ),
    );

    let config = Config::load(LoadOptions::default().with_working_dir(&working_dir))
        .expect("load config");
    assert_eq!(config.directories.support_directory_path, scratch);
}

#[test]
fn missing_override_is_reported() {
    let temp = TempDir::new().expect("tempdir");

    let err = Config::load(
        LoadOptions::default()
            .with_working_dir(temp.path())
            .with_override_path("missing.toml"),
    )
    .expect_err("override must exist");

    assert!(matches!(err, ConfigError::OverrideNotFound { .. }));
}

#[test]
fn parse_errors_name_the_file() {
    let temp = TempDir::new().expect("tempdir");
    let working_dir = canonical(temp.path());
    write_file(
        working_dir.join(".pdf-support.toml"),
        "[directories]\nsupport_directory_path = 42\n",
    );

    let err = Config::load(LoadOptions::default().with_working_dir(&working_dir))
        .expect_err("parse failure");

    match err {
        ConfigError::Parse { path, .. } => {
            assert_eq!(path, working_dir.join(".pdf-support.toml"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unknown_keys_are_rejected() {
    let temp = TempDir::new().expect("tempdir");
    let working_dir = canonical(temp.path());
    write_file(
        working_dir.join(".pdf-support.toml"),
        "[directories]\nscratch = \"tmp\"\n",
    );

    let err = Config::load(LoadOptions::default().with_working_dir(&working_dir))
        .expect_err("unknown key");
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn empty_values_fail_validation() {
    let temp = TempDir::new().expect("tempdir");
    let working_dir = canonical(temp.path());
    write_file(
        working_dir.join(".pdf-support.toml"),
        r#"
        [directories]
        support_directory_path = ""

        [logging]
        filter = "  "
        "#,
    );

    let err = Config::load(LoadOptions::default().with_working_dir(&working_dir))
        .expect_err("validation failure");

    match err {
        ConfigError::Validation(errors) => {
            let messages: Vec<_> = errors.iter().map(|e| e.message.clone()).collect();
            assert_eq!(
                messages,
                vec![
                    "directories.support_directory_path cannot be empty".to_string(),
                    "logging.filter cannot be empty".to_string(),
                ]
            );
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn resolution_is_stable_across_reads() {
    let temp = TempDir::new().expect("tempdir");
    let working_dir = canonical(temp.path());
    write_file(
        working_dir.join(".pdf-support.toml"),
        "[directories]\nsupport_directory_path = \"first\"\n",
    );

    let config = Config::load(LoadOptions::default().with_working_dir(&working_dir))
        .expect("load config");

    write_file(
        working_dir.join(".pdf-support.toml"),
        "[directories]\nsupport_directory_path = \"second\"\n",
    );

    let snapshot = config.clone();
    assert_eq!(
        config.directories.support_directory_path,
        working_dir.join("first")
    );
    assert_eq!(snapshot.directories, config.directories);
}

fn load_rejection(working_dir: &Path, contents: &str) -> String {
    write_file(working_dir.join(".pdf-support.toml"), contents);
    match Config::load(LoadOptions::default().with_working_dir(working_dir)) {
        Err(ConfigError::Validation(errors)) => errors.to_string(),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(config) => panic!(
            "accepted support directory {}",
            config.directories.support_directory_path.display()
        ),
    }
}

#[test]
fn support_directory_matching_default_output_is_rejected() {
    let temp = TempDir::new().expect("tempdir");
    let working_dir = canonical(temp.path());

    let message = load_rejection(
        &working_dir,
        "[directories]\nsupport_directory_path = \"documents\"\n",
    );

    assert!(message.contains("must not contain directories.default_directory_path"));
    assert!(message.contains(&working_dir.join("documents").display().to_string()));
}

#[test]
fn support_directory_at_working_directory_is_rejected() {
    let temp = TempDir::new().expect("tempdir");
    let working_dir = canonical(temp.path());

    let message = load_rejection(&working_dir, "[directories]\nsupport_directory_path = \".\"\n");

    assert!(message.contains("must not contain"));
}

#[test]
fn support_directory_above_output_is_rejected() {
    let temp = TempDir::new().expect("tempdir");
    let working_dir = canonical(temp.path());

    let message = load_rejection(
        &working_dir,
        r#"
        [directories]
        default_directory_path = "build/documents"
        support_directory_path = "build/pdf/.."
        "#,
    );

    assert!(message.contains(&format!(
        "directories.support_directory_path ({})",
        working_dir.join("build").display()
    )));
}

#[test]
fn support_directory_beside_output_is_accepted() {
    let temp = TempDir::new().expect("tempdir");
    let working_dir = canonical(temp.path());
    write_file(
        working_dir.join(".pdf-support.toml"),
        "[directories]\nsupport_directory_path = \"documents-scratch\"\n",
    );

    let config = Config::load(LoadOptions::default().with_working_dir(&working_dir))
        .expect("sibling directories are fine");

    assert_eq!(
        config.directories.support_directory_path,
        working_dir.join("documents-scratch")
    );
}
