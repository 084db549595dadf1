use std::{
    path::{Path, PathBuf},
    process::Command,
};

use gimport::{Gimport, ImportOptions};
use pretty_assertions::assert_eq;

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args([
            "-c",
            "user.name=gimport",
            "-c",
            "user.email=gimport@example.com",
            "-c",
            "commit.gpgsign=false",
            "-c",
            "tag.gpgsign=false",
        ])
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}

struct Fixture {
    _dir: tempfile::TempDir,
    remotes: PathBuf,
    origin: PathBuf,
    workspace: PathBuf,
}

impl Fixture {
    /// A `lib` repository with `v1` tagged at `version = 1` and `main` one
    /// commit ahead at `version = 2`.
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let remotes = dir.path().join("remotes");
        let origin = remotes.join("lib");
        let workspace = dir.path().join("workspace");
        std::fs::create_dir_all(&origin).unwrap();
        std::fs::create_dir_all(&workspace).unwrap();

        git(&origin, &["init", "-q"]);
        git(&origin, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        Self::commit(&origin, "version = 1\nname = \"lib\"\n", "first");
        git(&origin, &["tag", "v1"]);
        Self::commit(&origin, "version = 2\nname = \"lib\"\n", "second");

        Fixture {
            _dir: dir,
            remotes,
            origin,
            workspace,
        }
    }

    fn commit(origin: &Path, content: &str, message: &str) {
        std::fs::write(origin.join("lib.toml"), content).unwrap();
        git(origin, &["add", "lib.toml"]);
        git(origin, &["commit", "-q", "-m", message]);
    }

    fn gimport(&self) -> Gimport {
        Gimport::builder()
            .root(&self.workspace)
            .default_remote(format!("file://{}/", self.remotes.display()))
            .try_build()
            .unwrap()
    }
}

fn version(gimport: &Gimport, repospec: &str, options: &ImportOptions) -> i64 {
    let imported = gimport.import(repospec, "lib.toml", options).unwrap();
    imported.symbols["version"].as_integer().unwrap()
}

#[test]
fn imports_pinned_revisions_side_by_side() {
    if !git_available() {
        return;
    }
    let fixture = Fixture::new();
    let gimport = fixture.gimport();
    let options = ImportOptions::default();

    assert_eq!(version(&gimport, "lib@v1", &options), 1);
    assert_eq!(version(&gimport, "lib@main", &options), 2);
    assert_eq!(version(&gimport, "lib", &options), 2);

    let v1 = gimport.import("lib@v1", "lib.toml", &options).unwrap();
    let main = gimport.import("lib@main", "lib.toml", &options).unwrap();
    assert_eq!(v1.resolved.commit, git(&fixture.origin, &["rev-parse", "v1"]));
    assert_eq!(main.resolved.commit, git(&fixture.origin, &["rev-parse", "main"]));
    assert!(v1.path != main.path);
    assert!(v1.path.starts_with(fixture.workspace.join(".gimport")));
}

#[test]
fn annotated_tags_resolve_to_their_commit() {
    if !git_available() {
        return;
    }
    let fixture = Fixture::new();
    git(&fixture.origin, &["tag", "-a", "v2", "-m", "release", "main"]);
    let gimport = fixture.gimport();

    let spec = gimport.decompose("lib@v2").unwrap();
    let resolved = gimport.divine(&spec).unwrap();

    assert_eq!(resolved.commit, git(&fixture.origin, &["rev-parse", "v2^{commit}"]));
    assert_eq!(version(&gimport, "lib@v2", &ImportOptions::default()), 2);
}

#[test]
fn imports_a_literal_commit() {
    if !git_available() {
        return;
    }
    let fixture = Fixture::new();
    let commit = git(&fixture.origin, &["rev-parse", "v1"]);
    let gimport = fixture.gimport();

    let imported = gimport
        .import(&format!("lib@{commit}"), "lib.toml", &ImportOptions::default())
        .unwrap();

    assert_eq!(imported.resolved.commit, commit);
    assert_eq!(imported.resolved.ref_name, Some("refs/tags/v1".to_string()));
    assert_eq!(imported.symbols["version"].as_integer(), Some(1));
}

#[test]
fn restores_a_dirty_working_copy() {
    if !git_available() {
        return;
    }
    let fixture = Fixture::new();
    let gimport = fixture.gimport();
    let options = ImportOptions::default();

    let imported = gimport.import("lib@v1", "lib.toml", &options).unwrap();
    std::fs::write(&imported.file, "version = 99\n").unwrap();
    std::fs::write(imported.path.join("stray.toml"), "x = 1\n").unwrap();

    assert_eq!(version(&gimport, "lib@v1", &options), 1);
    assert!(!imported.path.join("stray.toml").exists());
}

#[test]
fn reclaims_when_not_persisting() {
    if !git_available() {
        return;
    }
    let fixture = Fixture::new();
    let gimport = fixture.gimport();
    let options = ImportOptions {
        persist: false,
        imports: Some(vec!["name".to_string()]),
    };

    let imported = gimport.import("lib@v1", "lib.toml", &options).unwrap();

    assert!(!imported.path.exists());
    assert!(imported.reclaim_warning.is_none());
    assert_eq!(imported.symbols.keys().collect::<Vec<_>>(), vec!["name"]);
    assert!(gimport.cache_location().exists());
}

#[test]
fn unknown_remote_repository_fails_to_resolve() {
    if !git_available() {
        return;
    }
    let fixture = Fixture::new();
    let gimport = fixture.gimport();

    let error = gimport
        .import("missing@main", "lib.toml", &ImportOptions::default())
        .unwrap_err();

    assert!(matches!(error, gimport::ImportError::Resolve(_)));
}

#[test]
fn option_like_revisions_never_reach_git_as_options() {
    if !git_available() {
        return;
    }
    let fixture = Fixture::new();
    let gimport = fixture.gimport();
    let marker = fixture.workspace.join("marker");
    let commit = format!("--upload-pack=touch {};false", marker.display());

    let error = gimport
        .import("lib@--upload-pack=false", "lib.toml", &ImportOptions::default())
        .unwrap_err();
    assert!(matches!(error, gimport::ImportError::Decomposition(_)));

    let spec = gimport.decompose("lib").unwrap();
    let resolved = gimport::model::ResolvedRevision {
        ref_name: None,
        commit,
    };
    assert!(gimport.materialize(&spec, &resolved).is_err());
    assert!(!marker.exists());
}
