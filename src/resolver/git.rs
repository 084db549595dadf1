use log::{debug, info};

use crate::{
    cache::GimportGitCache,
    git::repository::describe_failure,
    model::{RefMap, ResolvedRevision},
    process::ProcessCommand,
};

use super::{ResolveError, RevisionResolver};

impl RevisionResolver for GimportGitCache {
    fn divine(&self, remote: &str, revision: &str) -> Result<ResolvedRevision, ResolveError> {
        let refs = list_refs(self, remote)?;
        if refs.is_empty() {
            debug!("{} advertised no refs", remote);
        }
        let resolved = refs.divine(revision);
        info!("Resolved {}@{} to {}", remote, revision, resolved);
        Ok(resolved)
    }
}

fn list_refs(cache: &GimportGitCache, remote: &str) -> Result<RefMap, ResolveError> {
    let remote_query_error = |message: String| ResolveError::RemoteQuery {
        remote: remote.to_string(),
        message,
    };
    let command = ProcessCommand::git().args(["ls-remote", "--", remote]);
    let output = cache
        .runner()
        .run(&command)
        .map_err(|error| remote_query_error(error.to_string()))?;
    if !output.success() {
        return Err(remote_query_error(describe_failure(&output)));
    }

    RefMap::parse(&output.stdout).map_err(|source| ResolveError::Parse {
        remote: remote.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::git::testing::FakeGit;

    fn cache(git: &FakeGit) -> GimportGitCache {
        GimportGitCache::new(
            Path::new("/nonexistent/cache").to_path_buf(),
            None,
            true,
            Box::new(git.clone()),
        )
        .unwrap()
    }

    #[test]
    fn divine_queries_the_remote_once() {
        let git = FakeGit {
            listing: "abc123\trefs/heads/main\ndef456\trefs/tags/main\n".to_string(),
            ..Default::default()
        };
        let resolved = cache(&git)
            .divine("git@github.com:org/repo", "main")
            .unwrap();

        assert_eq!(
            resolved,
            ResolvedRevision {
                ref_name: Some("refs/heads/main".to_string()),
                commit: "abc123".to_string()
            }
        );
        assert_eq!(git.count("ls-remote"), 1);
        assert_eq!(
            git.commands.borrow()[0].args,
            vec!["ls-remote", "--", "git@github.com:org/repo"]
        );
    }

    #[test]
    fn failed_query_is_a_remote_query_error() {
        let git = FakeGit {
            failing: vec!["ls-remote"],
            ..Default::default()
        };
        let error = cache(&git)
            .divine("git@github.com:org/repo", "main")
            .unwrap_err();
        match error {
            ResolveError::RemoteQuery { remote, message } => {
                assert_eq!(remote, "git@github.com:org/repo");
                assert_eq!(message, "exit code 128: fatal: ls-remote failed");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn malformed_listing_is_a_parse_error() {
        let git = FakeGit {
            listing: "not a listing\n".to_string(),
            ..Default::default()
        };
        let error = cache(&git).divine("origin", "main").unwrap_err();
        assert!(matches!(error, ResolveError::Parse { .. }));
    }

    #[test]
    fn unknown_revision_is_used_as_commit() {
        let git = FakeGit {
            listing: "abc123\trefs/heads/main\n".to_string(),
            ..Default::default()
        };
        let resolved = cache(&git).divine("origin", "deadbeef").unwrap();
        assert_eq!(resolved.commit, "deadbeef");
        assert_eq!(resolved.ref_name, None);
    }
}
