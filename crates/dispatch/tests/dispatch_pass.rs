//! Integration tests for full dispatch passes against the in-memory fakes.

use std::sync::Arc;

use dispatch::fakes::{
    FakeJob, MemoryRegistry, MemorySecurityContext, RecordingSourceOwner, RecordingTrigger,
};
use dispatch::{
    DispatchError, Dispatcher, RemoteConfig, RepositoryUrl, SourceConfiguration, SourceDescriptor,
    SourceId, SourceRemote,
};

const BITBUCKET_HTTPS: &str = "https://bitbucket.example.com/scm/proj/repo.git";
const BITBUCKET_SSH: &str = "ssh://git@bitbucket.example.com/proj/repo.git";

fn git(uris: &[&str]) -> SourceConfiguration {
    SourceConfiguration::Git {
        remotes: vec![RemoteConfig::new(
            "origin",
            uris.iter()
                .map(|u| RepositoryUrl::parse(u).expect("test remote should parse"))
                .collect(),
        )],
    }
}

fn hg(source: &str) -> SourceConfiguration {
    SourceConfiguration::Mercurial {
        source: source.to_string(),
    }
}

struct Harness {
    registry: Arc<MemoryRegistry>,
    security: Arc<MemorySecurityContext>,
    dispatcher: Dispatcher,
}

fn harness() -> Harness {
    let registry = Arc::new(MemoryRegistry::new());
    let security = Arc::new(MemorySecurityContext::as_user("alice"));
    let dispatcher = Dispatcher::new(registry.clone(), security.clone());
    Harness {
        registry,
        security,
        dispatcher,
    }
}

impl Harness {
    fn job(&self, job: FakeJob) -> Arc<FakeJob> {
        let job = Arc::new(job);
        self.registry.add_job(job.clone());
        job
    }
}

/// Test: https notification with /scm prefix triggers job with ssh remote once
#[tokio::test]
async fn test_scm_prefixed_https_triggers_ssh_job_once() {
    let h = harness();
    let job = h.job(FakeJob::triggered("build", vec![git(&[BITBUCKET_SSH])]));

    let report = h
        .dispatcher
        .dispatch_with_report("alice", BITBUCKET_HTTPS, "git", "{\"push\":1}")
        .await
        .expect("dispatch failed");

    assert_eq!(
        job.trigger_calls(),
        vec![("alice".to_string(), "{\"push\":1}".to_string())]
    );
    assert_eq!(report.trigger_count("build"), 1);
    assert_eq!(h.security.current(), Some("alice".to_string()));
}

/// Test: notification without a host triggers the job sharing its path
#[tokio::test]
async fn test_hostless_notification_triggers_by_path() {
    let h = harness();
    let job = h.job(FakeJob::triggered(
        "build",
        vec![git(&["ssh://git@bitbucket.example.com/scm/proj/repo.git"])],
    ));
    let other = h.job(FakeJob::triggered(
        "other",
        vec![git(&["ssh://git@bitbucket.example.com/proj/other.git"])],
    ));

    let report = h
        .dispatcher
        .dispatch_with_report("alice", "https:///proj/repo.git", "git", "")
        .await
        .expect("dispatch failed");

    assert_eq!(job.trigger_calls().len(), 1);
    assert!(other.trigger_calls().is_empty());
    assert_eq!(report.triggered_jobs.len(), 1);
}

/// Test: multiple matching URIs in one configuration trigger once
#[tokio::test]
async fn test_multiple_matching_uris_trigger_once() {
    let h = harness();
    let job = h.job(FakeJob::triggered(
        "build",
        vec![git(&[BITBUCKET_SSH, "git@bitbucket.example.com:proj/repo.git"])],
    ));

    h.dispatcher
        .dispatch("alice", BITBUCKET_HTTPS, "git", "")
        .await
        .expect("dispatch failed");

    assert_eq!(job.trigger_calls().len(), 1);
}

/// Test: the same configuration listed twice on a job triggers once
#[tokio::test]
async fn test_duplicate_configuration_is_deduplicated() {
    let h = harness();
    let job = h.job(FakeJob::triggered(
        "build",
        vec![git(&[BITBUCKET_SSH]), git(&[BITBUCKET_SSH])],
    ));

    let report = h
        .dispatcher
        .dispatch_with_report("alice", BITBUCKET_HTTPS, "git", "")
        .await
        .expect("dispatch failed");

    assert_eq!(job.trigger_calls().len(), 1);
    assert_eq!(report.triggered_jobs.len(), 1);
}

/// Test: distinct matching configurations on one job each trigger
#[tokio::test]
async fn test_distinct_matching_configurations_each_trigger() {
    let h = harness();
    let job = h.job(FakeJob::triggered(
        "build",
        vec![
            git(&[BITBUCKET_SSH]),
            git(&["https://bitbucket.example.com/scm/proj/repo.git"]),
        ],
    ));

    h.dispatcher
        .dispatch("alice", BITBUCKET_HTTPS, "git", "")
        .await
        .expect("dispatch failed");

    assert_eq!(job.trigger_calls().len(), 2);
}

/// Test: two jobs with the identical remote are both triggered
#[tokio::test]
async fn test_two_jobs_same_remote_both_triggered() {
    let h = harness();
    let first = h.job(FakeJob::triggered("first", vec![git(&[BITBUCKET_SSH])]));
    let second = h.job(FakeJob::triggered("second", vec![git(&[BITBUCKET_SSH])]));

    let report = h
        .dispatcher
        .dispatch_with_report("alice", BITBUCKET_HTTPS, "git", "")
        .await
        .expect("dispatch failed");

    assert_eq!(first.trigger_calls().len(), 1);
    assert_eq!(second.trigger_calls().len(), 1);
    assert_eq!(report.triggered_jobs.len(), 2);
}

/// Test: override URL triggers a job whose remotes don't match
#[tokio::test]
async fn test_override_url_triggers_non_matching_job() {
    let h = harness();
    let notify = "https://mirror.example.com/scm/proj/repo.git";
    let job = h.job(FakeJob::with_trigger(
        "mirror",
        RecordingTrigger::new().with_override_url(notify),
        vec![git(&["https://origin.example.com/team/other.git"])],
    ));

    h.dispatcher
        .dispatch("alice", notify, "git", "")
        .await
        .expect("dispatch failed");

    assert_eq!(job.trigger_calls().len(), 1);
}

/// Test: non-matching job without override is left alone
#[tokio::test]
async fn test_unrelated_job_not_triggered() {
    let h = harness();
    let job = h.job(FakeJob::triggered(
        "other",
        vec![git(&["ssh://git@bitbucket.example.com/proj/other.git"])],
    ));

    let report = h
        .dispatcher
        .dispatch_with_report("alice", BITBUCKET_HTTPS, "git", "")
        .await
        .expect("dispatch failed");

    assert!(job.trigger_calls().is_empty());
    assert!(report.is_empty());
}

/// Test: jobs without a hook trigger are skipped
#[tokio::test]
async fn test_job_without_trigger_skipped() {
    let h = harness();
    h.job(FakeJob::untriggered("manual", vec![git(&[BITBUCKET_SSH])]));
    h.job(FakeJob::without_sources("pipeline"));
    let empty = h.job(FakeJob::triggered("empty", vec![]));

    let report = h
        .dispatcher
        .dispatch_with_report("alice", BITBUCKET_HTTPS, "git", "")
        .await
        .expect("dispatch failed");

    assert!(report.triggered_jobs.is_empty());
    assert_eq!(report.skipped_jobs, 2);
    assert!(empty.trigger_calls().is_empty());
}

/// Test: svn aborts with UnsupportedScmType and triggers nothing
#[tokio::test]
async fn test_unsupported_kind_aborts() {
    let h = harness();
    let job = h.job(FakeJob::triggered("build", vec![git(&[BITBUCKET_SSH])]));

    let err = h
        .dispatcher
        .dispatch("alice", BITBUCKET_HTTPS, "svn", "")
        .await
        .expect_err("svn should be rejected");

    assert!(matches!(err, DispatchError::UnsupportedScmType { ref kind } if kind == "svn"));
    assert!(job.trigger_calls().is_empty());
    assert_eq!(h.security.current(), Some("alice".to_string()));
}

/// Test: malformed URL aborts with InvalidRepositoryUrl and restores identity
#[tokio::test]
async fn test_malformed_url_aborts_and_restores_identity() {
    let h = harness();
    let job = h.job(FakeJob::triggered("build", vec![git(&[BITBUCKET_SSH])]));

    let err = h
        .dispatcher
        .dispatch("alice", "ht!tp://bad", "git", "")
        .await
        .expect_err("malformed url should be rejected");

    assert!(matches!(err, DispatchError::InvalidRepositoryUrl { .. }));
    assert!(job.trigger_calls().is_empty());
    assert_eq!(h.security.current(), Some("alice".to_string()));
    assert_eq!(h.security.restore_count(), 1);
}

/// Test: registry failure aborts and restores identity
#[tokio::test]
async fn test_registry_failure_aborts() {
    let security = Arc::new(MemorySecurityContext::as_user("alice"));
    let dispatcher = Dispatcher::new(Arc::new(MemoryRegistry::unavailable()), security.clone());

    let err = dispatcher
        .dispatch("alice", BITBUCKET_HTTPS, "git", "")
        .await
        .expect_err("registry failure should abort");

    assert!(matches!(err, DispatchError::Registry(_)));
    assert_eq!(security.current(), Some("alice".to_string()));
}

/// Test: a failing trigger does not stop later jobs
#[tokio::test]
async fn test_failing_trigger_does_not_stop_pass() {
    let h = harness();
    let broken = h.job(FakeJob::with_trigger(
        "broken",
        RecordingTrigger::new().failing(),
        vec![git(&[BITBUCKET_SSH])],
    ));
    let healthy = h.job(FakeJob::triggered("healthy", vec![git(&[BITBUCKET_SSH])]));

    let report = h
        .dispatcher
        .dispatch_with_report("alice", BITBUCKET_HTTPS, "git", "")
        .await
        .expect("dispatch failed");

    assert_eq!(broken.trigger_calls().len(), 1);
    assert_eq!(healthy.trigger_calls().len(), 1);
    assert_eq!(report.failed_callbacks, vec!["broken".to_string()]);
}

/// Test: mercurial job matches only on identical host, path and query
#[tokio::test]
async fn test_mercurial_job_matching() {
    let h = harness();
    let exact = h.job(FakeJob::triggered(
        "hg-exact",
        vec![hg("ssh://hg@hg.example.com/repo")],
    ));
    let prefixed = h.job(FakeJob::triggered(
        "hg-prefixed",
        vec![hg("https://hg.example.com/scm/repo")],
    ));
    let broken = h.job(FakeJob::triggered("hg-broken", vec![hg("ht!tp://bad")]));

    h.dispatcher
        .dispatch("alice", "https://hg.example.com/repo", "hg", "")
        .await
        .expect("dispatch failed");

    assert_eq!(exact.trigger_calls().len(), 1);
    assert!(prefixed.trigger_calls().is_empty());
    assert!(broken.trigger_calls().is_empty());
}

/// Test: source owners are notified for matching sources only
#[tokio::test]
async fn test_source_owner_notified_for_matching_sources() {
    let h = harness();
    let owner = Arc::new(RecordingSourceOwner::new(
        "multibranch",
        vec![
            SourceDescriptor {
                id: SourceId::new("matching").unwrap(),
                remote: SourceRemote::Git {
                    remote: "git@bitbucket.example.com:proj/repo.git".to_string(),
                },
            },
            SourceDescriptor {
                id: SourceId::new("other").unwrap(),
                remote: SourceRemote::Git {
                    remote: "git@bitbucket.example.com:proj/other.git".to_string(),
                },
            },
            SourceDescriptor {
                id: SourceId::new("broken").unwrap(),
                remote: SourceRemote::Git {
                    remote: "not a remote".to_string(),
                },
            },
            SourceDescriptor {
                id: SourceId::new("svn").unwrap(),
                remote: SourceRemote::Unsupported {
                    name: "subversion".to_string(),
                },
            },
        ],
    ));
    h.registry.add_owner(owner.clone());

    let report = h
        .dispatcher
        .dispatch_with_report("alice", BITBUCKET_HTTPS, "git", "")
        .await
        .expect("dispatch failed");

    assert_eq!(owner.updates(), vec![SourceId::new("matching").unwrap()]);
    assert_eq!(report.updated_sources.len(), 1);
    assert_eq!(report.updated_sources[0].owner.as_str(), "multibranch");
}

/// Test: legacy entry point dispatches with an empty payload
#[tokio::test]
#[allow(deprecated)]
async fn test_legacy_entry_point_uses_empty_payload() {
    let h = harness();
    let job = h.job(FakeJob::triggered("build", vec![git(&[BITBUCKET_SSH])]));

    h.dispatcher
        .dispatch_legacy("bob", BITBUCKET_HTTPS, "git")
        .await
        .expect("dispatch failed");

    assert_eq!(job.trigger_calls(), vec![("bob".to_string(), String::new())]);
}

/// Test: report serialises with the pass id and kind
#[tokio::test]
async fn test_report_serialises() {
    let h = harness();
    h.job(FakeJob::triggered("build", vec![git(&[BITBUCKET_SSH])]));

    let report = h
        .dispatcher
        .dispatch_with_report("alice", BITBUCKET_HTTPS, "git", "")
        .await
        .expect("dispatch failed");

    let json = serde_json::to_value(&report).expect("report should serialise");
    assert_eq!(json["kind"], "git");
    assert_eq!(json["repository_url"], BITBUCKET_HTTPS);
    assert_eq!(json["triggered_jobs"][0], "build");
    assert!(report.finished_at >= report.started_at);
}
