//! Whole-container deploys: overlay, user, assets and script

mod helpers;

use asset_deploy::config::ContainerConfig;
use asset_deploy::deploy::DeployError;
use asset_deploy::net::Fetcher;
use asset_deploy::pkg::PkgSettings;
use asset_deploy::runner::CommandRunner;
use asset_deploy::version::ReleaseResolver;
use asset_deploy::ContainerDeployer;
use helpers::{info, tar_gz, Entry, RecordingRunner, StubFetcher, StubReleases, TestEnvironment};
use std::sync::Arc;

const APP_URL: &str = "https://example.com/myapp-2.0.0.tar.gz";

fn app_archive() -> Vec<u8> {
    tar_gz(&[
        Entry::Dir("myapp-2.0.0/"),
        Entry::File("myapp-2.0.0/myapp", b"#!/bin/sh\n", 0o755),
        Entry::File("myapp-2.0.0/README", b"docs", 0o644),
    ])
}

struct Fixture {
    env: TestEnvironment,
    runner: Arc<RecordingRunner>,
    fetcher: Arc<StubFetcher>,
}

impl Fixture {
    fn new(runner: RecordingRunner) -> Self {
        Self {
            env: TestEnvironment::new(),
            runner: Arc::new(runner),
            fetcher: Arc::new(StubFetcher::new().with(APP_URL, app_archive())),
        }
    }

    fn deployer(&self, yaml: &str) -> ContainerDeployer {
        let config = ContainerConfig::from_yaml_str(yaml).unwrap();
        let runner: Arc<dyn CommandRunner> = self.runner.clone();
        let fetcher: Arc<dyn Fetcher> = self.fetcher.clone();
        let releases: Arc<dyn ReleaseResolver> = Arc::new(StubReleases::none());

        ContainerDeployer::new(config, runner, fetcher, releases).with_pkg_settings(PkgSettings {
            repos_conf: self.env.scratch("repos/FreeBSD.conf"),
            ..PkgSettings::default()
        })
    }
}

#[tokio::test]
async fn test_full_container_deploy() {
    let fixture = Fixture::new(RecordingRunner::new().with_output("pkg query", "8.6.0\n"));
    let overlay = fixture.env.scratch("overlay");
    std::fs::create_dir_all(overlay.join("usr/local/etc")).unwrap();
    std::fs::write(overlay.join("usr/local/etc/myapp.conf"), "port=80\n").unwrap();

    let yaml = format!(
        r#"
overlay: {}
user: myapp=1001
env:
  MYAPP_MODE: production
entrypoint: [/usr/local/bin/myapp, --serve]
script: |
  mkdir -p var/db/myapp
assets:
  - pkg: curl
  - archive: https://example.com/myapp-{{version}}.tar.gz
    version: "2.0.0"
    files:
      - src: "*/myapp"
"#,
        overlay.display()
    );

    let metadata = fixture
        .deployer(&yaml)
        .deploy(&fixture.env.root, &info(""))
        .await
        .unwrap();

    let env = &fixture.env;
    assert_eq!(env.read("/usr/local/etc/myapp.conf"), "port=80\n");
    assert_eq!(env.read("/usr/local/bin/myapp"), "#!/bin/sh\n");
    assert!(!env.path("/usr/local/bin/README").exists());

    let root = env.root.logical().display().to_string();
    let programs: Vec<String> = fixture
        .runner
        .commands()
        .iter()
        .map(|command| command.program().to_string())
        .collect();
    assert_eq!(programs, vec!["pw", "pw", "pkg", "pkg", "ldconfig", "sh"]);

    let lines = fixture.runner.command_lines();
    assert_eq!(lines[0], format!("pw -R {root} groupadd -n myapp -g 1001"));
    assert_eq!(
        lines[1],
        format!("pw -R {root} useradd -n myapp -u 1001 -g myapp -d /nonexistent -s /sbin/nologin")
    );

    let script = fixture.runner.commands().pop().unwrap();
    assert_eq!(script.get_args(), ["-e"]);
    assert_eq!(script.get_current_dir(), Some(env.root.logical()));
    assert_eq!(script.get_stdin(), Some(&b"mkdir -p var/db/myapp\n"[..]));

    assert_eq!(metadata.base, "freebsd:runtime");
    assert_eq!(metadata.version.as_deref(), Some("8.6.0"));
    assert_eq!(metadata.entrypoint, vec!["/usr/local/bin/myapp", "--serve"]);
    assert_eq!(metadata.annotations, vec!["org.freebsd.pkg.curl.version=8.6.0"]);
    assert_eq!(metadata.user.as_deref(), Some("myapp:myapp"));
    assert_eq!(
        metadata.env.get("MYAPP_MODE").map(String::as_str),
        Some("production")
    );
    assert_eq!(fixture.fetcher.requests(), vec![APP_URL]);
}

#[tokio::test]
async fn test_entrypoint_inferred_from_first_asset() {
    let fixture = Fixture::new(RecordingRunner::new());
    let yaml = r#"
user: nobody
assets:
  - archive: https://example.com/myapp-{version}.tar.gz
    files:
      - src: "*/myapp"
"#;

    let metadata = fixture
        .deployer(yaml)
        .deploy(&fixture.env.root, &info("2.0.0"))
        .await
        .unwrap();

    assert_eq!(metadata.base, "freebsd:static");
    assert_eq!(metadata.version.as_deref(), Some("2.0.0"));
    assert_eq!(metadata.entrypoint, vec!["/usr/local/bin/myapp"]);
    assert_eq!(metadata.user.as_deref(), Some("nobody:nobody"));
    // no uid, no account
    assert!(fixture.runner.commands().is_empty());
}

#[tokio::test]
async fn test_failing_asset_reports_its_position() {
    let fixture = Fixture::new(RecordingRunner::new());
    let yaml = r#"
script: touch never
assets:
  - archive: https://example.com/myapp-{version}.tar.gz
    files:
      - src: "*/myapp"
  - file: https://example.com/missing
"#;

    let result = fixture
        .deployer(yaml)
        .deploy(&fixture.env.root, &info("2.0.0"))
        .await;

    match result {
        Err(DeployError::Asset { index, kind, .. }) => {
            assert_eq!(index, 1);
            assert_eq!(kind.as_str(), "file");
        }
        other => panic!("expected an asset failure, got {other:?}"),
    }
    assert!(fixture.runner.commands().is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn test_script_runs_in_root() {
    use asset_deploy::runner::LocalRunner;

    let env = TestEnvironment::new();
    let config = ContainerConfig::from_yaml_str(
        "script: |\n  mkdir -p var/db\n  echo ok > var/db/ready\nassets:\n  - file: https://example.com/tool\n",
    )
    .unwrap();
    let fetcher = StubFetcher::new().with("https://example.com/tool", b"tool".to_vec());

    let deployer = ContainerDeployer::new(
        config,
        Arc::new(LocalRunner::new()),
        Arc::new(fetcher),
        Arc::new(StubReleases::none()),
    );
    let metadata = deployer.deploy(&env.root, &info("1.0")).await.unwrap();

    assert_eq!(env.read("/var/db/ready"), "ok\n");
    assert_eq!(env.read("/usr/local/bin/tool"), "tool");
    assert_eq!(metadata.entrypoint, vec!["/usr/local/bin/tool"]);
}

#[cfg(unix)]
#[tokio::test]
async fn test_sbin_is_not_listable_after_assets() {
    let fixture = Fixture {
        env: TestEnvironment::new(),
        runner: Arc::new(RecordingRunner::new()),
        fetcher: Arc::new(StubFetcher::new().with(
            "https://example.com/daemon-1.0.tar.gz",
            tar_gz(&[
                Entry::Dir("daemon-1.0/sbin/"),
                Entry::File("daemon-1.0/sbin/daemond", b"bin", 0o755),
            ]),
        )),
    };
    let yaml = r#"
assets:
  - archive: https://example.com/daemon-{version}.tar.gz
    files:
      - src: "*/sbin/"
        dst: /usr/local/sbin/
"#;

    fixture
        .deployer(yaml)
        .deploy(&fixture.env.root, &info("1.0"))
        .await
        .unwrap();

    let sbin = fixture.env.path("/usr/local/sbin");
    assert_eq!(fixture.env.read("/usr/local/sbin/daemond"), "bin");
    assert_eq!(helpers::mode(&sbin), 0o711);
}
