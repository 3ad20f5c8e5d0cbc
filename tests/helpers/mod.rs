//! Shared fixtures for integration tests
#![allow(dead_code)]

use asset_deploy::assets::DeployContext;
use asset_deploy::net::{FetchError, Fetcher};
use asset_deploy::runner::{CapturedOutput, Command, CommandRunner, Result as RunnerResult};
use asset_deploy::version::{
    Release, ReleaseFile, ReleaseRef, ReleaseResolver, Result as VersionResult, VersionError,
};
use asset_deploy::{ContainerInfo, DeployRoot};
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::TempDir;

/// Serves canned bodies by URL, 404 for everything else.
#[derive(Default)]
pub struct StubFetcher {
    bodies: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<String>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.bodies.insert(url.to_string(), body.into());
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());
        self.bodies.get(url).cloned().ok_or_else(|| FetchError::Status {
            url: url.to_string(),
            status: 404,
        })
    }
}

/// Records commands instead of running them. `output` answers with the
/// stdout registered for "<program> <first arg>".
#[derive(Default)]
pub struct RecordingRunner {
    commands: Mutex<Vec<Command>>,
    outputs: HashMap<String, String>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output(mut self, key: &str, stdout: &str) -> Self {
        self.outputs.insert(key.to_string(), stdout.to_string());
        self
    }

    pub fn commands(&self) -> Vec<Command> {
        self.commands.lock().unwrap().clone()
    }

    pub fn command_lines(&self) -> Vec<String> {
        self.commands().iter().map(ToString::to_string).collect()
    }

    fn key(command: &Command) -> String {
        match command.get_args().first() {
            Some(arg) => format!("{} {arg}", command.program()),
            None => command.program().to_string(),
        }
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn run(&self, command: &Command) -> RunnerResult<()> {
        self.commands.lock().unwrap().push(command.clone());
        Ok(())
    }

    async fn output(&self, command: &Command) -> RunnerResult<CapturedOutput> {
        self.commands.lock().unwrap().push(command.clone());
        Ok(CapturedOutput::new(
            self.outputs.get(&Self::key(command)).cloned().unwrap_or_default(),
        ))
    }
}

/// Answers every lookup with one fixed release.
pub struct StubReleases {
    release: Release,
    version: String,
    lookups: Mutex<Vec<ReleaseRef>>,
}

impl StubReleases {
    pub fn new(tag: &str, version: &str, files: &[(&str, &str)]) -> Self {
        Self {
            release: Release {
                tag_name: tag.to_string(),
                assets: files
                    .iter()
                    .map(|(name, url)| ReleaseFile {
                        name: name.to_string(),
                        browser_download_url: url.to_string(),
                    })
                    .collect(),
                ..Release::default()
            },
            version: version.to_string(),
            lookups: Mutex::new(Vec::new()),
        }
    }

    pub fn none() -> Self {
        Self::new("", "", &[])
    }

    pub fn lookups(&self) -> Vec<ReleaseRef> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReleaseResolver for StubReleases {
    async fn release_version(&self, reference: &ReleaseRef) -> VersionResult<(Release, String)> {
        self.lookups.lock().unwrap().push(reference.clone());
        if self.release.tag_name.is_empty() {
            return Err(VersionError::NoMatchingRelease {
                repo: reference.repo.clone(),
                matcher: reference.matcher.clone().unwrap_or_default(),
            });
        }
        Ok((self.release.clone(), self.version.clone()))
    }
}

/// A temporary deployment root
pub struct TestEnvironment {
    temp: TempDir,
    pub root: DeployRoot,
}

impl TestEnvironment {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let mount = temp.path().join("root");
        std::fs::create_dir_all(&mount).unwrap();
        Self {
            root: DeployRoot::new(mount),
            temp,
        }
    }

    /// Scratch path outside the root
    pub fn scratch(&self, name: &str) -> PathBuf {
        self.temp.path().join(name)
    }

    /// Host path of an in-target path
    pub fn path(&self, target: &str) -> PathBuf {
        self.root.host_path(target)
    }

    pub fn read(&self, target: &str) -> String {
        std::fs::read_to_string(self.path(target)).unwrap()
    }

    pub fn context<'a>(
        &'a self,
        runner: &'a dyn CommandRunner,
        fetcher: &'a dyn Fetcher,
        releases: &'a dyn ReleaseResolver,
    ) -> DeployContext<'a> {
        DeployContext {
            runner,
            fetcher,
            releases,
            root: &self.root,
        }
    }

    /// Every file below the mount, as in-target paths
    pub fn files(&self) -> Vec<String> {
        let mut files: Vec<String> = walkdir::WalkDir::new(self.root.mount())
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| !entry.file_type().is_dir())
            .map(|entry| {
                let relative = entry.path().strip_prefix(self.root.mount()).unwrap();
                format!("/{}", relative.display())
            })
            .collect();
        files.sort();
        files
    }
}

pub fn info(version: &str) -> ContainerInfo {
    ContainerInfo::new("myapp", "myapp", "14.2", "amd64").with_version(version)
}

/// Entries for the archive builders
pub enum Entry<'a> {
    File(&'a str, &'a [u8], u32),
    Dir(&'a str),
    /// Name written verbatim into the header, bypassing path checks
    Raw(&'a str, &'a [u8]),
}

pub fn tar(entries: &[Entry]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());

    for entry in entries {
        let mut header = tar::Header::new_gnu();
        match entry {
            Entry::File(name, data, mode) => {
                header.set_entry_type(tar::EntryType::Regular);
                header.set_mode(*mode);
                header.set_size(data.len() as u64);
                builder.append_data(&mut header, name, *data).unwrap();
            }
            Entry::Dir(name) => {
                header.set_entry_type(tar::EntryType::Directory);
                header.set_mode(0o755);
                header.set_size(0);
                builder
                    .append_data(&mut header, name, std::io::empty())
                    .unwrap();
            }
            Entry::Raw(name, data) => {
                let gnu = header.as_gnu_mut().unwrap();
                gnu.name[..name.len()].copy_from_slice(name.as_bytes());
                header.set_entry_type(tar::EntryType::Regular);
                header.set_mode(0o644);
                header.set_size(data.len() as u64);
                header.set_cksum();
                builder.append(&header, *data).unwrap();
            }
        }
    }

    builder.into_inner().unwrap()
}

pub fn tar_gz(entries: &[Entry]) -> Vec<u8> {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(&tar(entries)).unwrap();
    encoder.finish().unwrap()
}

pub fn zip(entries: &[(&str, &[u8], u32)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data, mode) in entries {
        let options = zip::write::SimpleFileOptions::default().unix_permissions(*mode);
        writer.start_file(*name, options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

#[cfg(unix)]
pub fn mode(path: &std::path::Path) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path).unwrap().permissions().mode() & 0o7777
}
