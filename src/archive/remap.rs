//! Mapping of archive entries onto destinations under the deployment root
//!
//! A [`PathRemapper`] is fed every entry of one archive in stream order and
//! answers with a [`Decision`]. It carries the extraction state for that
//! archive: which path each rule already matched, and which matched
//! directories now cover their descendants.

use super::{ArchiveError, Result};
use crate::types::ContainerInfo;
use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

pub const DEFAULT_DESTINATION: &str = "/usr/local/bin/";

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

fn default_destination() -> String {
    DEFAULT_DESTINATION.to_string()
}

/// A `src` glob to `dst` template pair.
///
/// A trailing `/` on `src` makes it a directory rule: the matched directory
/// and everything below it lands in `dst`. Without it the rule matches a
/// single file, which is placed at `dst`, or inside it when `dst` ends in
/// `/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MappingRule {
    pub src: String,
    #[serde(default = "default_destination")]
    pub dst: String,
}

impl MappingRule {
    pub fn new(src: impl Into<String>, dst: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            dst: dst.into(),
        }
    }

    pub fn is_directory(&self) -> bool {
        self.src.ends_with('/')
    }

    /// Check that the source glob compiles
    pub fn validate(&self) -> Result<()> {
        compile(self.src.trim_end_matches('/')).map(|_| ())
    }
}

/// What to do with one archive entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Materialize the entry at this absolute in-target path
    Extract(String),
    Skip,
    /// Skip the entry and everything below it
    SkipTree,
}

enum Outcome {
    Destination(String),
    Conflict,
    NoMatch,
}

enum Segment {
    AnyDepth,
    Glob(Pattern),
    Opaque,
}

struct CompiledRule {
    src: String,
    pattern: Pattern,
    segments: Vec<Segment>,
    directory: bool,
    template: String,
}

impl CompiledRule {
    fn new(rule: &MappingRule, info: &ContainerInfo) -> Result<Self> {
        let src = info.apply(&rule.src);
        let glob = src.trim_end_matches('/');
        let segments = glob
            .split('/')
            .map(|segment| match segment {
                "**" => Segment::AnyDepth,
                other => Pattern::new(other)
                    .map(Segment::Glob)
                    .unwrap_or(Segment::Opaque),
            })
            .collect();

        Ok(Self {
            pattern: compile(glob)?,
            segments,
            directory: src.ends_with('/'),
            src,
            template: expand_destination(&rule.dst, info)?,
        })
    }

    /// Whether some path strictly below `dir` could match this rule.
    fn may_match_below(&self, dir: &[&str]) -> bool {
        for (index, component) in dir.iter().enumerate() {
            match self.segments.get(index) {
                None => return false,
                Some(Segment::AnyDepth) | Some(Segment::Opaque) => return true,
                Some(Segment::Glob(pattern)) => {
                    if !pattern.matches_with(component, MATCH_OPTIONS) {
                        return false;
                    }
                }
            }
        }

        self.segments.len() > dir.len()
    }
}

fn compile(glob: &str) -> Result<Pattern> {
    Pattern::new(glob).map_err(|source| ArchiveError::InvalidPattern {
        pattern: glob.to_string(),
        source,
    })
}

/// Expand a destination template, which must yield an absolute path.
pub fn expand_destination(template: &str, info: &ContainerInfo) -> Result<String> {
    let resolved = info.apply(template);
    if resolved.starts_with('/') {
        Ok(resolved)
    } else {
        Err(ArchiveError::RelativeDestination {
            template: template.to_string(),
            resolved,
        })
    }
}

/// Destination of a single file: `dst` itself, or `dst` + the file's base
/// name when `dst` ends in `/`.
pub fn file_destination(name: &str, dst: &str) -> String {
    if dst.ends_with('/') {
        format!("{dst}{}", base_name(name))
    } else {
        dst.to_string()
    }
}

fn directory_destination(dst: &str) -> String {
    match dst.trim_end_matches('/') {
        "" => "/".to_string(),
        trimmed => trimmed.to_string(),
    }
}

fn base_name(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

fn parent(name: &str) -> Option<&str> {
    name.rfind('/').map(|index| &name[..index])
}

/// `name`, then each of its ancestors, nearest first
fn ancestors(name: &str) -> impl Iterator<Item = &str> {
    std::iter::successors(Some(name), |path| parent(path))
}

fn remainder<'a>(name: &'a str, ancestor: &str) -> &'a str {
    if name.len() == ancestor.len() {
        ""
    } else {
        &name[ancestor.len() + 1..]
    }
}

fn join(dst: &str, rest: &str) -> String {
    if rest.is_empty() {
        dst.to_string()
    } else {
        format!("{}/{rest}", dst.trim_end_matches('/'))
    }
}

/// Lexically clean an archive entry name.
///
/// Returns `None` for names that are empty, absolute, or climb above the
/// archive root.
pub fn clean_entry_name(raw: &str) -> Option<String> {
    if raw.starts_with('/') {
        return None;
    }

    let mut parts: Vec<&str> = Vec::new();
    for part in raw.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

pub struct PathRemapper {
    source: String,
    rules: Vec<CompiledRule>,
    /// rule index -> source path it matched
    matched: HashMap<usize, String>,
    /// matched directory -> its destination
    dirs: HashMap<String, String>,
    skipped: Vec<String>,
    entrypoint: Option<String>,
}

impl PathRemapper {
    /// Compile `rules` for one archive named `source`.
    ///
    /// Source patterns and destination templates are expanded against `info`
    /// up front, so a relative destination fails before anything is written.
    pub fn new(source: impl Into<String>, rules: &[MappingRule], info: &ContainerInfo) -> Result<Self> {
        let rules = rules
            .iter()
            .map(|rule| CompiledRule::new(rule, info))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            source: source.into(),
            rules,
            matched: HashMap::new(),
            dirs: HashMap::new(),
            skipped: Vec::new(),
            entrypoint: None,
        })
    }

    /// Entrypoint inferred from an executable matched by the first rule
    pub fn inferred_entrypoint(&self) -> Option<&str> {
        self.entrypoint.as_deref()
    }

    pub fn into_entrypoint(self) -> Option<String> {
        self.entrypoint
    }

    /// Directories matched so far and where they landed
    pub fn directory_mappings(&self) -> &HashMap<String, String> {
        &self.dirs
    }

    /// Decide where an entry goes. `mode` carries the entry's permission bits.
    pub fn decide(&mut self, raw_name: &str, is_dir: bool, mode: u32) -> Decision {
        let Some(name) = clean_entry_name(raw_name) else {
            warn!("Ignoring unsafe path in {}: {:?}", self.source, raw_name);
            return Decision::Skip;
        };

        if self.in_skipped_tree(&name) {
            return Decision::Skip;
        }

        if let Some(dst) = self.inherited(&name) {
            return Decision::Extract(dst);
        }

        match self.evaluate(&name, is_dir, mode) {
            Outcome::Destination(dst) => Decision::Extract(dst),
            Outcome::Conflict => Decision::Skip,
            Outcome::NoMatch => {
                debug!("Skipping {name:?}");
                if is_dir && !self.may_match_below(&name) {
                    self.skipped.push(name);
                    Decision::SkipTree
                } else {
                    Decision::Skip
                }
            }
        }
    }

    fn in_skipped_tree(&self, name: &str) -> bool {
        self.skipped.iter().any(|dir| {
            name.starts_with(dir.as_str()) && name.as_bytes().get(dir.len()) == Some(&b'/')
        })
    }

    fn inherited(&self, name: &str) -> Option<String> {
        ancestors(name).find_map(|src| {
            self.dirs
                .get(src)
                .map(|dst| join(dst, remainder(name, src)))
        })
    }

    fn may_match_below(&self, dir: &str) -> bool {
        let components: Vec<&str> = dir.split('/').collect();
        self.rules
            .iter()
            .any(|rule| rule.may_match_below(&components))
    }

    fn evaluate(&mut self, name: &str, is_dir: bool, mode: u32) -> Outcome {
        for (index, rule) in self.rules.iter().enumerate() {
            if rule.directory {
                let start = if is_dir { Some(name) } else { parent(name) };
                let Some(src) = start
                    .into_iter()
                    .flat_map(ancestors)
                    .find(|candidate| rule.pattern.matches_with(candidate, MATCH_OPTIONS))
                else {
                    continue;
                };

                match self.matched.get(&index) {
                    Some(existing) if existing != src => {
                        warn!(
                            "Ignoring duplicate matches in {}: {:?} -> {:?}, {:?}",
                            self.source, rule.src, existing, src
                        );
                        return Outcome::Conflict;
                    }
                    Some(_) => {}
                    None => {
                        self.matched.insert(index, src.to_string());
                    }
                }

                let dst = directory_destination(&rule.template);
                self.dirs.insert(src.to_string(), dst.clone());
                return Outcome::Destination(join(&dst, remainder(name, src)));
            }

            if is_dir || !rule.pattern.matches_with(name, MATCH_OPTIONS) {
                continue;
            }

            match self.matched.get(&index) {
                Some(existing) if existing != name => {
                    warn!(
                        "Ignoring duplicate matches in {}: {:?} -> {:?}, {:?}",
                        self.source, rule.src, existing, name
                    );
                    return Outcome::Conflict;
                }
                Some(_) => {}
                None => {
                    self.matched.insert(index, name.to_string());
                }
            }

            let dst = file_destination(name, &rule.template);
            if index == 0 && mode & 0o111 != 0 && self.entrypoint.is_none() {
                self.entrypoint = Some(dst.clone());
            }
            return Outcome::Destination(dst);
        }

        Outcome::NoMatch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn info() -> ContainerInfo {
        ContainerInfo::new("myapp", "myapp", "14.2", "amd64").with_version("1.0")
    }

    fn remapper(rules: &[(&str, &str)]) -> PathRemapper {
        let rules: Vec<MappingRule> = rules
            .iter()
            .map(|(src, dst)| MappingRule::new(*src, *dst))
            .collect();
        PathRemapper::new("test.tar.gz", &rules, &info()).unwrap()
    }

    fn extract(dst: &str) -> Decision {
        Decision::Extract(dst.to_string())
    }

    #[test]
    fn test_clean_entry_name() {
        assert_eq!(clean_entry_name("./bin/app").as_deref(), Some("bin/app"));
        assert_eq!(clean_entry_name("share/").as_deref(), Some("share"));
        assert_eq!(clean_entry_name("a/../b").as_deref(), Some("b"));
        assert_eq!(clean_entry_name("a/../../b"), None);
        assert_eq!(clean_entry_name("../../etc/passwd"), None);
        assert_eq!(clean_entry_name("/etc/passwd"), None);
        assert_eq!(clean_entry_name("./"), None);
        assert_eq!(clean_entry_name(""), None);
    }

    #[test]
    fn test_file_rule_into_directory() {
        let mut remapper = remapper(&[("bin/app", "/usr/local/bin/")]);

        assert_eq!(remapper.decide("bin/app", false, 0o755), extract("/usr/local/bin/app"));
        assert_eq!(remapper.inferred_entrypoint(), Some("/usr/local/bin/app"));
    }

    #[test]
    fn test_file_rule_exact_destination_with_placeholders() {
        let mut remapper = remapper(&[("**/LICENSE", "/usr/local/share/licenses/{project}/LICENSE")]);

        assert_eq!(
            remapper.decide("myapp-1.0/LICENSE", false, 0o644),
            extract("/usr/local/share/licenses/myapp/LICENSE")
        );
        assert_eq!(remapper.inferred_entrypoint(), None);
    }

    #[test]
    fn test_directory_rule_covers_descendants() {
        let mut remapper = remapper(&[("share/", "/usr/local/share/myapp/")]);

        assert_eq!(
            remapper.decide("share/doc/readme.txt", false, 0o644),
            extract("/usr/local/share/myapp/doc/readme.txt")
        );
        assert_eq!(
            remapper.directory_mappings().get("share").map(String::as_str),
            Some("/usr/local/share/myapp")
        );
        assert_eq!(remapper.inferred_entrypoint(), None);
    }

    #[test]
    fn test_directory_entry_matches_itself() {
        let mut remapper = remapper(&[("**/lib/", "/usr/local/lib/")]);

        assert_eq!(remapper.decide("pkg-1.0/", true, 0o755), Decision::Skip);
        assert_eq!(remapper.decide("pkg-1.0/lib/", true, 0o755), extract("/usr/local/lib"));
        assert_eq!(
            remapper.decide("pkg-1.0/lib/libfoo.so.1", false, 0o644),
            extract("/usr/local/lib/libfoo.so.1")
        );
    }

    #[test]
    fn test_inherited_directory_wins_over_later_rules() {
        let mut remapper = remapper(&[("share/", "/opt/share/"), ("share/x.txt", "/elsewhere/")]);

        assert_eq!(remapper.decide("share/a.txt", false, 0o644), extract("/opt/share/a.txt"));
        assert_eq!(remapper.decide("share/x.txt", false, 0o644), extract("/opt/share/x.txt"));
    }

    #[test]
    fn test_unmatched_file_is_skipped() {
        let mut remapper = remapper(&[("bin/app", "/usr/local/bin/")]);

        assert_eq!(remapper.decide("README.md", false, 0o644), Decision::Skip);
        assert_eq!(remapper.decide("bin/other", false, 0o755), Decision::Skip);
        assert_eq!(remapper.inferred_entrypoint(), None);
    }

    #[test]
    fn test_unmatched_directory_skips_subtree_only_when_nothing_can_match() {
        let mut remapper = remapper(&[("bin/app", "/usr/local/bin/")]);

        assert_eq!(remapper.decide("bin/", true, 0o755), Decision::Skip);
        assert_eq!(remapper.decide("docs/", true, 0o755), Decision::SkipTree);
        assert_eq!(remapper.decide("docs/bin/app", false, 0o755), Decision::Skip);
        assert_eq!(remapper.decide("bin/app", false, 0o755), extract("/usr/local/bin/app"));
    }

    #[test]
    fn test_recursive_glob_never_skips_subtrees() {
        let mut remapper = remapper(&[("**/app", "/usr/local/bin/")]);

        assert_eq!(remapper.decide("app-1.0/", true, 0o755), Decision::Skip);
        assert_eq!(
            remapper.decide("app-1.0/target/app", false, 0o755),
            extract("/usr/local/bin/app")
        );
    }

    #[test]
    fn test_duplicate_file_match_is_skipped() {
        let mut remapper = remapper(&[("**/app", "/usr/local/bin/")]);

        assert_eq!(remapper.decide("a/app", false, 0o755), extract("/usr/local/bin/app"));
        assert_eq!(remapper.decide("b/app", false, 0o755), Decision::Skip);
        // the same name again maps to the same place
        assert_eq!(remapper.decide("a/app", false, 0o755), extract("/usr/local/bin/app"));
    }

    #[test]
    fn test_duplicate_directory_match_is_skipped() {
        let mut remapper = remapper(&[("**/lib/", "/usr/local/lib/")]);

        assert_eq!(remapper.decide("a/lib/x.so", false, 0o644), extract("/usr/local/lib/x.so"));
        assert_eq!(remapper.decide("b/lib/y.so", false, 0o644), Decision::Skip);
        assert_eq!(remapper.decide("a/lib/z.so", false, 0o644), extract("/usr/local/lib/z.so"));
    }

    #[test]
    fn test_entrypoint_only_from_first_rule_and_executables() {
        let mut remapper = remapper(&[
            ("bin/app", "/usr/local/bin/"),
            ("bin/helper", "/usr/local/bin/"),
        ]);

        assert_eq!(
            remapper.decide("bin/helper", false, 0o755),
            extract("/usr/local/bin/helper")
        );
        assert_eq!(remapper.inferred_entrypoint(), None);

        assert_eq!(remapper.decide("bin/app", false, 0o644), extract("/usr/local/bin/app"));
        assert_eq!(remapper.inferred_entrypoint(), None);

        let mut owner_only = self::remapper(&[("**/app*", "/usr/local/bin/")]);
        owner_only.decide("x/app", false, 0o700);
        assert_eq!(owner_only.into_entrypoint().as_deref(), Some("/usr/local/bin/app"));
    }

    #[test]
    fn test_unsafe_names_are_rejected() {
        let mut remapper = remapper(&[("**/passwd", "/etc/"), ("**/", "/")]);

        assert_eq!(remapper.decide("../../etc/passwd", false, 0o644), Decision::Skip);
        assert_eq!(remapper.decide("/etc/passwd", false, 0o644), Decision::Skip);
        assert_eq!(remapper.decide(".", true, 0o755), Decision::Skip);
    }

    #[test]
    fn test_relative_destination_is_an_error() {
        let rules = vec![MappingRule::new("bin/app", "{project}/bin/")];
        let result = PathRemapper::new("x.tar", &rules, &info());

        match result {
            Err(ArchiveError::RelativeDestination { resolved, .. }) => {
                assert_eq!(resolved, "myapp/bin/")
            }
            _ => panic!("expected a relative destination error"),
        }
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        let rule = MappingRule::new("bin/[app", "/usr/local/bin/");
        assert!(matches!(rule.validate(), Err(ArchiveError::InvalidPattern { .. })));
        assert!(PathRemapper::new("x.tar", &[rule], &info()).is_err());
    }

    #[test]
    fn test_source_patterns_are_expanded() {
        let mut remapper = remapper(&[("**/{package}", "/usr/local/bin/")]);

        assert_eq!(
            remapper.decide("myapp-1.0/myapp", false, 0o755),
            extract("/usr/local/bin/myapp")
        );
        assert_eq!(remapper.decide("myapp-1.0/other", false, 0o755), Decision::Skip);
    }

    #[test]
    fn test_file_destination() {
        assert_eq!(file_destination("a/b/tool", "/usr/local/bin/"), "/usr/local/bin/tool");
        assert_eq!(file_destination("a/b/tool", "/usr/local/bin/t"), "/usr/local/bin/t");
    }

    proptest! {
        #[test]
        fn test_escaping_names_never_extract(
            depth in 1usize..4,
            tail in "[a-z]{1,8}(/[a-z]{1,8}){0,2}",
            absolute in any::<bool>(),
        ) {
            let name = if absolute {
                format!("/{tail}")
            } else {
                format!("{}{tail}", "../".repeat(depth))
            };
            let mut remapper = remapper(&[("**/", "/"), ("**", "/usr/")]);

            prop_assert_eq!(remapper.decide(&name, false, 0o755), Decision::Skip);
            prop_assert_eq!(remapper.decide(&name, true, 0o755), Decision::Skip);
        }

        #[test]
        fn test_unmatched_names_never_extract(name in "[a-z]{1,6}(/[a-z]{1,6}){0,3}") {
            let mut remapper = remapper(&[("bin/APP", "/usr/local/bin/"), ("SHARE/", "/opt/")]);

            prop_assert!(!matches!(remapper.decide(&name, false, 0o644), Decision::Extract(_)));
        }
    }
}
