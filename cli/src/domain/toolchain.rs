//! Toolchain requirements and probe classification.
//!
//! Pure functions only, no I/O, no async. Probing itself lives in
//! `application::services::toolchain`.

use std::sync::LazyLock;

use agentify_common::BuildTarget;
use regex::Regex;
use semver::Version;
use serde::Serialize;

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    // Safety: this is a compile-time constant pattern, cannot fail.
    #[allow(clippy::expect_used)]
    Regex::new(r"(\d+)\.(\d+)(?:\.(\d+))?").expect("valid regex")
});

/// Host package managers the installer knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Apt,
    Dnf,
    Brew,
}

impl PackageManager {
    /// Probe order when looking for a usable manager.
    pub const ALL: [Self; 3] = [Self::Apt, Self::Dnf, Self::Brew];

    #[must_use]
    pub fn program(self) -> &'static str {
        match self {
            Self::Apt => "apt-get",
            Self::Dnf => "dnf",
            Self::Brew => "brew",
        }
    }

    /// Arguments that install `package` non-interactively.
    #[must_use]
    pub fn install_args(self, package: &str) -> Vec<String> {
        let args: &[&str] = match self {
            Self::Apt => &["install", "-y", "--no-install-recommends"],
            Self::Dnf => &["install", "-y"],
            Self::Brew => &["install"],
        };
        args.iter()
            .map(ToString::to_string)
            .chain(std::iter::once(package.to_string()))
            .collect()
    }
}

/// One external tool a build target depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolRequirement {
    pub name: String,
    pub program: String,
    pub version_args: Vec<String>,
    /// Lowest accepted version; `None` accepts any version that runs.
    pub min_version: Option<Version>,
    pub targets: Vec<BuildTarget>,
    /// Package names per manager: apt, dnf, brew.
    pub packages: [String; 3],
}

impl ToolRequirement {
    #[must_use]
    pub fn required_for(&self, target: BuildTarget) -> bool {
        self.targets.contains(&target)
    }

    #[must_use]
    pub fn package_for(&self, manager: PackageManager) -> &str {
        match manager {
            PackageManager::Apt => &self.packages[0],
            PackageManager::Dnf => &self.packages[1],
            PackageManager::Brew => &self.packages[2],
        }
    }
}

/// Ordered list of tool requirements.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ToolchainCatalog {
    tools: Vec<ToolRequirement>,
}

impl ToolchainCatalog {
    /// `cargo`, `rustc` and `cc` for native modules; `python3` for bytecode.
    #[must_use]
    pub fn builtin() -> Self {
        let native = vec![BuildTarget::NativeModule];
        Self {
            tools: vec![
                requirement(
                    "cargo",
                    "--version",
                    Some(Version::new(1, 70, 0)),
                    &native,
                    ["cargo", "cargo", "rust"],
                ),
                requirement(
                    "rustc",
                    "--version",
                    Some(Version::new(1, 70, 0)),
                    &native,
                    ["rustc", "rust", "rust"],
                ),
                requirement("cc", "--version", None, &native, ["gcc", "gcc", "gcc"]),
                requirement(
                    "python3",
                    "--version",
                    Some(Version::new(3, 8, 0)),
                    &[BuildTarget::BytecodeModule],
                    ["python3", "python3", "python@3"],
                ),
            ],
        }
    }

    #[must_use]
    pub fn new(tools: Vec<ToolRequirement>) -> Self {
        Self { tools }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolRequirement> {
        self.tools.iter()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ToolRequirement> {
        self.tools.iter().find(|t| t.name == name)
    }

    /// Requirements of `target`, in catalog order.
    pub fn required_for(&self, target: BuildTarget) -> impl Iterator<Item = &ToolRequirement> {
        self.tools.iter().filter(move |t| t.required_for(target))
    }
}

fn requirement(
    name: &str,
    version_arg: &str,
    min_version: Option<Version>,
    targets: &[BuildTarget],
    packages: [&str; 3],
) -> ToolRequirement {
    ToolRequirement {
        name: name.to_string(),
        program: name.to_string(),
        version_args: vec![version_arg.to_string()],
        min_version,
        targets: targets.to_vec(),
        packages: packages.map(ToString::to_string),
    }
}

/// Availability of one tool at probe time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolchainStatus {
    pub name: String,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Why the tool is unavailable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ToolchainStatus {
    #[must_use]
    pub fn unavailable(name: &str, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            available: false,
            version: None,
            detail: Some(detail.into()),
        }
    }
}

/// Extract the first `major.minor[.patch]` version from tool output.
///
/// `"rustc 1.75.0 (82e1608df 2023-12-21)"` → `1.75.0`,
/// `"Python 3.12"` → `3.12.0`.
#[must_use]
pub fn parse_version(output: &str) -> Option<Version> {
    let caps = VERSION_RE.captures(output)?;
    let part = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u64>().ok());
    Some(Version::new(part(1)?, part(2)?, part(3).unwrap_or(0)))
}

/// Classify a finished version probe.
///
/// A non-zero exit is unavailable; so is a version below the minimum, or an
/// unparseable version when a minimum is set.
#[must_use]
pub fn classify_probe(req: &ToolRequirement, success: bool, output: &str) -> ToolchainStatus {
    if !success {
        return ToolchainStatus::unavailable(
            &req.name,
            format!("{} exited with an error", req.program),
        );
    }
    let version = parse_version(output);
    match (&req.min_version, &version) {
        (Some(min), None) => ToolchainStatus::unavailable(
            &req.name,
            format!("cannot determine version (need >= {min})"),
        ),
        (Some(min), Some(found)) if found < min => ToolchainStatus {
            name: req.name.clone(),
            available: false,
            version: Some(found.to_string()),
            detail: Some(format!("version {found} is older than {min}")),
        },
        _ => ToolchainStatus {
            name: req.name.clone(),
            available: true,
            version: version.map(|v| v.to_string()),
            detail: None,
        },
    }
}

/// Tools required by `target` that `statuses` does not report as available.
///
/// A requirement with no status at all counts as missing.
#[must_use]
pub fn missing_for(
    catalog: &ToolchainCatalog,
    statuses: &[ToolchainStatus],
    target: BuildTarget,
) -> Vec<String> {
    catalog
        .required_for(target)
        .filter(|req| !statuses.iter().any(|s| s.name == req.name && s.available))
        .map(|req| req.name.clone())
        .collect()
}
