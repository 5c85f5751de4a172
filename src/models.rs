//! Core data types for the dcli release builder.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Target triple baked into raw binary artifact names.
pub const TARGET_TRIPLE: &str = "x86_64-unknown-linux-gnu";

/// Debian architecture baked into package artifact names.
pub const DEB_ARCH: &str = "amd64";

/// Release version as typed by the invoker.
///
/// Opaque: it is only ever interpolated into artifact filenames.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version(String);

impl Version {
    pub fn new(raw: impl Into<String>) -> Self {
        Version(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Version {
    fn from(raw: String) -> Self {
        Version(raw)
    }
}

impl From<&str> for Version {
    fn from(raw: &str) -> Self {
        Version(raw.to_string())
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Locale variant compiled into the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Variant {
    /// Default feature set
    Default,
    /// Chinese locale: locale feature enabled, default features disabled
    ZhCn,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Default => "default",
            Variant::ZhCn => "chinese",
        }
    }

    /// Cargo feature flags selecting this variant.
    pub fn feature_args(&self, locale_feature: &str) -> Vec<String> {
        match self {
            Variant::Default => Vec::new(),
            Variant::ZhCn => vec![
                "--features".to_string(),
                locale_feature.to_string(),
                "--no-default-features".to_string(),
            ],
        }
    }
}

/// Distribution form of an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactKind {
    /// Raw executable relocated from the compiler's output directory
    Binary,
    /// Debian package written directly by the packaging tool
    DebPackage,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Binary => "linux",
            ArtifactKind::DebPackage => "package",
        }
    }
}

/// Artifact filename for a variant and distribution form.
///
/// `binary_name` is the crate's binary (`dcli`), `locale_feature` the cargo
/// feature behind the Chinese variant (`zh-CN`).
pub fn artifact_filename(
    kind: ArtifactKind,
    variant: Variant,
    binary_name: &str,
    locale_feature: &str,
    version: &Version,
) -> String {
    match (kind, variant) {
        (ArtifactKind::Binary, Variant::Default) => {
            format!("{}_{}-{}", binary_name, version, TARGET_TRIPLE)
        }
        (ArtifactKind::Binary, Variant::ZhCn) => {
            format!("{}-{}_{}-{}", binary_name, locale_feature, version, TARGET_TRIPLE)
        }
        (ArtifactKind::DebPackage, Variant::Default) => {
            format!("{}_{}_{}.deb", binary_name, version, DEB_ARCH)
        }
        (ArtifactKind::DebPackage, Variant::ZhCn) => format!(
            "{}_{}_{}_{}.deb",
            binary_name,
            locale_feature.replace('-', "_"),
            version,
            DEB_ARCH
        ),
    }
}

/// One build action: a fixed external command plus where its artifact lands.
///
/// Paths are relative to the workspace directory the command runs in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStep {
    pub variant: Variant,
    pub kind: ArtifactKind,
    pub program: String,
    pub args: Vec<String>,
    /// Where the toolchain leaves its output; `None` when it writes the
    /// artifact itself.
    pub expected_output: Option<PathBuf>,
    pub target_filename: String,
}

impl BuildStep {
    /// Stable step name, e.g. `linux-default` or `package-chinese`.
    pub fn name(&self) -> String {
        format!("{}-{}", self.kind.as_str(), self.variant.as_str())
    }

    /// Command line as it would be typed in a shell.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Whether the toolchain output has to be moved after the command.
    pub fn needs_relocation(&self) -> bool {
        self.expected_output.is_some()
    }

    pub fn target_path(&self, workspace: &Path) -> PathBuf {
        workspace.join(&self.target_filename)
    }
}
