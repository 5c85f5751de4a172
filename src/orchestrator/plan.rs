//! The release plan: four build steps, always in the same order.
//!
//! 1. `linux-default`   - `cargo build --release`, output relocated
//! 2. `linux-chinese`   - `cargo build --release --features zh-CN --no-default-features`, output relocated
//! 3. `package-default` - `cargo deb -o <file>`
//! 4. `package-chinese` - `cargo deb -o <file> -- --features zh-CN --no-default-features`

use crate::config::ReleaseConfig;
use crate::models::{artifact_filename, ArtifactKind, BuildStep, Variant, Version};

/// Step order of every release run.
pub const STEP_ORDER: [(ArtifactKind, Variant); 4] = [
    (ArtifactKind::Binary, Variant::Default),
    (ArtifactKind::Binary, Variant::ZhCn),
    (ArtifactKind::DebPackage, Variant::Default),
    (ArtifactKind::DebPackage, Variant::ZhCn),
];

/// Build the release plan for `version`.
pub fn release_plan(version: &Version, config: &ReleaseConfig) -> Vec<BuildStep> {
    STEP_ORDER
        .iter()
        .map(|&(kind, variant)| build_step(kind, variant, version, config))
        .collect()
}

fn build_step(
    kind: ArtifactKind,
    variant: Variant,
    version: &Version,
    config: &ReleaseConfig,
) -> BuildStep {
    let target_filename = artifact_filename(
        kind,
        variant,
        &config.binary_name,
        &config.locale_feature,
        version,
    );
    let features = variant.feature_args(&config.locale_feature);

    let (args, expected_output) = match kind {
        ArtifactKind::Binary => {
            let mut args = vec!["build".to_string(), "--release".to_string()];
            args.extend(features);
            (args, Some(config.release_output()))
        }
        ArtifactKind::DebPackage => {
            let mut args = vec![
                "deb".to_string(),
                "-o".to_string(),
                target_filename.clone(),
            ];
            // cargo-deb forwards everything after `--` to its cargo build
            if !features.is_empty() {
                args.push("--".to_string());
                args.extend(features);
            }
            (args, None)
        }
    };

    BuildStep {
        variant,
        kind,
        program: config.cargo.clone(),
        args,
        expected_output,
        target_filename,
    }
}
