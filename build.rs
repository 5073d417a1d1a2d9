use std::env;
use std::process::Command;

const VERSION_VAR: &str = "RHTTP_VERSION";

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/tags");
    println!("cargo:rerun-if-env-changed={}", VERSION_VAR);

    // packagers can pin the version without a git checkout
    let version = env::var(VERSION_VAR)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(version_from_tag)
        .unwrap_or_else(|| {
            let pkg = env!("CARGO_PKG_VERSION");
            match short_commit() {
                Some(commit) => format!("{}+g{}", pkg, commit),
                None => pkg.to_string(),
            }
        });

    println!("cargo:rustc-env={}={}", VERSION_VAR, version);
}

/// Version from the nearest `v*` tag, e.g. `v1.2.0-3-gabc1234` -> `1.2.0-3-gabc1234`.
fn version_from_tag() -> Option<String> {
    let described = git(&["describe", "--tags", "--match", "v[0-9]*", "--dirty=+dirty"])?;
    described.strip_prefix('v').map(str::to_string)
}

fn short_commit() -> Option<String> {
    git(&["rev-parse", "--short", "HEAD"])
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}
