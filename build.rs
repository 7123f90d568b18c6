fn main() {
    set_git_revision_hash();
}

/// Expose the short git revision to the crate as `CRYOS_BUILD_GIT_HASH`
/// so reports can name the exact build that produced them.
fn set_git_revision_hash() {
    use std::process::Command;

    let args = &["rev-parse", "--short=10", "HEAD"];
    let Ok(output) = Command::new("git").args(args).output() else { return };
    if !output.status.success() {
        return;
    }
    let rev = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if rev.is_empty() {
        return;
    }
    println!("cargo:rustc-env=CRYOS_BUILD_GIT_HASH={}", rev);
}
