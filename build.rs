use std::env;
use std::process::Command;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-env-changed=LOGSNAP_GIT_HASH");

    // An explicit hash wins (release pipelines build from tarballs without .git)
    let hash = match env::var("LOGSNAP_GIT_HASH") {
        Ok(hash) if !hash.is_empty() => Some(hash),
        _ => git_short_hash(),
    };

    if let Some(hash) = hash {
        println!("cargo:rustc-env=LOGSNAP_GIT_HASH={hash}");
    }

    Ok(())
}

fn git_short_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let hash = String::from_utf8(output.stdout).ok()?;
    let hash = hash.trim();
    if hash.is_empty() {
        None
    } else {
        Some(hash.to_string())
    }
}
