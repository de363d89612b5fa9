use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=.git/HEAD");

    emit(
        "HASH",
        git(&["rev-parse", "--short", "HEAD"])
            .filter(|hash| !hash.is_empty())
            .unwrap_or_else(unknown),
    );

    let status = git(&["status", "--porcelain"])
        .map(|out| {
            let status = if out.is_empty() { "clean" } else { "dirty" };
            status.to_string()
        })
        .unwrap_or_else(unknown);
    emit("STATUS", status);

    emit(
        "TIMESTAMP",
        chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
    );
    emit("TARGET", env::var("TARGET").unwrap_or_else(|_| unknown()));
    emit("PROFILE", env::var("PROFILE").unwrap_or_else(|_| unknown()));
    emit("RUSTC", run("rustc", &["--version"]).unwrap_or_else(unknown));
}

fn emit(name: &str, value: String) {
    println!("cargo:rustc-env=SEMS_CONSOLE_BUILD_{name}={value}");
}

fn unknown() -> String {
    "unknown".to_string()
}

fn git(args: &[&str]) -> Option<String> {
    run("git", args)
}

fn run(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()
        .map(|out| out.trim().to_string())
}
