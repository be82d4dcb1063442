use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process::Command;

/// Bundled mesh used by the smoke render.
const SMOKE_MESH: &str = "apps/turntable/assets/cube.obj";
const SMOKE_OUT_DIR: &str = "target/smoke";

#[derive(Parser)]
#[command(name = "xtask", about = "Workspace automation for offrender")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all checks: fmt, clippy, tests, doc
    Check,
    /// Run cargo fmt --check on all crates
    Fmt,
    /// Run clippy on all crates
    Clippy,
    /// Run all tests
    Test,
    /// Build rustdoc for the workspace
    Doc,
    /// Build the entire workspace
    Build,
    /// Render a short turntable of the bundled cube on the software platform
    Smoke {
        /// Number of frames to render
        #[arg(long, default_value = "4")]
        views: u32,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check => {
            run_fmt()?;
            run_clippy()?;
            run_tests()?;
            run_doc()?;
        }
        Commands::Fmt => run_fmt()?,
        Commands::Clippy => run_clippy()?,
        Commands::Test => run_tests()?,
        Commands::Doc => run_doc()?,
        Commands::Build => run_build()?,
        Commands::Smoke { views } => run_smoke(views)?,
    }

    Ok(())
}

/// Run cargo with `args` and extra environment, failing with `what` on a
/// non-zero exit.
fn cargo(args: &[&str], envs: &[(&str, &str)], what: &str) -> Result<()> {
    let status = Command::new("cargo")
        .args(args)
        .envs(envs.iter().copied())
        .status()?;
    if !status.success() {
        anyhow::bail!("{what} failed");
    }
    Ok(())
}

fn run_fmt() -> Result<()> {
    println!("==> Running cargo fmt --check");
    cargo(&["fmt", "--all", "--", "--check"], &[], "cargo fmt check")
}

fn run_clippy() -> Result<()> {
    println!("==> Running cargo clippy");
    cargo(
        &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
        &[],
        "cargo clippy",
    )
}

fn run_tests() -> Result<()> {
    println!("==> Running cargo test");
    cargo(&["test", "--workspace"], &[], "cargo test")
}

fn run_doc() -> Result<()> {
    println!("==> Running cargo doc");
    cargo(&["doc", "--workspace", "--no-deps"], &[], "cargo doc")
}

fn run_build() -> Result<()> {
    println!("==> Running cargo build");
    cargo(&["build", "--workspace"], &[], "cargo build")
}

fn run_smoke(views: u32) -> Result<()> {
    println!("==> Rendering {views} smoke frames to {SMOKE_OUT_DIR}");
    let views = views.to_string();
    cargo(
        &[
            "run",
            "-p",
            "offrender-turntable",
            "--",
            "--mesh-path",
            SMOKE_MESH,
            "--out-dir",
            SMOKE_OUT_DIR,
            "--material",
            "geo",
            "--views",
            &views,
            "--resolution",
            "128",
            "--focal",
            "1200",
        ],
        &[("OFFRENDER_PLATFORM", "osmesa")],
        "smoke render",
    )
}
