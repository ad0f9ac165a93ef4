mod config;

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use config::ConfigMerger;
use fs_err as fs;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use xcpatch_domain::{builtin_steps, render_patch, run_patch, FsPlatformView, PatchOptions};
use xcpatch_render::render_report_md;
use xcpatch_types::context::{HookContext, Platform};
use xcpatch_types::report::ToolInfo;

#[derive(Debug, Parser)]
#[command(
    name = "xcpatch",
    version,
    about = "Patch a Cordova-generated Xcode project: embed and sign plugin frameworks, strip unused architectures, register the payments URL scheme."
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply the patch sequence to the project.
    Run(RunArgs),
    /// Compute the patch sequence without writing; emits artifacts only.
    Preview(RunArgs),
    /// List the patch steps in execution order.
    ListSteps(ListStepsArgs),
}

#[derive(Debug, Parser)]
struct RunArgs {
    /// Cordova project root (default: current directory).
    #[arg(long, default_value = ".")]
    project_root: Utf8PathBuf,

    /// Plugin identifier whose frameworks get embedded.
    #[arg(long)]
    plugin_id: Option<String>,

    /// Target platform supplied by the build orchestrator.
    #[arg(long, value_enum, default_value = "ios")]
    platform: PlatformArg,

    /// Major version of the invoking Cordova tooling.
    #[arg(long)]
    tooling_major: Option<u32>,

    /// Output directory for artifacts (default: <project_root>/artifacts/xcpatch).
    #[arg(long)]
    out_dir: Option<Utf8PathBuf>,
}

#[derive(Debug, Parser)]
struct ListStepsArgs {
    /// Output format (text, json).
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum PlatformArg {
    Ios,
    Android,
    Browser,
}

impl From<PlatformArg> for Platform {
    fn from(p: PlatformArg) -> Self {
        match p {
            PlatformArg::Ios => Platform::Ios,
            PlatformArg::Android => Platform::Android,
            PlatformArg::Browser => Platform::Browser,
        }
    }
}

fn main() -> ExitCode {
    if let Err(e) = real_main() {
        error!("{:?}", e);
        return ExitCode::from(1);
    }
    ExitCode::from(0)
}

fn real_main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Run(args) => cmd_patch(args, false),
        Command::Preview(args) => cmd_patch(args, true),
        Command::ListSteps(args) => cmd_list_steps(args),
    }
}

fn cmd_patch(args: RunArgs, dry_run: bool) -> anyhow::Result<()> {
    let project_root = args.project_root;

    let platform: Platform = args.platform.into();
    if !platform.is_ios() {
        // The hook is iOS-only; other platforms are a clean no-op.
        info!("platform {platform} requires no Xcode patching");
        return Ok(());
    }

    let file_config = config::load_or_default(&project_root).context("load xcpatch.toml config")?;
    let merged = ConfigMerger::new(file_config).merge(
        args.plugin_id,
        args.tooling_major,
        args.out_dir,
    )?;

    let out_dir = merged
        .out_dir
        .unwrap_or_else(|| project_root.join("artifacts").join("xcpatch"));
    fs::create_dir_all(&out_dir).with_context(|| format!("create {}", out_dir))?;

    let hook = HookContext {
        plugin_id: merged.plugin_id,
        platform,
        tooling_major: merged.tooling_major,
        project_root: project_root.clone(),
    };
    let view = FsPlatformView::new(project_root);
    let opts = PatchOptions { dry_run };

    let outcome = run_patch(&hook, &view, tool_info(), &opts).context("patch project")?;
    let patch = render_patch(&outcome.before, &outcome.after);

    write_json(&out_dir.join("report.json"), &outcome.report)?;
    fs::write(out_dir.join("report.md"), render_report_md(&outcome.report))?;
    fs::write(out_dir.join("patch.diff"), &patch)?;

    info!("wrote artifacts to {}", out_dir);

    if outcome.report.summary.failed > 0 {
        anyhow::bail!("{} step(s) failed, nothing written", outcome.report.summary.failed);
    }
    if dry_run && outcome.report.summary.files_modified > 0 {
        warn!(
            "preview: {} file(s) would change",
            outcome.report.summary.files_modified
        );
    }
    Ok(())
}

fn cmd_list_steps(args: ListStepsArgs) -> anyhow::Result<()> {
    let steps = builtin_steps();
    match args.format {
        OutputFormat::Text => {
            println!("Patch steps, in execution order:\n");
            println!("  {:<24} TITLE", "ID");
            println!("  {:<24} -----", "--");
            for step in &steps {
                println!("  {:<24} {}", step.id(), step.title());
            }
        }
        OutputFormat::Json => {
            let steps: Vec<_> = steps
                .iter()
                .map(|s| {
                    serde_json::json!({
                        "id": s.id(),
                        "title": s.title(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&steps)?);
        }
    }
    Ok(())
}

fn write_json<T: serde::Serialize>(path: &Utf8Path, v: &T) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(v).context("serialize json")?;
    fs::write(path, s).with_context(|| format!("write {}", path))?;
    Ok(())
}

fn tool_info() -> ToolInfo {
    ToolInfo {
        name: "xcpatch".to_string(),
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
    }
}
