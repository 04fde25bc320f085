use std::path::PathBuf;

use atty::Stream;
use clap::{value_parser, ArgAction, Args, Parser, Subcommand, ValueEnum};
use color_eyre::{eyre::eyre, Result};
use lspace_core::{
    BuildCommandRequest, BuildMode, CommandContext, CommandStatus, EjectRequest, ExecutionOutcome,
    GlobalOptions,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

mod style;

use style::Style;

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = LspaceCli::parse();
    init_tracing(cli.trace, cli.verbose);

    let global = GlobalOptions {
        quiet: cli.quiet,
        verbose: cli.verbose,
        trace: cli.trace,
        json: cli.json,
    };

    let context = CommandContext::new(&global).map_err(|err| eyre!("{err:?}"))?;
    let (command, outcome) = run_command(&context, cli.command.as_ref());
    let code = emit_output(&cli, command, &outcome)?;

    if code == 0 {
        Ok(())
    } else {
        std::process::exit(code);
    }
}

fn init_tracing(trace: bool, verbose: u8) {
    let level = if trace {
        "trace"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = format!("lspace={level},lspace_core={level},lspace_domain={level}");
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn run_command(
    context: &CommandContext<'_>,
    command: Option<&SpaceCommand>,
) -> (&'static str, ExecutionOutcome) {
    // A bare `lspace` regenerates and opens the workspace.
    match command.unwrap_or(&SpaceCommand::Open) {
        SpaceCommand::Open => ("open", lspace_core::space_open(context)),
        SpaceCommand::Build(args) => (
            "build",
            lspace_core::space_build(
                context,
                &BuildCommandRequest {
                    mode: args.mode.into(),
                    root: args.root.clone(),
                    dry_run: args.dry_run,
                },
            ),
        ),
        SpaceCommand::Complete => ("complete", lspace_core::space_complete(context)),
        SpaceCommand::Eject(args) => (
            "eject",
            lspace_core::space_eject(
                context,
                &EjectRequest {
                    package: args.package.clone(),
                    all: args.all,
                },
            ),
        ),
        SpaceCommand::List => ("list", lspace_core::space_list(context)),
    }
}

fn emit_output(cli: &LspaceCli, command: &str, outcome: &ExecutionOutcome) -> Result<i32> {
    let code = match outcome.status {
        CommandStatus::Ok => 0,
        CommandStatus::UserError => 1,
        CommandStatus::Failure => 2,
    };

    let style = Style::new(cli.no_color, atty::is(Stream::Stdout));

    if cli.json {
        let payload = lspace_core::to_json_response(command, outcome);
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else if !cli.quiet {
        println!("{}", style.status(&outcome.status, &outcome.message));
        if let Some(hint) = hint_from_details(&outcome.details) {
            let hint_line = format!("Hint: {hint}");
            println!("{}", style.info(&hint_line));
        }
        if let Some(table) = render_member_table(&style, command, &outcome.details) {
            println!("{table}");
        }
    }

    Ok(code)
}

fn hint_from_details(details: &Value) -> Option<&str> {
    details
        .as_object()
        .and_then(|map| map.get("hint"))
        .and_then(Value::as_str)
}

fn render_member_table(style: &Style, command: &str, details: &Value) -> Option<String> {
    if command != "list" {
        return None;
    }
    let members = details.get("members")?.as_array()?;
    if members.is_empty() {
        return None;
    }

    let mut rows = Vec::new();
    for member in members {
        let obj = member.as_object()?;
        let links = obj
            .get("links")?
            .as_array()?
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        rows.push(MemberRow {
            name: obj.get("name")?.as_str()?.to_string(),
            path: obj.get("path")?.as_str()?.to_string(),
            links,
        });
    }

    Some(format_member_table(style, &rows))
}

struct MemberRow {
    name: String,
    path: String,
    links: String,
}

fn format_member_table(style: &Style, rows: &[MemberRow]) -> String {
    let headers = ["Package", "Path", "Links"];
    let mut widths = [headers[0].len(), headers[1].len(), headers[2].len()];

    for row in rows {
        widths[0] = widths[0].max(row.name.len());
        widths[1] = widths[1].max(row.path.len());
        widths[2] = widths[2].max(row.links.len());
    }

    let header_line = format!(
        "{:<width0$}  {:<width1$}  {:<width2$}",
        headers[0],
        headers[1],
        headers[2],
        width0 = widths[0],
        width1 = widths[1],
        width2 = widths[2],
    );

    let mut lines = Vec::new();
    lines.push(style.table_header(&header_line));
    lines.push(format!(
        "{:-<width0$}  {:-<width1$}  {:-<width2$}",
        "",
        "",
        "",
        width0 = widths[0],
        width1 = widths[1],
        width2 = widths[2],
    ));

    for row in rows {
        lines.push(format!(
            "{:<width0$}  {:<width1$}  {:<width2$}",
            row.name,
            row.path,
            row.links,
            width0 = widths[0],
            width1 = widths[1],
            width2 = widths[2],
        ));
    }

    lines.join("\n")
}

#[derive(Parser, Debug)]
#[command(
    name = "lspace",
    author,
    version,
    about = "Grow, build, and maintain a space of locally linked packages",
    long_about = "Resolves the space of yalc-linked checkouts around the current project, \
                  keeps it closed under its own dependencies, and drives scoped builds \
                  through it.",
    after_help = "Examples:\n  lspace\n  lspace build --mode downstream\n  lspace --json list\n"
)]
struct LspaceCli {
    #[arg(
        short,
        long,
        help = "Suppress human output (errors still set the exit code)"
    )]
    quiet: bool,
    #[arg(short, long, action = ArgAction::Count, help = "Increase logging (-vv reaches trace)")]
    verbose: u8,
    #[arg(long, help = "Force trace logging regardless of -v/-q")]
    trace: bool,
    #[arg(long, help = "Emit {status,message,details} JSON envelopes")]
    json: bool,
    #[arg(long, help = "Disable colored human output")]
    no_color: bool,
    #[command(subcommand)]
    command: Option<SpaceCommand>,
}

#[derive(Subcommand, Debug)]
enum SpaceCommand {
    #[command(
        about = "Regenerate the workspace file and open it in the editor.",
        after_help = "Examples:\n  lspace\n  LSPACE_EDITOR=\"code -n\" lspace open\n"
    )]
    Open,
    #[command(
        about = "Build the current project and its selected neighbors in dependency order.",
        override_usage = "lspace build [--mode single|downstream|everything] [--root DIR]",
        after_help = "Examples:\n  lspace build\n  lspace build --mode downstream\n  lspace build --mode everything --root ~/work/app\n"
    )]
    Build(BuildArgs),
    #[command(
        about = "Pull every reachable dependency into the space and link it everywhere.",
        after_help = "Examples:\n  lspace complete\n  lspace --json complete\n"
    )]
    Complete,
    #[command(
        about = "Detach a package, or every non-root member, from the space.",
        override_usage = "lspace eject (--package NAME | --all)",
        after_help = "Examples:\n  lspace eject --package @scope/http\n  lspace eject --all\n"
    )]
    Eject(EjectArgs),
    #[command(
        about = "Show the resolved space membership and links.",
        after_help = "Examples:\n  lspace list\n  lspace --json list\n"
    )]
    List,
}

#[derive(Args, Debug)]
struct BuildArgs {
    #[arg(
        long,
        value_enum,
        default_value_t = BuildModeArg::Single,
        help = "How far beyond the current project the build reaches"
    )]
    mode: BuildModeArg,
    #[arg(
        long,
        value_parser = value_parser!(PathBuf),
        help = "Directory of the space root (defaults to the current project)"
    )]
    root: Option<PathBuf>,
    #[arg(long, help = "Report the build selection without running anything")]
    dry_run: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, Serialize, Deserialize)]
enum BuildModeArg {
    Single,
    Downstream,
    Everything,
}

impl From<BuildModeArg> for BuildMode {
    fn from(mode: BuildModeArg) -> Self {
        match mode {
            BuildModeArg::Single => BuildMode::Single,
            BuildModeArg::Downstream => BuildMode::Downstream,
            BuildModeArg::Everything => BuildMode::Everything,
        }
    }
}

#[derive(Args, Debug)]
struct EjectArgs {
    #[arg(
        long,
        value_name = "NAME",
        conflicts_with = "all",
        help = "Full package name to detach from the space"
    )]
    package: Option<String>,
    #[arg(long, help = "Detach every non-root member")]
    all: bool,
}
