use crumbs::RenderOptions;
use facet::Facet;
use figue as args;

mod scenarios;

type AnyResult<T> = Result<T, String>;

#[derive(Facet, Debug)]
struct Cli {
    #[facet(flatten)]
    builtins: args::FigueBuiltins,
    #[facet(args::named, default)]
    separator: Option<String>,
    /// Frames from the top of the stack; `-1` clears a `CRUMBS_TOP_FRAMES` value.
    #[facet(args::named, default)]
    top_frames: Option<String>,
    /// Frames from the bottom of the stack; `-1` clears a `CRUMBS_BOTTOM_FRAMES` value.
    #[facet(args::named, default)]
    bottom_frames: Option<String>,
    #[facet(args::subcommand)]
    command: CommandKind,
}

#[derive(Facet, Debug)]
#[repr(u8)]
enum CommandKind {
    RequestPipeline,
    FanOut {
        #[facet(args::named, default)]
        workers: Option<usize>,
    },
    BlockingHandoff,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

async fn run() -> AnyResult<()> {
    let cli = parse_cli()?;
    let options = render_options_from_cli(&cli)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .event_format(
            crumbs::fmt::with_context(tracing_subscriber::fmt::format()).with_options(options),
        )
        .init();

    crumbs::in_current_context(dispatch_command(cli.command)).await
}

fn parse_cli() -> AnyResult<Cli> {
    let figue_config = args::builder::<Cli>()
        .map_err(|e| format!("failed to build CLI schema: {e}"))?
        .cli(|cli| cli.strict())
        .help(|h| {
            h.program_name("crumbs-examples")
                .description("Run crumbs context propagation scenarios as subcommands")
                .version(option_env!("CARGO_PKG_VERSION").unwrap_or("dev"))
        })
        .build();

    args::Driver::new(figue_config)
        .run()
        .into_result()
        .map(|v| v.value)
        .map_err(|e| e.to_string())
}

/// CLI flags override `CRUMBS_*` env vars, which override the defaults.
fn render_options_from_cli(cli: &Cli) -> AnyResult<RenderOptions> {
    let mut options = RenderOptions::from_env().map_err(|e| e.to_string())?;
    if let Some(separator) = cli.separator.as_ref() {
        options.separator = separator.clone();
    }
    options.top_frames =
        override_frame_count(options.top_frames, "--top-frames", cli.top_frames.as_deref())?;
    options.bottom_frames = override_frame_count(
        options.bottom_frames,
        "--bottom-frames",
        cli.bottom_frames.as_deref(),
    )?;
    Ok(options)
}

/// A flag, when given, replaces the env value. It follows the env parsing rules,
/// so `-1` means "no limit".
fn override_frame_count(
    current: Option<usize>,
    flag: &'static str,
    value: Option<&str>,
) -> AnyResult<Option<usize>> {
    match value {
        Some(value) => crumbs::parse_frame_count(flag, value).map_err(|e| e.to_string()),
        None => Ok(current),
    }
}

async fn dispatch_command(command: CommandKind) -> AnyResult<()> {
    match command {
        CommandKind::RequestPipeline => scenarios::request_pipeline::run().await,
        CommandKind::FanOut { workers } => scenarios::fan_out::run(workers.unwrap_or(4)).await,
        CommandKind::BlockingHandoff => scenarios::blocking_handoff::run().await,
    }
}
