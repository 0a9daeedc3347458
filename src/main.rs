use clap::{Parser, Subcommand, ValueEnum};
use pomodoro_client::application::tag_cache::{MAX_RECENT_TAGS, TagCache};
use pomodoro_client::domain::models::StatsPeriod;
use pomodoro_client::infrastructure::session_api::SessionApi;
use pomodoro_client::{
    ClientContext, PresetId, RenderSurface, RuntimeIntent, SessionController, SessionIntent,
    SessionRuntime, ViewModel,
};
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

/// pomodoro timer client for a remote session service
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// workspace holding config/, state/ and logs/
    #[arg(long, global = true)]
    workspace: Option<PathBuf>,

    /// session service base url, overrides config and POMODORO_BASE_URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Command {
    /// interactive timer driven by stdin commands
    Run,
    /// fetch the current session state once
    State,
    /// print tag suggestions
    Tags,
    /// print statistics rows
    Stats {
        #[arg(long, value_enum, default_value_t = StatsView::Weekly)]
        period: StatsView,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum StatsView {
    Weekly,
    Monthly,
    ByTag,
}

struct TerminalSurface;

impl RenderSurface for TerminalSurface {
    fn render(&mut self, view: &ViewModel) {
        println!("{}", view_line(view));
    }
}

fn view_line(view: &ViewModel) -> String {
    let mut controls = Vec::new();
    if view.start_enabled {
        controls.push("start");
    }
    if view.break_enabled {
        controls.push("break");
    }
    if view.stop_enabled {
        controls.push("stop");
    }

    let mut line = format!(
        "[{}] {} {:>3.0}% | done {} | {}",
        view.status_label,
        view.remaining_text,
        view.progress_ratio * 100.0,
        view.completed_count_text,
        view.total_focus_text
    );
    if let Some(tag) = &view.tag {
        line.push_str(&format!(" | #{tag}"));
    }
    if controls.is_empty() {
        line.push_str(" | -");
    } else {
        line.push_str(&format!(" | {}", controls.join(",")));
    }
    if let Some(toast) = &view.toast {
        line.push_str(&format!(" | {toast}"));
    }
    line
}

fn parse_intent(line: &str) -> Result<Option<RuntimeIntent>, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let rest = words.collect::<Vec<_>>();

    let intent = match verb {
        "start" | "focus" => {
            let (duration_minutes, tag) = duration_and_tag(&rest)?;
            RuntimeIntent::Session(SessionIntent::StartFocus { duration_minutes, tag })
        }
        "break" => {
            let (duration_minutes, tag) = duration_and_tag(&rest)?;
            RuntimeIntent::Session(SessionIntent::StartBreak { duration_minutes, tag })
        }
        "stop" => RuntimeIntent::Session(SessionIntent::Stop),
        "preset" => {
            let raw = rest.first().ok_or("usage: preset <default|long|short>")?;
            let id = PresetId::parse(raw).ok_or_else(|| format!("unknown preset: {raw}"))?;
            RuntimeIntent::SelectPreset(id)
        }
        "quit" | "exit" => RuntimeIntent::Shutdown,
        other => return Err(format!("unknown command: {other}")),
    };
    Ok(Some(intent))
}

fn duration_and_tag(words: &[&str]) -> Result<(Option<u32>, Option<String>), String> {
    let (duration, tag_words) = match words.split_first() {
        Some((first, rest)) if first.chars().all(|c| c.is_ascii_digit()) => {
            let minutes = first
                .parse::<u32>()
                .map_err(|error| format!("invalid duration {first}: {error}"))?;
            (Some(minutes), rest)
        }
        _ => (None, words),
    };
    let tag = (!tag_words.is_empty()).then(|| tag_words.join(" "));
    Ok((duration, tag))
}

async fn run_interactive(context: ClientContext) -> Result<(), Box<dyn Error>> {
    let controller = SessionController::from_config(
        Arc::clone(&context.api),
        Arc::clone(&context.store),
        Arc::clone(&context.log),
        &context.config,
    );
    let (runtime, handle) = SessionRuntime::new(controller, TerminalSurface, &context.config);
    let task = tokio::spawn(runtime.run());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_intent(&line) {
            Ok(Some(RuntimeIntent::Shutdown)) => break,
            Ok(Some(intent)) => {
                if !handle.submit(intent) {
                    break;
                }
            }
            Ok(None) => {}
            Err(message) => eprintln!("{message}"),
        }
    }

    handle.shutdown();
    task.await?;
    Ok(())
}

async fn print_state(context: &ClientContext) -> Result<(), Box<dyn Error>> {
    let snapshot = context
        .api
        .fetch_state()
        .await
        .map_err(|error| context.command_error("state", &error))?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

async fn print_tags(context: &ClientContext) -> Result<(), Box<dyn Error>> {
    let server_tags = match context.api.recent_tags(Some(MAX_RECENT_TAGS as u32)).await {
        Ok(tags) => tags,
        Err(error) => {
            eprintln!("{}", context.command_error("tags", &error));
            Vec::new()
        }
    };
    let cache = TagCache::new(Arc::clone(&context.store));
    for tag in cache.suggestions(&server_tags)? {
        println!("{tag}");
    }
    Ok(())
}

async fn print_stats(context: &ClientContext, view: StatsView) -> Result<(), Box<dyn Error>> {
    let rows = match view {
        StatsView::ByTag => context
            .api
            .stats_by_tag()
            .await
            .map_err(|error| context.command_error("stats", &error))?
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()?,
        StatsView::Weekly | StatsView::Monthly => {
            let period = if view == StatsView::Weekly {
                StatsPeriod::Weekly
            } else {
                StatsPeriod::Monthly
            };
            context
                .api
                .daily_stats(period)
                .await
                .map_err(|error| context.command_error("stats", &error))?
                .iter()
                .map(serde_json::to_string)
                .collect::<Result<Vec<_>, _>>()?
        }
    };
    for row in rows {
        println!("{row}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let workspace = match cli.workspace {
        Some(path) => path,
        None => std::env::current_dir()?,
    };
    let context = ClientContext::new(&workspace, cli.base_url.as_deref())?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run_interactive(context).await,
        Command::State => print_state(&context).await,
        Command::Tags => print_tags(&context).await,
        Command::Stats { period } => print_stats(&context, period).await,
    }
}
