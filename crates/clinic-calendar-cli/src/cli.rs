use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use chrono::{Datelike, Local, NaiveDate};
use clap::{ArgAction, Parser, Subcommand};
use clinic_calendar_core::config::{SchedulerConfig, parse_locale};
use clinic_calendar_core::sources::{EventSource, StaticEvents};
use clinic_calendar_core::{
    CalendarDay, CalendarEvent, Granularity, NoUrgency, ResourceFilterManager, ScheduleStore,
    build_month_grid, format_range_label, weekday_labels,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "clinic-calendar",
    version,
    about = "Preview clinic calendar grids, labels and agendas"
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the 42-cell month grid.
    Month {
        #[arg(long)]
        year: Option<i32>,
        /// 1-based month number.
        #[arg(long)]
        month: Option<u32>,
        /// JSON-lines event file used for day markers.
        #[arg(long)]
        events: Option<PathBuf>,
    },
    /// Print the range label for a view.
    Label {
        #[arg(long, value_parser = parse_date_arg)]
        date: Option<NaiveDate>,
        #[arg(long, default_value = "month", value_parser = parse_granularity_arg)]
        view: Granularity,
        #[arg(long)]
        locale: Option<String>,
    },
    /// List events for the selected doctors.
    Agenda {
        #[arg(long)]
        events: PathBuf,
        /// Restrict to these resource ids instead of the configured selection.
        #[arg(long = "resource")]
        resources: Vec<String>,
        #[arg(long, default_value = "")]
        search: String,
    },
}

fn parse_date_arg(raw: &str) -> Result<NaiveDate, String> {
    clinic_calendar_core::datetime::parse_draft_date(raw)
        .ok_or_else(|| format!("invalid date '{raw}'. Expected YYYY-MM-DD"))
}

fn parse_granularity_arg(raw: &str) -> Result<Granularity, String> {
    Granularity::from_key(raw).ok_or_else(|| format!("invalid view '{raw}'. Expected month, week or day"))
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

#[tracing::instrument(skip_all)]
pub fn run() -> anyhow::Result<()> {
    let cli = GlobalCli::parse();
    init_tracing(cli.verbose, cli.quiet)?;
    info!(verbose = cli.verbose, quiet = cli.quiet, "starting clinic-calendar");

    let config = SchedulerConfig::load(cli.config.as_deref()).context("failed to load config")?;
    let today = Local::now().date_naive();

    match cli.command {
        Command::Month {
            year,
            month,
            events,
        } => {
            let year = year.unwrap_or(today.year());
            let month = month.unwrap_or(today.month());
            if !(1..=12).contains(&month) {
                return Err(anyhow!("month must be between 1 and 12, got {month}"));
            }
            let events = load_events(events.as_deref())?;
            print_month(&config, year, month, &events);
        }
        Command::Label { date, view, locale } => {
            let locale = match locale {
                Some(raw) => parse_locale(&raw).ok_or_else(|| anyhow!("unknown locale: {raw}"))?,
                None => config.locale(),
            };
            println!("{}", format_range_label(date.unwrap_or(today), view, locale));
        }
        Command::Agenda {
            events,
            resources,
            search,
        } => {
            let events = load_events(Some(&events))?;
            print_agenda(&config, events, &resources, &search)?;
        }
    }

    info!("done");
    Ok(())
}

fn load_events(path: Option<&Path>) -> anyhow::Result<Vec<CalendarEvent>> {
    match path {
        Some(path) => StaticEvents::from_jsonl_path(path)?.list(),
        None => Ok(Vec::new()),
    }
}

fn print_month(config: &SchedulerConfig, year: i32, month: u32, events: &[CalendarEvent]) {
    let week_start = config.week_start();
    let locale = config.locale();
    let grid = build_month_grid(year, month as i32 - 1, events, week_start, &NoUrgency);

    if let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) {
        println!("{}", format_range_label(first, Granularity::Month, locale));
    }
    let header = weekday_labels(week_start, locale)
        .iter()
        .map(|label| format!("{:>5}", label.chars().take(4).collect::<String>()))
        .collect::<String>();
    println!("{header}");

    for week in grid.chunks(7) {
        let row = week.iter().map(render_cell).collect::<String>();
        println!("{row}");
    }
}

fn render_cell(cell: &CalendarDay) -> String {
    let marker = if cell.has_urgent_event {
        '!'
    } else if cell.has_any_event {
        '*'
    } else {
        ' '
    };
    if cell.is_current_month_member {
        format!("{:>4}{marker}", cell.date.day())
    } else {
        format!("  ·{marker} ")
    }
}

/// Resource roster plus the ids the agenda shows.
fn agenda_selection(
    config: &SchedulerConfig,
    only: &[String],
) -> anyhow::Result<(ResourceFilterManager, Vec<String>)> {
    let mut resources = ResourceFilterManager::from_source(config, config.initial_selection())?;
    if !only.is_empty() {
        resources.select_only(only);
    }

    let active = if resources.resources().is_empty() {
        // No roster configured: take the requested ids at face value.
        let mut ids = only.to_vec();
        ids.sort();
        ids.dedup();
        ids
    } else {
        resources.active_resource_ids()
    };
    Ok((resources, active))
}

fn print_agenda(
    config: &SchedulerConfig,
    events: Vec<CalendarEvent>,
    only: &[String],
    search: &str,
) -> anyhow::Result<()> {
    let (resources, active) = agenda_selection(config, only)?;
    let store = ScheduleStore::with_events(events, config.resource_policy());
    let visible = store.query(&active, search);
    debug!(total = store.len(), visible = visible.len(), "agenda query");

    if visible.is_empty() {
        println!("no events");
        return Ok(());
    }
    for event in visible {
        let who = resources
            .get(&event.resource_id)
            .map(|r| r.display_name.as_str())
            .unwrap_or(event.resource_id.as_str());
        println!(
            "{} {}–{}  {:<16} {}",
            event.start.format("%Y-%m-%d"),
            event.start.format("%H:%M"),
            event.end.format("%H:%M"),
            who,
            event.title
        );
    }
    Ok(())
}
