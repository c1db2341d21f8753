use std::path::PathBuf;

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use pandemic_appointments::{
    analyze_appointments, case_breakdown, parse_appointments_str, AppointmentFilter, CaseBreakdown,
    WEEKDAYS,
};
use pandemic_core::{DailySeries, ForecastShape, GrowthStrategy, TrendConfig, TrendSummary};

#[derive(Parser, Debug)]
#[command(
    name = "pandemic-cli",
    about = "Contagious-case trend and growth projection from appointment exports."
)]
struct Cli {
    /// Log computed windows and rates.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a JSON export of appointments.
    Analyze {
        /// Path to the appointments JSON (array or `{"data": [...]}`).
        #[arg(short, long)]
        input: PathBuf,
        /// First day of the range (YYYY-MM-DD).
        #[arg(long)]
        start: NaiveDate,
        /// Last day of the range (YYYY-MM-DD).
        #[arg(long)]
        end: NaiveDate,
        /// Only count appointments assigned to this hospital.
        #[arg(long)]
        hospital: Option<String>,
        /// Count every appointment, not only contagious ones.
        #[arg(long)]
        include_non_contagious: bool,
        #[command(flatten)]
        trend: TrendArgs,
    },
    /// Project from a comma-separated list of daily counts.
    Project {
        #[arg(long, value_delimiter = ',', required = true)]
        counts: Vec<u32>,
        /// Day of the first count. Defaults so the last count falls on today.
        #[arg(long)]
        start: Option<NaiveDate>,
        #[command(flatten)]
        trend: TrendArgs,
    },
}

#[derive(Args, Debug)]
struct TrendArgs {
    /// Trailing window (days) for the growth rate.
    #[arg(long, default_value_t = pandemic_core::DEFAULT_WINDOW_DAYS)]
    window: usize,
    /// Days to predict (1-30).
    #[arg(long, default_value_t = pandemic_core::DEFAULT_HORIZON_DAYS)]
    horizon: u32,
    /// weighted-average or log-linear.
    #[arg(long, default_value = "weighted-average")]
    strategy: GrowthStrategy,
    /// Seed for a reproducible forecast.
    #[arg(long)]
    seed: Option<u64>,
    /// Half-width of the random jitter factor; 0 disables it.
    #[arg(long)]
    jitter: Option<f64>,
    /// Print the summary as JSON.
    #[arg(long)]
    json: bool,
}

impl TrendArgs {
    fn config(&self) -> anyhow::Result<TrendConfig> {
        let mut shape = ForecastShape::default();
        if let Some(jitter) = self.jitter {
            shape.jitter = jitter;
        }

        let config = TrendConfig {
            window_days: self.window,
            strategy: self.strategy,
            horizon_days: self.horizon,
            shape,
            seed: self.seed,
            ..TrendConfig::default()
        };
        config.validate()?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let (summary, breakdown, json) = match cli.command {
        Command::Analyze {
            input,
            start,
            end,
            hospital,
            include_non_contagious,
            trend,
        } => {
            let data = std::fs::read_to_string(&input)
                .with_context(|| format!("could not read file {:?}", input))?;

            let mut filter = AppointmentFilter::new(start, end);
            filter.hospital_id = hospital;
            filter.contagious_only = !include_non_contagious;

            let appointments = parse_appointments_str(&data)
                .with_context(|| format!("could not parse appointments in {:?}", input))?;
            log::info!(
                "{} appointments loaded, range {}..{}, hospital {}",
                appointments.len(),
                filter.start,
                filter.end,
                filter.hospital_id.as_deref().unwrap_or("all")
            );

            let summary = analyze_appointments(&appointments, &filter, &trend.config()?)
                .with_context(|| format!("could not analyze {:?}", input))?;
            let breakdown = case_breakdown(&appointments, &filter);
            (summary, Some(breakdown), trend.json)
        }
        Command::Project {
            counts,
            start,
            trend,
        } => {
            let start = start.unwrap_or_else(|| default_start(counts.len()));
            log::info!("projecting {} daily counts from {}", counts.len(), start);
            let series = DailySeries::new(start, counts);
            (
                TrendSummary::build_with_config(&series, &trend.config()?)?,
                None,
                trend.json,
            )
        }
    };

    if json {
        let output = match &breakdown {
            Some(breakdown) => serde_json::json!({ "trend": summary, "breakdown": breakdown }),
            None => serde_json::to_value(&summary)?,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print!("{}", render(&summary));
        if let Some(breakdown) = &breakdown {
            print!("{}", render_breakdown(breakdown));
        }
    }

    Ok(())
}

fn default_start(len: usize) -> NaiveDate {
    let today = Local::now().date_naive();
    today
        .checked_sub_days(chrono::Days::new(len.saturating_sub(1) as u64))
        .unwrap_or(today)
}

fn render(summary: &TrendSummary) -> String {
    let mut out = format!(
        "Range: {} .. {}\nTotal cases: {}\nDaily average: {:.1}\n",
        summary.start, summary.end, summary.total_cases, summary.daily_average
    );

    match summary.peak_day {
        Some(day) => out.push_str(&format!("Peak day: {day}\n")),
        None => out.push_str("Peak day: -\n"),
    }

    out.push_str(&format!(
        "Growth rate: {} per day ({:?}, {:?} model, {}-day window)\n",
        summary.growth_percent(2),
        summary.direction,
        summary.model,
        summary.window_days_used
    ));

    for prediction in &summary.predictions {
        out.push_str(&format!("  {}  {}\n", prediction.date, prediction.value));
    }
    out
}

fn render_breakdown(breakdown: &CaseBreakdown) -> String {
    let mut out = String::from("Cases by hospital:\n");
    for (hospital, count) in &breakdown.by_hospital {
        out.push_str(&format!("  {hospital}  {count}\n"));
    }
    out.push_str("Cases by day of week:\n");
    for (weekday, count) in WEEKDAYS.iter().zip(breakdown.by_weekday) {
        out.push_str(&format!("  {weekday}  {count}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn project_parses_counts_and_strategy() {
        let cli = Cli::try_parse_from([
            "pandemic-cli",
            "project",
            "--counts",
            "1,2,4,8",
            "--strategy",
            "log-linear",
            "--seed",
            "9",
        ])
        .expect("arguments");

        let Command::Project { counts, trend, .. } = cli.command else {
            panic!("expected project");
        };
        assert_eq!(counts, vec![1, 2, 4, 8]);
        let config = trend.config().expect("config");
        assert_eq!(config.strategy, GrowthStrategy::LogLinear);
        assert_eq!(config.seed, Some(9));
    }

    #[test]
    fn render_lists_every_prediction() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).expect("date");
        let series = DailySeries::new(start, vec![3, 4, 6]);
        let config = TrendConfig {
            horizon_days: 2,
            seed: Some(1),
            ..TrendConfig::default()
        };
        let summary = TrendSummary::build_with_config(&series, &config).expect("summary");

        let text = render(&summary);
        assert!(text.contains("Peak day: 2024-01-03"));
        assert!(text.contains("  2024-01-04  "));
        assert!(text.contains("  2024-01-05  "));
    }

    #[test]
    fn breakdown_lists_weekdays_from_sunday() {
        let breakdown = CaseBreakdown {
            by_hospital: [("hosp-1".to_string(), 3)].into_iter().collect(),
            by_weekday: [1, 0, 0, 0, 0, 0, 2],
        };

        let text = render_breakdown(&breakdown);
        assert!(text.contains("  hosp-1  3\n"));
        assert!(text.contains("  Sun  1\n"));
        assert!(text.contains("  Sat  2\n"));
    }
}
