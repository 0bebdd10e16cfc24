//! Command-line argument definitions.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use workforce::{Granularity, GroupKey, RosterFilter};

#[derive(Debug, Parser)]
#[command(
    name = "workforce",
    version,
    about = "Workforce turnover metrics from an employee roster",
    long_about = "Compute hires, terminations, turnover and retention per period,\n\
                  tenure distributions, group breakdowns, lag features and\n\
                  company-status predictions from a roster CSV or JSON file."
)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Command,

    /// Roster file: CSV with a header row, or a JSON array of records.
    #[arg(long, short, value_name = "PATH", global = true)]
    pub(crate) input: Option<PathBuf>,

    /// Reference date for open tenures (default: today).
    #[arg(long = "as-of", value_name = "YYYY-MM-DD", global = true)]
    pub(crate) as_of: Option<NaiveDate>,

    /// Period size (overrides the config file).
    #[arg(long, value_enum, global = true)]
    pub(crate) period: Option<PeriodArg>,

    /// Pipeline configuration file (JSON).
    #[arg(long, value_name = "PATH", global = true)]
    pub(crate) config: Option<PathBuf>,

    #[command(flatten)]
    pub(crate) filter: FilterArgs,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub(crate) verbose: u8,

    /// Log output format.
    #[arg(long = "log-format", value_enum, default_value = "compact", global = true)]
    pub(crate) log_format: LogFormatArg,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// List all available metrics
    List,
    /// Show information about a specific metric
    Info {
        /// Metric name
        metric: String,
    },
    /// Processed roster with tenure and calendar fields
    Records,
    /// Every metric per period
    Metrics,
    /// Headline numbers
    Summary,
    /// Tenure, reasons, seasonality, exits per group and month, survival
    Distribution {
        /// Field that labels the rows of the exit heatmap
        #[arg(long, value_enum, default_value = "department")]
        by: GroupArg,
    },
    /// One metric broken down by a categorical field
    Breakdown {
        /// Field to group by
        #[arg(long, value_enum, default_value = "department")]
        by: GroupArg,
        /// Metric to compute per group
        #[arg(long, default_value = "turnover_rate")]
        metric: String,
    },
    /// Lag-feature table with status labels
    Features,
    /// K-means clusters of departing employees
    Clusters,
    /// Fit the nearest-centroid status classifier and save it
    Train {
        /// Where to write the model
        #[arg(long, short, value_name = "PATH")]
        output: PathBuf,
    },
    /// Predict the status of the latest period (JSON output)
    Predict {
        /// Trained model file
        #[arg(long, value_name = "PATH")]
        model: Option<PathBuf>,
    },
    /// Full JSON report
    Report {
        /// Trained model file
        #[arg(long, value_name = "PATH")]
        model: Option<PathBuf>,
    },
}

/// Roster subset selection.
#[derive(Debug, Clone, Default, Args)]
pub(crate) struct FilterArgs {
    /// Keep employees hired on or after this date (used with --hired-to).
    #[arg(long = "hired-from", value_name = "YYYY-MM-DD", global = true)]
    pub(crate) hired_from: Option<NaiveDate>,

    /// Keep employees hired on or before this date (used with --hired-from).
    #[arg(long = "hired-to", value_name = "YYYY-MM-DD", global = true)]
    pub(crate) hired_to: Option<NaiveDate>,

    /// Keep only this department (repeatable).
    #[arg(long = "department", value_name = "NAME", global = true)]
    pub(crate) departments: Vec<String>,
}

impl FilterArgs {
    pub(crate) fn to_filter(&self) -> RosterFilter {
        RosterFilter {
            start: self.hired_from,
            end: self.hired_to,
            departments: self.departments.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub(crate) enum PeriodArg {
    Month,
    Quarter,
    Year,
}

impl From<PeriodArg> for Granularity {
    fn from(arg: PeriodArg) -> Self {
        match arg {
            PeriodArg::Month => Self::Month,
            PeriodArg::Quarter => Self::Quarter,
            PeriodArg::Year => Self::Year,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub(crate) enum GroupArg {
    Department,
    ContractType,
    JobTitle,
}

impl From<GroupArg> for GroupKey {
    fn from(arg: GroupArg) -> Self {
        match arg {
            GroupArg::Department => Self::Department,
            GroupArg::ContractType => Self::ContractType,
            GroupArg::JobTitle => Self::JobTitle,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub(crate) enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
