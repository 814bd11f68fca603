//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::{load_config, ExtractConfig, RangeDefinition};
use crate::error::{Error, Result};
use crate::interval::Interval;
use crate::partition::DatePartitioner;
use crate::types::{DateTimeRange, DATETIME_FORMAT};
use serde_json::{json, Value};
use tracing::debug;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Plan {
                start,
                end,
                interval,
            } => self.plan(start.as_deref(), end.as_deref(), interval.as_deref()),
            Commands::Validate => self.validate(),
        }
    }

    /// Load the config named by `-C`
    fn load_config(&self) -> Result<ExtractConfig> {
        let path = self
            .cli
            .config
            .as_ref()
            .ok_or_else(|| Error::config("Config file not specified (use -C flag)"))?;
        load_config(path)
    }

    /// Print the partitions of a range
    fn plan(&self, start: Option<&str>, end: Option<&str>, interval: Option<&str>) -> Result<()> {
        let config = match &self.cli.config {
            Some(_) => Some(self.load_config()?),
            None => None,
        };

        let mut bounds = config
            .as_ref()
            .map(|c| c.created.clone())
            .unwrap_or_default();
        if let Some(start) = start {
            bounds.start = Some(start.to_string());
        }
        if let Some(end) = end {
            bounds.end = Some(end.to_string());
        }

        let interval = match interval {
            Some(name) => name.parse::<Interval>()?,
            None => config
                .as_ref()
                .and_then(|c| c.partition)
                .ok_or_else(|| Error::missing_field("interval"))?,
        };

        let table = config.as_ref().map(|c| c.table.as_str());
        let plan = plan_message(table, &bounds, interval)?;
        self.output_message(&plan)
    }

    /// Validate the config file
    fn validate(&self) -> Result<()> {
        let config = self.load_config()?;
        let options = config.reader_options()?;
        debug!("Validated options: {options:?}");

        let mode = match options.partition {
            Some(interval) => format!("{interval} partitions on {} threads", options.threads.max(1)),
            None => "unpartitioned".to_string(),
        };
        self.output_message(&json!({
            "type": "LOG",
            "log": {
                "level": "INFO",
                "message": format!(
                    "Config for '{}' is valid: {} with page size {}, {}",
                    config.table,
                    options.pagination,
                    options.page_size,
                    mode
                )
            }
        }))
    }

    /// Output a JSON message in the selected format
    fn output_message(&self, msg: &Value) -> Result<()> {
        let line = match self.cli.format {
            OutputFormat::Json => serde_json::to_string(msg)?,
            OutputFormat::Pretty => serde_json::to_string_pretty(msg)?,
        };
        println!("{line}");
        Ok(())
    }
}

/// Build the `PLAN` message for a bounded range
fn plan_message(table: Option<&str>, bounds: &RangeDefinition, interval: Interval) -> Result<Value> {
    let range: DateTimeRange = bounds.to_range()?;
    if !range.is_bounded() {
        return Err(Error::config("Planning needs both a start and an end"));
    }

    let partitions: Vec<Value> = DatePartitioner::new(range, interval)
        .partitions()?
        .iter()
        .map(|p| {
            json!({
                "name": p.name(),
                "start": p.start().format(DATETIME_FORMAT).to_string(),
                "end": p.end().format(DATETIME_FORMAT).to_string(),
            })
        })
        .collect();

    Ok(json!({
        "type": "PLAN",
        "table": table,
        "range": range.to_string(),
        "interval": interval.name(),
        "count": partitions.len(),
        "partitions": partitions,
    }))
}
