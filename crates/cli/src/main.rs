use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::Value;
use taskflow_engine::navigation::{
    ConditionSkipRuleFactory, NavigatorLayer, OrderedStepNavigator, SkipRule, SkipToStepRuleFactory, compose,
};
use taskflow_engine::{
    AsyncActionSchedule, DirectoryResourceProvider, RecorderRegistry, ResourceTaskRepository, StepNavigator,
    TaskRepository,
};
use taskflow_types::identifier::IDENTIFIER_SEPARATOR;
use taskflow_types::{ActionType, LeafStep, StepResult, TaskResult};
use taskflow_util::TaskflowConfig;
use tracing::{debug, warn};

#[derive(Debug, Parser)]
#[command(name = "taskflow", version, about = "Inspect and walk research task definitions")]
struct Cli {
    /// Asset directory holding task/, task/info/ and task/transformer/
    #[arg(long, global = true, value_name = "DIR")]
    assets: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the resolved task as JSON
    Task { identifier: String },
    /// Print the task info as JSON
    Info { identifier: String },
    /// Print the steps a participant visits from start to end
    Walk {
        identifier: String,
        /// Step or section to skip, qualified or as authored; repeatable
        #[arg(long = "skip", value_name = "ID")]
        skip: Vec<String>,
        /// JSON object of answers keyed by qualified step identifier
        #[arg(long, value_name = "FILE")]
        answers: Option<PathBuf>,
        /// Action the participant takes at a step, e.g. `overview=skip`; repeatable
        #[arg(long = "action", value_name = "ID=ACTION", value_parser = parse_step_action)]
        actions: Vec<(String, ActionType)>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, config_error) = match TaskflowConfig::load() {
        Ok(config) => (config, None),
        Err(error) => (TaskflowConfig::default(), Some(error)),
    };
    init_tracing(config.log_filter());
    if let Some(error) = config_error {
        warn!(error = %error, "Failed to read configuration; using defaults");
    }

    let assets = cli
        .assets
        .or_else(|| config.asset_root.clone())
        .context("no asset directory; pass --assets or set TASKFLOW_ASSET_ROOT")?;
    debug!(assets = %assets.display(), "using asset directory");
    let repository = ResourceTaskRepository::new(DirectoryResourceProvider::new(assets));

    match cli.command {
        Command::Task { identifier } => {
            let task = repository
                .get_task(&identifier)
                .await
                .with_context(|| format!("loading task '{identifier}'"))?;
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
        Command::Info { identifier } => {
            let info = repository
                .get_task_info(&identifier)
                .await
                .with_context(|| format!("loading task info '{identifier}'"))?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Command::Walk {
            identifier,
            skip,
            answers,
            actions,
        } => {
            let answers = match answers {
                Some(path) => load_answers(&path)?,
                None => HashMap::new(),
            };
            let walk = Walk {
                skip,
                answers,
                actions,
                guard_revisits: config.navigation.guard_revisits,
            };
            walk_task(&repository, &identifier, walk).await?;
        }
    }
    Ok(())
}

fn init_tracing(default_filter: &str) {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_answers(path: &Path) -> Result<HashMap<String, Value>> {
    let data = fs::read_to_string(path).with_context(|| format!("reading answers from {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("parsing answers in {}", path.display()))
}

/// Parses `ID=ACTION`, where `ACTION` is a step action slot such as `skip`.
fn parse_step_action(value: &str) -> Result<(String, ActionType), String> {
    let (step, action) = value
        .split_once('=')
        .ok_or_else(|| format!("expected ID=ACTION, got '{value}'"))?;
    if step.is_empty() {
        return Err(format!("missing step identifier in '{value}'"));
    }
    let action = serde_json::from_value(Value::String(action.to_string()))
        .map_err(|_| format!("unknown action '{action}'; expected goForward, goBackward, skip, cancel or learnMore"))?;
    Ok((step.to_string(), action))
}

/// Participant input replayed by `walk`.
struct Walk {
    skip: Vec<String>,
    answers: HashMap<String, Value>,
    actions: Vec<(String, ActionType)>,
    guard_revisits: bool,
}

impl Walk {
    fn action_for(&self, step: &str) -> Option<ActionType> {
        self.actions
            .iter()
            .find(|(id, _)| names_step(id, step))
            .map(|(_, action)| *action)
    }
}

async fn walk_task(
    repository: &ResourceTaskRepository<DirectoryResourceProvider>,
    identifier: &str,
    walk: Walk,
) -> Result<()> {
    let task = repository
        .get_task(identifier)
        .await
        .with_context(|| format!("loading task '{identifier}'"))?;
    let schedule = AsyncActionSchedule::new(&task);
    let step_limit = task.leaves().len();

    let skip = walk.skip.clone();
    let listed = move |step: &LeafStep| -> Option<Box<dyn SkipRule>> {
        skip.iter()
            .any(|id| names_step(id, &step.identifier))
            .then(|| Box::new(|_: &LeafStep, _: &TaskResult| true) as Box<dyn SkipRule>)
    };
    let navigator = compose(
        Box::new(OrderedStepNavigator::new(Arc::new(task))),
        vec![
            NavigatorLayer::jump(SkipToStepRuleFactory),
            NavigatorLayer::skip(ConditionSkipRuleFactory).with_guard_revisits(walk.guard_revisits),
            NavigatorLayer::skip(listed).with_guard_revisits(walk.guard_revisits),
        ],
    );

    let mut result = TaskResult::new(identifier);
    let mut recorders = RecorderRegistry::new();
    recorders.begin_task(identifier, &schedule);

    let mut visits = 0;
    let mut current = navigator.next_step(None, &result);
    while let Some(step) = current {
        visits += 1;
        if visits > step_limit {
            bail!("navigation of '{identifier}' did not finish within {step_limit} steps");
        }

        recorders.enter_step(identifier, &schedule, &step.identifier);
        let position = navigator
            .progress(step, &result)
            .map(|progress| {
                let marker = if progress.is_estimated { "~" } else { "" };
                format!("{marker}{}/{}", progress.current, progress.total)
            })
            .unwrap_or_default();
        let active = recorders.active_recorders(identifier).join(",");
        if active.is_empty() {
            println!("{position:>7}  {}", step.identifier);
        } else {
            println!("{position:>7}  {}  [recording: {active}]", step.identifier);
        }

        let answer = walk.answers.get(&step.identifier).cloned().unwrap_or(Value::Null);
        let mut step_result = StepResult::new(step.identifier.clone()).with_answer(answer);
        if let Some(action) = walk.action_for(&step.identifier) {
            debug!(step = %step.identifier, action = ?action, "recording navigation action");
            step_result = step_result.with_navigation_action(action);
        }
        result.append(step_result);
        recorders.leave_step(identifier, &schedule, &step.identifier);
        current = navigator.next_step(Some(step), &result);
    }
    Ok(())
}

/// True when `id` is the step itself, its authored local name, or an enclosing section.
fn names_step(id: &str, step: &str) -> bool {
    step == id
        || step
            .strip_suffix(id)
            .is_some_and(|head| head.ends_with(IDENTIFIER_SEPARATOR))
        || step
            .strip_prefix(id)
            .is_some_and(|tail| tail.starts_with(IDENTIFIER_SEPARATOR))
}
