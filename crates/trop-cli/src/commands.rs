use std::io::Write;

use trop_core::models::StackStatus;
use trop_core::{JsonTemplate, Layout, StackTemplate};
use trop_stack::{
    Clock, CloudFormation, ControlPlane, StackError, SystemClock, build_request, stack_parameters,
    tail_events,
};

use crate::cli::{Cli, Command, ManageArgs};
use crate::{aws, config};

/// What every remote command runs against.
pub struct CommandContext<'a> {
    pub api: &'a dyn ControlPlane,
    pub clock: &'a dyn Clock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
}

/// Resolve configuration, build the CloudFormation client, and run the
/// requested command.
pub async fn run(cli: Cli, out: &mut dyn Write) -> eyre::Result<()> {
    // Rendering a template is purely local.
    if let Command::Template { template } = &cli.command {
        return Ok(template_document(&JsonTemplate::load(template)?, out)?);
    }

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => config::default_config_path()?,
    };
    let file = config::load_config(&config_path)?;
    let settings = config::resolve(file, cli.region.clone(), cli.profile.clone())?;
    let sdk_config = aws::build_aws_config(&settings).await;
    let api = CloudFormation::new(&sdk_config);

    let ctx = CommandContext {
        api: &api,
        clock: &SystemClock,
    };
    dispatch(&ctx, &cli.command, out).await
}

pub async fn dispatch(
    ctx: &CommandContext<'_>,
    command: &Command,
    out: &mut dyn Write,
) -> eyre::Result<()> {
    match command {
        Command::List { all } => list(ctx, *all, out).await?,
        Command::Events { name } => {
            tail_events(ctx.api, ctx.clock, name, out).await?;
        }
        Command::Outputs { name, key } => outputs(ctx, name, key.as_deref(), out).await?,
        Command::Parameters { name } => parameters(ctx, name, out).await?,
        Command::Template { template } => template_document(&JsonTemplate::load(template)?, out)?,
        Command::Create(args) => {
            manage(ctx, Operation::Create, args, out).await?;
        }
        Command::Update(args) => {
            manage(ctx, Operation::Update, args, out).await?;
        }
    }
    Ok(())
}

pub async fn list(ctx: &CommandContext<'_>, all: bool, out: &mut dyn Write) -> Result<(), StackError> {
    let filter = StackStatus::listable(all);
    for stack in ctx.api.list_stacks(&filter).await? {
        writeln!(out, "{:<15} {}", stack.name, stack.status)?;
    }
    Ok(())
}

/// All outputs, or only the value of the first output named `key`.
pub async fn outputs(
    ctx: &CommandContext<'_>,
    name: &str,
    key: Option<&str>,
    out: &mut dyn Write,
) -> Result<(), StackError> {
    let stack = ctx.api.describe_stack(name).await?;
    match key {
        Some(key) => {
            if let Some(output) = stack.outputs.iter().find(|o| o.key == key) {
                writeln!(out, "{}", output.value)?;
            }
        }
        None => {
            for output in &stack.outputs {
                writeln!(out, "{:<35}: {:<30}", output.key, output.value)?;
            }
        }
    }
    Ok(())
}

pub async fn parameters(
    ctx: &CommandContext<'_>,
    name: &str,
    out: &mut dyn Write,
) -> Result<(), StackError> {
    match stack_parameters(ctx.api, name).await? {
        Some(params) => {
            for (key, value) in params.iter() {
                writeln!(out, "{key:<35}: {value:<30}")?;
            }
        }
        None => writeln!(out, "Stack `{name}` does not exist.")?,
    }
    Ok(())
}

pub fn template_document(template: &dyn StackTemplate, out: &mut dyn Write) -> Result<(), StackError> {
    out.write_all(template.to_document(Layout::Pretty)?.as_bytes())?;
    Ok(())
}

/// Submit a create or update, then optionally tail until the stack settles.
///
/// Returns the final status when tailing. A rollback-terminal status is
/// logged as a warning but is not an error.
pub async fn manage(
    ctx: &CommandContext<'_>,
    operation: Operation,
    args: &ManageArgs,
    out: &mut dyn Write,
) -> Result<Option<StackStatus>, StackError> {
    let template = JsonTemplate::load(&args.template)?;
    let request = build_request(
        ctx.api,
        &template,
        &args.name,
        &args.parameters(),
        args.capability(),
    )
    .await?;

    match operation {
        Operation::Create => ctx.api.create_stack(&request).await?,
        Operation::Update => ctx.api.update_stack(&request).await?,
    }

    if !args.tail {
        return Ok(None);
    }

    let status = tail_events(ctx.api, ctx.clock, &args.name, out).await?;
    if status.is_rollback() {
        tracing::warn!(stack = %args.name, status = %status, "stack operation rolled back");
    } else {
        tracing::info!(stack = %args.name, status = %status, "stack operation finished");
    }
    Ok(Some(status))
}
