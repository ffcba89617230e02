//! `list` command - print the resolved script sequence

use super::GlobalArgs;
use crate::core::CommandSpec;
use clap::Args;

#[derive(Debug, Clone, Args)]
pub struct ListArgs {
    /// Print the sequence as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(global: &GlobalArgs, args: ListArgs) -> anyhow::Result<()> {
    let settings = global.settings()?;
    let spec = settings.command_spec();
    println!("{}", render(&spec, args.json)?);
    Ok(())
}

fn render(spec: &CommandSpec, json: bool) -> anyhow::Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(spec.steps())?);
    }

    let lines: Vec<String> = spec
        .iter()
        .enumerate()
        .map(|(i, step)| format!("{}. {}", i + 1, step.command_line()))
        .collect();
    Ok(lines.join("\n"))
}
