//! Panels command.

use anyhow::Result;
use clevertime_core::panels::Panel;
use serde::Serialize;
use tabled::Tabled;

use crate::output::print_output;

use super::CommandContext;

#[derive(Debug, Serialize, Tabled)]
struct PanelRow {
    #[tabled(rename = "Key")]
    key: &'static str,
    #[tabled(rename = "Title")]
    title: &'static str,
    #[tabled(rename = "Command")]
    command: &'static str,
}

fn command_for(panel: Panel) -> &'static str {
    match panel {
        Panel::Model => "advise",
        Panel::Cache => "cache",
        Panel::Sql => "convert",
        Panel::Mitoviz => "viz",
    }
}

pub fn run(ctx: &CommandContext) -> Result<()> {
    let rows: Vec<PanelRow> = Panel::ALL
        .iter()
        .map(|&panel| PanelRow {
            key: panel.key(),
            title: panel.title(),
            command: command_for(panel),
        })
        .collect();
    print_output(&rows, ctx.format);
    Ok(())
}
