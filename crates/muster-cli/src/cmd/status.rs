//! `muster status`: who the bot is and which groups it can see.

use std::io::Write;

use clap::Args;
use muster_core::config::MusterConfig;
use muster_core::model::GroupProfile;
use muster_core::remote::{GroupApi, LoginIdentity};
use serde::Serialize;
use tracing::warn;

use super::OrReport;
use crate::onebot::{OneBotClient, VersionInfo};
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug, Default)]
pub struct StatusArgs {}

#[derive(Debug, Serialize)]
struct StatusOutput {
    base_url: String,
    identity: LoginIdentity,
    #[serde(skip_serializing_if = "Option::is_none")]
    implementation: Option<VersionInfo>,
    groups: Vec<GroupProfile>,
}

pub fn run_status(
    _args: &StatusArgs,
    config: &MusterConfig,
    output: OutputMode,
) -> anyhow::Result<()> {
    let client = OneBotClient::new(&config.onebot);
    let identity = client.login_identity().or_report(output)?;

    let implementation = client
        .version_info()
        .inspect_err(|err| warn!(error = %err, "version info unavailable"))
        .ok();
    let groups = client.group_list().unwrap_or_else(|err| {
        warn!(error = %err, "group list unavailable");
        Vec::new()
    });

    let payload = StatusOutput {
        base_url: client.base_url().to_string(),
        identity,
        implementation,
        groups,
    };
    render_mode(output, &payload, render_status_text, render_status_pretty)
}

fn render_status_text(report: &StatusOutput, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(
        w,
        "bot {} {}",
        report.identity.user_id, report.identity.display_name
    )?;
    for group in &report.groups {
        writeln!(
            w,
            "group {} {}/{} {}",
            group.group_id, group.member_count, group.max_member_count, group.group_name
        )?;
    }
    Ok(())
}

fn render_status_pretty(report: &StatusOutput, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, "Bot")?;
    pretty_kv(w, "endpoint", &report.base_url)?;
    pretty_kv(
        w,
        "account",
        format!(
            "{} ({})",
            report.identity.display_name, report.identity.user_id
        ),
    )?;
    match &report.implementation {
        Some(version) => pretty_kv(
            w,
            "implementation",
            format!(
                "{} {} ({})",
                version.app_name, version.app_version, version.protocol_version
            ),
        )?,
        None => pretty_kv(w, "implementation", "unknown")?,
    }

    writeln!(w)?;
    pretty_section(w, &format!("Groups ({})", report.groups.len()))?;
    for group in &report.groups {
        writeln!(
            w,
            "  {:<12} {:>5}/{:<5} {}",
            group.group_id, group.member_count, group.max_member_count, group.group_name
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::testing::scratch_config;

    #[test]
    fn status_fails_when_bot_unreachable() {
        let (_dir, config) = scratch_config();
        let result = run_status(&StatusArgs {}, &config, OutputMode::Json);
        let err = result.expect_err("no bot on port 1");
        assert!(err.to_string().starts_with("E3001"));
    }

    #[test]
    fn pretty_render_lists_groups() {
        let report = StatusOutput {
            base_url: "http://bot".to_string(),
            identity: LoginIdentity {
                user_id: 10,
                display_name: "helper".to_string(),
            },
            implementation: None,
            groups: vec![GroupProfile::new(77, "club").with_counts(12, 200)],
        };
        let mut buf = Vec::new();
        render_status_pretty(&report, &mut buf).expect("render");
        let text = String::from_utf8(buf).expect("utf8");
        assert!(text.contains("helper (10)"));
        assert!(text.contains("club"));
        assert!(text.contains("Groups (1)"));
    }
}
