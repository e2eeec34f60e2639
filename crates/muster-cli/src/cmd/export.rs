use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Args, ValueEnum};
use muster_core::config::MusterConfig;
use muster_core::model::MemberRecord;
use muster_core::remote::{Freshness, GroupApi};
use serde::Serialize;

use super::{OrReport, manager};
use crate::onebot::OneBotClient;
use crate::output::{OutputMode, render};

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Stored snapshot to export.
    #[arg(required_unless_present = "group", conflicts_with = "group")]
    pub snapshot: Option<i64>,

    /// Export the live roster of this group instead of a snapshot.
    #[arg(long, value_name = "GROUP")]
    pub group: Option<i64>,

    /// File format of the export.
    #[arg(id = "export_format", long = "as", value_name = "FORMAT", value_enum, default_value_t = ExportFormat::Json)]
    pub format: ExportFormat,

    /// Write the document here instead of stdout.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Json,
    Csv,
}

/// Live roster document written by `export --group`.
#[derive(Debug, Serialize)]
struct RosterExport<'a> {
    group_id: i64,
    exported_at: DateTime<Utc>,
    member_count: usize,
    members: &'a [MemberRecord],
}

/// One CSV line per member.
#[derive(Debug, Serialize)]
struct MemberRow<'a> {
    user_id: i64,
    display_name: &'a str,
    group_card: &'a str,
    role: &'static str,
    gender: &'static str,
    level: &'a str,
    title: &'a str,
    joined_at: String,
    last_active_at: String,
}

impl<'a> From<&'a MemberRecord> for MemberRow<'a> {
    fn from(member: &'a MemberRecord) -> Self {
        let rfc3339 = |at: Option<DateTime<Utc>>| at.map(|at| at.to_rfc3339()).unwrap_or_default();
        Self {
            user_id: member.user_id,
            display_name: &member.display_name,
            group_card: &member.group_card,
            role: member.role.as_str(),
            gender: member.gender.as_str(),
            level: &member.level,
            title: &member.title,
            joined_at: rfc3339(member.joined_at),
            last_active_at: rfc3339(member.last_active_at),
        }
    }
}

#[derive(Debug, Serialize)]
struct ExportOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    snapshot_id: Option<i64>,
    group_id: i64,
    path: PathBuf,
    member_count: usize,
}

/// Write `members` as CSV with a header row. An empty roster writes nothing.
fn write_members_csv<W: Write>(members: &[MemberRecord], writer: W) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for member in members {
        wtr.serialize(MemberRow::from(member))
            .with_context(|| format!("failed to write CSV row for {}", member.user_id))?;
    }
    wtr.flush().context("failed to flush CSV")?;
    Ok(())
}

/// Execute `muster export`: a stored snapshot or a live roster as JSON or CSV.
pub fn run_export(args: &ExportArgs, config: &MusterConfig, output: OutputMode) -> anyhow::Result<()> {
    let mut body = Vec::new();
    let report = if let Some(group_id) = args.group {
        let members = OneBotClient::new(&config.onebot)
            .list_group_members(group_id, Freshness::BypassCache)
            .or_report(output)?;
        match args.format {
            ExportFormat::Json => {
                let document = RosterExport {
                    group_id,
                    exported_at: Utc::now(),
                    member_count: members.len(),
                    members: &members,
                };
                serde_json::to_writer_pretty(&mut body, &document)?;
                writeln!(body)?;
            }
            ExportFormat::Csv => write_members_csv(&members, &mut body)?,
        }
        ExportOutput {
            snapshot_id: None,
            group_id,
            path: PathBuf::new(),
            member_count: members.len(),
        }
    } else {
        let snapshot_id = args
            .snapshot
            .context("a snapshot id or --group is required")?;
        let document = manager(config, output)?
            .load_archive(snapshot_id)
            .or_report(output)?;
        match args.format {
            ExportFormat::Json => {
                serde_json::to_writer_pretty(&mut body, &document)?;
                writeln!(body)?;
            }
            ExportFormat::Csv => write_members_csv(&document.members, &mut body)?,
        }
        ExportOutput {
            snapshot_id: Some(document.snapshot_id),
            group_id: document.group_id,
            path: PathBuf::new(),
            member_count: document.member_count,
        }
    };

    let Some(path) = &args.output else {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        out.write_all(&body)?;
        return Ok(());
    };

    std::fs::write(path, &body).with_context(|| format!("failed to write {}", path.display()))?;
    let report = ExportOutput {
        path: path.clone(),
        ..report
    };
    render(output, &report, |r, w| match r.snapshot_id {
        Some(id) => writeln!(
            w,
            "exported snapshot {id} ({} members) to {}",
            r.member_count,
            r.path.display()
        ),
        None => writeln!(
            w,
            "exported group {} ({} members) to {}",
            r.group_id,
            r.member_count,
            r.path.display()
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use muster_core::model::Role;

    #[test]
    fn csv_has_header_and_one_row_per_member() {
        let members = vec![
            MemberRecord::new(1, "alice").with_role(Role::Owner),
            MemberRecord::new(2, "bob, jr").with_card("Bobby"),
        ];
        let mut buf = Vec::new();
        write_members_csv(&members, &mut buf).expect("csv");
        let text = String::from_utf8(buf).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "user_id,display_name,group_card,role,gender,level,title,joined_at,last_active_at"
        );
        assert_eq!(lines[1], "1,alice,,owner,unknown,,,,");
        assert_eq!(lines[2], "2,\"bob, jr\",Bobby,member,unknown,,,,");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn empty_roster_writes_nothing() {
        let mut buf = Vec::new();
        write_members_csv(&[], &mut buf).expect("csv");
        assert!(buf.is_empty());
    }
}
