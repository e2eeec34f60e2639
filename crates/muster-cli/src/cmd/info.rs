//! `muster info`: live metadata and role breakdown of one group.

use std::io::Write;

use chrono::{DateTime, Utc};
use clap::Args;
use muster_core::config::MusterConfig;
use muster_core::model::{GroupProfile, RoleCounts};
use muster_core::remote::{Freshness, GroupApi};
use serde::Serialize;
use tracing::warn;

use super::{OrReport, manager, timestamp};
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct InfoArgs {
    pub group: i64,

    /// Ask the bot to bypass its own cache.
    #[arg(long)]
    pub no_cache: bool,
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    group: GroupProfile,
    roles: RoleCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_backup_at: Option<DateTime<Utc>>,
}

pub fn run_info(args: &InfoArgs, config: &MusterConfig, output: OutputMode) -> anyhow::Result<()> {
    let freshness = if args.no_cache {
        Freshness::BypassCache
    } else {
        Freshness::Cached
    };
    let manager = manager(config, output)?;
    let group = manager
        .api()
        .group_info(args.group, freshness)
        .or_report(output)?;
    let members = manager
        .api()
        .list_group_members(args.group, freshness)
        .or_report(output)?;
    let last_backup_at = manager
        .group_profile(args.group)
        .unwrap_or_else(|err| {
            warn!(group_id = args.group, error = %err, "stored group record unavailable");
            None
        })
        .and_then(|stored| stored.last_backup_at);

    let payload = InfoOutput {
        group,
        roles: RoleCounts::of(&members),
        last_backup_at,
    };
    render_mode(output, &payload, render_info_text, render_info_pretty)
}

fn render_info_text(info: &InfoOutput, w: &mut dyn Write) -> std::io::Result<()> {
    let g = &info.group;
    let r = &info.roles;
    writeln!(
        w,
        "{}\t{}\t{}/{}",
        g.group_id, g.group_name, g.member_count, g.max_member_count
    )?;
    writeln!(
        w,
        "owners={}\tadmins={}\tmembers={}\ttotal={}",
        r.owners, r.admins, r.members, r.total
    )
}

fn render_info_pretty(info: &InfoOutput, w: &mut dyn Write) -> std::io::Result<()> {
    let g = &info.group;
    pretty_section(w, &format!("Group {}", g.group_id))?;
    pretty_kv(w, "name", &g.group_name)?;
    pretty_kv(w, "members", format!("{}/{}", g.member_count, g.max_member_count))?;
    pretty_kv(
        w,
        "last backup",
        info.last_backup_at.map_or_else(|| "never".to_string(), timestamp),
    )?;

    writeln!(w)?;
    pretty_section(w, "Roles")?;
    pretty_kv(w, "owners", info.roles.owners.to_string())?;
    pretty_kv(w, "admins", info.roles.admins.to_string())?;
    pretty_kv(w, "members", info.roles.members.to_string())?;
    pretty_kv(w, "total", info.roles.total.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use muster_core::model::{MemberRecord, Role};

    fn sample() -> InfoOutput {
        let roster = [
            MemberRecord::new(1, "o").with_role(Role::Owner),
            MemberRecord::new(2, "a").with_role(Role::Admin),
            MemberRecord::new(3, "m"),
        ];
        InfoOutput {
            group: GroupProfile::new(55, "chess").with_counts(3, 100),
            roles: RoleCounts::of(&roster),
            last_backup_at: None,
        }
    }

    #[test]
    fn text_lists_counts_by_role() {
        let mut buf = Vec::new();
        render_info_text(&sample(), &mut buf).expect("render");
        let text = String::from_utf8(buf).expect("utf8");
        assert_eq!(
            text,
            "55\tchess\t3/100\nowners=1\tadmins=1\tmembers=1\ttotal=3\n"
        );
    }

    #[test]
    fn pretty_says_never_without_backup() {
        let mut buf = Vec::new();
        render_info_pretty(&sample(), &mut buf).expect("render");
        let text = String::from_utf8(buf).expect("utf8");
        assert!(text.contains("never"));
        assert!(text.contains("Roles"));
    }
}
