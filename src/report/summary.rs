use std::fmt::Write;

use chrono::{DateTime, Utc};

use super::{FirstEverythingReport, Timestamp};

const RULE_WIDTH: usize = 60;

fn date(value: &DateTime<Utc>) -> String {
    value.format("%Y-%m-%d").to_string()
}

fn tagged(value: &Timestamp) -> String {
    if value.is_approximate() {
        format!("~{}", date(&value.at()))
    } else {
        date(&value.at())
    }
}

fn short_sha(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}

/// Human-readable multi-line summary of a report.
///
/// Only populated fields get a line; approximate dates are prefixed with `~`.
pub fn render_summary(report: &FirstEverythingReport) -> String {
    let mut lines = vec![
        format!("📊 First Everything Report for @{}", report.username),
        "=".repeat(RULE_WIDTH),
    ];

    if let Some(account) = &report.account_created {
        lines.push(format!("👤 Account created: {}", date(&account.created_at)));
    }
    if let Some(repo) = &report.first_repository {
        lines.push(format!("📂 First repository: {} ({})", repo.name, date(&repo.created_at)));
    }
    if let Some(commit) = &report.first_commit {
        lines.push(format!(
            "💾 First commit: {} in {} ({})",
            short_sha(&commit.sha),
            commit.repository,
            date(&commit.committed_at)
        ));
    }
    if let Some(issue) = &report.first_issue {
        lines.push(format!(
            "🐛 First issue: {}#{} ({})",
            issue.repository,
            issue.number,
            date(&issue.created_at)
        ));
    }
    if let Some(pr) = &report.first_pull_request {
        lines.push(format!(
            "🔀 First PR: {}#{} ({})",
            pr.repository,
            pr.number,
            date(&pr.created_at)
        ));
    }
    if let Some(gist) = &report.first_gist {
        lines.push(format!("📝 First gist: {} ({})", gist.id, date(&gist.created_at)));
    }
    if let Some(starred) = &report.first_starred_repo {
        lines.push(format!(
            "⭐ First starred repo: {} ({})",
            starred.full_name,
            tagged(&starred.starred_at)
        ));
    }
    if let Some(run) = &report.first_workflow_run {
        lines.push(format!(
            "⚡ First workflow run: {} in {} ({})",
            run.name,
            run.repository,
            date(&run.created_at)
        ));
    }
    if let Some(fork) = &report.first_fork {
        lines.push(format!("🍴 First fork: {} ({})", fork.name, date(&fork.created_at)));
    }
    if let Some(org) = &report.first_organization {
        lines.push(format!("🏢 First organization: {}", org.login));
    }
    if let Some(following) = &report.first_following {
        lines.push(format!("👥 First following: {}", following.login));
    }
    if let Some(follower) = &report.first_follower {
        lines.push(format!("👥 First follower: {}", follower.login));
    }
    if let Some(event) = &report.first_public_event {
        lines.push(format!(
            "📅 First public event: {} on {} ({})",
            event.event_type,
            event.repository,
            date(&event.created_at)
        ));
    }
    if let Some(release) = &report.first_release {
        lines.push(format!(
            "🚀 First release: {} of {} ({})",
            release.tag_name,
            release.repository,
            date(&release.created_at)
        ));
    }
    if let Some(comment) = &report.first_comment {
        lines.push(format!(
            "💬 First comment: On {}#{} ({})",
            comment.repository,
            comment.issue_number,
            date(&comment.created_at)
        ));
    }
    if let Some(watch) = &report.first_watch {
        lines.push(format!(
            "👀 First watched repo: {} ({})",
            watch.full_name,
            tagged(&watch.watched_at)
        ));
    }
    if let Some(contribution) = &report.first_contribution {
        lines.push(format!(
            "🤝 First contribution: {} to {} ({})",
            contribution.kind.label(),
            contribution.repository,
            date(&contribution.created_at)
        ));
    }

    let mut summary = lines.join("\n");
    let _ = write!(
        summary,
        "\n\n🔍 Found {} different \"first\" items!",
        report.found_count()
    );
    summary
}
