//! Probes answered by the issue search endpoint, sorted by creation time.

use crate::api::{IssueItem, ListQuery, MAX_PER_PAGE, SearchQuery};
use crate::report::{CommentRecord, IssueRecord};

use super::strategy::fan_out_earliest;
use super::{ProbeContext, ProbeError};

/// `owner/repo` of a search hit, derived from its repository API URL.
pub(super) fn repository_of(item: &IssueItem) -> Result<(String, String), ProbeError> {
    item.repository_coordinates().ok_or_else(|| {
        ProbeError::MalformedResponse(format!(
            "unrecognised repository url {:?}",
            item.repository_url
        ))
    })
}

fn issue_record(item: IssueItem) -> Result<IssueRecord, ProbeError> {
    let (owner, repo) = repository_of(&item)?;
    Ok(IssueRecord {
        number: item.number,
        title: item.title,
        repository: format!("{owner}/{repo}"),
        url: item.html_url,
        created_at: item.created_at,
    })
}

async fn oldest_hit(
    ctx: &ProbeContext,
    qualifiers: [String; 2],
) -> Result<Option<IssueRecord>, ProbeError> {
    let query = SearchQuery::oldest_first(qualifiers, 1);
    let page = ctx.call(ctx.api().search_issues(&query)).await?;
    page.items.into_iter().next().map(issue_record).transpose()
}

pub async fn first_issue(ctx: &ProbeContext) -> Result<Option<IssueRecord>, ProbeError> {
    oldest_hit(ctx, [format!("author:{}", ctx.username()), "type:issue".into()]).await
}

pub async fn first_pull_request(ctx: &ProbeContext) -> Result<Option<IssueRecord>, ProbeError> {
    oldest_hit(ctx, [format!("author:{}", ctx.username()), "type:pr".into()]).await
}

/// Earliest comment by the user across the oldest issues they commented on.
///
/// The search only ranks issues by their own creation time, so each candidate's
/// comments are listed and the user's earliest one wins across all candidates.
pub async fn first_comment(ctx: &ProbeContext) -> Result<Option<CommentRecord>, ProbeError> {
    let query = SearchQuery::oldest_first(
        [format!("commenter:{}", ctx.username())],
        ctx.settings().comment_candidates,
    );
    let candidates = ctx.call(ctx.api().search_issues(&query)).await?.items;

    fan_out_earliest(
        &candidates,
        |issue| async move {
            let (owner, repo) = repository_of(issue)?;
            let comments = ctx
                .call(ctx.api().list_issue_comments(
                    &owner,
                    &repo,
                    issue.number,
                    &ListQuery::new(MAX_PER_PAGE),
                ))
                .await?;
            Ok::<_, ProbeError>(comments
                .items
                .into_iter()
                .filter(|comment| {
                    comment
                        .user
                        .as_ref()
                        .is_some_and(|user| ctx.is_own(&user.login))
                })
                .map(|comment| CommentRecord {
                    comment_id: comment.id,
                    issue_number: issue.number,
                    repository: format!("{owner}/{repo}"),
                    url: comment.html_url,
                    created_at: comment.created_at,
                })
                .collect::<Vec<_>>())
        },
        |comment: &CommentRecord| comment.created_at,
    )
    .await
}
