//! Probes answered by the user profile and its account listings.
//!
//! Organization and follow listings expose no membership or follow time, so
//! these records carry none; the platform's default listing order is taken as
//! the "first" one.

use crate::api::ListQuery;
use crate::report::{AccountLinkRecord, AccountRecord, OrganizationRecord};

use super::{ProbeContext, ProbeError};

pub async fn account_created(ctx: &ProbeContext) -> Result<Option<AccountRecord>, ProbeError> {
    let profile = ctx.call(ctx.api().get_user(ctx.username())).await?;
    Ok(Some(AccountRecord {
        login: profile.login,
        created_at: profile.created_at,
    }))
}

pub async fn first_organization(
    ctx: &ProbeContext,
) -> Result<Option<OrganizationRecord>, ProbeError> {
    let page = ctx
        .call(ctx.api().list_organizations(ctx.username(), &ListQuery::new(1)))
        .await?;
    Ok(page.items.into_iter().next().map(|org| OrganizationRecord {
        login: org.login,
        description: org.description,
    }))
}

pub async fn first_following(ctx: &ProbeContext) -> Result<Option<AccountLinkRecord>, ProbeError> {
    let page = ctx
        .call(ctx.api().list_following(ctx.username(), &ListQuery::new(1)))
        .await?;
    Ok(page.items.into_iter().next().map(|user| AccountLinkRecord {
        login: user.login,
        url: user.html_url,
    }))
}

pub async fn first_follower(ctx: &ProbeContext) -> Result<Option<AccountLinkRecord>, ProbeError> {
    let page = ctx
        .call(ctx.api().list_followers(ctx.username(), &ListQuery::new(1)))
        .await?;
    Ok(page.items.into_iter().next().map(|user| AccountLinkRecord {
        login: user.login,
        url: user.html_url,
    }))
}
