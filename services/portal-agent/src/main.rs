// Portal agent entry point: resolves the caller's role and drives the DNC endpoints.
mod cli;
mod observability;

use anyhow::{Context, Result, bail};
use clap::Parser;
use cli::{Args, Command};
use portal_authz::{NavigationSection, OrganizationId, Role, can_view};
use portal_client::overrides::set_override;
use portal_client::{
    ClientConfig, Credentials, DncClient, HttpIdentitySource, RoleResolution, RoleResolver,
    Session, normalize_numbers,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    observability::init_observability(args.verbose);

    let config = ClientConfig::from_env_or_yaml(args.config.as_deref())?;
    let credentials = args.credentials()?;
    tracing::debug!(api_url = %config.api_url, credentials = ?credentials, "portal agent starting");

    let session_file = args.session_file.as_deref();
    let session = cli::load_session(session_file)?;

    let report = match &args.command {
        Command::SignOut => {
            session.sign_out();
            cli::clear_session(session_file)?;
            tracing::info!("session cleared");
            return Ok(());
        }
        Command::Whoami { view_as } => {
            let resolution = resolve(&config, &session, credentials.as_ref()).await?;
            if let Some(view_as) = view_as {
                let role = Role::parse(view_as).context("parse --as")?;
                set_override(&session, role);
                if session.override_role() != Some(role) {
                    tracing::warn!(
                        requested = %role,
                        "override ignored; base role is not superadmin"
                    );
                }
            }
            cli::whoami_report(&resolution, &session)
        }
        Command::Check { numbers } => {
            resolve(&config, &session, credentials.as_ref()).await?;
            require_any_section(&session, &[NavigationSection::DncChecker])?;
            let normalized = normalize_numbers(numbers);
            for rejected in &normalized.rejected {
                tracing::warn!(input = %rejected, "skipping invalid phone number");
            }
            let dnc = DncClient::new(&config, credentials.clone())?;
            let results = dnc
                .check_numbers(&normalized.valid)
                .await
                .context("check phone numbers")?;
            cli::check_report(&results, &normalized.rejected)
        }
        Command::History => {
            resolve(&config, &session, credentials.as_ref()).await?;
            require_any_section(
                &session,
                &[NavigationSection::MyRequests, NavigationSection::AdminDashboard],
            )?;
            let org_id = organization(&args, &session)?;
            let dnc = DncClient::new(&config, credentials.clone())?;
            let requests = dnc
                .request_history(org_id)
                .await
                .context("load request history")?;
            cli::history_report(org_id, &requests)
        }
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("encode report")?
    );
    cli::save_session(session_file, &session)?;
    Ok(())
}

async fn resolve(
    config: &ClientConfig,
    session: &Session,
    credentials: Option<&Credentials>,
) -> Result<RoleResolution> {
    let source = HttpIdentitySource::new(config).context("build identity client")?;
    let resolver = RoleResolver::new(Arc::new(source), config.claim_rules());
    let resolution = resolver.resolve(session, credentials).await;
    if resolution.effective.is_resolving() {
        tracing::warn!("role unresolved; only the main view is available");
    } else if let Some(principal) = resolution.principal {
        tracing::info!(
            role = %principal.role,
            source = %principal.source,
            "role resolved"
        );
    }
    Ok(resolution)
}

fn require_any_section(session: &Session, sections: &[NavigationSection]) -> Result<()> {
    let effective = session.effective_role();
    if !sections.iter().any(|section| can_view(effective, *section)) {
        bail!("role {effective} cannot open this view");
    }
    Ok(())
}

fn organization(args: &Args, session: &Session) -> Result<OrganizationId> {
    session
        .organization_id()
        .or(args.org_id.map(OrganizationId::new))
        .context("organization id unknown; pass --org-id or use a token that carries org_id")
}
