// Command-line arguments, credential assembly, session-file persistence and report rendering.
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use portal_authz::{OrganizationId, Role, UserId};
use portal_client::{
    Credentials, DncCheckResult, DncRequest, RoleResolution, Session, SessionSnapshot,
};
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "portal-agent")]
#[command(about = "Resolve portal roles and work DNC requests from the command line")]
pub struct Args {
    /// YAML config overlay (also: PORTAL_CLIENT_CONFIG)
    #[arg(long, env = "PORTAL_CLIENT_CONFIG")]
    pub config: Option<String>,

    /// Bearer token; takes precedence over identity headers
    #[arg(long, env = "PORTAL_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Organization id for header credentials
    #[arg(long, env = "PORTAL_ORG_ID")]
    pub org_id: Option<i64>,

    /// User id for header credentials
    #[arg(long, env = "PORTAL_USER_ID")]
    pub user_id: Option<i64>,

    /// Role for header credentials
    #[arg(long, env = "PORTAL_ROLE")]
    pub role: Option<String>,

    /// File the session snapshot is restored from and saved to
    #[arg(long)]
    pub session_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Resolve and print the effective role and visible sections
    Whoami {
        /// View as another role (superadmins only)
        #[arg(long = "as")]
        view_as: Option<String>,
    },
    /// Check phone numbers against the DNC list
    Check {
        #[arg(required = true)]
        numbers: Vec<String>,
    },
    /// Print the organization's removal-request history
    History,
    /// Forget the persisted session
    SignOut,
}

impl Args {
    /// Credentials from flags or environment; `None` when nothing is configured.
    pub fn credentials(&self) -> Result<Option<Credentials>> {
        if let Some(token) = self.token.as_deref().map(str::trim)
            && !token.is_empty()
        {
            return Ok(Some(Credentials::bearer(token)));
        }
        match (self.org_id, self.user_id, self.role.as_deref()) {
            (None, None, None) => Ok(None),
            (Some(org_id), Some(user_id), Some(role)) => {
                let role = Role::parse(role).context("parse --role")?;
                Ok(Some(Credentials::headers(
                    OrganizationId::new(org_id),
                    UserId::new(user_id),
                    role,
                )))
            }
            _ => bail!("header credentials need --org-id, --user-id and --role together"),
        }
    }
}

pub fn load_session(path: Option<&Path>) -> Result<Session> {
    let Some(path) = path else {
        return Ok(Session::new());
    };
    if !path.exists() {
        return Ok(Session::new());
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read session file {}", path.display()))?;
    let snapshot: SessionSnapshot = serde_json::from_str(&contents)
        .with_context(|| format!("parse session file {}", path.display()))?;
    tracing::debug!(path = %path.display(), "session restored");
    Ok(Session::restore(snapshot))
}

pub fn save_session(path: Option<&Path>, session: &Session) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let contents = serde_json::to_string_pretty(&session.snapshot()).context("encode session")?;
    fs::write(path, contents).with_context(|| format!("write session file {}", path.display()))
}

pub fn clear_session(path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) if path.exists() => fs::remove_file(path)
            .with_context(|| format!("remove session file {}", path.display())),
        _ => Ok(()),
    }
}

pub fn whoami_report(resolution: &RoleResolution, session: &Session) -> Value {
    let principal = resolution.principal;
    let effective = session.effective_role();
    json!({
        "effective_role": effective,
        "resolving": effective.is_resolving(),
        "base_role": principal.map(|principal| principal.role),
        "override_role": session.override_role(),
        "source": principal.map(|principal| principal.source.as_str()),
        "organization_id": session.organization_id(),
        "user_id": session.user_id(),
        "sections": session.visible_sections(),
    })
}

pub fn check_report(results: &[DncCheckResult], rejected: &[String]) -> Value {
    json!({
        "results": results,
        "rejected": rejected,
        "listed": results.iter().filter(|result| result.is_dnc).count(),
    })
}

pub fn history_report(org_id: OrganizationId, requests: &[DncRequest]) -> Value {
    json!({
        "organization_id": org_id,
        "count": requests.len(),
        "requests": requests,
    })
}
