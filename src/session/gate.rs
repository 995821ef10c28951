use tracing::{debug, instrument};

use super::{errors::SessionError, service::SessionService, types::UserContext};

/// Paths that are served without a credential check
#[derive(Debug, Clone)]
pub struct AllowList {
    exact: Vec<String>,
    prefixes: Vec<String>,
}

impl AllowList {
    pub fn new<E, P>(exact: E, prefixes: P) -> Self
    where
        E: IntoIterator,
        E::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Self {
            exact: exact.into_iter().map(Into::into).collect(),
            prefixes: prefixes
                .into_iter()
                .map(|p| {
                    let p: String = p.into();
                    p.trim_end_matches('/').to_string()
                })
                .collect(),
        }
    }

    /// Exact match, or the path is a prefix entry or lies beneath one
    /// (`/static` covers `/static/app.css` but not `/staticfoo`)
    pub fn is_allowed(&self, path: &str) -> bool {
        self.exact.iter().any(|p| p == path)
            || self.prefixes.iter().any(|prefix| {
                path.strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
            })
    }
}

impl Default for AllowList {
    fn default() -> Self {
        Self::new(["/metrics", "/health", "/signup", "/login"], ["/static"])
    }
}

/// What the gate decided for a request
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    /// Allow-listed path, no credential looked at
    Bypass,
    /// Authenticated; `rotated_token` is set when the session was refreshed
    /// and the client must be handed the new credential
    Forward {
        principal: UserContext,
        rotated_token: Option<String>,
    },
}

/// Decides whether a request may proceed.
///
/// Every failure is returned with its specific kind; collapsing them into a
/// single unauthorized response is the caller's job.
#[instrument(skip(credential, allow_list, sessions))]
pub async fn gate(
    path: &str,
    credential: Option<&str>,
    allow_list: &AllowList,
    sessions: &SessionService,
) -> Result<GateDecision, SessionError> {
    if allow_list.is_allowed(path) {
        debug!("Allow-listed path, skipping credential check");
        return Ok(GateDecision::Bypass);
    }

    let credential = credential.ok_or(SessionError::CredentialMissing)?;
    let session = sessions.validate(credential, true).await?;

    let rotated_token = if session.token != credential {
        Some(session.token)
    } else {
        None
    };

    Ok(GateDecision::Forward {
        principal: session.user_context,
        rotated_token,
    })
}
