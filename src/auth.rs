//! Access gate over an external identity provider.
//!
//! Sign-in and sign-up happen on the provider's hosted pages, opened in the
//! system browser. The app only supplies its publishable key and where to
//! return afterwards, and reads the resulting session token from the
//! environment. Tokens are never validated here.

use crate::config::AuthConfig;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("No publishable key configured")]
    MissingKey,
    #[error("Failed to open browser: {0}")]
    Browser(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
}

pub trait IdentityProvider {
    fn sign_in_url(&self) -> Result<String, AuthError>;
    fn sign_up_url(&self) -> Result<String, AuthError>;
    fn session(&self) -> Option<Session>;

    fn open_sign_in(&self) -> Result<(), AuthError> {
        let url = self.sign_in_url()?;
        info!("Opening sign-in page");
        open::that(url)?;
        Ok(())
    }

    fn open_sign_up(&self) -> Result<(), AuthError> {
        let url = self.sign_up_url()?;
        info!("Opening sign-up page");
        open::that(url)?;
        Ok(())
    }
}

/// Provider-hosted pages configured in `[auth]`.
#[derive(Debug, Clone)]
pub struct HostedIdentity {
    config: AuthConfig,
    session: Option<Session>,
}

impl HostedIdentity {
    /// Session token taken from the environment variable named in config.
    pub fn from_env(config: AuthConfig) -> Self {
        let token = std::env::var(&config.session_env).ok();
        debug!(
            "Session variable {} {}",
            config.session_env,
            if token.is_some() { "set" } else { "unset" }
        );
        Self::with_token(config, token)
    }

    pub fn with_token(config: AuthConfig, token: Option<String>) -> Self {
        let session = token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .map(|token| Session { token });
        Self { config, session }
    }

    fn hosted_url(&self, base: &str) -> Result<String, AuthError> {
        if self.config.publishable_key.trim().is_empty() {
            return Err(AuthError::MissingKey);
        }
        let separator = if base.contains('?') { '&' } else { '?' };
        Ok(format!(
            "{}{}publishable_key={}&redirect_url={}",
            base,
            separator,
            percent_encode(&self.config.publishable_key),
            percent_encode(&self.config.after_sign_in_url)
        ))
    }
}

impl IdentityProvider for HostedIdentity {
    fn sign_in_url(&self) -> Result<String, AuthError> {
        self.hosted_url(&self.config.sign_in_url)
    }

    fn sign_up_url(&self) -> Result<String, AuthError> {
        self.hosted_url(&self.config.sign_up_url)
    }

    fn session(&self) -> Option<Session> {
        self.session.clone()
    }
}

/// Query-component encoding; unreserved characters pass through.
pub fn percent_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateView {
    Content,
    SignInPrompt,
}

/// Shows wrapped content to signed-in users and a sign-in prompt otherwise.
#[derive(Debug, Clone, Default)]
pub struct AccessGate {
    session: Option<Session>,
}

impl AccessGate {
    pub fn new(provider: &dyn IdentityProvider) -> Self {
        Self {
            session: provider.session(),
        }
    }

    pub fn view(&self) -> GateView {
        if self.session.is_some() {
            GateView::Content
        } else {
            GateView::SignInPrompt
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.view() == GateView::Content
    }

    /// Render `content` when signed in. Returns the error of a failed
    /// browser launch so the caller can surface it.
    pub fn show(
        &self,
        ui: &mut egui::Ui,
        provider: &dyn IdentityProvider,
        content: impl FnOnce(&mut egui::Ui),
    ) -> Option<AuthError> {
        match self.view() {
            GateView::Content => {
                content(ui);
                None
            }
            GateView::SignInPrompt => {
                let mut failure = None;
                egui::Frame::group(ui.style()).show(ui, |ui| {
                    ui.label("Sign in to read the full article and download visualizations.");
                    ui.horizontal(|ui| {
                        if ui.button("Sign in").clicked() {
                            failure = provider.open_sign_in().err();
                        }
                        if ui.button("Create account").clicked() {
                            failure = provider.open_sign_up().err();
                        }
                    });
                });
                failure
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AuthConfig {
        AuthConfig {
            publishable_key: "pk_test_abc".into(),
            sign_in_url: "https://accounts.example.org/sign-in".into(),
            sign_up_url: "https://accounts.example.org/sign-up?lang=en".into(),
            after_sign_in_url: "https://atlas.example.org/topics?x=1".into(),
            session_env: "ATLAS_TEST_SESSION".into(),
        }
    }

    #[test]
    fn hosted_urls_carry_key_and_redirect() {
        let identity = HostedIdentity::with_token(config(), None);
        assert_eq!(
            identity.sign_in_url().unwrap(),
            "https://accounts.example.org/sign-in?publishable_key=pk_test_abc\
             &redirect_url=https%3A%2F%2Fatlas.example.org%2Ftopics%3Fx%3D1"
        );
        assert!(identity
            .sign_up_url()
            .unwrap()
            .starts_with("https://accounts.example.org/sign-up?lang=en&publishable_key="));
    }

    #[test]
    fn missing_key_is_an_error() {
        let identity = HostedIdentity::with_token(
            AuthConfig {
                publishable_key: " ".into(),
                ..config()
            },
            None,
        );
        assert!(matches!(identity.sign_in_url(), Err(AuthError::MissingKey)));
        assert!(matches!(identity.open_sign_in(), Err(AuthError::MissingKey)));
    }

    #[test]
    fn gate_follows_session() {
        let signed_out = HostedIdentity::with_token(config(), Some("  ".into()));
        assert_eq!(AccessGate::new(&signed_out).view(), GateView::SignInPrompt);

        let signed_in = HostedIdentity::with_token(config(), Some("sess_123".into()));
        let gate = AccessGate::new(&signed_in);
        assert!(gate.is_signed_in());
        assert_eq!(signed_in.session().unwrap().token, "sess_123");
    }

    #[test]
    fn encoding_leaves_unreserved_alone() {
        assert_eq!(percent_encode("a-b_c.d~e"), "a-b_c.d~e");
        assert_eq!(percent_encode("a b/é"), "a%20b%2F%C3%A9");
    }
}
