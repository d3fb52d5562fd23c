//! The client bootstrap protocol.
//!
//! The loader script executes this sequence inside the browser; the
//! rules live here as a pure model so the policy (what halts the
//! bootstrap, and in what order assets load) is testable server-side.
//! Every halt is silent in the browser: tracking failure must never
//! surface into the embedding page's own script context.

use crate::sdk::{ConsentDefault, SdkConfig};

/// The three ordered steps of the load sequence.
///
/// The capture extension assumes an initialized tracker; loading it
/// early leaves dead instrumentation, so the order is mandatory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStep {
    /// Load the vendored tracking library asset.
    Tracker,
    /// Initialize the tracker with the resolved key and host.
    Init,
    /// Load the capture-extension asset.
    Capture,
}

const STEPS: [LoadStep; 3] = [LoadStep::Tracker, LoadStep::Init, LoadStep::Capture];

/// Why a bootstrap terminated without (fully) activating tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Halt {
    /// No site identifier on the loader's own query string. No network
    /// call is made in this case.
    NoSiteParam,
    /// Config fetch failed or returned non-success.
    ConfigUnavailable,
    /// The page hostname is not covered by the allow-list.
    DomainNotAllowed,
    /// Consent default is opt-out and the page carries no consent flag.
    ConsentWithheld,
    /// A load step failed; the remaining sequence is abandoned.
    StepFailed(LoadStep),
}

/// What the loader observes on the page before deciding to track.
#[derive(Debug, Clone)]
pub struct BootstrapEnv<'a> {
    /// `site` from the loader script's own query string.
    pub site_param: Option<&'a str>,
    /// Resolved config, if the fetch succeeded.
    pub config: Option<&'a SdkConfig>,
    /// Hostname of the embedding page.
    pub page_host: &'a str,
    /// Explicit runtime consent flag set by the host page.
    pub consent_signal: bool,
}

/// The gate checks the loader runs before touching any tracking code.
pub struct BootstrapRules;

impl BootstrapRules {
    /// Evaluate the early-exit branches in order and, if every gate
    /// passes, hand back the load sequence to execute.
    pub fn evaluate(env: &BootstrapEnv<'_>) -> Result<LoadSequence, Halt> {
        match env.site_param {
            Some(s) if !s.is_empty() => {}
            _ => return Err(Halt::NoSiteParam),
        }

        let config = env.config.ok_or(Halt::ConfigUnavailable)?;

        if !config.is_host_allowed(env.page_host) {
            return Err(Halt::DomainNotAllowed);
        }

        if config.consent_default == ConsentDefault::OptOut && !env.consent_signal {
            return Err(Halt::ConsentWithheld);
        }

        Ok(LoadSequence::new())
    }
}

/// Tracker → Init → Capture, acknowledged strictly in order.
#[derive(Debug, PartialEq, Eq)]
pub struct LoadSequence {
    next: usize,
}

impl LoadSequence {
    fn new() -> Self {
        Self { next: 0 }
    }

    /// The step that must run next, or `None` when complete.
    pub fn pending(&self) -> Option<LoadStep> {
        STEPS.get(self.next).copied()
    }

    /// Acknowledge completion of a step. Out-of-order acknowledgement
    /// is rejected without advancing.
    pub fn acknowledge(&mut self, step: LoadStep) -> Result<(), Halt> {
        match self.pending() {
            Some(expected) if expected == step => {
                self.next += 1;
                Ok(())
            }
            Some(expected) => Err(Halt::StepFailed(expected)),
            None => Err(Halt::StepFailed(step)),
        }
    }

    /// Record a step failure. Terminal: no retry, the remaining
    /// sequence is abandoned.
    pub fn fail(self, step: LoadStep) -> Halt {
        Halt::StepFailed(step)
    }

    pub fn is_complete(&self) -> bool {
        self.next >= STEPS.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdk::SdkConfig;

    fn config(consent: ConsentDefault) -> SdkConfig {
        SdkConfig {
            tracking_key: "pl_test".to_string(),
            api_host: "https://app.porchlight.io".to_string(),
            allowed_domains: vec!["acme.com".to_string()],
            grouping_enabled: true,
            consent_default: consent,
            extra_options: serde_json::Map::new(),
        }
    }

    fn env<'a>(cfg: &'a SdkConfig) -> BootstrapEnv<'a> {
        BootstrapEnv {
            site_param: Some("pl_test"),
            config: Some(cfg),
            page_host: "acme.com",
            consent_signal: false,
        }
    }

    #[test]
    fn missing_site_param_halts_before_anything_else() {
        let cfg = config(ConsentDefault::OptIn);
        let mut e = env(&cfg);
        e.site_param = None;
        assert_eq!(BootstrapRules::evaluate(&e), Err(Halt::NoSiteParam));

        e.site_param = Some("");
        assert_eq!(BootstrapRules::evaluate(&e), Err(Halt::NoSiteParam));
    }

    #[test]
    fn unavailable_config_halts() {
        let cfg = config(ConsentDefault::OptIn);
        let mut e = env(&cfg);
        e.config = None;
        assert_eq!(BootstrapRules::evaluate(&e), Err(Halt::ConfigUnavailable));
    }

    #[test]
    fn disallowed_domain_halts() {
        let cfg = config(ConsentDefault::OptIn);
        let mut e = env(&cfg);
        e.page_host = "notacme.com";
        assert_eq!(BootstrapRules::evaluate(&e), Err(Halt::DomainNotAllowed));
    }

    #[test]
    fn subdomain_is_allowed() {
        let cfg = config(ConsentDefault::OptIn);
        let mut e = env(&cfg);
        e.page_host = "listings.acme.com";
        assert!(BootstrapRules::evaluate(&e).is_ok());
    }

    #[test]
    fn opt_out_without_signal_halts() {
        let cfg = config(ConsentDefault::OptOut);
        let e = env(&cfg);
        assert_eq!(BootstrapRules::evaluate(&e), Err(Halt::ConsentWithheld));
    }

    #[test]
    fn opt_out_with_signal_proceeds() {
        let cfg = config(ConsentDefault::OptOut);
        let mut e = env(&cfg);
        e.consent_signal = true;
        assert!(BootstrapRules::evaluate(&e).is_ok());
    }

    #[test]
    fn sequence_runs_in_order() {
        let cfg = config(ConsentDefault::OptIn);
        let mut seq = BootstrapRules::evaluate(&env(&cfg)).unwrap();

        assert_eq!(seq.pending(), Some(LoadStep::Tracker));
        seq.acknowledge(LoadStep::Tracker).unwrap();
        assert_eq!(seq.pending(), Some(LoadStep::Init));
        seq.acknowledge(LoadStep::Init).unwrap();
        seq.acknowledge(LoadStep::Capture).unwrap();
        assert!(seq.is_complete());
        assert_eq!(seq.pending(), None);
    }

    #[test]
    fn out_of_order_acknowledgement_rejected() {
        let cfg = config(ConsentDefault::OptIn);
        let mut seq = BootstrapRules::evaluate(&env(&cfg)).unwrap();

        assert_eq!(
            seq.acknowledge(LoadStep::Capture),
            Err(Halt::StepFailed(LoadStep::Tracker))
        );
        // The sequence did not advance.
        assert_eq!(seq.pending(), Some(LoadStep::Tracker));
    }

    #[test]
    fn failure_mid_sequence_is_terminal() {
        let cfg = config(ConsentDefault::OptIn);
        let mut seq = BootstrapRules::evaluate(&env(&cfg)).unwrap();
        seq.acknowledge(LoadStep::Tracker).unwrap();
        assert_eq!(seq.fail(LoadStep::Init), Halt::StepFailed(LoadStep::Init));
    }
}
