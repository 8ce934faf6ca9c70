//! Liveness probe for the detection backend. The embedding application polls
//! this to decide whether sampling is permitted to start; polling cadence is
//! its policy, not ours.

/// `GET {base}/health`; any 2xx counts as healthy.
pub fn probe_health(agent: &ureq::Agent, base_url: &str) -> bool {
    let url = format!("{}/health", base_url.trim_end_matches('/'));
    match agent.get(&url).call() {
        Ok(response) => (200..300).contains(&response.status()),
        Err(e) => {
            tracing::debug!(error = %e, "health probe failed");
            false
        }
    }
}
