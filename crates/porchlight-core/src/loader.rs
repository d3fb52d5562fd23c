//! The fixed loader program served to third-party pages.
//!
//! The emitted bytes are identical for every site: the script reads
//! its own `site` query parameter at runtime in the browser, so the
//! response is cacheable by downstream HTTP caches. The program is the
//! browser-side realization of the rules in [`crate::bootstrap`]:
//! extract, fetch, domain check, consent gate, then the strictly
//! ordered tracker → init → capture load chain. Every failure path is
//! silent; nothing is thrown into the embedding page.

/// Content type for the loader response.
pub const LOADER_CONTENT_TYPE: &str = "application/javascript; charset=utf-8";

/// Downstream caches may hold the loader briefly; it changes only on
/// deploy.
pub const LOADER_CACHE_CONTROL: &str = "public, max-age=300";

/// The bootstrap program.
pub const LOADER_JS: &str = r#"(function () {
  "use strict";

  var script = document.currentScript;
  if (!script || !script.src) return;

  var match = /[?&]site=([^&]+)/.exec(script.src);
  if (!match) return;
  var siteKey = decodeURIComponent(match[1]);
  if (!siteKey) return;

  var origin = script.src.split("/sdk/loader")[0];

  function hostMatches(host, allowed) {
    host = host.toLowerCase();
    allowed = allowed.toLowerCase();
    return host === allowed || (
      host.length > allowed.length &&
      host.indexOf("." + allowed, host.length - allowed.length - 1) !== -1
    );
  }

  function loadScript(url, onReady) {
    var el = document.createElement("script");
    el.async = true;
    el.src = url;
    el.onload = onReady;
    // Load errors end the chain; nothing is retried or reported.
    el.onerror = function () {};
    document.head.appendChild(el);
  }

  fetch(origin + "/sdk/site-config?site=" + encodeURIComponent(siteKey))
    .then(function (res) {
      if (!res.ok) throw new Error("config unavailable");
      return res.json();
    })
    .then(function (cfg) {
      var host = window.location.hostname;
      var allowed = cfg.allowedDomains || [];
      var ok = false;
      for (var i = 0; i < allowed.length; i++) {
        if (hostMatches(host, allowed[i])) { ok = true; break; }
      }
      if (!ok) return;

      if (cfg.consentDefault === "opt_out" && window.__porchlightConsent !== true) {
        return;
      }

      loadScript(origin + "/sdk/assets/tracker.js", function () {
        var tracker = window.__plTracker;
        if (!tracker || typeof tracker.init !== "function") return;
        tracker.init({
          key: cfg.trackingKey,
          host: cfg.apiHost,
          grouping: cfg.groupingEnabled,
          options: cfg.extraOptions || {}
        });
        loadScript(origin + "/sdk/assets/capture.js", function () {});
      });
    })
    .catch(function () {});
})();
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loader_is_fixed_and_untemplated() {
        // No per-request substitution markers of any kind.
        assert!(!LOADER_JS.contains("{{"));
        assert!(!LOADER_JS.contains("%s"));
        assert!(LOADER_JS.len() > 200);
    }

    #[test]
    fn loader_reads_site_param_at_runtime() {
        assert!(LOADER_JS.contains("site="));
        assert!(LOADER_JS.contains("document.currentScript"));
        assert!(LOADER_JS.contains("/sdk/site-config"));
    }

    #[test]
    fn loader_sequences_tracker_before_capture() {
        let tracker = LOADER_JS.find("tracker.js").expect("tracker load");
        let capture = LOADER_JS.find("capture.js").expect("capture load");
        assert!(tracker < capture);
    }

    #[test]
    fn loader_honors_consent_gate() {
        assert!(LOADER_JS.contains("opt_out"));
        assert!(LOADER_JS.contains("__porchlightConsent"));
    }
}
