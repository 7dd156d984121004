use log::debug;

/// Variables checked in order of preference.
const HTTPS_PROXY_VARS: [&str; 4] = ["HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"];

/// HTTPS proxy configured for the current process, if any. Looked up on each
/// call so a changed environment is picked up by the next request.
#[derive(Debug, Clone, Copy)]
pub struct SystemProxy {
    lookup: fn(&str) -> Option<String>,
}

impl Default for SystemProxy {
    fn default() -> Self {
        Self {
            lookup: |name| std::env::var(name).ok(),
        }
    }
}

impl SystemProxy {
    #[must_use]
    pub fn with_lookup(lookup: fn(&str) -> Option<String>) -> Self {
        Self { lookup }
    }

    /// First usable proxy URL. Values with a scheme other than `http` or
    /// `https` (`ALL_PROXY` often holds a `socks5://` URL) are skipped.
    #[must_use]
    pub fn https(&self) -> Option<String> {
        HTTPS_PROXY_VARS.iter().find_map(|name| {
            let value = (self.lookup)(name)?;
            let value = value.trim();
            if value.is_empty() {
                return None;
            }
            if !is_http_proxy(value) {
                debug!("Ignoring {name}, only http and https proxies are supported");
                return None;
            }
            debug!("Using HTTPS proxy from {name}");
            Some(value.to_string())
        })
    }
}

/// A value without a scheme is taken as `http`.
fn is_http_proxy(value: &str) -> bool {
    match value.split_once("://") {
        Some((scheme, _)) => {
            scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https")
        }
        None => true,
    }
}
