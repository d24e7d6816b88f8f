//! System hostname and domain discovery.
//!
//! Used when `--hostname`/`--domain` are not passed: the certificate subject
//! should default to the identity the host already presents on the network.

/// The system hostname, falling back to `localhost`.
pub fn system_hostname() -> String {
    #[cfg(target_os = "linux")]
    if let Ok(name) = std::fs::read_to_string("/proc/sys/kernel/hostname") {
        let name = name.trim();
        if !name.is_empty() {
            // A fully-qualified kernel hostname carries the domain too;
            // the subject joins them itself.
            return name.split('.').next().unwrap_or(name).to_owned();
        }
    }
    std::env::var("HOSTNAME")
        .ok()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_owned())
}

/// The system DNS domain from the resolver configuration, or empty.
pub fn system_domain() -> String {
    std::fs::read_to_string("/etc/resolv.conf")
        .map(|content| domain_from_resolv_conf(&content))
        .unwrap_or_default()
}

/// Extract the domain from resolv.conf text: `domain` wins over the first
/// `search` entry.
fn domain_from_resolv_conf(content: &str) -> String {
    let mut search_first = None;
    for line in content.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("domain ") {
            if let Some(name) = rest.split_whitespace().next() {
                return name.to_owned();
            }
        }
        if search_first.is_none() {
            if let Some(rest) = line.strip_prefix("search ") {
                search_first = rest.split_whitespace().next().map(str::to_owned);
            }
        }
    }
    search_first.unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_keyword_wins_over_search() {
        let conf = "nameserver 10.0.0.1\nsearch corp.example.net other.example\ndomain example.com\n";
        assert_eq!(domain_from_resolv_conf(conf), "example.com");
    }

    #[test]
    fn first_search_entry_used_without_domain() {
        let conf = "nameserver 10.0.0.1\nsearch corp.example.net other.example\n";
        assert_eq!(domain_from_resolv_conf(conf), "corp.example.net");
    }

    #[test]
    fn empty_resolv_conf_gives_empty_domain() {
        assert_eq!(domain_from_resolv_conf("nameserver 10.0.0.1\n"), "");
    }
}
