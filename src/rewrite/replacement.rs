//! The replacement table.

/// Host names the upstream serves under; each is rewritten to the mirror host.
pub const UPSTREAM_HOSTS: &[&str] = &["vjudge.net.cn", "vjudge.csgrandeur.cn", "vjudge.net"];

const AD_SCRIPT: &str = "<script async src=\"https://pagead2.googlesyndication.com/pagead/js/adsbygoogle.js?client=ca-pub-9098591903020457\" crossorigin=\"anonymous\"></script>";
const AD_SCRIPT_URL: &str =
    "https://pagead2.googlesyndication.com/pagead/js/adsbygoogle.js?client=ca-pub-9098591903020457";
const GTAG_SCRIPT: &str =
    "<script async src=\"https://www.googletagmanager.com/gtag/js?id=G-374JLX1715\"></script>";
const TITLE: &str = "<title>Virtual Judge</title>";
const MIRROR_TITLE: &str = "<title>Virtual Judge (Unofficial Mirror)</title>";
const SERVER_TIME: &str = "Server Time: <span class=\"currentTimeTZ\"></span>";
const MIRROR_FOOTER: &str = "Server Time: <span class=\"currentTimeTZ\" data-mirror=\"\"></span><br>Unofficial Mirror; Powered by Rust &amp; axum<br>Feedback: me[at]imken.moe";

/// One literal substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub pattern: String,
    pub replacement: String,
}

impl Replacement {
    pub fn new(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            replacement: replacement.into(),
        }
    }
}

/// Ordered list of replacements.
///
/// Entries apply in order and each sees the output of the previous ones.
/// Matching is literal, case-sensitive and global.
#[derive(Debug, Clone)]
pub struct ReplacementTable {
    entries: Vec<Replacement>,
}

impl ReplacementTable {
    /// Build the mirror's table for the given public host.
    ///
    /// Removals run first so that deleting a fragment can never splice
    /// together an upstream host name after the host entries have run.
    /// `vjudge.net.cn` precedes `vjudge.net` so the longer name is
    /// replaced whole.
    pub fn new(host: &str) -> Self {
        let mut entries = vec![
            Replacement::new(AD_SCRIPT, ""),
            Replacement::new(GTAG_SCRIPT, ""),
            Replacement::new(AD_SCRIPT_URL, ""),
            Replacement::new(TITLE, MIRROR_TITLE),
        ];
        entries.extend(UPSTREAM_HOSTS.iter().map(|h| Replacement::new(*h, host)));
        // The footer carries `data-mirror`, so SERVER_TIME no longer matches
        // its output and a second pass leaves the body unchanged.
        entries.push(Replacement::new(SERVER_TIME, MIRROR_FOOTER));
        Self { entries }
    }

    /// Build a table from explicit entries.
    pub fn from_entries(entries: Vec<Replacement>) -> Self {
        Self { entries }
    }

    /// Apply every replacement in order.
    pub fn apply(&self, text: &str) -> String {
        let mut out = text.to_string();
        for r in &self.entries {
            if out.contains(&r.pattern) {
                out = out.replace(&r.pattern, &r.replacement);
            }
        }
        out
    }

    /// Patterns that occur in `text`.
    pub fn residual_patterns<'a>(&'a self, text: &str) -> Vec<&'a str> {
        self.entries
            .iter()
            .filter(|r| text.contains(&r.pattern))
            .map(|r| r.pattern.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOST: &str = "vjmirror.link";

    fn sample_page() -> String {
        format!(
            "<html><head>{TITLE}{AD_SCRIPT}{GTAG_SCRIPT}</head><body>\
             <a href=\"https://vjudge.net/problem\">p</a>\
             <a href=\"//vjudge.net.cn/x\">cn</a>\
             <img src=\"https://vjudge.csgrandeur.cn/logo.png\">\
             <script>var s=\"{AD_SCRIPT_URL}\";</script>\
             <footer>{SERVER_TIME}</footer></body></html>"
        )
    }

    #[test]
    fn test_hosts_are_replaced() {
        let table = ReplacementTable::new(HOST);
        let out = table.apply("see https://vjudge.net/contest and vjudge.csgrandeur.cn");
        assert_eq!(out, "see https://vjmirror.link/contest and vjmirror.link");
    }

    #[test]
    fn test_longer_host_wins() {
        let table = ReplacementTable::new(HOST);
        assert_eq!(table.apply("vjudge.net.cn"), HOST);
    }

    #[test]
    fn test_full_page_rewrite() {
        let table = ReplacementTable::new(HOST);
        let out = table.apply(&sample_page());

        assert!(table.residual_patterns(&out).is_empty(), "{out}");
        assert!(out.contains(MIRROR_TITLE));
        assert!(out.contains("Unofficial Mirror; Powered by Rust"));
        assert!(!out.contains("googlesyndication"));
        assert!(!out.contains("googletagmanager"));
        assert!(out.contains("https://vjmirror.link/problem"));
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let table = ReplacementTable::new(HOST);
        let once = table.apply(&sample_page());
        let twice = table.apply(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_case_sensitive_literal_match() {
        let table = ReplacementTable::new(HOST);
        assert_eq!(table.apply("VJUDGE.NET vjudge_net"), "VJUDGE.NET vjudge_net");
    }

    #[test]
    fn test_order_matters() {
        let table = ReplacementTable::from_entries(vec![
            Replacement::new("a", "b"),
            Replacement::new("b", "c"),
        ]);
        assert_eq!(table.apply("ab"), "cc");
    }
}
