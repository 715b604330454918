use review_logging::{review_debug, review_warn};
use url::Url;

use crate::{FailureKind, Fetcher};

/// Allow/Disallow rules from the robots.txt groups that apply to one agent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RobotsRules {
    allow: Vec<String>,
    disallow: Vec<String>,
}

#[derive(Debug, Default)]
struct Group {
    agents: Vec<String>,
    allow: Vec<String>,
    disallow: Vec<String>,
}

impl RobotsRules {
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Parse `content` for `user_agent` (matched on its product token,
    /// e.g. `review-harvester` out of `review-harvester/0.1.0`). Groups naming
    /// the agent replace the `*` groups entirely.
    pub fn parse(content: &str, user_agent: &str) -> Self {
        let token = product_token(user_agent);
        let groups = parse_groups(content);

        let specific: Vec<&Group> = groups
            .iter()
            .filter(|g| g.agents.iter().any(|a| a != "*" && token.contains(a.as_str())))
            .collect();
        let chosen = if specific.is_empty() {
            groups
                .iter()
                .filter(|g| g.agents.iter().any(|a| a == "*"))
                .collect()
        } else {
            specific
        };

        let mut rules = Self::default();
        for group in chosen {
            rules.allow.extend(group.allow.iter().cloned());
            rules.disallow.extend(group.disallow.iter().cloned());
        }
        rules
    }

    /// Longest matching pattern wins; allow wins a tie.
    pub fn is_allowed(&self, path: &str) -> bool {
        let longest = |patterns: &[String]| {
            patterns
                .iter()
                .filter(|p| pattern_matches(p, path))
                .map(String::len)
                .max()
        };
        match (longest(&self.allow), longest(&self.disallow)) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(allow), Some(disallow)) => allow >= disallow,
        }
    }
}

fn product_token(user_agent: &str) -> String {
    user_agent
        .split(['/', ' '])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

fn parse_groups(content: &str) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();
    let mut collecting_agents = false;

    for line in content.lines() {
        let line = line.split('#').next().unwrap_or_default().trim();
        let Some((directive, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();

        match directive.trim().to_ascii_lowercase().as_str() {
            "user-agent" => {
                if !collecting_agents {
                    groups.push(Group::default());
                    collecting_agents = true;
                }
                if let Some(group) = groups.last_mut() {
                    group.agents.push(value.to_ascii_lowercase());
                }
            }
            "allow" | "disallow" => {
                collecting_agents = false;
                let Some(group) = groups.last_mut() else {
                    continue;
                };
                // An empty Disallow allows everything, same as no rule.
                if value.is_empty() {
                    continue;
                }
                if directive.trim().eq_ignore_ascii_case("allow") {
                    group.allow.push(value.to_string());
                } else {
                    group.disallow.push(value.to_string());
                }
            }
            _ => collecting_agents = false,
        }
    }
    groups
}

/// robots.txt path pattern: `*` matches any run, a trailing `$` anchors the end.
fn pattern_matches(pattern: &str, path: &str) -> bool {
    let (pattern, anchored) = match pattern.strip_suffix('$') {
        Some(p) => (p, true),
        None => (pattern, false),
    };
    let mut parts = pattern.split('*');
    let first = parts.next().unwrap_or_default();
    let Some(mut rest) = path.strip_prefix(first) else {
        return false;
    };
    let tail: Vec<&str> = parts.collect();
    if tail.is_empty() {
        return !anchored || rest.is_empty();
    }
    for (i, part) in tail.iter().enumerate() {
        let last = i + 1 == tail.len();
        if last && anchored {
            return rest.ends_with(part);
        }
        match rest.find(part) {
            Some(pos) => rest = &rest[pos + part.len()..],
            None => return false,
        }
    }
    true
}

pub fn robots_url(url: &Url) -> Url {
    let mut robots = url.clone();
    robots.set_path("/robots.txt");
    robots.set_query(None);
    robots.set_fragment(None);
    robots
}

/// Path plus query, the part of a URL robots rules are matched against.
pub fn request_target(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

/// Fetch and parse the robots.txt governing `url`. Any failure allows the run.
pub async fn fetch_rules(fetcher: &dyn Fetcher, url: &Url, user_agent: &str) -> RobotsRules {
    let robots = robots_url(url);
    match fetcher.fetch(robots.as_str()).await {
        Ok(output) => {
            let content = String::from_utf8_lossy(&output.bytes);
            RobotsRules::parse(&content, user_agent)
        }
        Err(err) if err.kind == FailureKind::HttpStatus(404) => {
            review_debug!("No robots.txt at {}", robots);
            RobotsRules::allow_all()
        }
        Err(err) => {
            review_warn!("Could not read {}: {}; continuing without it", robots, err);
            RobotsRules::allow_all()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROBOTS: &str = "\
User-agent: *
Disallow: /review/private
Allow: /review/private/open
Disallow: /*?*sort=

# a bot we are not
User-agent: otherbot
Disallow: /

User-agent: Review-Harvester
User-agent: friend
Disallow: /review/
Allow: /review/example.com
";

    #[test]
    fn wildcard_group_applies_to_unnamed_agents() {
        let rules = RobotsRules::parse(ROBOTS, "somebot/1.0");
        assert!(rules.is_allowed("/review/example.com?page=2"));
        assert!(!rules.is_allowed("/review/private/x"));
        assert!(rules.is_allowed("/review/private/open/x"));
        assert!(!rules.is_allowed("/review/x?stars=5&sort=recency"));
    }

    #[test]
    fn named_group_replaces_wildcard() {
        let rules = RobotsRules::parse(ROBOTS, "review-harvester/0.1.0");
        assert!(rules.is_allowed("/review/example.com?languages=all"));
        assert!(!rules.is_allowed("/review/other.com"));
        assert!(!rules.is_allowed("/review/private/x"));
        assert!(rules.is_allowed("/about"));
    }

    #[test]
    fn allow_wins_a_tie() {
        let rules = RobotsRules::parse("User-agent: *\nDisallow: /a\nAllow: /a\n", "x");
        assert!(rules.is_allowed("/a/b"));
    }

    #[test]
    fn end_anchor() {
        assert!(pattern_matches("/*.php$", "/index.php"));
        assert!(!pattern_matches("/*.php$", "/index.php?x=1"));
        assert!(pattern_matches("/review", "/reviews"));
        assert!(!pattern_matches("/review$", "/reviews"));
    }

    #[test]
    fn robots_location_and_target() {
        let url = Url::parse("https://www.example.test/review/shop.test?page=2#x").unwrap();
        assert_eq!(robots_url(&url).as_str(), "https://www.example.test/robots.txt");
        assert_eq!(request_target(&url), "/review/shop.test?page=2");
    }
}
