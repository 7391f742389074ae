/// A topic pattern as used in capability announcements and queue configs.
///
/// - `my/topic`: exact topic
/// - `my/*`: any topic directly below `my/`
/// - `my/**`: any topic below `my/`, at any depth
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TopicPattern {
    Exact(String),
    /// Prefix including the trailing slash.
    Category(String),
    /// Prefix including the trailing slash.
    DeepCategory(String),
}

impl TopicPattern {
    pub fn parse(pattern: &str) -> Self {
        if let Some(prefix) = pattern.strip_suffix("/**") {
            TopicPattern::DeepCategory(format!("{prefix}/"))
        } else if let Some(prefix) = pattern.strip_suffix("/*") {
            TopicPattern::Category(format!("{prefix}/"))
        } else {
            TopicPattern::Exact(pattern.to_string())
        }
    }

    /// Agrees with [`lookup_keys`]: a pattern matches a topic exactly when
    /// its key is one of the topic's lookup keys.
    pub fn matches(&self, topic: &str) -> bool {
        match self {
            TopicPattern::Exact(exact) => exact == topic,
            TopicPattern::Category(prefix) => {
                prefix.len() > 1
                    && topic
                        .strip_prefix(prefix.as_str())
                        .is_some_and(|rest| !rest.contains('/'))
            }
            TopicPattern::DeepCategory(prefix) => {
                prefix.len() > 1 && topic.starts_with(prefix.as_str())
            }
        }
    }
}

/// Index keys that can hold candidates for `topic`, most specific first.
///
/// The exact topic, then `parent/*` for the immediate parent, then `ancestor/**`
/// for every ancestor from the nearest upwards. A slash at position 0 never
/// forms a category.
pub fn lookup_keys(topic: &str) -> Vec<String> {
    let mut keys = vec![topic.to_string()];
    let mut end = topic.len();
    let mut immediate_parent = true;

    while let Some(pos) = topic[..end].rfind('/') {
        if pos == 0 {
            break;
        }
        let prefix = &topic[..=pos];
        if immediate_parent {
            keys.push(format!("{prefix}*"));
            immediate_parent = false;
        }
        keys.push(format!("{prefix}**"));
        end = pos;
    }

    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_shapes() {
        assert_eq!(
            TopicPattern::parse("a/b"),
            TopicPattern::Exact("a/b".to_string())
        );
        assert_eq!(
            TopicPattern::parse("a/*"),
            TopicPattern::Category("a/".to_string())
        );
        assert_eq!(
            TopicPattern::parse("a/b/**"),
            TopicPattern::DeepCategory("a/b/".to_string())
        );
    }

    #[test]
    fn lookup_keys_walk_from_leaf_to_root() {
        assert_eq!(
            lookup_keys("a/b/c"),
            vec!["a/b/c", "a/b/*", "a/b/**", "a/**"]
        );
    }

    #[test]
    fn lookup_keys_without_slash_is_exact_only() {
        assert_eq!(lookup_keys("topic"), vec!["topic"]);
    }

    #[test]
    fn lookup_keys_ignore_leading_slash() {
        assert_eq!(lookup_keys("/"), vec!["/"]);
        assert_eq!(lookup_keys("/a/b"), vec!["/a/b", "/a/*", "/a/**"]);
    }

    #[test]
    fn category_matches_one_level_only() {
        let pattern = TopicPattern::parse("a/*");
        assert!(pattern.matches("a/b"));
        assert!(!pattern.matches("a/b/c"));
        assert!(!pattern.matches("a"));
    }

    #[test]
    fn deep_category_needs_a_segment_below_prefix() {
        let pattern = TopicPattern::parse("a/b/**");
        assert!(pattern.matches("a/b/c"));
        assert!(pattern.matches("a/b/c/d"));
        assert!(!pattern.matches("a/b"));
        assert!(!pattern.matches("a/bc/d"));
    }

    #[test]
    fn root_categories_never_match() {
        assert!(!TopicPattern::parse("/*").matches("/a"));
        assert!(!TopicPattern::parse("/**").matches("/a/b"));
    }

    #[test]
    fn matches_agrees_with_lookup_keys() {
        let topics = ["a", "a/b", "a/b/c", "a/b/c/d", "/a/b", "a//b", "a/b/"];
        let patterns = [
            "a", "a/b", "a/*", "a/**", "a/b/*", "a/b/**", "a/b/c/*", "/a/*", "a//*", "a/b/c",
        ];
        for topic in topics {
            let keys = lookup_keys(topic);
            for pattern in patterns {
                assert_eq!(
                    TopicPattern::parse(pattern).matches(topic),
                    keys.iter().any(|k| k == pattern),
                    "pattern {pattern} vs topic {topic}"
                );
            }
        }
    }
}
