//! Extraction of issue references from free text worklog comments.
//!
//! A comment like `[Jira:ABC-123] Fixed the login page` names the provider
//! (`cn`), the issue and the remaining comment. The provider prefix may be
//! left out, in which case the user's default target applies.
use regex::Regex;

use crate::error::WorklogError;

pub const DEFAULT_ISSUE_ID_PATTERN: &str =
    r"^\[((?P<cn>.*?):)?(?P<issue_id>.*?)\]\s*(?P<comment>.*)";

const REQUIRED_GROUPS: [&str; 3] = ["cn", "issue_id", "comment"];

#[derive(Debug, Clone)]
pub struct IssueReferenceParser {
    pattern: Regex,
    default_target: Option<String>,
}

impl IssueReferenceParser {
    /// # Errors
    /// `InvalidPattern` if the pattern does not compile or lacks one of the
    /// named groups `cn`, `issue_id` and `comment`
    pub fn new(pattern: &str, default_target: Option<String>) -> Result<Self, WorklogError> {
        let pattern = Regex::new(pattern)?;
        let names: Vec<&str> = pattern.capture_names().flatten().collect();
        if let Some(missing) = REQUIRED_GROUPS.iter().find(|g| !names.contains(*g)) {
            return Err(WorklogError::InvalidPattern(format!(
                "the named group '{missing}' is missing"
            )));
        }
        Ok(IssueReferenceParser {
            pattern,
            default_target,
        })
    }

    /// Splits `comment` into the issue reference meant for `target_provider`
    /// and the remaining text. Comments without a usable reference come back
    /// trimmed and untouched.
    #[must_use]
    pub fn parse(&self, comment: &str, target_provider: &str) -> (Option<String>, String) {
        let trimmed = comment.trim();
        let Some(caps) = self.pattern.captures(trimmed) else {
            return (None, trimmed.to_string());
        };

        let issue_id = caps.name("issue_id").map_or("", |m| m.as_str().trim());
        if issue_id.is_empty() {
            return (None, trimmed.to_string());
        }

        let prefix = caps
            .name("cn")
            .map(|m| m.as_str().trim())
            .filter(|cn| !cn.is_empty());
        let addressed_to_target = match prefix {
            Some(cn) => cn.eq_ignore_ascii_case(target_provider),
            None => self
                .default_target
                .as_deref()
                .is_some_and(|d| d.eq_ignore_ascii_case(target_provider)),
        };
        if !addressed_to_target {
            return (None, trimmed.to_string());
        }

        let rest = caps.name("comment").map_or("", |m| m.as_str().trim());
        (Some(issue_id.to_string()), rest.to_string())
    }
}
