//! Repository fullname and branch ref handling.
//!
//! GitHub's API shapes disagree about how a branch is spelled: ref creation
//! wants `refs/heads/<name>`, ref lookup wants `heads/<name>`, and pull
//! request `base`/`head` fields want the bare `<name>`. All conversion
//! between the three encodings lives here; no other module strips or
//! prepends prefixes itself.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A repository identified by owner and name.
///
/// Both parts are opaque identifiers; nothing here validates them against
/// GitHub's repository naming rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl FromStr for RepoRef {
    type Err = Error;

    /// Parse an `"owner/name"` fullname, splitting on the first `/`.
    ///
    /// Anything without two non-empty segments is rejected with
    /// [`Error::MalformedReference`].
    fn from_str(fullname: &str) -> Result<Self, Self::Err> {
        let malformed = || Error::MalformedReference {
            input: fullname.to_string(),
        };

        let (owner, name) = fullname.split_once('/').ok_or_else(malformed)?;
        if owner.is_empty() || name.is_empty() {
            return Err(malformed());
        }

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Reduce any branch ref encoding to the bare branch name.
///
/// Strips a leading `refs/` segment if present, then a leading `heads/`
/// segment if present. Total and idempotent; branch names containing `/`
/// (e.g. `word/new/api`) pass through intact.
pub fn branch_name(branch_ref: &str) -> &str {
    let stripped = branch_ref.strip_prefix("refs/").unwrap_or(branch_ref);
    stripped.strip_prefix("heads/").unwrap_or(stripped)
}

/// The `heads/<name>` encoding, as used by ref lookup and deletion paths.
///
/// Accepts any of the three encodings; normalizes before formatting.
pub fn heads(branch_ref: &str) -> String {
    format!("heads/{}", branch_name(branch_ref))
}

/// The `refs/heads/<name>` encoding, as used by ref creation payloads.
///
/// Accepts any of the three encodings; normalizes before formatting.
pub fn refs_heads(branch_ref: &str) -> String {
    format!("refs/heads/{}", branch_name(branch_ref))
}
