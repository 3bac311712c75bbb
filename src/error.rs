//! Error taxonomy for the contribution pipeline.
//!
//! Every component wraps the raw API failure in a domain error variant with
//! a human-readable message and the original failure attached as a source,
//! so callers branch on the variant rather than inspecting message text.
//! The HTTP layer maps variants to status codes in [`crate::server`].
//!
//! Only [`Error::BranchAlreadyExists`] has a defined recovery path: delete
//! the stale branch and resubmit. Everything else is terminal for the
//! submission that raised it.

use thiserror::Error;

use crate::github::ApiError;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// All failures the contribution pipeline can surface.
#[derive(Debug, Error)]
pub enum Error {
    /// An `"owner/name"` string failed to parse into two non-empty segments.
    #[error("malformed repository reference {input:?}, expected \"owner/name\"")]
    MalformedReference { input: String },

    /// A submission was structurally invalid before any remote call was made.
    #[error("invalid submission: {message}")]
    InvalidSubmission { message: String },

    /// The remote reported that a branch does not exist.
    #[error("branch {branch:?} was not found")]
    BranchNotFound {
        branch: String,
        #[source]
        source: ApiError,
    },

    /// The credential in use is not permitted to touch the branch.
    #[error("not permitted to access branch {branch:?}")]
    BranchAccess {
        branch: String,
        #[source]
        source: ApiError,
    },

    /// Branch creation collided with an existing ref of the same name.
    ///
    /// Raised when a contributor resubmits the same title and action before
    /// their previous change branch was merged or deleted.
    #[error("branch {branch:?} already exists")]
    BranchAlreadyExists { branch: String },

    /// Any other branch operation failure.
    #[error("branch operation failed")]
    BranchOperation {
        #[source]
        source: ApiError,
    },

    /// Fork resolution failed at some step: identity lookup, fork listing,
    /// fork creation, staleness check, or upstream sync. The step that
    /// failed is preserved in the source chain.
    #[error("could not resolve a usable fork of the dictionary repository")]
    ForkOperation {
        #[source]
        source: Box<Error>,
    },

    /// Committing a brand new entry file was rejected by the remote.
    #[error("failed to commit new word {title:?} to the dictionary")]
    WordWrite {
        title: String,
        #[source]
        source: ApiError,
    },

    /// Committing an update to an existing entry was rejected, including the
    /// conflict case where the supplied blob SHA is stale.
    #[error("failed to commit edit to {title:?}")]
    WordEdit {
        title: String,
        #[source]
        source: ApiError,
    },

    /// Reading an existing entry failed for a reason other than absence.
    #[error("failed to read {title:?} from the dictionary")]
    WordRead {
        title: String,
        #[source]
        source: ApiError,
    },

    /// No entry file exists at the path derived from the title.
    #[error("word {title:?} was not found in the dictionary")]
    WordNotFound { title: String },

    /// Pull request creation or label attachment failed. When labeling
    /// fails the pull request already exists, unlabeled; resubmission will
    /// collide on the change branch, which is how the partial state is
    /// discovered.
    #[error("failed to submit word {title:?}")]
    WordSubmission {
        title: String,
        #[source]
        source: Box<Error>,
    },

    /// A raw API failure not yet classified by a component. Internal
    /// intermediate state; the public pipeline operations always return one
    /// of the classified variants above.
    #[error(transparent)]
    Api(#[from] ApiError),
}
