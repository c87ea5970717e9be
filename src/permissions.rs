//! Authorization policy: pure decision functions composed by handlers.
//!
//! Every check returns a [`Decision`] value. Mapping a denial to an HTTP
//! status (403, or 401 when no actor was presented at all) is the
//! handler's concern, which keeps "who may" separate from "how to refuse".

use model::entities::{comment, post, user};

use crate::error::ApiError;

/// Outcome of a policy check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(&'static str),
}

impl Decision {
    /// True when the decision allows the action.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Convert into a handler result, mapping a denial to `Forbidden`.
    pub fn require(self) -> Result<(), ApiError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(ApiError::Forbidden(reason.to_string())),
        }
    }
}

/// May `actor` update `target`'s profile?
pub fn can_modify_user(actor: &user::Model, target: &user::Model) -> Decision {
    if actor.is_superuser || actor.id == target.id {
        Decision::Allow
    } else {
        Decision::Deny("only the user themselves or a superuser may modify this profile")
    }
}

/// May `actor` update or delete `post`?
pub fn can_modify_post(actor: &user::Model, post: &post::Model) -> Decision {
    if actor.is_superuser || actor.id == post.author_id {
        Decision::Allow
    } else {
        Decision::Deny("only the post author or a superuser may modify this post")
    }
}

/// May `actor` update `comment`?
pub fn can_modify_comment(actor: &user::Model, comment: &comment::Model) -> Decision {
    if actor.is_superuser || actor.id == comment.author_id {
        Decision::Allow
    } else {
        Decision::Deny("only the comment author or a superuser may modify this comment")
    }
}

/// May `actor` delete `comment`? Deletion is wider than update: the
/// author of the parent post may moderate comments under it.
pub fn can_delete_comment(
    actor: &user::Model,
    comment: &comment::Model,
    post_author_id: i32,
) -> Decision {
    if actor.is_superuser || actor.id == comment.author_id || actor.id == post_author_id {
        Decision::Allow
    } else {
        Decision::Deny(
            "only the comment author, the post author or a superuser may delete this comment",
        )
    }
}
