//! Who may do what to which user account.

use crate::models::user::User;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct PermissionDenied(pub String);

impl PermissionDenied {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserOperation {
    View,
    Update,
    Delete,
}

pub fn require_admin(actor: &User) -> Result<(), PermissionDenied> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(PermissionDenied::new("Administrator permission required"))
    }
}

/// Administrators may do anything except delete themselves. Normal users may
/// view and update only their own account and never delete.
pub fn can_operate_user(
    actor: &User,
    target: &User,
    op: UserOperation,
) -> Result<(), PermissionDenied> {
    let is_self = actor.user_id == target.user_id;

    if actor.is_admin() {
        if op == UserOperation::Delete && is_self {
            return Err(PermissionDenied::new("You cannot delete your own account"));
        }
        return Ok(());
    }

    match op {
        UserOperation::Delete => Err(PermissionDenied::new("Normal users cannot delete users")),
        UserOperation::View if !is_self => Err(PermissionDenied::new(
            "No permission to view this user",
        )),
        UserOperation::Update if target.is_admin() => Err(PermissionDenied::new(
            "No permission to modify an administrator",
        )),
        UserOperation::Update if !is_self => Err(PermissionDenied::new(
            "No permission to modify this user",
        )),
        UserOperation::View | UserOperation::Update => Ok(()),
    }
}
