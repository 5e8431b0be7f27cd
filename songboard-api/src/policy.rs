//! Role-based authorization
//!
//! Viewing and suggesting are open to everyone; direct creation and
//! moderation require the admin role. Anonymous callers asking for an admin
//! capability get `Unauthenticated`, signed-in non-admins get `Forbidden`.

use songboard_common::Role;

use crate::context::RequestContext;
use crate::error::{ServiceError, ServiceResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    View,
    Suggest,
    CreateDirect,
    Moderate,
}

impl Capability {
    fn requires_admin(&self) -> bool {
        matches!(self, Capability::CreateDirect | Capability::Moderate)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizationPolicy;

impl AuthorizationPolicy {
    /// Pure role check
    pub fn allows(&self, role: Option<Role>, capability: Capability) -> bool {
        if !capability.requires_admin() {
            return true;
        }
        role.map_or(false, |r| r.is_admin())
    }

    pub fn authorize(&self, ctx: &RequestContext, capability: Capability) -> ServiceResult<()> {
        if self.allows(ctx.role(), capability) {
            return Ok(());
        }

        match ctx.caller {
            None => Err(ServiceError::Unauthenticated),
            Some(_) => Err(ServiceError::Forbidden(
                "This action is unauthorized.".to_string(),
            )),
        }
    }
}
