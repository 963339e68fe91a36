// ── Access control ──
//
// Mirrors the server's ownership rule so callers can refuse an edit
// before sending it. The server stays authoritative (403).

use catalog_api::{Instrument, Role, User};

/// Anything with an owning user.
pub trait Owned {
    /// `sub` of the owning user. Empty when unowned.
    fn owner(&self) -> &str;
}

impl Owned for Instrument {
    fn owner(&self) -> &str {
        &self.user_id
    }
}

pub fn is_admin(user: &User) -> bool {
    user.roles.contains(&Role::Admin)
}

/// Admins may modify anything; everyone else only what they own.
///
/// Unowned resources are admin-only.
pub fn can_edit_or_delete(user: Option<&User>, resource: &impl Owned) -> bool {
    let Some(user) = user else {
        return false;
    };
    if is_admin(user) {
        return true;
    }
    let owner = resource.owner();
    !owner.is_empty() && owner == user.sub
}
