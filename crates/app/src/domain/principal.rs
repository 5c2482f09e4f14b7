//! Principals
//!
//! The authenticated caller, as supplied by the access-control layer in front of the services.

use crate::uuids::TypedUuid;

/// User marker.
#[derive(Debug)]
pub struct User;

/// User UUID
pub type UserUuid = TypedUuid<User>;

/// Role of an authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// A shopper acting on their own carts and orders.
    Customer,

    /// Back-office staff.
    Staff,
}

/// Authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user: UserUuid,
    pub role: Role,
}

impl Principal {
    #[must_use]
    pub fn customer(user: UserUuid) -> Self {
        Self {
            user,
            role: Role::Customer,
        }
    }

    #[must_use]
    pub fn staff(user: UserUuid) -> Self {
        Self {
            user,
            role: Role::Staff,
        }
    }

    #[must_use]
    pub fn is_staff(&self) -> bool {
        self.role == Role::Staff
    }

    /// Whether the principal owns a resource owned by `owner`.
    #[must_use]
    pub fn owns(&self, owner: UserUuid) -> bool {
        self.user == owner
    }

    /// Whether the principal may see a back-office visible resource owned by `owner`.
    #[must_use]
    pub fn can_see(&self, owner: UserUuid) -> bool {
        self.is_staff() || self.owns(owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staff_can_see_everything_customers_only_their_own() {
        let owner = UserUuid::new();

        assert!(Principal::customer(owner).can_see(owner));
        assert!(!Principal::customer(UserUuid::new()).can_see(owner));
        assert!(Principal::staff(UserUuid::new()).can_see(owner));
    }
}
