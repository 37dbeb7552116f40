//! Role-based visibility helpers for portal views.
//!
//! These decide what a signed-in user may *see*; they are a presentation
//! affordance and do not guard any server route.

use std::borrow::Cow;

use serde::Serialize;
use uuid::Uuid;

use crate::models::text_enum;

text_enum! {
    pub enum Role {
        Admin => "ADMIN",
        Doctor => "DOCTOR",
        Nurse => "NURSE",
        Receptionist => "RECEPTIONIST",
        LabTechnician => "LAB_TECHNICIAN",
        Pharmacist => "PHARMACIST",
        Billing => "BILLING",
    }
}

/// Placeholder shown in place of a value the viewer may not see.
pub const MASKED_PLACEHOLDER: &str = "********";

/// The authenticated user attached to a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn new(name: impl Into<String>, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            role,
        }
    }

    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.contains(&self.role)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Ssn,
    Financial,
    Medical,
    Contact,
    Insurance,
}

impl FieldType {
    /// Roles allowed to see a field of this type when the caller gives no list.
    pub fn default_roles(self) -> &'static [Role] {
        match self {
            FieldType::Ssn => &[Role::Admin],
            FieldType::Financial => &[Role::Admin, Role::Billing],
            FieldType::Medical => &[Role::Admin, Role::Doctor, Role::Nurse],
            FieldType::Contact => &[Role::Admin, Role::Doctor, Role::Nurse, Role::Receptionist],
            FieldType::Insurance => &[Role::Admin, Role::Billing, Role::Receptionist],
        }
    }
}

/// A missing user is never allowed.
pub fn is_allowed(user: Option<&CurrentUser>, allowed: &[Role]) -> bool {
    user.is_some_and(|u| u.has_any_role(allowed))
}

/// A value that renders masked unless the viewer's role is allowed.
#[derive(Debug, Clone)]
pub struct SensitiveField<'a> {
    value: Cow<'a, str>,
    field_type: FieldType,
    allowed_roles: Option<Vec<Role>>,
}

impl<'a> SensitiveField<'a> {
    pub fn new(value: impl Into<Cow<'a, str>>, field_type: FieldType) -> Self {
        Self {
            value: value.into(),
            field_type,
            allowed_roles: None,
        }
    }

    /// Replace the field type's default roles.
    pub fn with_allowed_roles(mut self, roles: impl Into<Vec<Role>>) -> Self {
        self.allowed_roles = Some(roles.into());
        self
    }

    pub fn allowed_roles(&self) -> &[Role] {
        self.allowed_roles
            .as_deref()
            .unwrap_or_else(|| self.field_type.default_roles())
    }

    pub fn is_visible_to(&self, user: Option<&CurrentUser>) -> bool {
        is_allowed(user, self.allowed_roles())
    }

    pub fn render(&self, user: Option<&CurrentUser>) -> Cow<'_, str> {
        if self.is_visible_to(user) {
            Cow::Borrowed(self.value.as_ref())
        } else {
            Cow::Borrowed(MASKED_PLACEHOLDER)
        }
    }
}

/// Shows guarded content to allowed roles and a fallback to everyone else.
#[derive(Debug, Clone)]
pub struct RoleGate {
    allowed: Vec<Role>,
}

impl RoleGate {
    pub fn new(allowed: impl Into<Vec<Role>>) -> Self {
        Self {
            allowed: allowed.into(),
        }
    }

    pub fn permits(&self, user: Option<&CurrentUser>) -> bool {
        is_allowed(user, &self.allowed)
    }

    pub fn render<T>(&self, user: Option<&CurrentUser>, content: T, fallback: T) -> T {
        if self.permits(user) {
            content
        } else {
            fallback
        }
    }
}
