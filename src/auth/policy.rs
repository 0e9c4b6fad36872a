// Central authorization policy. Every role/permission decision goes through
// authorize() so the rules live in one place instead of per-route checks.

use uuid::Uuid;

use crate::auth::Role;
use crate::middleware::auth::AuthUser;

/// Operations an actor can attempt against the API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Read a resource (request, order, ticket, invoice)
    ViewResource,
    /// Edit descriptive fields (title, description, notes)
    EditDetails,
    /// Overwrite the workflow status and assignment/cost fields
    SetStatus,
    /// Issue a signed QR token for a service request
    IssueQr,
    /// Consume a scanned QR token and apply its transition
    ScanQr,
    /// Generic delete of a resource
    DeleteResource,
    /// Start a payment for an invoice
    PayInvoice,
    /// Create/update sites and users
    ManageSites,
    /// Run the invoice auto-accept sweep
    RunSweep,
}

/// Site and ownership context of the resource being acted on
#[derive(Debug, Clone, Copy)]
pub struct ResourceScope {
    pub site_id: Uuid,
    pub owner_id: Uuid,
}

/// Denied decision, carrying the reason reported to the caller
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct Denied(pub String);

fn deny(reason: &str) -> Result<(), Denied> {
    Err(Denied(reason.to_string()))
}

/// Decide whether `actor` may perform `action` on the resource described by
/// `scope`. Site-less actions (ManageSites, RunSweep) pass `None`.
pub fn authorize(
    actor: &AuthUser,
    scope: Option<&ResourceScope>,
    action: Action,
) -> Result<(), Denied> {
    // Superadmins are unrestricted
    if actor.role == Role::Superadmin {
        return Ok(());
    }

    match action {
        Action::ManageSites => deny("superadmin access required"),
        Action::RunSweep => deny("superadmin access required"),

        _ => {
            let scope = match scope {
                Some(s) => s,
                None => return deny("resource context required"),
            };

            // Everyone below superadmin is bound to exactly one site
            if actor.site_id != Some(scope.site_id) {
                return deny("resource belongs to a different site");
            }

            match actor.role {
                Role::Resident => match action {
                    Action::ViewResource | Action::EditDetails | Action::IssueQr | Action::PayInvoice => {
                        if actor.user_id == scope.owner_id {
                            Ok(())
                        } else {
                            deny("residents may only access their own resources")
                        }
                    }
                    Action::SetStatus => deny("residents cannot change status"),
                    Action::ScanQr => deny("residents cannot confirm service steps"),
                    _ => deny("not permitted"),
                },

                Role::Staff | Role::SiteAdmin => match action {
                    Action::ViewResource
                    | Action::EditDetails
                    | Action::SetStatus
                    | Action::IssueQr
                    | Action::ScanQr
                    | Action::DeleteResource => Ok(()),
                    Action::PayInvoice => deny("invoices are paid by the resident"),
                    _ => deny("not permitted"),
                },

                Role::Superadmin => Ok(()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(role: Role, site_id: Option<Uuid>, user_id: Uuid) -> AuthUser {
        AuthUser {
            user_id,
            site_id,
            role,
            department: None,
            name: "test".to_string(),
        }
    }

    #[test]
    fn superadmin_is_unrestricted() {
        let admin = actor(Role::Superadmin, None, Uuid::new_v4());
        let scope = ResourceScope { site_id: Uuid::new_v4(), owner_id: Uuid::new_v4() };
        assert!(authorize(&admin, Some(&scope), Action::SetStatus).is_ok());
        assert!(authorize(&admin, None, Action::ManageSites).is_ok());
        assert!(authorize(&admin, None, Action::RunSweep).is_ok());
    }

    #[test]
    fn resident_owns_their_resources_only() {
        let site = Uuid::new_v4();
        let me = Uuid::new_v4();
        let resident = actor(Role::Resident, Some(site), me);

        let mine = ResourceScope { site_id: site, owner_id: me };
        let theirs = ResourceScope { site_id: site, owner_id: Uuid::new_v4() };

        assert!(authorize(&resident, Some(&mine), Action::EditDetails).is_ok());
        assert!(authorize(&resident, Some(&mine), Action::PayInvoice).is_ok());
        assert!(authorize(&resident, Some(&theirs), Action::ViewResource).is_err());
        assert!(authorize(&resident, Some(&mine), Action::SetStatus).is_err());
        assert!(authorize(&resident, Some(&mine), Action::ScanQr).is_err());
    }

    #[test]
    fn staff_are_scoped_to_their_site() {
        let site = Uuid::new_v4();
        let staff = actor(Role::Staff, Some(site), Uuid::new_v4());

        let local = ResourceScope { site_id: site, owner_id: Uuid::new_v4() };
        let remote = ResourceScope { site_id: Uuid::new_v4(), owner_id: Uuid::new_v4() };

        assert!(authorize(&staff, Some(&local), Action::SetStatus).is_ok());
        assert!(authorize(&staff, Some(&local), Action::ScanQr).is_ok());
        assert!(authorize(&staff, Some(&remote), Action::SetStatus).is_err());
        assert!(authorize(&staff, None, Action::ManageSites).is_err());
        assert!(authorize(&staff, None, Action::RunSweep).is_err());
    }

    #[test]
    fn site_admin_matches_staff_privileges() {
        let site = Uuid::new_v4();
        let admin = actor(Role::SiteAdmin, Some(site), Uuid::new_v4());
        let local = ResourceScope { site_id: site, owner_id: Uuid::new_v4() };

        assert!(authorize(&admin, Some(&local), Action::SetStatus).is_ok());
        assert!(authorize(&admin, Some(&local), Action::PayInvoice).is_err());
    }
}
