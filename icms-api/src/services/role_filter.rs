//! Role-based projection of a dashboard overview.
//!
//! Each role sees a strictly smaller view than the one above it:
//!
//! | role | view |
//! |------|------|
//! | admin | everything |
//! | manager | health message redacted |
//! | editor | manager view, HR and storage zeroed |
//! | user | editor view, user figures zeroed and top users dropped |
//! | other | every category zeroed |

use icms_core::{
    ContentOverview, DashboardOverview, HrOverview, MarketingOverview, StorageUsage,
    SystemOverview, UserOverview, UserRole,
};
use serde::{Deserialize, Serialize};

use crate::constants::REDACTED_HEALTH_MESSAGE;

/// Overview as seen by one role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct RoleDashboard {
    #[cfg_attr(feature = "openapi", schema(value_type = String, example = "manager"))]
    pub role: UserRole,
    pub overview: DashboardOverview,
}

/// Project `overview` for a role name, matched case-insensitively.
pub fn filter_dashboard_by_role(overview: &DashboardOverview, role: &str) -> DashboardOverview {
    filter_for_role(overview, &UserRole::parse(role))
}

pub fn filter_for_role(overview: &DashboardOverview, role: &UserRole) -> DashboardOverview {
    let mut view = overview.clone();

    match role {
        UserRole::Admin => {}
        UserRole::Manager => redact_health(&mut view),
        UserRole::Editor => {
            redact_health(&mut view);
            hide_hr_and_storage(&mut view);
        }
        UserRole::User => {
            redact_health(&mut view);
            hide_hr_and_storage(&mut view);
            view.users = UserOverview::default();
        }
        UserRole::Other(_) => {
            view = DashboardOverview {
                system: SystemOverview::default(),
                content: ContentOverview::default(),
                users: UserOverview::default(),
                hr: HrOverview::default(),
                marketing: MarketingOverview::default(),
                generated_at: overview.generated_at,
            };
        }
    }

    view
}

fn redact_health(view: &mut DashboardOverview) {
    view.system.system_health.message = REDACTED_HEALTH_MESSAGE.to_string();
}

fn hide_hr_and_storage(view: &mut DashboardOverview) {
    view.hr = HrOverview::default();
    view.system.storage = StorageUsage::default();
}

#[cfg(test)]
mod tests {
    use super::*;
    use icms_test_utils::fixtures::sample_overview;

    #[test]
    fn test_admin_is_identity() {
        let overview = sample_overview();
        assert_eq!(filter_dashboard_by_role(&overview, "admin"), overview);
        assert_eq!(filter_dashboard_by_role(&overview, "ADMIN"), overview);
    }

    #[test]
    fn test_manager_only_redacts_health_message() {
        let overview = sample_overview();
        let view = filter_dashboard_by_role(&overview, "Manager");

        assert_eq!(view.system.system_health.message, "Restricted");
        assert_eq!(view.system.system_health.status, overview.system.system_health.status);
        assert_eq!(view.hr, overview.hr);
        assert_eq!(view.system.storage, overview.system.storage);
    }

    #[test]
    fn test_editor_hides_hr_and_storage() {
        let overview = sample_overview();
        let view = filter_dashboard_by_role(&overview, "editor");

        assert_eq!(view.hr, HrOverview::default());
        assert_eq!(view.system.storage, StorageUsage::default());
        assert_eq!(view.users, overview.users);
        assert_eq!(view.content, overview.content);
    }

    #[test]
    fn test_user_drops_user_figures() {
        let overview = sample_overview();
        let view = filter_dashboard_by_role(&overview, "user");

        assert_eq!(view.users.total_users, 0);
        assert!(view.users.top_active_users.is_empty());
        assert_eq!(view.hr, HrOverview::default());
        assert_eq!(view.marketing, overview.marketing);
    }

    #[test]
    fn test_unknown_role_sees_nothing() {
        let overview = sample_overview();
        for role in ["guest", "", "root"] {
            let view = filter_dashboard_by_role(&overview, role);
            assert_eq!(view, DashboardOverview::empty(overview.generated_at));
        }
    }

    #[test]
    fn test_input_is_not_mutated() {
        let overview = sample_overview();
        let before = overview.clone();
        let _ = filter_dashboard_by_role(&overview, "user");
        assert_eq!(overview, before);
    }
}
