//! Property tests for role-based dashboard projection.
//!
//! - projection is pure: the input is never mutated and repeated calls agree
//! - admin sees the overview unchanged, whatever the casing
//! - each lower role sees a view derivable from the one above it
//! - unknown roles see an empty overview stamped with the original time

use icms_api::services::{filter_dashboard_by_role, filter_for_role};
use icms_core::{DashboardOverview, HrOverview, StorageUsage, UserOverview, UserRole};
use icms_test_utils::generators::{arb_dashboard_overview, arb_role_name};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_projection_is_pure(overview in arb_dashboard_overview(), role in arb_role_name()) {
        let before = overview.clone();
        let first = filter_dashboard_by_role(&overview, &role);
        let second = filter_dashboard_by_role(&overview, &role);

        prop_assert_eq!(&overview, &before);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_admin_sees_everything(overview in arb_dashboard_overview()) {
        for name in ["admin", "Admin", " ADMIN "] {
            prop_assert_eq!(&filter_dashboard_by_role(&overview, name), &overview);
        }
    }

    #[test]
    fn prop_editor_never_sees_hr(overview in arb_dashboard_overview()) {
        let view = filter_for_role(&overview, &UserRole::Editor);

        prop_assert_eq!(view.hr.total_employees, 0);
        prop_assert_eq!(&view.hr, &HrOverview::default());
        prop_assert_eq!(&view.system.storage, &StorageUsage::default());
        prop_assert_eq!(&view.content, &overview.content);
    }

    #[test]
    fn prop_views_narrow_down_the_role_ladder(overview in arb_dashboard_overview()) {
        let manager = filter_for_role(&overview, &UserRole::Manager);
        let editor = filter_for_role(&overview, &UserRole::Editor);
        let user = filter_for_role(&overview, &UserRole::User);

        // Editor view is the manager view with HR and storage cleared.
        let mut expected_editor = manager.clone();
        expected_editor.hr = HrOverview::default();
        expected_editor.system.storage = StorageUsage::default();
        prop_assert_eq!(&editor, &expected_editor);

        // User view is the editor view with user figures cleared.
        let mut expected_user = editor.clone();
        expected_user.users = UserOverview::default();
        prop_assert_eq!(&user, &expected_user);

        prop_assert_eq!(manager.generated_at, overview.generated_at);
        prop_assert_eq!(user.generated_at, overview.generated_at);
    }

    #[test]
    fn prop_unknown_roles_see_nothing(
        overview in arb_dashboard_overview(),
        role in "[a-z]{1,12}",
    ) {
        prop_assume!(!matches!(role.as_str(), "admin" | "manager" | "editor" | "user"));

        let view = filter_dashboard_by_role(&overview, &role);
        prop_assert_eq!(view, DashboardOverview::empty(overview.generated_at));
    }
}
