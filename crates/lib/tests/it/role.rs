use rowfence::Tenant;
use rowfence::role::RoleSwitcher;

use crate::helpers::{MockGateway, mock_context};
use rowfence::RlsConfig;

#[tokio::test]
async fn no_configured_role_means_no_role_statements() {
    let mut ctx = mock_context(RlsConfig::new());
    ctx.disable().await.unwrap();
    ctx.enable().await.unwrap();
    ctx.set_tenant(Some(&Tenant::new("42"))).await.unwrap();

    assert_eq!(ctx.gateway_mut().statements_containing("SET ROLE"), 0);
}

#[tokio::test]
async fn privileged_switch_issues_set_role_none() {
    let switcher = RoleSwitcher::new(Some("app_user".to_string()));
    let mut gateway = MockGateway::new(1);

    switcher.set_role(&mut gateway, true).await.unwrap();
    assert_eq!(gateway.statements, vec!["SET ROLE NONE".to_string()]);
    assert_eq!(gateway.role, None);

    switcher.set_role(&mut gateway, false).await.unwrap();
    assert_eq!(gateway.role.as_deref(), Some("app_user"));
}

#[tokio::test]
async fn reassert_overrides_an_earlier_set_role_none() {
    let switcher = RoleSwitcher::new(Some("app_user".to_string()));
    let mut gateway = MockGateway::new(1);

    switcher.set_role(&mut gateway, true).await.unwrap();
    switcher.reassert_unprivileged(&mut gateway).await.unwrap();
    assert_eq!(gateway.role.as_deref(), Some("app_user"));
}

#[tokio::test]
async fn role_names_are_quoted_as_identifiers() {
    let switcher = RoleSwitcher::new(Some("app user".to_string()));
    let mut gateway = MockGateway::new(1);

    switcher.set_role(&mut gateway, false).await.unwrap();
    assert_eq!(
        gateway.statements,
        vec!["SET ROLE \"app user\"".to_string()]
    );
}

#[tokio::test]
async fn tenant_switch_double_sets_the_unprivileged_role() {
    let config = RlsConfig::new().with_unprivileged_role("app_user");
    let mut ctx = mock_context(config);
    ctx.set_tenant(Some(&Tenant::new("42"))).await.unwrap();

    assert_eq!(
        ctx.gateway_mut()
            .statements_containing("SET ROLE \"app_user\""),
        2
    );
}
