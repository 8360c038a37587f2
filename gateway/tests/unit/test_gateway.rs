//! Gateway facade scenarios

use routergate::access::Role;
use routergate::errors::GatewayError;
use routergate::executor::Param;
use routergate::facade::operations::{AddressRequest, DeviceChange, Table};

use crate::support::{gateway_with_device, principal, Failure, MockDevice};

fn words(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_read_role_on_runner_is_insufficient_role() {
    let device = MockDevice::new();
    for write_enabled in [true, false] {
        let (_dir, gateway, id) = gateway_with_device(&device, write_enabled).await;

        for path in ["/ip/address/add", "/system/script/run", "/ip/address/print"] {
            let err = gateway
                .run(&principal(Role::Read), &id, path, &[])
                .await
                .unwrap_err();
            assert!(matches!(err, GatewayError::InsufficientRole { .. }), "{path}: {err}");
        }
    }
    assert_eq!(device.opened(), 0);
}

#[tokio::test]
async fn test_admin_adds_address_through_runner() {
    let device = MockDevice::new();
    let (_dir, gateway, id) = gateway_with_device(&device, true).await;

    let out = gateway
        .run(
            &principal(Role::Admin),
            &id,
            "/ip/address/add",
            &words(&["=address=192.168.88.10/24", "interface=ether1"]),
        )
        .await
        .unwrap();

    assert_eq!(out.len(), 1);
    assert_eq!(device.opened(), 1);
    assert_eq!(device.closed(), 1);

    let sent = device.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "/ip/address/add");
    assert_eq!(
        sent[0].1,
        vec![
            Param::new("address", "192.168.88.10/24"),
            Param::new("interface", "ether1"),
        ]
    );
}

#[tokio::test]
async fn test_writes_disabled_blocks_every_role_before_connecting() {
    let device = MockDevice::new();
    let (_dir, gateway, id) = gateway_with_device(&device, false).await;

    for role in [Role::Owner, Role::Admin] {
        let err = gateway
            .run(&principal(role), &id, "/ip/address/add", &words(&["address=10.0.0.1/24"]))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::WritesDisabled));

        let err = gateway
            .apply(&principal(role), &id, DeviceChange::Reboot)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::WritesDisabled));
    }

    // Reads still work while the kill-switch is on.
    let rows = gateway
        .list(&principal(Role::Read), &id, Table::Addresses)
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(device.sent_paths(), vec!["/ip/address/print"]);
}

#[tokio::test]
async fn test_runner_rejects_unlisted_paths_and_protocol_syntax() {
    let device = MockDevice::new();
    let (_dir, gateway, id) = gateway_with_device(&device, true).await;
    let admin = principal(Role::Admin);

    let err = gateway.run(&admin, &id, "/system/script/run", &[]).await.unwrap_err();
    assert!(matches!(err, GatewayError::NotWhitelisted(_)));

    let err = gateway
        .run(&admin, &id, "/ip/address/print", &words(&["?address=10.0.0.1"]))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::InvalidParameters(_)));
    assert!(err.is_policy_rejection());

    assert_eq!(device.opened(), 0);
}

#[tokio::test]
async fn test_unknown_device_is_not_found() {
    let device = MockDevice::new();
    let (_dir, gateway, _id) = gateway_with_device(&device, true).await;

    let err = gateway
        .list(&principal(Role::Read), "nope", Table::Interfaces)
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::NotFound(_)));
    assert_eq!(device.opened(), 0);
}

#[tokio::test]
async fn test_device_error_is_surfaced_verbatim() {
    let device = MockDevice::failing_on(
        1,
        Failure::Device("failure: already have such address".into()),
    );
    let (_dir, gateway, id) = gateway_with_device(&device, true).await;

    let change = DeviceChange::AddAddress(AddressRequest {
        address: "192.168.88.1/24".into(),
        interface: "bridge1".into(),
    });
    let err = gateway
        .apply(&principal(Role::Owner), &id, change)
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "failure: already have such address");
    assert_eq!(err.kind().category(), "device");
    assert_eq!(device.closed(), 1);
}

#[tokio::test]
async fn test_typed_validation_happens_before_connecting() {
    let device = MockDevice::new();
    let (_dir, gateway, id) = gateway_with_device(&device, true).await;

    let change = DeviceChange::AddAddress(AddressRequest {
        address: String::new(),
        interface: "ether1".into(),
    });
    let err = gateway
        .apply(&principal(Role::Admin), &id, change)
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::ValidationError(_)));

    let err = gateway
        .monitor_traffic(&principal(Role::Read), &id, "")
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::ValidationError(_)));
    assert_eq!(device.opened(), 0);
}

#[tokio::test]
async fn test_monitor_and_export() {
    let device = MockDevice::new();
    let (_dir, gateway, id) = gateway_with_device(&device, true).await;
    let reader = principal(Role::Read);

    let summary = gateway.monitor(&reader, &id).await.unwrap();
    assert_eq!(summary.cpu_load, Some(3));
    assert_eq!(summary.total_memory, Some(268_435_456));
    assert_eq!(summary.board_name.as_deref(), Some("RB5009"));

    let sample = gateway.monitor_traffic(&reader, &id, "ether1").await.unwrap();
    assert_eq!(sample["name"], "ether1");

    let lines = gateway.export(&reader, &id).await.unwrap();
    assert_eq!(lines.len(), 4);

    assert_eq!(device.opened(), 3);
    assert_eq!(device.closed(), 3);
}

#[tokio::test]
async fn test_registry_and_role_management_are_gated() {
    let device = MockDevice::new();
    let (_dir, gateway, id) = gateway_with_device(&device, true).await;

    let err = gateway.remove_device(&principal(Role::Read), &id).await.unwrap_err();
    assert!(matches!(err, GatewayError::InsufficientRole { .. }));

    for role in [Role::Admin, Role::Read] {
        let err = gateway.list_users(&principal(role)).await.unwrap_err();
        assert!(matches!(err, GatewayError::InsufficientRole { .. }));
        let err = gateway
            .assign_role(&principal(role), "someone", "owner")
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InsufficientRole { .. }));
    }

    assert_eq!(gateway.list_devices(&principal(Role::Read)).await.unwrap().len(), 1);
    gateway.remove_device(&principal(Role::Admin), &id).await.unwrap();
    assert!(gateway.list_devices(&principal(Role::Read)).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_register_login_and_role_changes() {
    let device = MockDevice::new();
    let (_dir, gateway, _id) = gateway_with_device(&device, true).await;

    let grant = gateway.register("alice", "correct horse").await.unwrap();
    assert_eq!(grant.profile.role, "owner");

    let err = gateway.register("mallory", "x").await.unwrap_err();
    assert!(matches!(err, GatewayError::RegistrationClosed));

    let err = gateway.login("alice", "wrong").await.unwrap_err();
    assert!(matches!(err, GatewayError::BadCredentials));
    let err = gateway.login("nobody", "correct horse").await.unwrap_err();
    assert!(matches!(err, GatewayError::BadCredentials));

    let grant = gateway.login("alice", "correct horse").await.unwrap();
    let owner = gateway.authenticate(Some(grant.token.as_str())).await.unwrap();
    assert_eq!(owner.role, Role::Owner);

    let users = gateway.list_users(&owner).await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].username, "alice");

    let err = gateway.assign_role(&owner, &users[0].id, "root").await.unwrap_err();
    assert!(matches!(err, GatewayError::ValidationError(_)));
    let err = gateway.assign_role(&owner, "missing", "read").await.unwrap_err();
    assert!(matches!(err, GatewayError::NotFound(_)));

    // A demotion applies to tokens issued before it.
    gateway.assign_role(&owner, &users[0].id, "read").await.unwrap();
    let demoted = gateway.authenticate(Some(grant.token.as_str())).await.unwrap();
    assert_eq!(demoted.role, Role::Read);

    assert!(matches!(
        gateway.authenticate(None).await,
        Err(GatewayError::MissingToken)
    ));
    assert!(matches!(
        gateway.authenticate(Some("garbage")).await,
        Err(GatewayError::InvalidToken(_))
    ));
}
