//! Resolver behaviour with in-memory adapters
//!
//! Covers ordering, empty-value reporting, preparation gating and the
//! per-workspace fetch cache.

use pretty_assertions::assert_eq;
use tfc_outputs::source::mock::{MockLocal, MockRemote};
use tfc_outputs::{
    format_lines, BindingSet, Config, OutputBinding, ResolveError, Resolver, WorkspaceOutputs,
};

// ============================================================================
// HELPERS
// ============================================================================

fn config() -> Config {
    Config::from_lookup(|key| match key {
        "TFC_ORG_NAME" => Some("acme".into()),
        "TFC_INFRA_WORKSPACE_ID" => Some("ws-infra".into()),
        "TFC_API_READ_TOKEN" => Some("token".into()),
        _ => None,
    })
    .unwrap()
}

fn local_ok() -> MockLocal {
    MockLocal::new()
        .with_value("subnet_id", "subnet-abc")
        .with_value("security_group_id", "sg-123")
}

fn outputs(pairs: &[(&str, &str)]) -> WorkspaceOutputs {
    pairs.iter().copied().collect()
}

fn remote_ok() -> MockRemote {
    MockRemote::new().with_workspace(
        "ws-infra",
        outputs(&[
            ("efs_dns_name", "fs-1.efs.amazonaws.com"),
            ("vpc_id", "vpc-9"),
        ]),
    )
}

// ============================================================================
// SUCCESS
// ============================================================================

#[tokio::test]
async fn full_resolution_produces_packer_outputs() {
    let config = config();
    let local = local_ok();
    let remote = remote_ok();

    let result = Resolver::new(&config, &local, &remote)
        .resolve(&BindingSet::defaults())
        .await
        .unwrap();

    assert_eq!(
        format_lines(&result),
        "SUBNET_ID=subnet-abc\nSG_ID=sg-123\nEFS_DNS_NAME=fs-1.efs.amazonaws.com\nVPC_ID=vpc-9\n"
    );
    assert_eq!(local.lookups(), ["subnet_id", "security_group_id"]);
}

#[tokio::test]
async fn result_follows_declaration_order_not_source_order() {
    let config = config();
    let local = local_ok();
    let remote = remote_ok();
    let bindings = BindingSet::new(vec![
        OutputBinding::remote("VPC_ID", "vpc_id"),
        OutputBinding::local("SG_ID", "security_group_id"),
        OutputBinding::remote("EFS_DNS_NAME", "efs_dns_name"),
        OutputBinding::local("SUBNET_ID", "subnet_id"),
    ])
    .unwrap();

    let result = Resolver::new(&config, &local, &remote)
        .resolve(&bindings)
        .await
        .unwrap();

    assert_eq!(result.names(), ["VPC_ID", "SG_ID", "EFS_DNS_NAME", "SUBNET_ID"]);
    // Preparation still happened once, before the first local lookup
    assert_eq!(local.prepare_calls(), 1);
}

#[tokio::test]
async fn same_key_can_publish_under_two_names() {
    let config = config();
    let local = MockLocal::new();
    let remote = remote_ok();
    let bindings = BindingSet::new(vec![
        OutputBinding::remote("VPC_ID", "vpc_id"),
        OutputBinding::remote("PKR_VAR_vpc_id", "vpc_id"),
    ])
    .unwrap();

    let result = Resolver::new(&config, &local, &remote)
        .resolve(&bindings)
        .await
        .unwrap();

    assert_eq!(result.get("VPC_ID"), Some("vpc-9"));
    assert_eq!(result.get("PKR_VAR_vpc_id"), Some("vpc-9"));
}

// ============================================================================
// MISSING VALUES
// ============================================================================

#[tokio::test]
async fn single_empty_value_names_only_that_binding() {
    let config = config();
    let local = MockLocal::new()
        .with_value("subnet_id", "")
        .with_value("security_group_id", "sg-123");
    let remote = remote_ok();

    let err = Resolver::new(&config, &local, &remote)
        .resolve(&BindingSet::defaults())
        .await
        .unwrap_err();

    match err {
        ResolveError::IncompleteResolution { missing } => assert_eq!(missing, ["SUBNET_ID"]),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn all_missing_names_reported_together() {
    let config = config();
    let local = MockLocal::new()
        .with_value("subnet_id", "subnet-abc")
        .with_value("security_group_id", "");
    // vpc_id absent, efs_dns_name empty
    let remote =
        MockRemote::new().with_workspace("ws-infra", outputs(&[("efs_dns_name", "")]));

    let err = Resolver::new(&config, &local, &remote)
        .resolve(&BindingSet::defaults())
        .await
        .unwrap_err();

    match err {
        ResolveError::IncompleteResolution { missing } => {
            assert_eq!(missing, ["SG_ID", "EFS_DNS_NAME", "VPC_ID"])
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

// ============================================================================
// FAIL FAST
// ============================================================================

#[tokio::test]
async fn failed_preparation_skips_every_local_lookup() {
    let config = config();
    let local = local_ok().failing_prepare();
    let remote = remote_ok();

    let err = Resolver::new(&config, &local, &remote)
        .resolve(&BindingSet::defaults())
        .await
        .unwrap_err();

    assert!(matches!(err, ResolveError::CommandExecution { .. }));
    assert_eq!(local.prepare_calls(), 1);
    assert!(local.lookups().is_empty());
    assert!(remote.calls().is_empty());
}

#[tokio::test]
async fn local_command_failure_is_fatal() {
    let config = config();
    // security_group_id not scripted -> terraform output fails
    let local = MockLocal::new().with_value("subnet_id", "subnet-abc");
    let remote = remote_ok();

    let err = Resolver::new(&config, &local, &remote)
        .resolve(&BindingSet::defaults())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("terraform output -raw security_group_id"));
    assert!(remote.calls().is_empty());
}

#[tokio::test]
async fn remote_failure_is_fatal() {
    let config = config();
    let local = local_ok();
    let remote = MockRemote::new();

    let err = Resolver::new(&config, &local, &remote)
        .resolve(&BindingSet::defaults())
        .await
        .unwrap_err();

    assert!(matches!(err, ResolveError::ApiResponse { .. }));
}

// ============================================================================
// WORKSPACE CACHE
// ============================================================================

#[tokio::test]
async fn each_workspace_fetched_once() {
    let config = config();
    let local = MockLocal::new();
    let remote = remote_ok().with_workspace(
        "ws-network",
        outputs(&[("private_subnet_id", "subnet-priv"), ("nat_ip", "10.0.0.1")]),
    );
    let bindings = BindingSet::new(vec![
        OutputBinding::remote("VPC_ID", "vpc_id"),
        OutputBinding::remote("PRIVATE_SUBNET", "private_subnet_id").in_workspace("ws-network"),
        OutputBinding::remote("EFS_DNS_NAME", "efs_dns_name"),
        OutputBinding::remote("NAT_IP", "nat_ip").in_workspace("ws-network"),
        // explicit id equal to the configured default shares its cache entry
        OutputBinding::remote("VPC_ID_AGAIN", "vpc_id").in_workspace("ws-infra"),
    ])
    .unwrap();

    let result = Resolver::new(&config, &local, &remote)
        .resolve(&bindings)
        .await
        .unwrap();

    assert_eq!(result.len(), 5);
    assert_eq!(result.get("NAT_IP"), Some("10.0.0.1"));
    assert_eq!(remote.calls(), ["ws-infra", "ws-network"]);
    assert_eq!(local.prepare_calls(), 0);
}
