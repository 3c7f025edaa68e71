//! End-to-end resolution of the shared fixtures

use cirrus_core::{ResolvedTemplate, TemplateError, Value};
use cirrus_parser::parse_template;
use cirrus_resolver::{resolve, Resolver, ResolverConfig};
use cirrus_test_fixtures::{cyclic_conditions, ecs_cluster, network};
use indexmap::IndexMap;
use pretty_assertions::assert_eq;

fn params(pairs: &[(&str, Value)]) -> IndexMap<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn resolve_ecs(pairs: &[(&str, Value)]) -> Result<ResolvedTemplate, TemplateError> {
    let template = parse_template(ecs_cluster().as_bytes())?;
    resolve(&template, &params(pairs))
}

fn strategy(capacity_provider: &str, weight: i64) -> Value {
    let mut entry = IndexMap::new();
    entry.insert("CapacityProvider".to_string(), Value::string(capacity_provider));
    entry.insert("Weight".to_string(), Value::Int(weight));
    Value::Map(entry)
}

#[test]
fn test_defaults_resolve_to_dev() -> Result<(), TemplateError> {
    let resolved = resolve_ecs(&[])?;

    assert_eq!(resolved.parameter_value("Environment"), Some(&Value::string("dev")));
    assert_eq!(resolved.parameter_value("FargateWeight"), Some(&Value::Int(1)));

    let cluster = resolved.resource("Cluster").unwrap();
    assert_eq!(cluster.property("ClusterName"), Some(&Value::string("services-dev")));
    assert_eq!(
        cluster.property("CapacityProviders"),
        Some(&Value::list(["FARGATE", "FARGATE_SPOT"]))
    );
    assert_eq!(
        cluster.property("DefaultCapacityProviderStrategy"),
        Some(&Value::List(vec![strategy("FARGATE", 1), strategy("FARGATE_SPOT", 4)]))
    );
    assert_eq!(
        cluster.property("ClusterSettings.0.Value"),
        Some(&Value::string("disabled"))
    );
    assert_eq!(cluster.tag("Environment"), Some(&Value::string("dev")));
    assert_eq!(cluster.tag("ManagedBy"), Some(&Value::string("cirrus")));

    let log_group = resolved.resource("LogGroup").unwrap();
    assert_eq!(log_group.property("LogGroupName"), Some(&Value::string("/ecs/services/dev")));
    assert_eq!(log_group.property("RetentionInDays"), Some(&Value::Int(30)));
    assert_eq!(log_group.deletion_policy.as_deref(), Some("Retain"));

    let role = resolved.resource("ExecutionRole").unwrap();
    assert_eq!(
        role.property("ManagedPolicyArns.0"),
        Some(&Value::string(
            "arn:aws:iam::aws:policy/service-role/AmazonECSTaskExecutionRolePolicy"
        ))
    );

    assert!(resolved.resource("Alarm").is_none());
    assert!(!resolved.outputs.contains_key("AlarmName"));
    assert_eq!(resolved.creation_order, vec!["Cluster", "LogGroup", "ExecutionRole"]);

    assert_eq!(resolved.outputs["ClusterName"].value, Value::string("<resolved:Cluster>"));
    assert_eq!(resolved.outputs["ClusterArn"].value, Value::string("<resolved:Cluster.Arn>"));
    assert_eq!(
        resolved.export_names().collect::<Vec<_>>(),
        vec!["cirrus-stack-ClusterName", "cirrus-stack-ClusterArn"]
    );

    assert_eq!(resolved.conditions["IsProd"], Some(false));
    assert_eq!(resolved.conditions["IsNotProd"], Some(true));
    assert_eq!(resolved.conditions["UseSpot"], Some(true));
    Ok(())
}

#[test]
fn test_prod_switches_conditions() -> Result<(), TemplateError> {
    let resolved = resolve_ecs(&[("Environment", Value::string("prod"))])?;

    let cluster = resolved.resource("Cluster").unwrap();
    assert_eq!(
        cluster.property("DefaultCapacityProviderStrategy"),
        Some(&Value::List(vec![strategy("FARGATE", 1)]))
    );
    assert_eq!(
        cluster.property("ClusterSettings.0.Value"),
        Some(&Value::string("enabled"))
    );

    let alarm = resolved.resource("Alarm").unwrap();
    assert_eq!(alarm.property("AlarmName"), Some(&Value::string("<resolved:Cluster>-cpu")));
    assert_eq!(
        resolved.creation_order,
        vec!["Cluster", "LogGroup", "ExecutionRole", "Alarm"]
    );
    assert_eq!(resolved.outputs["AlarmName"].value, Value::string("<resolved:Alarm>"));
    Ok(())
}

#[test]
fn test_string_supplied_numbers_are_coerced() -> Result<(), TemplateError> {
    let resolved = resolve_ecs(&[("SpotWeight", Value::string("0")), ("Environment", Value::string("prod"))])?;
    assert_eq!(resolved.conditions["UseSpot"], Some(true));
    Ok(())
}

#[test]
fn test_parameter_constraints() {
    let err = resolve_ecs(&[("Environment", Value::string("qa"))]).unwrap_err();
    match err {
        TemplateError::ParameterConstraint { path, name, value, .. } => {
            assert_eq!(path, "Parameters.Environment");
            assert_eq!(name, "Environment");
            assert_eq!(value, "qa");
        }
        other => panic!("unexpected error: {other}"),
    }

    let err = resolve_ecs(&[("FargateWeight", Value::Int(11))]).unwrap_err();
    assert_eq!(err.kind(), "ParameterConstraintError");

    let err = resolve_ecs(&[("ClusterName", Value::string("Bad_Name"))]).unwrap_err();
    assert_eq!(err.kind(), "ParameterConstraintError");

    let err = resolve_ecs(&[("LogRetentionDays", Value::Int(14))]).unwrap_err();
    assert_eq!(err.kind(), "ParameterConstraintError");
}

#[test]
fn test_cyclic_conditions_rejected() {
    let template = parse_template(cyclic_conditions().as_bytes()).unwrap();
    let err = resolve(&template, &IndexMap::new()).unwrap_err();
    match err {
        TemplateError::CyclicReference { cycle, .. } => {
            assert_eq!(cycle, vec!["Conditions.A", "Conditions.B", "Conditions.A"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_missing_depends_on_target() {
    let yaml = r#"
Resources:
  Role:
    Type: AWS::IAM::Role
    DependsOn: [LogGroup, Missing]
  LogGroup:
    Type: AWS::Logs::LogGroup
"#;
    let template = parse_template(yaml.as_bytes()).unwrap();
    let err = resolve(&template, &IndexMap::new()).unwrap_err();
    assert_eq!(
        err,
        TemplateError::UndefinedReference {
            path: "Resources.Role.DependsOn[1]".into(),
            name: "Missing".into(),
        }
    );
}

#[test]
fn test_conditional_laziness() {
    let yaml = r#"
Parameters:
  Flag:
    Type: String
    Default: "off"
  OnlyWhenOn:
    Type: String
Conditions:
  IsOn: !Equals [!Ref Flag, "on"]
Resources:
  Bucket:
    Type: AWS::S3::Bucket
    Properties:
      BucketName: !If [IsOn, !Ref OnlyWhenOn, default-bucket]
      Owner: !If [IsOn, !Ref Undeclared, nobody]
"#;
    let template = parse_template(yaml.as_bytes()).unwrap();
    let resolved = resolve(&template, &IndexMap::new()).unwrap();
    let bucket = resolved.resource("Bucket").unwrap();
    assert_eq!(bucket.property("BucketName"), Some(&Value::string("default-bucket")));
    assert_eq!(bucket.property("Owner"), Some(&Value::string("nobody")));
    assert_eq!(resolved.parameters["OnlyWhenOn"].value, None);

    let err = resolve(&template, &params(&[("Flag", Value::string("on"))])).unwrap_err();
    assert_eq!(
        err,
        TemplateError::MissingParameter {
            path: "Resources.Bucket.Properties.BucketName[1]".into(),
            name: "OnlyWhenOn".into(),
        }
    );
}

#[test]
fn test_network_intrinsics() -> Result<(), TemplateError> {
    let template = parse_template(network().as_bytes())?;
    let resolved = resolve(&template, &IndexMap::new())?;

    assert_eq!(
        resolved.parameter_value("SubnetNames"),
        Some(&Value::list(["public-a", "public-b"]))
    );

    let subnet_a = resolved.resource("SubnetA").unwrap();
    assert_eq!(subnet_a.property("VpcId"), Some(&Value::string("<resolved:Vpc>")));
    assert_eq!(subnet_a.property("CidrBlock"), Some(&Value::string("10.0.0.0/24")));
    assert_eq!(subnet_a.property("AvailabilityZone"), Some(&Value::string("us-east-1a")));
    assert_eq!(subnet_a.tag("Name"), Some(&Value::string("public-a")));

    let subnet_b = resolved.resource("SubnetB").unwrap();
    assert_eq!(subnet_b.property("CidrBlock"), Some(&Value::string("10.0.1.0/24")));
    assert_eq!(subnet_b.property("AvailabilityZone"), Some(&Value::string("us-east-1b")));

    assert_eq!(
        resolved.resource("UserData").unwrap().property("Value"),
        Some(&Value::string("IyEvYmluL2Jhc2gKZWNobyBoZWxsbwo="))
    );

    assert_eq!(
        resolved.outputs["VpcId"].export_name.as_deref(),
        Some("cirrus-stack-VpcId")
    );
    assert_eq!(
        resolved.outputs["SharedBucket"].value,
        Value::string("<import:shared-artifacts-bucket>")
    );
    assert_eq!(
        resolved.creation_order,
        vec!["Vpc", "SubnetA", "SubnetB", "UserData"]
    );
    Ok(())
}

#[test]
fn test_configured_region_and_imports() -> Result<(), TemplateError> {
    let template = parse_template(network().as_bytes())?;
    let resolver = Resolver::new(
        ResolverConfig::default()
            .with_region("eu-central-1")
            .with_stack_name("net")
            .with_availability_zones(["eu-central-1b", "eu-central-1c"])
            .with_import("shared-artifacts-bucket", "artifacts-eu"),
    );
    let resolved = resolver.resolve(&template, &IndexMap::new())?;

    assert_eq!(
        resolved.resource("SubnetA").unwrap().property("AvailabilityZone"),
        Some(&Value::string("eu-central-1b"))
    );
    assert_eq!(resolved.outputs["VpcId"].export_name.as_deref(), Some("net-VpcId"));
    assert_eq!(resolved.outputs["SharedBucket"].value, Value::string("artifacts-eu"));
    Ok(())
}

#[test]
fn test_source_template_is_untouched() -> Result<(), TemplateError> {
    let template = parse_template(ecs_cluster().as_bytes())?;
    let before = template.clone();
    resolve(&template, &params(&[("Environment", Value::string("prod"))]))?;
    assert_eq!(template, before);
    Ok(())
}

#[test]
fn test_resolved_template_serializes() -> Result<(), Box<dyn std::error::Error>> {
    let resolved = resolve_ecs(&[])?;
    let json: serde_json::Value = serde_json::from_str(&resolved.to_json()?)?;
    assert_eq!(json["Resources"]["Cluster"]["Type"], "AWS::ECS::Cluster");
    assert_eq!(json["CreationOrder"][2], "ExecutionRole");
    assert_eq!(json["Conditions"]["IsProd"], false);
    Ok(())
}

#[test]
fn test_equals_matches_unquoted_literals() -> Result<(), TemplateError> {
    let yaml = r#"
Parameters:
  EnableLogs:
    Type: String
    Default: "true"
  Replicas:
    Type: Number
    Default: 1
Conditions:
  LogsOn: !Equals [!Ref EnableLogs, true]
  SingleReplica: !Equals [!Ref Replicas, "1"]
Resources:
  Bucket:
    Type: AWS::S3::Bucket
    Condition: LogsOn
  Queue:
    Type: AWS::SQS::Queue
    Condition: SingleReplica
"#;
    let template = parse_template(yaml.as_bytes())?;
    let resolved = resolve(&template, &IndexMap::new())?;

    assert_eq!(resolved.conditions["LogsOn"], Some(true));
    assert_eq!(resolved.conditions["SingleReplica"], Some(true));
    assert!(resolved.resource("Bucket").is_some());
    assert!(resolved.resource("Queue").is_some());

    let resolved = resolve(&template, &params(&[("EnableLogs", Value::string("false"))]))?;
    assert_eq!(resolved.conditions["LogsOn"], Some(false));
    assert!(resolved.resource("Bucket").is_none());
    Ok(())
}

#[test]
fn test_base64_of_sub_in_every_form() -> Result<(), TemplateError> {
    let expected = Value::string("ZWNobyB1cy1lYXN0LTE=");
    for user_data in [
        r#"!Base64 [!Sub "echo ${AWS::Region}"]"#,
        r#"{"Fn::Base64": {"Fn::Sub": "echo ${AWS::Region}"}}"#,
        r#"!Base64 {"Fn::Sub": "echo ${AWS::Region}"}"#,
    ] {
        let yaml = format!(
            "Resources:\n  Instance:\n    Type: AWS::EC2::Instance\n    Properties:\n      UserData: {}\n",
            user_data
        );
        let template = parse_template(yaml.as_bytes())?;
        let resolved = resolve(&template, &IndexMap::new())?;
        let instance = resolved.resource("Instance").unwrap();
        assert_eq!(instance.property("UserData"), Some(&expected), "{}", user_data);
    }
    Ok(())
}
