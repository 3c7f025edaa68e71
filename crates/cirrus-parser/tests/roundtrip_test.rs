//! Canonical emission followed by parsing yields the same template

use cirrus_core::{Intrinsic, IntrinsicKind, Node, ParameterSpec, Resource, Scalar, Template};
use cirrus_parser::{emit, parse_template};
use cirrus_test_fixtures::{ecs_cluster, network};
use indexmap::IndexMap;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

#[test]
fn test_fixtures_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    for source in [ecs_cluster(), network()] {
        let template = parse_template(source.as_bytes())?;
        let emitted = emit::to_yaml(&template)?;
        let reparsed = parse_template(emitted.as_bytes())?;
        assert_eq!(template, reparsed, "emitted:\n{}", emitted);
    }
    Ok(())
}

#[test]
fn test_emitted_resource_snapshot() -> Result<(), Box<dyn std::error::Error>> {
    let template = parse_template(
        br#"
Resources:
  Topic:
    Type: AWS::SNS::Topic
    Properties:
      TopicName: !Sub "${AWS::StackName}-alerts"
      DisplayName: !GetAtt Queue.Arn
"#,
    )?;
    insta::assert_snapshot!(emit::to_yaml(&template)?, @r###"
    Resources:
      Topic:
        Type: AWS::SNS::Topic
        Properties:
          TopicName: !Sub ${AWS::StackName}-alerts
          DisplayName: !GetAtt
          - Queue
          - Arn
    "###);
    Ok(())
}

#[test]
fn test_nested_single_operand_intrinsics_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let template = parse_template(
        br#"
Resources:
  Instance:
    Type: AWS::EC2::Instance
    Properties:
      UserData:
        Fn::Base64: !Sub "echo ${AWS::Region}"
      AvailabilityZone: !Select [0, !GetAZs {"Ref": "AWS::Region"}]
      VpcId: !ImportValue [!Sub "${AWS::StackName}-vpc"]
"#,
    )?;
    let properties = &template.resources["Instance"].properties;
    let user_data = properties["UserData"].as_intrinsic().unwrap();
    assert_eq!(user_data.kind, IntrinsicKind::Base64);

    let emitted = emit::to_yaml(&template)?;
    assert!(emitted.contains("UserData: !Base64"), "emitted:\n{}", emitted);
    let reparsed = parse_template(emitted.as_bytes())?;
    assert_eq!(template, reparsed, "emitted:\n{}", emitted);
    Ok(())
}

fn identifier(prefix: &'static str) -> impl Strategy<Value = String> {
    "[A-Z][a-zA-Z0-9]{0,8}".prop_map(move |s| format!("{}{}", prefix, s))
}

fn scalar() -> impl Strategy<Value = Node> {
    prop_oneof![
        any::<bool>().prop_map(|b| Node::Scalar(Scalar::Bool(b))),
        any::<i64>().prop_map(|i| Node::Scalar(Scalar::Int(i))),
        "[a-zA-Z][a-zA-Z0-9_-]{0,12}".prop_map(Node::string),
    ]
}

fn property_value(params: Vec<String>) -> impl Strategy<Value = Node> {
    let leaf = prop_oneof![
        3 => scalar(),
        1 => proptest::sample::select(params).prop_map(|name| {
            Node::Intrinsic(Intrinsic {
                kind: IntrinsicKind::Ref,
                operands: vec![Node::string(name)],
            })
        }),
    ];
    leaf.prop_recursive(3, 16, 4, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..4).prop_map(Node::Sequence),
            proptest::collection::vec(("[A-Z][a-z]{0,6}", inner.clone()), 0..4).prop_map(
                |entries| Node::Mapping(
                    entries
                        .into_iter()
                        .map(|(k, v)| (format!("K{}", k), v))
                        .collect()
                )
            ),
            (inner.clone(), inner).prop_map(|(a, b)| Node::Intrinsic(Intrinsic {
                kind: IntrinsicKind::Join,
                operands: vec![Node::string(","), Node::Sequence(vec![a, b])],
            })),
        ]
    })
}

fn template() -> impl Strategy<Value = Template> {
    proptest::collection::btree_set(identifier("P"), 1..4)
        .prop_flat_map(|names| {
            let names: Vec<String> = names.into_iter().collect();
            let resources = proptest::collection::btree_map(
                identifier("R"),
                proptest::collection::vec(
                    ("[A-Z][a-z]{0,6}", property_value(names.clone())),
                    0..4,
                ),
                0..4,
            );
            (Just(names), resources)
        })
        .prop_map(|(names, resources)| {
            let mut template = Template::default();
            for name in names {
                let mut spec = ParameterSpec::new(name.clone(), "String");
                spec.default = Some(Node::string("value"));
                template.parameters.insert(name, spec);
            }
            for (id, props) in resources {
                let mut resource = Resource::new(id.clone(), "AWS::Test::Thing");
                resource.properties = props
                    .into_iter()
                    .map(|(k, v)| (format!("Prop{}", k), v))
                    .collect::<IndexMap<_, _>>();
                template.resources.insert(id, resource);
            }
            template
        })
}

proptest! {
    #[test]
    fn prop_emit_then_parse_is_identity(template in template()) {
        let emitted = emit::to_yaml(&template).unwrap();
        let reparsed = parse_template(emitted.as_bytes()).unwrap();
        prop_assert_eq!(template, reparsed);
    }
}
