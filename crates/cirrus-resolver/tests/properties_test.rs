//! Determinism and cycle rejection over generated inputs

use cirrus_core::{Intrinsic, IntrinsicKind, Node, Resource, Template, TemplateError, Value};
use cirrus_parser::parse_template;
use cirrus_resolver::resolve;
use cirrus_test_fixtures::ecs_cluster;
use indexmap::IndexMap;
use proptest::prelude::*;

fn call(kind: IntrinsicKind, operands: Vec<Node>) -> Node {
    Node::Intrinsic(Intrinsic { kind, operands })
}

/// Wrap a condition reference in one of the boolean combinators.
fn wrap(reference: Node, shape: u8) -> Node {
    let truth = call(IntrinsicKind::Equals, vec![Node::string("x"), Node::string("x")]);
    match shape % 3 {
        0 => call(IntrinsicKind::Not, vec![reference]),
        1 => call(IntrinsicKind::And, vec![reference, truth]),
        _ => call(IntrinsicKind::Or, vec![truth, reference]),
    }
}

fn ecs_parameters() -> impl Strategy<Value = IndexMap<String, Value>> {
    (
        prop::sample::select(vec!["dev", "staging", "prod"]),
        0i64..=10,
        0i64..=8,
        prop::sample::select(vec![7i64, 30, 90]),
    )
        .prop_map(|(env, fargate, spot, retention)| {
            let mut params = IndexMap::new();
            params.insert("Environment".to_string(), Value::string(env));
            params.insert("FargateWeight".to_string(), Value::Int(fargate));
            params.insert("SpotWeight".to_string(), Value::string(spot.to_string()));
            params.insert("LogRetentionDays".to_string(), Value::Int(retention));
            params
        })
}

proptest! {
    #[test]
    fn prop_resolution_is_deterministic(params in ecs_parameters()) {
        let template = parse_template(ecs_cluster().as_bytes()).unwrap();
        let first = resolve(&template, &params).unwrap();
        let second = resolve(&template, &params).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.to_yaml().unwrap(), second.to_yaml().unwrap());
    }

    #[test]
    fn prop_condition_cycles_are_rejected(
        shapes in prop::collection::vec(any::<u8>(), 1..6),
        entry in any::<prop::sample::Index>(),
    ) {
        let n = shapes.len();
        let mut template = Template::default();
        for (i, shape) in shapes.iter().enumerate() {
            let next = format!("C{}", (i + 1) % n);
            let reference = call(IntrinsicKind::Condition, vec![Node::string(next)]);
            template.conditions.insert(format!("C{}", i), wrap(reference, *shape));
        }
        let mut resource = Resource::new("Topic", "AWS::SNS::Topic");
        resource.condition = Some(format!("C{}", entry.index(n)));
        template.resources.insert("Topic".to_string(), resource);

        let err = resolve(&template, &IndexMap::new()).unwrap_err();
        let is_cycle = matches!(err, TemplateError::CyclicReference { .. });
        prop_assert!(is_cycle, "expected a cycle error, got {}", err);
    }
}
