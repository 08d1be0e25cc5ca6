mod support;

use ldaphydrate::{
    AttributeValue, Batch, BatchAction, BatchModifyOperation, HydrateError, HydrateResult, Operation, OperationHydrator,
    Value,
};
use support::{JDOE_DN, connection, registry, user_schema};

fn hydrate(op: BatchModifyOperation, dn: Option<&str>) -> HydrateResult<(BatchModifyOperation, Vec<Operation>)> {
    let registry = registry();
    let schema = user_schema();
    let mut operation = Operation::BatchModify(op);
    let queued = OperationHydrator::new(&registry)
        .with_schema(&schema)
        .hydrate_to_protocol(&mut operation, dn)?;
    let Operation::BatchModify(modify) = operation else {
        panic!("operation kind changed");
    };
    Ok((modify, queued))
}

#[test]
fn replace_keeps_its_value_under_the_physical_name() {
    let (modify, queued) = hydrate(BatchModifyOperation::new(JDOE_DN).replace("emailAddress", "a@b.com"), None).unwrap();
    assert!(queued.is_empty());
    assert_eq!(modify.batches, vec![Batch::new(BatchAction::Replace, "mail", "a@b.com")]);
}

#[test]
fn batches_keep_their_order_and_actions() {
    let op = BatchModifyOperation::new(JDOE_DN)
        .add("firstName", "John")
        .remove("lastName", "Doe")
        .remove_all("description");
    let (modify, _) = hydrate(op, None).unwrap();
    let summary: Vec<(BatchAction, &str)> = modify
        .batches
        .iter()
        .map(|batch| (batch.action, batch.attribute.as_str()))
        .collect();
    assert_eq!(
        summary,
        [
            (BatchAction::Add, "givenName"),
            (BatchAction::Remove, "sn"),
            (BatchAction::RemoveAll, "description"),
        ]
    );
}

#[test]
fn empty_values_are_not_filtered() {
    let (modify, _) = hydrate(BatchModifyOperation::new(JDOE_DN).replace("description", ""), None).unwrap();
    assert_eq!(modify.batches[0].values, AttributeValue::single(""));
}

#[test]
fn converted_values_keep_their_shape() {
    let (modify, _) = hydrate(
        BatchModifyOperation::new(JDOE_DN).replace("created", "2024-01-02T03:04:05Z"),
        None,
    )
    .unwrap();
    assert_eq!(modify.batches[0].attribute, "whenCreated");
    assert_eq!(modify.batches[0].values, AttributeValue::single("20240102030405.0Z"));
}

#[test]
fn flag_batches_fold_into_one_replace() {
    let op = BatchModifyOperation::new(JDOE_DN)
        .replace("disabled", true)
        .replace("passwordNeverExpires", true);
    let (modify, _) = hydrate(op, None).unwrap();
    assert_eq!(
        modify.batches,
        vec![Batch::new(BatchAction::Replace, "userAccountControl", "66050")]
    );
}

#[test]
fn flag_batches_keep_the_bits_already_set() {
    let op = BatchModifyOperation::new(JDOE_DN)
        .with_current_value("userAccountControl", "66048")
        .replace("disabled", true);
    let (modify, _) = hydrate(op, None).unwrap();
    assert_eq!(
        modify.batches,
        vec![Batch::new(BatchAction::Replace, "userAccountControl", "66050")]
    );
}

#[test]
fn flag_removal_clears_only_its_bit() {
    let op = BatchModifyOperation::new(JDOE_DN)
        .with_current_value("userAccountControl", AttributeValue::multi(["328194"]))
        .remove("smartcardRequired", true);
    let (modify, _) = hydrate(op, None).unwrap();
    // 328194 = 512 | 2 | 65536 | 262144
    assert_eq!(modify.batches[0].values, AttributeValue::single("66050"));
}

#[test]
fn group_membership_batches_become_group_modifications() {
    let op = BatchModifyOperation::new(JDOE_DN)
        .add("groups", AttributeValue::multi(["cn=admins,dc=example,dc=com"]))
        .remove("groups", AttributeValue::multi(["cn=ops,dc=example,dc=com"]))
        .replace("firstName", "John");
    let (modify, queued) = hydrate(op, None).unwrap();
    assert_eq!(modify.batches, vec![Batch::new(BatchAction::Replace, "givenName", "John")]);

    let actions: Vec<(&str, BatchAction)> = queued
        .iter()
        .map(|op| match op {
            Operation::BatchModify(group) => (group.dn.as_str(), group.batches[0].action),
            other => panic!("unexpected side operation {other:?}"),
        })
        .collect();
    assert_eq!(
        actions,
        [
            ("cn=admins,dc=example,dc=com", BatchAction::Add),
            ("cn=ops,dc=example,dc=com", BatchAction::Remove),
        ]
    );
}

#[test]
fn caller_dn_is_used_when_the_operation_has_none() {
    let op = BatchModifyOperation::new("").add("groups", AttributeValue::multi(["cn=admins,dc=example,dc=com"]));
    let (_, queued) = hydrate(op, Some(JDOE_DN)).unwrap();
    let Operation::BatchModify(group) = &queued[0] else {
        panic!("expected a batch modify");
    };
    assert_eq!(group.batches[0].values, AttributeValue::multi([JDOE_DN]));
}

#[test]
fn group_membership_without_a_dn_is_rejected() {
    let op = BatchModifyOperation::new("").add("groups", AttributeValue::multi(["cn=admins,dc=example,dc=com"]));
    match hydrate(op, None).unwrap_err() {
        HydrateError::Value(err) => assert_eq!(err.attribute, "groups"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn failed_hydration_leaves_the_operation_untouched() {
    let registry = registry();
    let schema = user_schema();
    let original = BatchModifyOperation::new(JDOE_DN)
        .replace("firstName", "John")
        .replace("accountExpirationDate", "later");
    let mut operation = Operation::BatchModify(original.clone());
    let err = OperationHydrator::new(&registry)
        .with_schema(&schema)
        .hydrate_to_protocol(&mut operation, None)
        .unwrap_err();
    assert!(matches!(err, HydrateError::Value(_)));
    assert_eq!(operation, Operation::BatchModify(original));
}

#[test]
fn connection_encoding_applies_to_pass_through_values() {
    let registry = registry();
    let schema = user_schema();
    let connection = connection().with_encoding("UTF-16LE");
    let mut operation = Operation::BatchModify(BatchModifyOperation::new(JDOE_DN).replace("firstName", "Jo"));
    OperationHydrator::new(&registry)
        .with_schema(&schema)
        .with_connection(&connection)
        .hydrate_to_protocol(&mut operation, None)
        .unwrap();
    let Operation::BatchModify(modify) = operation else {
        panic!("operation kind changed");
    };
    assert_eq!(
        modify.batches[0].values,
        AttributeValue::Single(Value::Binary(vec![b'J', 0, b'o', 0]))
    );
}

#[test]
fn unsupported_encoding_is_a_configuration_error() {
    let registry = registry();
    let schema = user_schema();
    let connection = connection().with_encoding("EBCDIC");
    let mut operation = Operation::BatchModify(BatchModifyOperation::new(JDOE_DN).replace("firstName", "Jo"));
    let err = OperationHydrator::new(&registry)
        .with_schema(&schema)
        .with_connection(&connection)
        .hydrate_to_protocol(&mut operation, None)
        .unwrap_err();
    assert!(err.is_configuration());
}
