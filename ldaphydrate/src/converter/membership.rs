//! Group membership expressed on the member: setting `groups` on a user queues modifications of
//! each group's `member` attribute instead of writing anything on the user itself.
//!
//! Options:
//! - `to_attribute`: attribute modified on the group (default `member`)

use std::sync::Arc;

use log::debug;

use super::{AttributeConverter, ConverterContext, ConverterRegistration, OperationGenerator, OperationType};
use crate::errors::ConverterError;
use crate::operation::{Batch, BatchAction, BatchModifyOperation, Operation};
use crate::value::{AttributeValue, Value};

const DEFAULT_MEMBER_ATTRIBUTE: &str = "member";

#[derive(Debug, Default)]
pub struct GroupMembershipConverter;

impl AttributeConverter for GroupMembershipConverter {
    fn to_protocol(&self, _ctx: &ConverterContext<'_>, value: Value) -> Result<Value, ConverterError> {
        Ok(value)
    }

    fn from_protocol(&self, _ctx: &ConverterContext<'_>, value: Value) -> Result<Value, ConverterError> {
        Ok(value)
    }

    fn is_multi_valued(&self) -> bool {
        true
    }

    fn generator(&self) -> Option<&dyn OperationGenerator> {
        Some(self)
    }
}

impl OperationGenerator for GroupMembershipConverter {
    fn generate(&self, ctx: &ConverterContext<'_>, values: &[Value]) -> Result<Vec<Operation>, ConverterError> {
        if is_search(ctx) {
            return Ok(Vec::new());
        }
        let dn = ctx.require_dn()?;
        let member_attribute = ctx.option_str("to_attribute").unwrap_or(DEFAULT_MEMBER_ATTRIBUTE);
        // Replace cannot drop memberships it does not know about, so it only adds.
        let action = match ctx.batch_action {
            Some(BatchAction::Remove | BatchAction::RemoveAll) => BatchAction::Remove,
            _ => BatchAction::Add,
        };

        let mut operations = Vec::new();
        for group in values {
            let Some(group_dn) = group.as_str().filter(|g| !g.is_empty()) else {
                return Err(ctx.invalid(format!("expected a group DN, got {} '{group}'", group.kind())));
            };
            debug!("queueing {action:?} of {member_attribute} on {group_dn} for {dn}");
            operations.push(Operation::BatchModify(BatchModifyOperation::new(group_dn).with_batch(
                Batch::new(action, member_attribute, AttributeValue::multi([dn])),
            )));
        }
        Ok(operations)
    }

    fn removes_original_value(&self, ctx: &ConverterContext<'_>) -> bool {
        !is_search(ctx)
    }
}

/// Filters on group membership are left to the directory.
fn is_search(ctx: &ConverterContext<'_>) -> bool {
    matches!(
        ctx.operation_type,
        OperationType::SearchToWire | OperationType::SearchFromWire
    )
}

inventory::submit! {
    ConverterRegistration { name: "group_membership", build: || Arc::new(GroupMembershipConverter) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::ConverterOptions;

    fn ctx<'a>(options: &'a ConverterOptions, dn: Option<&'a str>, action: Option<BatchAction>) -> ConverterContext<'a> {
        ConverterContext {
            attribute: "groups",
            options,
            operation_type: OperationType::Modify,
            connection: None,
            dn,
            batch_action: action,
        }
    }

    #[test]
    fn one_operation_per_group() {
        let options = ConverterOptions::new();
        let ctx = ctx(&options, Some("cn=jdoe,dc=example,dc=com"), Some(BatchAction::Add));
        let ops = GroupMembershipConverter
            .generate(&ctx, &[Value::text("cn=admins,dc=example,dc=com"), Value::text("cn=ops,dc=example,dc=com")])
            .unwrap();
        assert_eq!(ops.len(), 2);
        let Operation::BatchModify(first) = &ops[0] else {
            panic!("expected batch modify");
        };
        assert_eq!(first.dn, "cn=admins,dc=example,dc=com");
        assert_eq!(first.batches[0].action, BatchAction::Add);
        assert_eq!(first.batches[0].attribute, "member");
        assert_eq!(first.batches[0].values, AttributeValue::multi(["cn=jdoe,dc=example,dc=com"]));
    }

    #[test]
    fn remove_action_removes_membership() {
        let options = ConverterOptions::new();
        let ctx = ctx(&options, Some("cn=jdoe,dc=example,dc=com"), Some(BatchAction::Remove));
        let ops = GroupMembershipConverter
            .generate(&ctx, &[Value::text("cn=admins,dc=example,dc=com")])
            .unwrap();
        let Operation::BatchModify(op) = &ops[0] else {
            panic!("expected batch modify");
        };
        assert_eq!(op.batches[0].action, BatchAction::Remove);
    }

    #[test]
    fn searches_generate_nothing() {
        let options = ConverterOptions::new();
        let mut ctx = ctx(&options, None, None);
        ctx.operation_type = OperationType::SearchToWire;
        assert!(GroupMembershipConverter.generate(&ctx, &[Value::text("cn=admins")]).unwrap().is_empty());
        assert!(!GroupMembershipConverter.removes_original_value(&ctx));
    }

    #[test]
    fn requires_dn() {
        let options = ConverterOptions::new();
        let err = GroupMembershipConverter
            .generate(&ctx(&options, None, None), &[Value::text("cn=admins")])
            .unwrap_err();
        assert!(matches!(err, ConverterError::MissingDn { .. }));
    }
}
