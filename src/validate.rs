use tracing::debug;

use crate::{ast::Node, error::Error, feature::FeatureSet};

/// Walks `root` in pre-order and fails on the first node whose feature is not
///  enabled in `features`. The walk keeps its own stack, so deeply nested
///  expressions do not exhaust the call stack.
pub fn check_features(root: &dyn Node, features: &FeatureSet) -> Result<(), Error> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        let feature = node.feature();
        if !features.is_enabled(&feature) {
            debug!(%feature, adql = %node.to_adql(), "rejecting disabled feature");
            return Err(Error::unsupported(node));
        }
        // Reversed so the leftmost child is visited first
        let start = stack.len();
        stack.extend(node.children());
        stack[start..].reverse();
    }
    Ok(())
}

/// Like [check_features] but collects every rejection instead of stopping at
///  the first one.
pub fn unsupported_features(root: &dyn Node, features: &FeatureSet) -> Vec<Error> {
    let mut found = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if !features.is_enabled(&node.feature()) {
            found.push(Error::unsupported(node));
        }
        let start = stack.len();
        stack.extend(node.children());
        stack[start..].reverse();
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ast::{Condition, ComparisonOperator, Operand, OperationType, Query, SelectItem},
        feature::{LanguageFeature, LanguageVersion, features},
        geometry::{GeometryFunction, GeometryValue, PointFunction},
        position::TextPosition,
    };

    fn point(ra: &str, dec: &str) -> Operand {
        PointFunction::new(None, Operand::numeric(ra), Operand::numeric(dec))
            .map(|p| Operand::from(GeometryFunction::from(p)))
            .expect("valid point")
    }

    #[test]
    fn accepts_enabled_features() -> Result<(), Error> {
        let query = Query::select_from(
            vec![SelectItem::operand(Operand::op(
                Operand::numeric("1"),
                OperationType::Sum,
                Operand::column("a"),
            ))],
            "foo",
        );
        check_features(&query, &FeatureSet::for_version(LanguageVersion::V2_0))
    }

    #[test]
    fn rejects_first_disabled_feature_in_pre_order() {
        let mut set = FeatureSet::for_version(LanguageVersion::V2_1);
        set.disable(&features::POINT);
        set.disable(&features::CONTAINS);

        let contains = GeometryFunction::contains(
            GeometryValue::try_from(point("10", "20")).expect("point"),
            GeometryValue::try_from(Operand::column("area")).expect("column"),
        );
        let query = Query::select_from(vec![SelectItem::All], "foo").with_where(
            Condition::compare(Operand::from(contains), ComparisonOperator::Eq, Operand::numeric("1")),
        );

        match check_features(&query, &set) {
            Err(Error::UnsupportedFeature { feature, adql, .. }) => {
                assert_eq!(features::CONTAINS, feature);
                assert_eq!("CONTAINS(POINT(10, 20), area)", adql);
            }
            other => panic!("expected CONTAINS to be rejected, got {other:?}"),
        }

        let all = unsupported_features(&query, &set);
        assert_eq!(2, all.len());
    }

    #[test]
    fn udfs_need_their_own_feature() {
        let mut udf = Operand::udf("split", vec![Operand::column("values")]);
        udf.set_position(Some(TextPosition::with_end(1, 8, 1, 21)));
        let mut set = FeatureSet::for_version(LanguageVersion::V2_1);

        let err = check_features(&udf, &set).expect_err("udf is not declared");
        assert_eq!(Some(TextPosition::with_end(1, 8, 1, 21)), err.position());

        set.enable(LanguageFeature::udf("SPLIT"));
        assert!(check_features(&udf, &set).is_ok());
    }

    #[test]
    fn offset_is_gated() {
        let query = Query::select_from(vec![SelectItem::All], "foo").with_offset(10);
        let err = check_features(&query, &FeatureSet::for_version(LanguageVersion::V2_0));
        assert_eq!(
            Some("Unsupported feature: \"OFFSET\" (of type 'ivo://ivoa.net/std/TAPRegExt#features-adql-offset')".to_string()),
            err.err().map(|e| e.to_string())
        );
    }

    #[test]
    fn deep_trees_do_not_overflow() -> Result<(), Error> {
        let mut expr = Operand::numeric("1");
        for _ in 0..10_000 {
            expr = Operand::op(expr, OperationType::Sum, Operand::numeric("1"));
        }
        let result = check_features(&expr, &FeatureSet::for_version(LanguageVersion::V2_1));
        // Dropping a deep Box chain recurses, so unwind it by hand
        let mut current = expr;
        while let Operand::Operation(op) = current {
            current = *op.left;
        }
        result
    }
}
