use crate::{
    QueryParser,
    ast::{
        Column, ComparisonOperator, Condition, FromItem, Identifier, JoinCondition, JoinKind,
        Operand, OperationType, Query, SelectItem, UserDefinedFunction,
    },
    db_type::{DbType, DbTypeKind, TypeMapping, length_param},
    error::Error,
    function_def::{FunctionDef, FunctionRegistry},
    geometry::GeometryFunction,
    region::Region,
    to_sql::PrinterConfig,
    translate::{
        self, DialectConfig, Expression, TranslationContext, translate_args,
        translate_geometry_value,
    },
};

/// Logical type names as they are.
pub struct TestTypeMapping;

impl TypeMapping for TestTypeMapping {
    fn from_backend(
        &self,
        _type_code: i32,
        raw_name: &str,
        _display_name: &str,
        params: &[String],
    ) -> DbType {
        match raw_name.parse::<DbTypeKind>() {
            Ok(kind) if kind.has_length() => match length_param(params) {
                Some(n) => DbType::with_length(kind, n),
                None => DbType::new(kind),
            },
            Ok(kind) => DbType::new(kind),
            Err(_) => DbType::unknown(raw_name),
        }
    }

    fn to_backend(&self, ty: &DbType) -> String {
        ty.to_string()
    }
}

/// A minimal dialect: case insensitive, standard printing, geometry functions
///  passed through under their ADQL names and STC-S as the native geometry.
#[derive(Default)]
pub struct TestTranslator {
    pub dialect: DialectConfig,
    pub functions: Option<FunctionRegistry>,
}

impl TranslationContext for TestTranslator {
    type Geometry = String;

    fn dialect(&self) -> &DialectConfig {
        &self.dialect
    }

    fn printer_config(&self) -> PrinterConfig {
        PrinterConfig::default()
    }

    fn type_mapping(&self) -> &dyn TypeMapping {
        &TestTypeMapping
    }

    fn functions(&self) -> Option<&FunctionRegistry> {
        self.functions.as_ref()
    }

    fn translate_geometry(&self, function: &GeometryFunction) -> translate::Result {
        let args = match function {
            GeometryFunction::Point(p) => translate_args(&[p.coord1.clone(), p.coord2.clone()], self)?,
            GeometryFunction::Circle(c) => translate_args(
                &[c.coord1.clone(), c.coord2.clone(), c.radius.clone()],
                self,
            )?,
            GeometryFunction::Box(b) => translate_args(
                &[
                    b.coord1.clone(),
                    b.coord2.clone(),
                    b.width.clone(),
                    b.height.clone(),
                ],
                self,
            )?,
            GeometryFunction::Polygon(p) => {
                let flat: Vec<Operand> = p
                    .vertices
                    .iter()
                    .flat_map(|(x, y)| [x.clone(), y.clone()])
                    .collect();
                translate_args(&flat, self)?
            }
            GeometryFunction::Region(r) => vec![self.translate(&r.value)?],
            GeometryFunction::Centroid(f) => vec![translate_geometry_value(&f.geometry, self)?],
            GeometryFunction::Area(f) => vec![translate_geometry_value(&f.geometry, self)?],
            GeometryFunction::ExtractCoordSys(f) => {
                vec![translate_geometry_value(&f.geometry, self)?]
            }
            GeometryFunction::Distance(f) => vec![
                translate_geometry_value(&f.p1, self)?,
                translate_geometry_value(&f.p2, self)?,
            ],
            GeometryFunction::Contains(f) => vec![
                translate_geometry_value(&f.left, self)?,
                translate_geometry_value(&f.right, self)?,
            ],
            GeometryFunction::Intersects(f) => vec![
                translate_geometry_value(&f.left, self)?,
                translate_geometry_value(&f.right, self)?,
            ],
            GeometryFunction::ExtractCoord(f) => vec![translate_geometry_value(&f.point, self)?],
        };
        Ok(Expression::call(function.name(), args))
    }

    fn translate_geometry_from_db(&self, value: &String) -> Result<Region, Error> {
        Region::parse(value)
    }

    fn translate_geometry_to_db(&self, region: &Region) -> Result<String, Error> {
        Ok(region.to_string())
    }
}

/// Hands out prepared trees for known query texts.
pub struct FixedParser(pub Vec<(&'static str, Query)>);

impl QueryParser for FixedParser {
    fn parse(&self, text: &str) -> Result<Query, Error> {
        self.0
            .iter()
            .find(|(t, _)| *t == text)
            .map(|(_, q)| q.clone())
            .ok_or_else(|| Error::Parse {
                message: format!("unexpected query {text}"),
                position: None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        feature::{FeatureSet, LanguageVersion, features},
        geometry::{GeometryValue, PointFunction},
        geometry::RegionFunction,
        translate::{
            CaseSensitivity, OffsetPolicy, postgres::PostgresTranslator, region_argument,
            sqlite::SqliteTranslator, translate_operand, translate_query,
        },
        translate_text,
    };
    use pretty_assertions::assert_eq;

    fn foo(items: Vec<SelectItem>) -> Query {
        Query::select_from(items, "foo")
    }

    #[test]
    fn offset() -> Result<(), Error> {
        let cx = TestTranslator::default();
        assert_eq!(
            "SELECT *\nFROM foo\nOFFSET 10",
            translate_query(&foo(vec![SelectItem::All]).with_offset(10), &cx)?
        );
        assert_eq!(
            "SELECT *\nFROM foo\nOFFSET 0",
            translate_query(&foo(vec![SelectItem::All]).with_offset(0), &cx)?
        );
        let paged = foo(vec![SelectItem::All])
            .with_top(5)
            .order_by(Operand::column("id"), false)
            .with_offset(10);
        assert_eq!(
            "SELECT *\nFROM foo\nORDER BY id ASC\nLIMIT 5\nOFFSET 10",
            translate_query(&paged, &cx)?
        );
        Ok(())
    }

    #[test]
    fn offset_policies() -> Result<(), Error> {
        let query = foo(vec![SelectItem::All]).with_offset(10);
        let unbounded = TestTranslator {
            dialect: DialectConfig {
                offset_policy: OffsetPolicy::WithUnboundedLimit,
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(
            "SELECT *\nFROM foo\nLIMIT ALL\nOFFSET 10",
            translate_query(&query, &unbounded)?
        );

        let rejecting = TestTranslator {
            dialect: DialectConfig {
                offset_policy: OffsetPolicy::Reject,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            translate_query(&query, &rejecting),
            Err(Error::Translation(_))
        ));
        // A row limit makes the offset acceptable everywhere
        assert_eq!(
            "SELECT *\nFROM foo\nLIMIT 3\nOFFSET 10",
            translate_query(&query.with_top(3), &rejecting)?
        );
        Ok(())
    }

    #[test]
    fn hexadecimal() -> Result<(), Error> {
        let cx = TestTranslator::default();
        let hex = || Operand::numeric("0xF");
        assert_eq!(
            "SELECT 15 AS \"0xF\"\nFROM foo",
            translate_query(&foo(vec![SelectItem::operand(hex())]), &cx)?
        );
        assert_eq!(
            "SELECT -15 AS \"NEG_0xF\"\nFROM foo",
            translate_query(&foo(vec![SelectItem::operand(Operand::negate(hex()))]), &cx)?
        );
        let mult = Operand::op(hex(), OperationType::Mult, Operand::numeric("2"));
        assert_eq!(
            "SELECT (15*2) AS \"MULT\"\nFROM foo",
            translate_query(&foo(vec![SelectItem::operand(mult)]), &cx)?
        );
        assert!(matches!(
            translate_operand(&Operand::numeric("0x1FFFFFFFFFFFFFFFF"), &cx),
            Err(Error::Translation(_))
        ));
        Ok(())
    }

    #[test]
    fn precedence() -> Result<(), Error> {
        // ~3-1|2*5^6/1+2
        let n = Operand::numeric;
        let expr = Operand::op(
            Operand::op(Operand::bit_not(n("3")), OperationType::Sub, n("1")),
            OperationType::BitOr,
            Operand::op(
                Operand::op(n("2"), OperationType::Mult, n("5")),
                OperationType::BitXor,
                Operand::op(
                    Operand::op(n("6"), OperationType::Div, n("1")),
                    OperationType::Sum,
                    n("2"),
                ),
            ),
        );
        assert_eq!(
            "(((~3)-1)|((2*5)^((6/1)+2)))",
            translate_operand(&expr, &TestTranslator::default())?
        );
        Ok(())
    }

    #[test]
    fn negative_operands() -> Result<(), Error> {
        let n = Operand::numeric;
        let minus_one = || Operand::negate(n("1"));
        let cx = TestTranslator::default();
        let postgres = PostgresTranslator::default();
        for (operator, expected) in [
            (OperationType::Sub, "(1-(-1))"),
            (OperationType::Sum, "(1+(-1))"),
            (OperationType::Mult, "(1*(-1))"),
            (OperationType::Div, "(1/(-1))"),
        ] {
            let expr = Operand::op(n("1"), operator, minus_one());
            assert_eq!(expected, translate_operand(&expr, &cx)?);
            assert_eq!(expected, translate_operand(&expr, &postgres)?);
        }

        let left = Operand::op(minus_one(), OperationType::Sub, n("1"));
        assert_eq!("(-1-1)", translate_operand(&left, &cx)?);
        let double = Operand::op(n("1"), OperationType::Sub, Operand::negate(minus_one()));
        assert_eq!("(1-(- -1))", translate_operand(&double, &cx)?);

        let xor = Operand::op(Operand::column("a"), OperationType::BitXor, minus_one());
        assert_eq!(
            "((a|(-1))-(a&(-1)))",
            translate_operand(&xor, &SqliteTranslator::default())?
        );

        let query = foo(vec![SelectItem::All]).with_where(Condition::compare(
            Operand::column("a"),
            ComparisonOperator::Eq,
            minus_one(),
        ));
        assert_eq!("SELECT *\nFROM foo\nWHERE a = -1", translate_query(&query, &cx)?);
        Ok(())
    }

    #[test]
    fn malformed_regions() -> Result<(), Error> {
        let region = |text: &str| -> Result<GeometryFunction, Error> {
            Ok(RegionFunction::new(Operand::string(text))?.into())
        };
        for text in ["", "CIRCLE 1 2", "NOT (CIRCLE 1 2 3", "UNION (CIRCLE 1 2 3) extra"] {
            let function = region(text)?;
            assert!(
                matches!(
                    translate_operand(&Operand::from(function), &PostgresTranslator::default()),
                    Err(Error::GeometryTranslation { .. })
                ),
                "{text:?} should be rejected"
            );
        }

        let depth = 100_000;
        let nested = format!("{}CIRCLE ICRS 1 2 3{}", "NOT (".repeat(depth), ")".repeat(depth));
        let function = RegionFunction::new(Operand::string(nested))?;
        assert!(matches!(
            region_argument(&function),
            Err(Error::GeometryTranslation { .. })
        ));
        assert!(matches!(
            translate_operand(
                &Operand::from(GeometryFunction::from(function)),
                &SqliteTranslator::default()
            ),
            Err(Error::GeometryTranslation { .. })
        ));
        Ok(())
    }

    #[test]
    fn string_literals() -> Result<(), Error> {
        assert_eq!(
            "'SQL''s translation'",
            translate_operand(&Operand::string("SQL's translation"), &TestTranslator::default())?
        );
        let concat = Operand::concat(vec![
            Operand::column("first"),
            Operand::string(" "),
            Operand::column("last"),
        ])?;
        assert_eq!(
            "(first || ' ' || last)",
            translate_operand(&concat, &TestTranslator::default())?
        );
        Ok(())
    }

    fn split() -> UserDefinedFunction {
        UserDefinedFunction::new("split", vec![Operand::column("values"), Operand::string(";")])
    }

    fn split_def() -> Result<FunctionDef, Error> {
        FunctionDef::parse("split(str VARCHAR, sep VARCHAR) -> VARCHAR")
    }

    #[test]
    fn udf_patterns() -> Result<(), Error> {
        let cx = TestTranslator::default();
        let translate = |udf: &UserDefinedFunction| translate_operand(&Operand::from(udf.clone()), &cx);

        let mut udf = split();
        assert_eq!("split(values, ';')", translate(&udf)?);

        udf.set_definition(Some(split_def()?))?;
        assert_eq!("split(values, ';')", translate(&udf)?);

        if let Some(def) = udf.definition_mut() {
            def.set_translation_pattern("foobar")?;
        }
        assert_eq!("foobar", translate(&udf)?);

        if let Some(def) = udf.definition_mut() {
            def.set_translation_pattern("splitWith($2, $1)")?;
        }
        assert_eq!("splitWith(';', values)", translate(&udf)?);
        Ok(())
    }

    #[test]
    fn udf_from_registry() -> Result<(), Error> {
        let mut functions = FunctionRegistry::new();
        functions.register(split_def()?);
        functions.set_translation_pattern("SPLIT", 2, "string_to_array($1, $2)")?;
        let cx = TestTranslator {
            functions: Some(functions),
            ..Default::default()
        };
        assert_eq!(
            "string_to_array(values, ';')",
            translate_operand(&Operand::from(split()), &cx)?
        );
        Ok(())
    }

    #[test]
    fn case_sensitivity() -> Result<(), Error> {
        let query = foo(vec![
            SelectItem::operand(Operand::column("id")),
            SelectItem::aliased(Operand::column("ra"), Identifier::new("RightAscension")),
            SelectItem::aliased(Operand::column("dec"), Identifier::delimited("Dec")),
        ]);
        assert_eq!(
            "SELECT id AS \"id\", ra AS \"rightascension\", dec AS \"Dec\"\nFROM foo",
            translate_query(&query, &TestTranslator::default())?
        );

        let sensitive = TestTranslator {
            dialect: DialectConfig {
                case_sensitivity: CaseSensitivity::all(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(
            "SELECT \"id\" AS \"id\", \"ra\" AS \"RightAscension\", \"dec\" AS \"Dec\"\nFROM \"foo\"",
            translate_query(&query, &sensitive)?
        );

        let mut delimited = Query::select(vec![SelectItem::operand(Operand::from(
            Column::new("Mag").with_table("Stars"),
        ))])
        .with_from(FromItem::table("Stars"));
        if let Some(SelectItem::Operand {
            operand: Operand::Column(c),
            ..
        }) = delimited.select.items.first_mut()
        {
            c.name = Identifier::delimited("Mag");
        }
        assert_eq!(
            "SELECT Stars.\"Mag\" AS \"Mag\"\nFROM Stars",
            translate_query(&delimited, &TestTranslator::default())?
        );
        Ok(())
    }

    #[test]
    fn conditions() -> Result<(), Error> {
        let cx = TestTranslator::default();
        let query = foo(vec![SelectItem::All]).with_where(Condition::And(vec![
            Condition::compare(Operand::column("a"), ComparisonOperator::Ne, Operand::numeric("1")),
            Condition::Or(vec![
                Condition::compare(Operand::column("b"), ComparisonOperator::Lt, Operand::numeric("2")),
                Condition::is_null(Operand::column("c"), false),
            ]),
            Condition::Not(Box::new(Condition::between(
                Operand::column("d"),
                Operand::numeric("1"),
                Operand::numeric("2"),
                false,
            ))),
            Condition::compare(Operand::column("name"), ComparisonOperator::ILike, Operand::string("m%")),
        ]));
        assert_eq!(
            "SELECT *\nFROM foo\nWHERE a != 1 AND (b < 2 OR c IS NULL) AND NOT d BETWEEN 1 AND 2 AND LOWER(name) LIKE LOWER('m%')",
            translate_query(&query, &cx)?
        );
        Ok(())
    }

    #[test]
    fn clauses() -> Result<(), Error> {
        let cx = TestTranslator::default();
        let join = FromItem::join(
            JoinKind::Left,
            FromItem::aliased("stars", Identifier::new("S")),
            FromItem::table("photometry"),
            Some(JoinCondition::Using(vec![Column::new("id")])),
        );
        let count = Operand::udf("count", vec![Operand::column("id")]);
        let query = Query::select(vec![
            SelectItem::operand(Operand::column("kind")),
            SelectItem::aliased(count, Identifier::new("n")),
        ])
        .distinct()
        .with_from(join)
        .group_by(Operand::column("kind"))
        .with_having(Condition::compare(
            Operand::column("kind"),
            ComparisonOperator::Ne,
            Operand::string("x"),
        ))
        .order_by_index(2, true);
        assert_eq!(
            "SELECT DISTINCT kind AS \"kind\", count(id) AS \"n\"\nFROM stars AS \"s\" LEFT OUTER JOIN photometry USING (id)\nGROUP BY kind\nHAVING kind != 'x'\nORDER BY 2 DESC",
            translate_query(&query, &cx)?
        );
        Ok(())
    }

    #[test]
    fn cast() -> Result<(), Error> {
        let cast = Operand::cast(Operand::column("id"), DbType::with_length(DbTypeKind::VarChar, 10));
        assert_eq!(
            "CAST(id AS VARCHAR(10))",
            translate_operand(&cast, &TestTranslator::default())?
        );
        Ok(())
    }

    #[test]
    fn geometry() -> Result<(), Error> {
        let cx = TestTranslator::default();
        let point = PointFunction::new(None, Operand::column("ra"), Operand::column("dec"))?;
        let distance = GeometryFunction::distance(
            GeometryValue::Function(Box::new(point)),
            GeometryValue::try_from(Operand::column("pos"))?,
        );
        assert_eq!(
            "DISTANCE(POINT(ra, dec), pos)",
            translate_operand(&Operand::from(distance), &cx)?
        );

        let region = Region::parse("CIRCLE ICRS 10 20 0.5")?;
        let native = cx.translate_geometry_to_db(&region)?;
        assert_eq!(region, cx.translate_geometry_from_db(&native)?);
        Ok(())
    }

    #[test]
    fn pipeline() -> Result<(), Error> {
        let parser = FixedParser(vec![(
            "SELECT * FROM foo OFFSET 10",
            foo(vec![SelectItem::All]).with_offset(10),
        )]);
        let cx = TestTranslator::default();

        assert_eq!(
            "SELECT *\nFROM foo\nOFFSET 10",
            translate_text(
                &parser,
                "SELECT * FROM foo OFFSET 10",
                &FeatureSet::for_version(LanguageVersion::V2_1),
                &cx
            )?
        );

        match translate_text(
            &parser,
            "SELECT * FROM foo OFFSET 10",
            &FeatureSet::for_version(LanguageVersion::V2_0),
            &cx,
        ) {
            Err(Error::UnsupportedFeature { feature, .. }) => assert_eq!(features::OFFSET, feature),
            other => panic!("expected OFFSET to be rejected, got {other:?}"),
        }

        assert!(matches!(
            translate_text(&parser, "SELECT", &FeatureSet::default(), &cx),
            Err(Error::Parse { .. })
        ));
        Ok(())
    }
}
