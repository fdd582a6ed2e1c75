//! Geometric functions and the column/function/UDF sum type they accept as
//!  arguments.

use std::borrow::Cow;

use crate::{
    ast::{Children, Column, Node, Operand, StringConstant, UserDefinedFunction, ValueKind},
    error::Error,
    feature::{LanguageFeature, features},
    position::TextPosition,
};

/// Validates a coordinate system argument; a missing one becomes `''`.
fn coordinate_system(coord_sys: Option<Operand>) -> Result<Operand, Error> {
    match coord_sys {
        None => Ok(Operand::String(StringConstant::new(""))),
        Some(op) if op.is_string() => Ok(op),
        Some(op) => Err(Error::InvalidArgument(format!(
            "The coordinate system must be a string (got {})",
            op.to_adql()
        ))),
    }
}

fn is_empty_coordinate_system(op: &Operand) -> bool {
    matches!(op, Operand::String(s) if s.value.is_empty())
}

fn numeric(what: &str, op: Operand) -> Result<Operand, Error> {
    if op.is_numeric() {
        Ok(op)
    } else {
        Err(Error::InvalidArgument(format!(
            "The {what} must be numeric (got {})",
            op.to_adql()
        )))
    }
}

/// `NAME(arg, ...)` leaving out an empty coordinate system.
fn call_adql(name: &str, coord_sys: Option<&Operand>, args: &[&dyn Node]) -> String {
    let mut parts = Vec::with_capacity(args.len() + 1);
    if let Some(cs) = coord_sys.filter(|cs| !is_empty_coordinate_system(cs)) {
        parts.push(cs.to_adql());
    }
    parts.extend(args.iter().map(|a| a.to_adql()));
    format!("{name}({})", parts.join(", "))
}

fn args_with_coordinate_system<'a>(coord_sys: &'a Operand, args: Vec<&'a dyn Node>) -> Children<'a> {
    let cs = (!is_empty_coordinate_system(coord_sys)).then_some(coord_sys as &dyn Node);
    Box::new(cs.into_iter().chain(args))
}

/// A function which can stand in a [GeometryValue].
pub trait GeometryKind: Node + ValueKind + Clone + PartialEq + Sized {
    /// Narrows a geometry function, handing it back unchanged on mismatch.
    fn from_geometry(function: GeometryFunction) -> Result<Self, GeometryFunction>;

    fn into_geometry(self) -> GeometryFunction;

    fn as_geometry(&self) -> Cow<'_, GeometryFunction>;
}

/// A geometric argument: exactly one of a column, a geometry function or a
///  user defined function. Replacing the value switches the active branch.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryValue<F> {
    Column(Column),
    Function(Box<F>),
    Udf(UserDefinedFunction),
}

impl<F: GeometryKind> GeometryValue<F> {
    pub fn from_parts(
        column: Option<Column>,
        function: Option<F>,
        udf: Option<UserDefinedFunction>,
    ) -> Result<Self, Error> {
        match (column, function, udf) {
            (Some(c), None, None) => Ok(Self::Column(c)),
            (None, Some(f), None) => Ok(Self::Function(Box::new(f))),
            (None, None, Some(u)) => Ok(Self::Udf(u)),
            _ => Err(Error::InvalidArgument(
                "A geometry value needs exactly one of a column, a geometry function or a UDF"
                    .to_string(),
            )),
        }
    }

    pub fn set_column(&mut self, column: Column) {
        *self = Self::Column(column);
    }

    pub fn set_geometry(&mut self, function: F) {
        *self = Self::Function(Box::new(function));
    }

    pub fn set_udf(&mut self, udf: UserDefinedFunction) {
        *self = Self::Udf(udf);
    }

    pub fn is_column(&self) -> bool {
        matches!(self, Self::Column(_))
    }

    pub fn column(&self) -> Option<&Column> {
        match self {
            Self::Column(c) => Some(c),
            _ => None,
        }
    }

    pub fn function(&self) -> Option<&F> {
        match self {
            Self::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn udf(&self) -> Option<&UserDefinedFunction> {
        match self {
            Self::Udf(u) => Some(u),
            _ => None,
        }
    }

    pub fn as_node(&self) -> &dyn Node {
        match self {
            Self::Column(c) => c,
            Self::Function(f) => &**f,
            Self::Udf(u) => u,
        }
    }

    pub fn into_operand(self) -> Operand {
        match self {
            Self::Column(c) => Operand::Column(c),
            Self::Function(f) => Operand::Geometry(Box::new(f.into_geometry())),
            Self::Udf(u) => Operand::Udf(u),
        }
    }
}

impl<F: GeometryKind> TryFrom<Operand> for GeometryValue<F> {
    type Error = Error;

    fn try_from(operand: Operand) -> Result<Self, Error> {
        match operand {
            Operand::Column(c) if c.is_geometry() => Ok(Self::Column(c)),
            Operand::Udf(u) if u.is_geometry() => Ok(Self::Udf(u)),
            Operand::Geometry(g) => F::from_geometry(*g)
                .map(|f| Self::Function(Box::new(f)))
                .map_err(|g| {
                    Error::InvalidArgument(format!("{} is not allowed here", g.to_adql()))
                }),
            other => Err(Error::InvalidArgument(format!(
                "{} is not a geometry",
                other.to_adql()
            ))),
        }
    }
}

impl<F: GeometryKind> Node for GeometryValue<F> {
    fn position(&self) -> Option<TextPosition> {
        self.as_node().position()
    }

    fn feature(&self) -> LanguageFeature {
        self.as_node().feature()
    }

    fn to_adql(&self) -> String {
        self.as_node().to_adql()
    }

    fn children(&self) -> Children<'_> {
        self.as_node().children()
    }
}

impl<F: GeometryKind> ValueKind for GeometryValue<F> {
    fn is_numeric(&self) -> bool {
        match self {
            Self::Column(c) => c.is_numeric(),
            Self::Function(f) => f.is_numeric(),
            Self::Udf(u) => u.is_numeric(),
        }
    }

    fn is_string(&self) -> bool {
        match self {
            Self::Column(c) => c.is_string(),
            Self::Function(f) => f.is_string(),
            Self::Udf(u) => u.is_string(),
        }
    }

    fn is_geometry(&self) -> bool {
        match self {
            Self::Column(c) => c.is_geometry(),
            Self::Function(f) => f.is_geometry(),
            Self::Udf(u) => u.is_geometry(),
        }
    }
}

/// `POINT([coordsys,] ra, dec)`
#[derive(Debug, Clone, PartialEq)]
pub struct PointFunction {
    coord_sys: Operand,
    pub coord1: Operand,
    pub coord2: Operand,
    pub position: Option<TextPosition>,
}

impl PointFunction {
    pub fn new(coord_sys: Option<Operand>, coord1: Operand, coord2: Operand) -> Result<Self, Error> {
        Ok(Self {
            coord_sys: coordinate_system(coord_sys)?,
            coord1: numeric("first coordinate", coord1)?,
            coord2: numeric("second coordinate", coord2)?,
            position: None,
        })
    }

    pub fn coordinate_system(&self) -> &Operand {
        &self.coord_sys
    }

    pub fn set_coordinate_system(&mut self, coord_sys: Option<Operand>) -> Result<(), Error> {
        self.coord_sys = coordinate_system(coord_sys)?;
        self.position = None;
        Ok(())
    }
}

impl Node for PointFunction {
    fn position(&self) -> Option<TextPosition> {
        self.position
    }

    fn feature(&self) -> LanguageFeature {
        features::POINT
    }

    fn to_adql(&self) -> String {
        call_adql("POINT", Some(&self.coord_sys), &[&self.coord1 as &dyn Node, &self.coord2])
    }

    fn children(&self) -> Children<'_> {
        args_with_coordinate_system(&self.coord_sys, vec![&self.coord1 as &dyn Node, &self.coord2])
    }
}

impl ValueKind for PointFunction {
    fn is_numeric(&self) -> bool {
        false
    }

    fn is_string(&self) -> bool {
        false
    }

    fn is_geometry(&self) -> bool {
        true
    }
}

impl GeometryKind for PointFunction {
    fn from_geometry(function: GeometryFunction) -> Result<Self, GeometryFunction> {
        match function {
            GeometryFunction::Point(p) => Ok(p),
            other => Err(other),
        }
    }

    fn into_geometry(self) -> GeometryFunction {
        GeometryFunction::Point(self)
    }

    fn as_geometry(&self) -> Cow<'_, GeometryFunction> {
        Cow::Owned(GeometryFunction::Point(self.clone()))
    }
}

/// `CIRCLE([coordsys,] ra, dec, radius)`
#[derive(Debug, Clone, PartialEq)]
pub struct CircleFunction {
    coord_sys: Operand,
    pub coord1: Operand,
    pub coord2: Operand,
    pub radius: Operand,
    pub position: Option<TextPosition>,
}

impl CircleFunction {
    pub fn new(
        coord_sys: Option<Operand>,
        coord1: Operand,
        coord2: Operand,
        radius: Operand,
    ) -> Result<Self, Error> {
        Ok(Self {
            coord_sys: coordinate_system(coord_sys)?,
            coord1: numeric("first center coordinate", coord1)?,
            coord2: numeric("second center coordinate", coord2)?,
            radius: numeric("radius", radius)?,
            position: None,
        })
    }

    pub fn coordinate_system(&self) -> &Operand {
        &self.coord_sys
    }

    pub fn set_coordinate_system(&mut self, coord_sys: Option<Operand>) -> Result<(), Error> {
        self.coord_sys = coordinate_system(coord_sys)?;
        self.position = None;
        Ok(())
    }
}

impl Node for CircleFunction {
    fn position(&self) -> Option<TextPosition> {
        self.position
    }

    fn feature(&self) -> LanguageFeature {
        features::CIRCLE
    }

    fn to_adql(&self) -> String {
        call_adql(
            "CIRCLE",
            Some(&self.coord_sys),
            &[&self.coord1 as &dyn Node, &self.coord2, &self.radius],
        )
    }

    fn children(&self) -> Children<'_> {
        args_with_coordinate_system(
            &self.coord_sys,
            vec![&self.coord1 as &dyn Node, &self.coord2, &self.radius],
        )
    }
}

/// `BOX([coordsys,] ra, dec, width, height)`, centered on (ra, dec).
#[derive(Debug, Clone, PartialEq)]
pub struct BoxFunction {
    coord_sys: Operand,
    pub coord1: Operand,
    pub coord2: Operand,
    pub width: Operand,
    pub height: Operand,
    pub position: Option<TextPosition>,
}

impl BoxFunction {
    pub fn new(
        coord_sys: Option<Operand>,
        coord1: Operand,
        coord2: Operand,
        width: Operand,
        height: Operand,
    ) -> Result<Self, Error> {
        Ok(Self {
            coord_sys: coordinate_system(coord_sys)?,
            coord1: numeric("first center coordinate", coord1)?,
            coord2: numeric("second center coordinate", coord2)?,
            width: numeric("width", width)?,
            height: numeric("height", height)?,
            position: None,
        })
    }

    pub fn coordinate_system(&self) -> &Operand {
        &self.coord_sys
    }

    pub fn set_coordinate_system(&mut self, coord_sys: Option<Operand>) -> Result<(), Error> {
        self.coord_sys = coordinate_system(coord_sys)?;
        self.position = None;
        Ok(())
    }
}

impl Node for BoxFunction {
    fn position(&self) -> Option<TextPosition> {
        self.position
    }

    fn feature(&self) -> LanguageFeature {
        features::BOX
    }

    fn to_adql(&self) -> String {
        call_adql(
            "BOX",
            Some(&self.coord_sys),
            &[&self.coord1 as &dyn Node, &self.coord2, &self.width, &self.height],
        )
    }

    fn children(&self) -> Children<'_> {
        args_with_coordinate_system(
            &self.coord_sys,
            vec![&self.coord1 as &dyn Node, &self.coord2, &self.width, &self.height],
        )
    }
}

/// `POLYGON([coordsys,] ra1, dec1, ra2, dec2, ra3, dec3, ...)`
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonFunction {
    coord_sys: Operand,
    pub vertices: Vec<(Operand, Operand)>,
    pub position: Option<TextPosition>,
}

impl PolygonFunction {
    pub fn new(coord_sys: Option<Operand>, vertices: Vec<(Operand, Operand)>) -> Result<Self, Error> {
        if vertices.len() < 3 {
            return Err(Error::InvalidArgument(format!(
                "A polygon needs at least 3 vertices (got {})",
                vertices.len()
            )));
        }
        let vertices = vertices
            .into_iter()
            .map(|(x, y)| -> Result<_, Error> {
                Ok((numeric("vertex coordinate", x)?, numeric("vertex coordinate", y)?))
            })
            .collect::<Result<Vec<_>, Error>>()?;
        Ok(Self {
            coord_sys: coordinate_system(coord_sys)?,
            vertices,
            position: None,
        })
    }

    pub fn coordinate_system(&self) -> &Operand {
        &self.coord_sys
    }

    pub fn set_coordinate_system(&mut self, coord_sys: Option<Operand>) -> Result<(), Error> {
        self.coord_sys = coordinate_system(coord_sys)?;
        self.position = None;
        Ok(())
    }

    fn coordinates(&self) -> Vec<&dyn Node> {
        self.vertices
            .iter()
            .flat_map(|(x, y)| [x as &dyn Node, y])
            .collect()
    }
}

impl Node for PolygonFunction {
    fn position(&self) -> Option<TextPosition> {
        self.position
    }

    fn feature(&self) -> LanguageFeature {
        features::POLYGON
    }

    fn to_adql(&self) -> String {
        call_adql("POLYGON", Some(&self.coord_sys), &self.coordinates())
    }

    fn children(&self) -> Children<'_> {
        args_with_coordinate_system(&self.coord_sys, self.coordinates())
    }
}

/// `REGION('<STC-S>')`
#[derive(Debug, Clone, PartialEq)]
pub struct RegionFunction {
    pub value: Operand,
    pub position: Option<TextPosition>,
}

impl RegionFunction {
    pub fn new(value: Operand) -> Result<Self, Error> {
        if !value.is_string() {
            return Err(Error::InvalidArgument(format!(
                "REGION expects a string (got {})",
                value.to_adql()
            )));
        }
        Ok(Self {
            value,
            position: None,
        })
    }
}

impl Node for RegionFunction {
    fn position(&self) -> Option<TextPosition> {
        self.position
    }

    fn feature(&self) -> LanguageFeature {
        features::REGION
    }

    fn to_adql(&self) -> String {
        call_adql("REGION", None, &[&self.value as &dyn Node])
    }

    fn children(&self) -> Children<'_> {
        Box::new(std::iter::once(&self.value as &dyn Node))
    }
}

/// `CENTROID(geometry)`
#[derive(Debug, Clone, PartialEq)]
pub struct CentroidFunction {
    pub geometry: GeometryValue<GeometryFunction>,
    pub position: Option<TextPosition>,
}

/// `AREA(geometry)`
#[derive(Debug, Clone, PartialEq)]
pub struct AreaFunction {
    pub geometry: GeometryValue<GeometryFunction>,
    pub position: Option<TextPosition>,
}

/// `COORDSYS(geometry)`
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractCoordSys {
    pub geometry: GeometryValue<GeometryFunction>,
    pub position: Option<TextPosition>,
}

/// `DISTANCE(point, point)`
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceFunction {
    pub p1: GeometryValue<PointFunction>,
    pub p2: GeometryValue<PointFunction>,
    pub position: Option<TextPosition>,
}

/// `CONTAINS(inner, outer)`
#[derive(Debug, Clone, PartialEq)]
pub struct ContainsFunction {
    pub left: GeometryValue<GeometryFunction>,
    pub right: GeometryValue<GeometryFunction>,
    pub position: Option<TextPosition>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntersectsFunction {
    pub left: GeometryValue<GeometryFunction>,
    pub right: GeometryValue<GeometryFunction>,
    pub position: Option<TextPosition>,
}

/// `COORD1(point)` or `COORD2(point)`
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractCoord {
    index: u8,
    pub point: GeometryValue<PointFunction>,
    pub position: Option<TextPosition>,
}

impl ExtractCoord {
    pub fn new(index: u8, point: GeometryValue<PointFunction>) -> Result<Self, Error> {
        if !(1..=2).contains(&index) {
            return Err(Error::InvalidArgument(format!(
                "Coordinate index must be 1 or 2 (got {index})"
            )));
        }
        Ok(Self {
            index,
            point,
            position: None,
        })
    }

    pub fn index(&self) -> u8 {
        self.index
    }
}

/// Every geometric function of the language.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryFunction {
    Point(PointFunction),
    Circle(CircleFunction),
    Box(BoxFunction),
    Polygon(PolygonFunction),
    Region(RegionFunction),
    Centroid(CentroidFunction),
    Area(AreaFunction),
    Distance(DistanceFunction),
    Contains(ContainsFunction),
    Intersects(IntersectsFunction),
    ExtractCoord(ExtractCoord),
    ExtractCoordSys(ExtractCoordSys),
}

impl GeometryFunction {
    pub fn centroid(geometry: GeometryValue<GeometryFunction>) -> Self {
        Self::Centroid(CentroidFunction {
            geometry,
            position: None,
        })
    }

    pub fn area(geometry: GeometryValue<GeometryFunction>) -> Self {
        Self::Area(AreaFunction {
            geometry,
            position: None,
        })
    }

    pub fn coordsys(geometry: GeometryValue<GeometryFunction>) -> Self {
        Self::ExtractCoordSys(ExtractCoordSys {
            geometry,
            position: None,
        })
    }

    pub fn distance(p1: GeometryValue<PointFunction>, p2: GeometryValue<PointFunction>) -> Self {
        Self::Distance(DistanceFunction {
            p1,
            p2,
            position: None,
        })
    }

    pub fn contains(
        left: GeometryValue<GeometryFunction>,
        right: GeometryValue<GeometryFunction>,
    ) -> Self {
        Self::Contains(ContainsFunction {
            left,
            right,
            position: None,
        })
    }

    pub fn intersects(
        left: GeometryValue<GeometryFunction>,
        right: GeometryValue<GeometryFunction>,
    ) -> Self {
        Self::Intersects(IntersectsFunction {
            left,
            right,
            position: None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Point(_) => "POINT",
            Self::Circle(_) => "CIRCLE",
            Self::Box(_) => "BOX",
            Self::Polygon(_) => "POLYGON",
            Self::Region(_) => "REGION",
            Self::Centroid(_) => "CENTROID",
            Self::Area(_) => "AREA",
            Self::Distance(_) => "DISTANCE",
            Self::Contains(_) => "CONTAINS",
            Self::Intersects(_) => "INTERSECTS",
            Self::ExtractCoord(c) if c.index == 1 => "COORD1",
            Self::ExtractCoord(_) => "COORD2",
            Self::ExtractCoordSys(_) => "COORDSYS",
        }
    }

    pub fn set_position(&mut self, position: Option<TextPosition>) {
        match self {
            Self::Point(f) => f.position = position,
            Self::Circle(f) => f.position = position,
            Self::Box(f) => f.position = position,
            Self::Polygon(f) => f.position = position,
            Self::Region(f) => f.position = position,
            Self::Centroid(f) => f.position = position,
            Self::Area(f) => f.position = position,
            Self::Distance(f) => f.position = position,
            Self::Contains(f) => f.position = position,
            Self::Intersects(f) => f.position = position,
            Self::ExtractCoord(f) => f.position = position,
            Self::ExtractCoordSys(f) => f.position = position,
        }
    }

    /// The geometry arguments of the function, in order.
    fn geometry_args(&self) -> Vec<&dyn Node> {
        match self {
            Self::Centroid(f) => vec![&f.geometry as &dyn Node],
            Self::Area(f) => vec![&f.geometry as &dyn Node],
            Self::ExtractCoordSys(f) => vec![&f.geometry as &dyn Node],
            Self::Distance(f) => vec![&f.p1 as &dyn Node, &f.p2],
            Self::Contains(f) => vec![&f.left as &dyn Node, &f.right],
            Self::Intersects(f) => vec![&f.left as &dyn Node, &f.right],
            Self::ExtractCoord(f) => vec![&f.point as &dyn Node],
            Self::Point(_) | Self::Circle(_) | Self::Box(_) | Self::Polygon(_) | Self::Region(_) => {
                vec![]
            }
        }
    }
}

impl Node for GeometryFunction {
    fn position(&self) -> Option<TextPosition> {
        match self {
            Self::Point(f) => f.position,
            Self::Circle(f) => f.position,
            Self::Box(f) => f.position,
            Self::Polygon(f) => f.position,
            Self::Region(f) => f.position,
            Self::Centroid(f) => f.position,
            Self::Area(f) => f.position,
            Self::Distance(f) => f.position,
            Self::Contains(f) => f.position,
            Self::Intersects(f) => f.position,
            Self::ExtractCoord(f) => f.position,
            Self::ExtractCoordSys(f) => f.position,
        }
    }

    fn feature(&self) -> LanguageFeature {
        match self {
            Self::Point(_) => features::POINT,
            Self::Circle(_) => features::CIRCLE,
            Self::Box(_) => features::BOX,
            Self::Polygon(_) => features::POLYGON,
            Self::Region(_) => features::REGION,
            Self::Centroid(_) => features::CENTROID,
            Self::Area(_) => features::AREA,
            Self::Distance(_) => features::DISTANCE,
            Self::Contains(_) => features::CONTAINS,
            Self::Intersects(_) => features::INTERSECTS,
            Self::ExtractCoord(c) if c.index == 1 => features::COORD1,
            Self::ExtractCoord(_) => features::COORD2,
            Self::ExtractCoordSys(_) => features::COORDSYS,
        }
    }

    fn to_adql(&self) -> String {
        match self {
            Self::Point(f) => f.to_adql(),
            Self::Circle(f) => f.to_adql(),
            Self::Box(f) => f.to_adql(),
            Self::Polygon(f) => f.to_adql(),
            Self::Region(f) => f.to_adql(),
            _ => call_adql(self.name(), None, &self.geometry_args()),
        }
    }

    fn children(&self) -> Children<'_> {
        match self {
            Self::Point(f) => f.children(),
            Self::Circle(f) => f.children(),
            Self::Box(f) => f.children(),
            Self::Polygon(f) => f.children(),
            Self::Region(f) => f.children(),
            _ => Box::new(self.geometry_args().into_iter()),
        }
    }
}

impl ValueKind for GeometryFunction {
    fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Area(_)
                | Self::Distance(_)
                | Self::Contains(_)
                | Self::Intersects(_)
                | Self::ExtractCoord(_)
        )
    }

    fn is_string(&self) -> bool {
        matches!(self, Self::ExtractCoordSys(_))
    }

    fn is_geometry(&self) -> bool {
        matches!(
            self,
            Self::Point(_)
                | Self::Circle(_)
                | Self::Box(_)
                | Self::Polygon(_)
                | Self::Region(_)
                | Self::Centroid(_)
        )
    }
}

impl GeometryKind for GeometryFunction {
    fn from_geometry(function: GeometryFunction) -> Result<Self, GeometryFunction> {
        Ok(function)
    }

    fn into_geometry(self) -> GeometryFunction {
        self
    }

    fn as_geometry(&self) -> Cow<'_, GeometryFunction> {
        Cow::Borrowed(self)
    }
}

impl From<PointFunction> for GeometryFunction {
    fn from(p: PointFunction) -> Self {
        Self::Point(p)
    }
}

impl From<CircleFunction> for GeometryFunction {
    fn from(c: CircleFunction) -> Self {
        Self::Circle(c)
    }
}

impl From<BoxFunction> for GeometryFunction {
    fn from(b: BoxFunction) -> Self {
        Self::Box(b)
    }
}

impl From<PolygonFunction> for GeometryFunction {
    fn from(p: PolygonFunction) -> Self {
        Self::Polygon(p)
    }
}

impl From<RegionFunction> for GeometryFunction {
    fn from(r: RegionFunction) -> Self {
        Self::Region(r)
    }
}

impl From<ExtractCoord> for GeometryFunction {
    fn from(c: ExtractCoord) -> Self {
        Self::ExtractCoord(c)
    }
}
