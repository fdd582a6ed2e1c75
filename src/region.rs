//! Sky regions exchanged with the database, and their STC-S text form (the
//!  argument of `REGION`).

use std::fmt;

use nom::{
    IResult,
    branch::alt,
    bytes::complete::tag_no_case,
    character::complete::{alphanumeric1, char, multispace0, multispace1},
    combinator::{map, map_res, opt},
    error::ErrorKind,
    multi::many1,
    number::complete::double,
    sequence::{delimited, preceded, tuple},
};

use crate::{error::Error, position::TextPosition};

#[derive(
    strum_macros::Display,
    strum_macros::EnumString,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Frame {
    Icrs,
    Fk4,
    Fk5,
    J2000,
    Galactic,
    Ecliptic,
    UnknownFrame,
}

/// Coordinates and sizes are in degrees.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Position { x: f64, y: f64 },
    Circle { x: f64, y: f64, radius: f64 },
    /// Centered on (x, y).
    Box { x: f64, y: f64, width: f64, height: f64 },
    Polygon(Vec<(f64, f64)>),
    Union(Vec<Region>),
    Intersection(Vec<Region>),
    Not(Box<Region>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub frame: Option<Frame>,
    pub shape: Shape,
}

fn invalid(message: impl Into<String>) -> Error {
    Error::geometry(message, None)
}

fn finite(values: &[f64]) -> Result<(), Error> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(invalid("Coordinates must be finite numbers"))
    }
}

impl Region {
    pub fn position(x: f64, y: f64) -> Result<Self, Error> {
        finite(&[x, y])?;
        Ok(Self::from(Shape::Position { x, y }))
    }

    pub fn circle(x: f64, y: f64, radius: f64) -> Result<Self, Error> {
        finite(&[x, y, radius])?;
        if radius < 0.0 {
            return Err(invalid(format!("Negative circle radius: {radius}")));
        }
        Ok(Self::from(Shape::Circle { x, y, radius }))
    }

    pub fn boxed(x: f64, y: f64, width: f64, height: f64) -> Result<Self, Error> {
        finite(&[x, y, width, height])?;
        if width < 0.0 || height < 0.0 {
            return Err(invalid(format!("Negative box size: {width} x {height}")));
        }
        Ok(Self::from(Shape::Box {
            x,
            y,
            width,
            height,
        }))
    }

    pub fn polygon(vertices: Vec<(f64, f64)>) -> Result<Self, Error> {
        if vertices.len() < 3 {
            return Err(invalid(format!(
                "A polygon needs at least 3 vertices (got {})",
                vertices.len()
            )));
        }
        for (x, y) in &vertices {
            finite(&[*x, *y])?;
        }
        Ok(Self::from(Shape::Polygon(vertices)))
    }

    pub fn union(regions: Vec<Region>) -> Result<Self, Error> {
        if regions.len() < 2 {
            return Err(invalid("UNION needs at least 2 regions"));
        }
        Ok(Self::from(Shape::Union(regions)))
    }

    pub fn intersection(regions: Vec<Region>) -> Result<Self, Error> {
        if regions.len() < 2 {
            return Err(invalid("INTERSECTION needs at least 2 regions"));
        }
        Ok(Self::from(Shape::Intersection(regions)))
    }

    pub fn not(region: Region) -> Self {
        Self::from(Shape::Not(Box::new(region)))
    }

    pub fn with_frame(mut self, frame: Frame) -> Self {
        self.frame = Some(frame);
        self
    }

    /// Parses STC-S text such as `CIRCLE ICRS 10 20 0.5`.
    pub fn parse(stcs: &str) -> Result<Self, Error> {
        let at = |rest: &str| Some(TextPosition::new(1, (stcs.len() - rest.len() + 1) as u32));

        let (rest, raw) = match delimited(multispace0, |i| region(i, 0), multispace0)(stcs) {
            Ok(parsed) => parsed,
            Err(nom::Err::Failure(e)) if e.code == ErrorKind::TooLarge => {
                return Err(Error::geometry(
                    format!("STC-S region nested deeper than {MAX_NESTING} levels"),
                    at(e.input),
                ));
            }
            Err(nom::Err::Error(e) | nom::Err::Failure(e)) => {
                return Err(Error::geometry(
                    format!("Invalid STC-S region \"{stcs}\""),
                    at(e.input),
                ));
            }
            Err(nom::Err::Incomplete(_)) => {
                return Err(Error::geometry(format!("Incomplete STC-S region \"{stcs}\""), None));
            }
        };
        if !rest.is_empty() {
            return Err(Error::geometry(
                format!("Unexpected text after STC-S region: \"{rest}\""),
                at(rest),
            ));
        }
        raw.build(stcs.len())
    }
}

impl From<Shape> for Region {
    fn from(shape: Shape) -> Self {
        Self { frame: None, shape }
    }
}

fn write_frame(f: &mut fmt::Formatter<'_>, frame: Option<Frame>) -> fmt::Result {
    match frame {
        Some(frame) => write!(f, " {frame}"),
        None => Ok(()),
    }
}

fn write_regions(f: &mut fmt::Formatter<'_>, regions: &[Region]) -> fmt::Result {
    write!(f, " (")?;
    for (i, r) in regions.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{r}")?;
    }
    write!(f, ")")
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.shape {
            Shape::Position { x, y } => {
                write!(f, "POSITION")?;
                write_frame(f, self.frame)?;
                write!(f, " {x} {y}")
            }
            Shape::Circle { x, y, radius } => {
                write!(f, "CIRCLE")?;
                write_frame(f, self.frame)?;
                write!(f, " {x} {y} {radius}")
            }
            Shape::Box {
                x,
                y,
                width,
                height,
            } => {
                write!(f, "BOX")?;
                write_frame(f, self.frame)?;
                write!(f, " {x} {y} {width} {height}")
            }
            Shape::Polygon(vertices) => {
                write!(f, "POLYGON")?;
                write_frame(f, self.frame)?;
                for (x, y) in vertices {
                    write!(f, " {x} {y}")?;
                }
                Ok(())
            }
            Shape::Union(regions) => {
                write!(f, "UNION")?;
                write_frame(f, self.frame)?;
                write_regions(f, regions)
            }
            Shape::Intersection(regions) => {
                write!(f, "INTERSECTION")?;
                write_frame(f, self.frame)?;
                write_regions(f, regions)
            }
            Shape::Not(region) => write!(f, "NOT ({region})"),
        }
    }
}

/// Deepest accepted nesting of `UNION`, `INTERSECTION` and `NOT`.
const MAX_NESTING: usize = 64;

/// Parsed but not yet validated STC-S. `rest_len` is the length of the input
///  left when the element started, used to report positions.
enum RawRegion {
    Shape {
        keyword: &'static str,
        frame: Option<Frame>,
        numbers: Vec<f64>,
        rest_len: usize,
    },
    Composite {
        union: bool,
        frame: Option<Frame>,
        regions: Vec<RawRegion>,
    },
    Not(Box<RawRegion>),
}

impl RawRegion {
    fn build(self, total_len: usize) -> Result<Region, Error> {
        match self {
            RawRegion::Shape {
                keyword,
                frame,
                numbers,
                rest_len,
            } => {
                let position = Some(TextPosition::new(1, (total_len - rest_len + 1) as u32));
                let arity_error = |expected: &str| {
                    Error::geometry(
                        format!("{keyword} expects {expected} (got {})", numbers.len()),
                        position,
                    )
                };
                let region = match (keyword, numbers.as_slice()) {
                    ("POSITION", [x, y]) => Region::position(*x, *y),
                    ("POSITION", _) => return Err(arity_error("2 numbers")),
                    ("CIRCLE", [x, y, r]) => Region::circle(*x, *y, *r),
                    ("CIRCLE", _) => return Err(arity_error("3 numbers")),
                    ("BOX", [x, y, w, h]) => Region::boxed(*x, *y, *w, *h),
                    ("BOX", _) => return Err(arity_error("4 numbers")),
                    (_, coords) if coords.len() >= 6 && coords.len() % 2 == 0 => {
                        Region::polygon(coords.chunks(2).map(|c| (c[0], c[1])).collect())
                    }
                    _ => return Err(arity_error("an even count of at least 6 numbers")),
                }
                .map_err(|e| match e {
                    Error::GeometryTranslation { message, .. } => Error::geometry(message, position),
                    other => other,
                })?;
                Ok(Region { frame, ..region })
            }
            RawRegion::Composite {
                union,
                frame,
                regions,
            } => {
                let regions = regions
                    .into_iter()
                    .map(|r| r.build(total_len))
                    .collect::<Result<Vec<_>, _>>()?;
                let region = if union {
                    Region::union(regions)?
                } else {
                    Region::intersection(regions)?
                };
                Ok(Region { frame, ..region })
            }
            RawRegion::Not(inner) => Ok(Region::not(inner.build(total_len)?)),
        }
    }
}

fn frame(input: &str) -> IResult<&str, Option<Frame>> {
    opt(preceded(
        multispace1,
        map_res(alphanumeric1, |w: &str| w.parse::<Frame>()),
    ))(input)
}

fn shape(input: &str) -> IResult<&str, RawRegion> {
    let rest_len = input.len();
    let (input, keyword) = alt((
        map(tag_no_case("POSITION"), |_| "POSITION"),
        map(tag_no_case("CIRCLE"), |_| "CIRCLE"),
        map(tag_no_case("BOX"), |_| "BOX"),
        map(tag_no_case("POLYGON"), |_| "POLYGON"),
    ))(input)?;
    let (input, frame) = frame(input)?;
    let (input, numbers) = many1(preceded(multispace1, double))(input)?;
    Ok((
        input,
        RawRegion::Shape {
            keyword,
            frame,
            numbers,
            rest_len,
        },
    ))
}

fn composite(input: &str, depth: usize) -> IResult<&str, RawRegion> {
    let (input, union) = alt((
        map(tag_no_case("UNION"), |_| true),
        map(tag_no_case("INTERSECTION"), |_| false),
    ))(input)?;
    let (input, frame) = frame(input)?;
    let (input, regions) = delimited(
        tuple((multispace0, char('('))),
        many1(preceded(multispace0, |i| region(i, depth + 1))),
        tuple((multispace0, char(')'))),
    )(input)?;
    Ok((
        input,
        RawRegion::Composite {
            union,
            frame,
            regions,
        },
    ))
}

fn negation(input: &str, depth: usize) -> IResult<&str, RawRegion> {
    let (input, inner) = preceded(
        tag_no_case("NOT"),
        delimited(
            tuple((multispace0, char('('), multispace0)),
            |i| region(i, depth + 1),
            tuple((multispace0, char(')'))),
        ),
    )(input)?;
    Ok((input, RawRegion::Not(Box::new(inner))))
}

fn region(input: &str, depth: usize) -> IResult<&str, RawRegion> {
    if depth > MAX_NESTING {
        return Err(nom::Err::Failure(nom::error::Error::new(
            input,
            ErrorKind::TooLarge,
        )));
    }
    alt((|i| negation(i, depth), |i| composite(i, depth), shape))(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_shapes() -> Result<(), Error> {
        assert_eq!(
            Region::circle(10.0, 20.0, 0.5)?.with_frame(Frame::Icrs),
            Region::parse("circle icrs 10 20 0.5")?
        );
        assert_eq!(Region::position(1.5, -2.0)?, Region::parse("  POSITION 1.5 -2 ")?);
        assert_eq!(
            Region::polygon(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)])?,
            Region::parse("POLYGON 0 0 1 0 1 1")?
        );
        Ok(())
    }

    #[test]
    fn parse_composites() -> Result<(), Error> {
        let parsed = Region::parse("UNION ICRS (CIRCLE 1 2 3 NOT (BOX 0 0 1 1))")?;
        let expected = Region::union(vec![
            Region::circle(1.0, 2.0, 3.0)?,
            Region::not(Region::boxed(0.0, 0.0, 1.0, 1.0)?),
        ])?
        .with_frame(Frame::Icrs);
        assert_eq!(expected, parsed);
        assert_eq!("UNION ICRS (CIRCLE 1 2 3 NOT (BOX 0 0 1 1))", parsed.to_string());
        Ok(())
    }

    #[test]
    fn display() -> Result<(), Error> {
        let r = Region::boxed(10.5, 20.0, 1.0, 2.0)?.with_frame(Frame::UnknownFrame);
        assert_eq!("BOX UNKNOWNFRAME 10.5 20 1 2", r.to_string());
        Ok(())
    }

    #[test]
    fn errors_carry_a_column() {
        let column = |text: &str| match Region::parse(text) {
            Err(Error::GeometryTranslation {
                position: Some(p), ..
            }) => p.begin_column,
            other => panic!("expected a positioned error for {text}, got {other:?}"),
        };
        assert_eq!(1, column("CIRCLE 1 2"));
        assert_eq!(14, column("CIRCLE 1 2 3 extra"));
        assert_eq!(1, column("SPHERE 1 2 3"));
        assert_eq!(1, column("CIRCLE 1 2 -3"));
        assert_eq!(1, column("POLYGON 1 2 3 4 5"));
    }

    #[test]
    fn composite_needs_two_regions() {
        assert!(Region::parse("INTERSECTION (CIRCLE 1 2 3)").is_err());
        assert!(Region::parse("NOT CIRCLE 1 2 3").is_err());
    }

    #[test]
    fn nesting_limit() -> Result<(), Error> {
        let nested = |depth: usize| {
            format!("{}CIRCLE ICRS 1 2 3{}", "NOT (".repeat(depth), ")".repeat(depth))
        };
        assert!(matches!(Region::parse(&nested(MAX_NESTING))?.shape, Shape::Not(_)));

        let err = Region::parse(&nested(MAX_NESTING + 1)).expect_err("too deep");
        assert!(matches!(
            err,
            Error::GeometryTranslation {
                position: Some(TextPosition { begin_column: 326, .. }),
                ..
            }
        ));
        assert!(matches!(
            Region::parse(&nested(200_000)),
            Err(Error::GeometryTranslation { .. })
        ));
        Ok(())
    }
}
