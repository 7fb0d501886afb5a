//! Typed attribute values and per-kind attribute schemas

use std::fmt;
use std::str::FromStr;

use super::city_object::CityObjectKind;

/// Calendar date in `YYYY-MM-DD` form
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Date {
    /// Year
    pub year: i32,
    /// Month (1-12)
    pub month: u8,
    /// Day of month (1-31)
    pub day: u8,
}

impl Date {
    /// Create a date, validating month and day ranges
    pub fn new(year: i32, month: u8, day: u8) -> Option<Self> {
        if !(1..=12).contains(&month) || day == 0 || day > days_in_month(year, month) {
            return None;
        }
        Some(Self { year, month, day })
    }
}

fn days_in_month(year: i32, month: u8) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if (year % 4 == 0 && year % 100 != 0) || year % 400 == 0 => 29,
        2 => 28,
        _ => 0,
    }
}

impl FromStr for Date {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        // xs:date may carry a timezone suffix; only the calendar part is kept
        let calendar = s.get(..10).unwrap_or(s);
        let mut parts = calendar.splitn(3, '-');
        let (Some(year), Some(month), Some(day)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(format!("Invalid date '{}': expected YYYY-MM-DD", s));
        };

        let year = year
            .parse::<i32>()
            .map_err(|_| format!("Invalid year in date '{}'", s))?;
        let month = month
            .parse::<u8>()
            .map_err(|_| format!("Invalid month in date '{}'", s))?;
        let day = day
            .parse::<u8>()
            .map_err(|_| format!("Invalid day in date '{}'", s))?;

        Date::new(year, month, day).ok_or_else(|| format!("Date '{}' is out of range", s))
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// Type tag of an attribute value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeType {
    /// Free text
    String,
    /// Floating-point number
    Double,
    /// Whole number
    Integer,
    /// Calendar date
    Date,
    /// URI reference
    Uri,
    /// Number with a unit of measure
    Measure,
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttributeType::String => "string",
            AttributeType::Double => "double",
            AttributeType::Integer => "integer",
            AttributeType::Date => "date",
            AttributeType::Uri => "uri",
            AttributeType::Measure => "measure",
        };
        f.write_str(name)
    }
}

/// A typed attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Free text
    String(String),
    /// Floating-point number
    Double(f64),
    /// Whole number
    Integer(i64),
    /// Calendar date
    Date(Date),
    /// URI reference
    Uri(String),
    /// Number with an optional unit of measure
    Measure {
        /// Numeric value
        value: f64,
        /// Unit of measure (`uom` attribute)
        uom: Option<String>,
    },
}

impl AttributeValue {
    /// The value's type tag
    pub fn value_type(&self) -> AttributeType {
        match self {
            AttributeValue::String(_) => AttributeType::String,
            AttributeValue::Double(_) => AttributeType::Double,
            AttributeValue::Integer(_) => AttributeType::Integer,
            AttributeValue::Date(_) => AttributeType::Date,
            AttributeValue::Uri(_) => AttributeType::Uri,
            AttributeValue::Measure { .. } => AttributeType::Measure,
        }
    }

    /// Parse raw element text as a value of type `ty`
    ///
    /// Returns `None` when the text is not a valid literal of that type.
    pub fn parse_as(text: &str, ty: AttributeType, uom: Option<&str>) -> Option<Self> {
        let text = text.trim();
        match ty {
            AttributeType::String => Some(AttributeValue::String(text.to_string())),
            AttributeType::Uri => Some(AttributeValue::Uri(text.to_string())),
            AttributeType::Double => text.parse::<f64>().ok().map(AttributeValue::Double),
            AttributeType::Integer => text.parse::<i64>().ok().map(AttributeValue::Integer),
            AttributeType::Date => text.parse::<Date>().ok().map(AttributeValue::Date),
            AttributeType::Measure => text.parse::<f64>().ok().map(|value| AttributeValue::Measure {
                value,
                uom: uom.map(str::to_string),
            }),
        }
    }

    /// Convert to type `ty` without losing information
    ///
    /// Text converts when it parses as the target type, integers widen to
    /// doubles and measures, and measures narrow to their numeric value.
    /// Anything else is not coercible and yields `None`.
    pub fn coerce(&self, ty: AttributeType) -> Option<Self> {
        if self.value_type() == ty {
            return Some(self.clone());
        }

        match (self, ty) {
            (AttributeValue::String(s), _) => AttributeValue::parse_as(s, ty, None),
            (AttributeValue::Uri(s), AttributeType::String) => {
                Some(AttributeValue::String(s.clone()))
            }
            (AttributeValue::Integer(i), AttributeType::Double) => {
                Some(AttributeValue::Double(*i as f64))
            }
            (AttributeValue::Integer(i), AttributeType::Measure) => Some(AttributeValue::Measure {
                value: *i as f64,
                uom: None,
            }),
            (AttributeValue::Double(d), AttributeType::Measure) => Some(AttributeValue::Measure {
                value: *d,
                uom: None,
            }),
            (AttributeValue::Measure { value, .. }, AttributeType::Double) => {
                Some(AttributeValue::Double(*value))
            }
            (AttributeValue::Double(d), AttributeType::Integer)
                if d.fract() == 0.0 && d.is_finite() =>
            {
                Some(AttributeValue::Integer(*d as i64))
            }
            _ => None,
        }
    }

    /// Text form of the value, if it is textual
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) | AttributeValue::Uri(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::String(s) | AttributeValue::Uri(s) => f.write_str(s),
            AttributeValue::Double(d) => write!(f, "{}", d),
            AttributeValue::Integer(i) => write!(f, "{}", i),
            AttributeValue::Date(d) => write!(f, "{}", d),
            AttributeValue::Measure { value, uom: Some(uom) } => write!(f, "{} {}", value, uom),
            AttributeValue::Measure { value, uom: None } => write!(f, "{}", value),
        }
    }
}

/// Failure of a validated attribute lookup
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AttributeError {
    /// The attribute is defined for this kind but has no value
    #[error("Attribute '{name}' is not set")]
    Absent {
        /// Attribute name
        name: String,
    },

    /// The attribute is not part of this kind's schema
    #[error("Attribute '{name}' is not defined for {kind}")]
    NotInSchema {
        /// Attribute name
        name: String,
        /// Kind of the queried object
        kind: CityObjectKind,
    },

    /// The stored value cannot be coerced to the expected type
    #[error("Attribute '{name}' holds a {found} value, expected {expected}")]
    TypeMismatch {
        /// Attribute name
        name: String,
        /// Type the caller or schema expects
        expected: AttributeType,
        /// Type of the stored value
        found: AttributeType,
    },
}

/// One entry of a kind's attribute schema
pub type SchemaEntry = (&'static str, AttributeType);

const CORE: &[SchemaEntry] = &[
    ("name", AttributeType::String),
    ("description", AttributeType::String),
    ("creationDate", AttributeType::Date),
    ("terminationDate", AttributeType::Date),
    ("relativeToTerrain", AttributeType::String),
    ("relativeToWater", AttributeType::String),
];

const CLASSIFIED: &[SchemaEntry] = &[
    ("class", AttributeType::String),
    ("function", AttributeType::String),
    ("usage", AttributeType::String),
];

const CONSTRUCTION: &[SchemaEntry] = &[
    ("yearOfConstruction", AttributeType::Integer),
    ("yearOfDemolition", AttributeType::Integer),
];

const BUILDING: &[SchemaEntry] = &[
    ("roofType", AttributeType::String),
    ("measuredHeight", AttributeType::Measure),
    ("storeysAboveGround", AttributeType::Integer),
    ("storeysBelowGround", AttributeType::Integer),
    ("storeyHeightsAboveGround", AttributeType::String),
    ("storeyHeightsBelowGround", AttributeType::String),
];

const BRIDGE: &[SchemaEntry] = &[("isMovable", AttributeType::String)];

const TRAFFIC_AREA: &[SchemaEntry] = &[("surfaceMaterial", AttributeType::String)];

const WATER_SURFACE: &[SchemaEntry] = &[("waterLevel", AttributeType::String)];

const PLANT_COVER: &[SchemaEntry] = &[("averageHeight", AttributeType::Measure)];

const SOLITARY_VEGETATION: &[SchemaEntry] = &[
    ("species", AttributeType::String),
    ("height", AttributeType::Measure),
    ("trunkDiameter", AttributeType::Measure),
    ("crownDiameter", AttributeType::Measure),
];

const RELIEF: &[SchemaEntry] = &[("lod", AttributeType::Integer)];

/// Schema fragments making up a kind's attribute schema
pub(crate) fn schema_parts(kind: CityObjectKind) -> &'static [&'static [SchemaEntry]] {
    use CityObjectKind::*;
    match kind {
        Building | BuildingPart => &[CORE, CLASSIFIED, CONSTRUCTION, BUILDING],
        Bridge | BridgePart => &[CORE, CLASSIFIED, CONSTRUCTION, BRIDGE],
        Tunnel | TunnelPart => &[CORE, CLASSIFIED, CONSTRUCTION],
        TrafficArea | AuxiliaryTrafficArea => &[CORE, CLASSIFIED, TRAFFIC_AREA],
        WaterSurface => &[CORE, WATER_SURFACE],
        PlantCover => &[CORE, CLASSIFIED, PLANT_COVER],
        SolitaryVegetationObject => &[CORE, CLASSIFIED, SOLITARY_VEGETATION],
        ReliefFeature | TinRelief | MassPointRelief | RasterRelief | RectifiedGridCoverage => {
            &[CORE, RELIEF]
        }
        WallSurface | RoofSurface | GroundSurface | ClosureSurface | FloorSurface
        | InteriorWallSurface | CeilingSurface | OuterCeilingSurface | OuterFloorSurface
        | Door | Window | WaterGroundSurface | WaterClosureSurface => &[CORE],
        Room | BuildingInstallation | BuildingFurniture | BridgeConstructionElement
        | BridgeInstallation | TunnelInstallation | Road | Railway | Track | Square
        | TransportationComplex | WaterBody | LandUse | CityFurniture | GenericCityObject
        | CityObjectGroup => &[CORE, CLASSIFIED],
    }
}

/// Expected type of attribute `name` for `kind`, or `None` if not in its schema
pub fn schema_type(kind: CityObjectKind, name: &str) -> Option<AttributeType> {
    schema_parts(kind)
        .iter()
        .flat_map(|part| part.iter())
        .find(|(entry, _)| *entry == name)
        .map(|(_, ty)| *ty)
}

/// True if `name` is a thematic attribute of any kind
pub(crate) fn is_thematic_attribute(name: &str) -> bool {
    [
        CORE,
        CLASSIFIED,
        CONSTRUCTION,
        BUILDING,
        BRIDGE,
        TRAFFIC_AREA,
        WATER_SURFACE,
        PLANT_COVER,
        SOLITARY_VEGETATION,
        RELIEF,
    ]
    .iter()
    .flat_map(|part| part.iter())
    .any(|(entry, _)| *entry == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_parsing() {
        let date: Date = "2023-02-28".parse().unwrap();
        assert_eq!(date, Date::new(2023, 2, 28).unwrap());
        assert_eq!(date.to_string(), "2023-02-28");

        assert!("2023-02-29".parse::<Date>().is_err());
        assert!("2024-02-29".parse::<Date>().is_ok());
        assert!("2024-13-01".parse::<Date>().is_err());
        assert!("yesterday".parse::<Date>().is_err());
        assert_eq!(
            "2020-06-01Z".parse::<Date>().unwrap(),
            Date::new(2020, 6, 1).unwrap()
        );
    }

    #[test]
    fn test_coerce_string_to_number() {
        let value = AttributeValue::String("12.5".to_string());
        assert_eq!(
            value.coerce(AttributeType::Double),
            Some(AttributeValue::Double(12.5))
        );
        assert_eq!(value.coerce(AttributeType::Integer), None);
    }

    #[test]
    fn test_coerce_measure_to_double() {
        let value = AttributeValue::Measure {
            value: 8.0,
            uom: Some("m".to_string()),
        };
        assert_eq!(
            value.coerce(AttributeType::Double),
            Some(AttributeValue::Double(8.0))
        );
        assert_eq!(value.coerce(AttributeType::Date), None);
        assert_eq!(value.to_string(), "8 m");
    }

    #[test]
    fn test_parse_as_measure_keeps_uom() {
        let value = AttributeValue::parse_as(" 3.5 ", AttributeType::Measure, Some("m")).unwrap();
        assert_eq!(
            value,
            AttributeValue::Measure {
                value: 3.5,
                uom: Some("m".to_string())
            }
        );
    }

    #[test]
    fn test_schema_lookup() {
        assert_eq!(
            schema_type(CityObjectKind::Building, "measuredHeight"),
            Some(AttributeType::Measure)
        );
        assert_eq!(
            schema_type(CityObjectKind::Building, "name"),
            Some(AttributeType::String)
        );
        assert_eq!(schema_type(CityObjectKind::WallSurface, "measuredHeight"), None);
        assert_eq!(
            schema_type(CityObjectKind::SolitaryVegetationObject, "species"),
            Some(AttributeType::String)
        );
        assert!(is_thematic_attribute("storeysAboveGround"));
        assert!(!is_thematic_attribute("posList"));
    }
}
