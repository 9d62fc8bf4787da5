use smallvec::SmallVec;
use std::fmt::{self, Display, Write};

/// Key/value pairs of a record, already converted to their string form.
pub type Pairs = SmallVec<[(String, String); 8]>;

/// One line of InfluxDB line protocol.
///
/// Keys and values are written as-is. Commas, spaces and equal signs are
/// not escaped, so callers must keep them out of names, keys and values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Measurement {
    pub name: String,
    pub tags: Pairs,
    pub fields: Pairs,
    pub timestamp: Option<i64>,
}

impl Measurement {
    pub fn new<T, F, TK, TV, FK, FV>(
        name: impl Into<String>,
        tags: T,
        fields: F,
        timestamp: Option<i64>,
    ) -> Self
    where
        T: IntoIterator<Item = (TK, TV)>,
        F: IntoIterator<Item = (FK, FV)>,
        TK: Display,
        TV: Display,
        FK: Display,
        FV: Display,
    {
        Self {
            name: name.into(),
            tags: to_pairs(tags),
            fields: to_pairs(fields),
            timestamp,
        }
    }
}

fn to_pairs<I, K, V>(pairs: I) -> Pairs
where
    I: IntoIterator<Item = (K, V)>,
    K: Display,
    V: Display,
{
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

fn write_pairs(f: &mut fmt::Formatter<'_>, pairs: &Pairs) -> fmt::Result {
    for (index, (key, value)) in pairs.iter().enumerate() {
        if index > 0 {
            f.write_char(',')?;
        }
        write!(f, "{}={}", key, value)?;
    }
    Ok(())
}

impl Display for Measurement {
    // The separator after the name and between the groups is written even
    // when the tag or field group is empty.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        f.write_char(',')?;
        write_pairs(f, &self.tags)?;
        f.write_char(' ')?;
        write_pairs(f, &self.fields)?;
        if let Some(timestamp) = self.timestamp {
            write!(f, " {}", timestamp)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use influxdb_line_protocol::{parse_lines, FieldValue};
    use std::collections::BTreeMap;

    #[test]
    fn test_single_tag_and_field_with_timestamp() {
        let measurement = Measurement::new("temp", [("loc", "a")], [("v", 1)], Some(1000));
        assert_eq!(measurement.to_string(), "temp,loc=a v=1 1000");
    }

    #[test]
    fn test_groups_are_comma_joined() {
        let tags = BTreeMap::from([("machine", "one"), ("site", "kitchen")]);
        let fields = BTreeMap::from([("boiler", 93.5), ("setpoint", 94.0)]);
        let measurement = Measurement::new("brew", tags, fields, None);
        assert_eq!(
            measurement.to_string(),
            "brew,machine=one,site=kitchen boiler=93.5,setpoint=94"
        );
    }

    #[test]
    fn test_well_formed_line_is_parseable() {
        let measurement = Measurement::new(
            "brew",
            [("machine", "one")],
            [("boiler", "93.5"), ("count", "12i")],
            Some(1_700_000_000_000_000_000),
        );
        let line = measurement.to_string();
        let parsed: Vec<_> = parse_lines(&line).collect();
        assert_eq!(parsed.len(), 1);
        let parsed = parsed.into_iter().next().unwrap().unwrap();
        assert_eq!(parsed.series.measurement.to_string(), "brew");
        assert_eq!(parsed.timestamp, Some(1_700_000_000_000_000_000));
        assert_eq!(parsed.field_set.len(), 2);
        assert_eq!(parsed.field_set[0].1, FieldValue::F64(93.5));
        assert_eq!(parsed.field_set[1].1, FieldValue::I64(12));
    }

    #[test]
    fn test_empty_tags_keep_separators() {
        let no_tags: [(&str, &str); 0] = [];
        let measurement = Measurement::new("temp", no_tags, [("v", 1)], None);
        assert_eq!(measurement.to_string(), "temp, v=1");
    }

    #[test]
    fn test_empty_fields_keep_separators() {
        let no_fields: [(&str, i64); 0] = [];
        let measurement = Measurement::new("temp", [("loc", "a")], no_fields, Some(5));
        assert_eq!(measurement.to_string(), "temp,loc=a  5");
    }

    #[test]
    fn test_reserved_characters_are_not_escaped() {
        let measurement = Measurement::new("temp", [("loc", "a b")], [("v", "1,2")], None);
        assert_eq!(measurement.to_string(), "temp,loc=a b v=1,2");
    }
}
