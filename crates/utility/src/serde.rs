pub mod date_time {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{de::Error, de::IntoDeserializer, Deserialize as _, Deserializer};

    /// Accepts RFC 3339 timestamps as well as naive `%Y-%m-%dT%H:%M:%S`
    /// timestamps, which are interpreted as UTC.
    pub fn deserialize_utc<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        if let Ok(date_time) = DateTime::parse_from_rfc3339(&s) {
            return Ok(date_time.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&s, "%Y-%m-%dT%H:%M:%S")
            .map(|naive| naive.and_utc())
            .map_err(Error::custom)
    }

    pub fn deserialize_utc_option<'de, D>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = Option::<String>::deserialize(deserializer)?;
        match s {
            Some(s) => deserialize_utc(s.as_str().into_deserializer()).map(Some),
            None => Ok(None),
        }
    }
}

pub mod duration {
    use chrono::Duration;
    use schemars::gen::SchemaGenerator;
    use schemars::schema::{InstanceType, Schema, SchemaObject};
    use serde::de::Error as DeError;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let total_seconds = duration.num_seconds();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        let formatted = format!("{:02}:{:02}:{:02}", hours, minutes, seconds);
        serializer.serialize_str(&formatted)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let parts: Vec<&str> = s.split(':').collect();

        if parts.len() != 3 {
            return Err(D::Error::invalid_length(
                parts.len(),
                &"Expected format hh:mm:ss",
            ));
        }

        let hours: i64 = parts[0].parse().map_err(D::Error::custom)?;
        let minutes: i64 = parts[1].parse().map_err(D::Error::custom)?;
        let seconds: i64 = parts[2].parse().map_err(D::Error::custom)?;

        Ok(Duration::hours(hours)
            + Duration::minutes(minutes)
            + Duration::seconds(seconds))
    }

    pub fn schema(_gen: &mut SchemaGenerator) -> Schema {
        SchemaObject {
            instance_type: Some(InstanceType::String.into()),
            format: Some("hh:mm:ss".to_owned()),
            ..Default::default()
        }
        .into()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use serde::{Deserialize, Serialize};

    #[derive(Deserialize)]
    struct Range {
        #[serde(deserialize_with = "super::date_time::deserialize_utc_option", default)]
        start: Option<DateTime<Utc>>,
    }

    #[derive(Serialize, Deserialize)]
    struct Elapsed {
        #[serde(with = "super::duration")]
        elapsed: Duration,
    }

    #[test]
    fn accepts_naive_and_rfc3339_timestamps() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 5, 8, 30, 0).unwrap();
        let naive: Range = serde_json::from_str(r#"{"start":"2024-03-05T08:30:00"}"#).unwrap();
        let rfc: Range =
            serde_json::from_str(r#"{"start":"2024-03-05T09:30:00+01:00"}"#).unwrap();
        let missing: Range = serde_json::from_str("{}").unwrap();
        assert_eq!(naive.start, Some(expected));
        assert_eq!(rfc.start, Some(expected));
        assert_eq!(missing.start, None);
    }

    #[test]
    fn durations_use_hh_mm_ss() {
        let value = Elapsed {
            elapsed: Duration::minutes(51) + Duration::seconds(7),
        };
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"{"elapsed":"00:51:07"}"#);
        let back: Elapsed = serde_json::from_str(&json).unwrap();
        assert_eq!(back.elapsed, value.elapsed);
    }
}
