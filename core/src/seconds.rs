//! Serde adapters that express durations as fractional seconds in config files.

use std::time::Duration;

use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

pub(crate) fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_f32(value.as_secs_f32())
}

pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let seconds = f32::deserialize(deserializer)?;
    Duration::try_from_secs_f32(seconds).map_err(D::Error::custom)
}

/// Optional durations; `None` is simply omitted from the file.
pub(crate) mod option {
    use std::time::Duration;

    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub(crate) fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(duration) => serializer.serialize_some(&duration.as_secs_f32()),
            None => serializer.serialize_none(),
        }
    }

    pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<f32>::deserialize(deserializer)?
            .map(|seconds| Duration::try_from_secs_f32(seconds).map_err(D::Error::custom))
            .transpose()
    }
}

/// Ordered lists of durations such as the boss schedule.
pub(crate) mod list {
    use std::time::Duration;

    use serde::{de::Error as _, ser::SerializeSeq, Deserialize, Deserializer, Serializer};

    pub(crate) fn serialize<S>(value: &[Duration], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(value.len()))?;
        for duration in value {
            seq.serialize_element(&duration.as_secs_f32())?;
        }
        seq.end()
    }

    pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Vec::<f32>::deserialize(deserializer)?
            .into_iter()
            .map(|seconds| Duration::try_from_secs_f32(seconds).map_err(D::Error::custom))
            .collect()
    }
}
