// ABOUTME: Custom serde deserializers for config types.
// ABOUTME: Turns the mechanism list into a non-empty, duplicate-free set.

use nonempty::NonEmpty;
use serde::Deserialize;

use crate::mechanism::MechanismType;

pub fn deserialize_mechanisms<'de, D>(deserializer: D) -> Result<NonEmpty<MechanismType>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let values: Vec<MechanismType> = Vec::deserialize(deserializer)?;
    let mut unique = Vec::with_capacity(values.len());
    for value in values {
        if !unique.contains(&value) {
            unique.push(value);
        }
    }

    NonEmpty::from_vec(unique)
        .ok_or_else(|| serde::de::Error::custom("at least one mechanism is required"))
}
