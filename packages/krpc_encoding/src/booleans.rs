//! Bencode has no boolean type; BEP-5/BEP-43 flags (`implied_port`, `ro`) are
//! carried as the integers `0`/`1`. This module adapts those to `bool`.

use serde::{
    de::{
        self,
        Visitor,
    },
    Deserializer,
};
use std::fmt;

pub fn is_false(value: &bool) -> bool {
    !value
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    struct BoolVisitor;

    impl<'de> Visitor<'de> for BoolVisitor {
        type Value = bool;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("an integer 0 or 1")
        }

        fn visit_i64<E>(self, v: i64) -> Result<bool, E>
        where
            E: de::Error,
        {
            Ok(v != 0)
        }

        fn visit_u64<E>(self, v: u64) -> Result<bool, E>
        where
            E: de::Error,
        {
            Ok(v != 0)
        }

        fn visit_bool<E>(self, v: bool) -> Result<bool, E>
        where
            E: de::Error,
        {
            Ok(v)
        }
    }

    deserializer.deserialize_any(BoolVisitor)
}

#[cfg(test)]
mod tests {
    use super::is_false;

    #[test]
    fn is_false_matches_default() {
        assert!(is_false(&false));
        assert!(!is_false(&true));
    }
}
