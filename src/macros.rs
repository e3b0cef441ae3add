/*
 * Copyright 2021 the alarmdotcom_sdk developers
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

/// Declares an integer-backed wire enum.
///
/// Alarm.com transmits states, event types and subtypes as bare integers.
/// The generated enum serializes back to the same integer and folds unknown
/// wire values into the designated fallback variant instead of failing the
/// containing document.
macro_rules! wire_enum {
    (
        $(#[$attr:meta])*
        $vis:vis enum $id:ident {
            $($(#[$vattr:meta])* $variant:ident = $value:literal),+ $(,)?
        }
        fallback $fallback:ident
    ) => {
        $(#[$attr])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        $vis enum $id {
            $($(#[$vattr])* $variant),+
        }

        impl $id {
            pub fn value(self) -> i64 {
                match self {
                    $($id::$variant => $value),+
                }
            }
        }

        impl ::std::convert::From<i64> for $id {
            fn from(value: i64) -> Self {
                match value {
                    $($value => $id::$variant,)+
                    _ => $id::$fallback,
                }
            }
        }

        impl ::serde::Serialize for $id {
            fn serialize<S: ::serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_i64(self.value())
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $id {
            fn deserialize<D: ::serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let value = <i64 as ::serde::Deserialize>::deserialize(deserializer)?;
                Ok($id::from(value))
            }
        }

        impl ::std::default::Default for $id {
            fn default() -> Self {
                $id::$fallback
            }
        }
    };
}

#[cfg(test)]
mod tests {
    wire_enum! {
        enum Probe {
            Zero = 0,
            One = 1,
            Many = 113,
        }
        fallback Zero
    }

    #[test]
    fn must_round_trip_known_values() {
        for probe in [Probe::Zero, Probe::One, Probe::Many] {
            let json = serde_json::to_string(&probe).unwrap();
            assert_eq!(serde_json::from_str::<Probe>(&json).unwrap(), probe);
        }
    }

    #[test]
    fn must_fold_unknown_values_into_fallback() {
        assert_eq!(serde_json::from_str::<Probe>("42").unwrap(), Probe::Zero);
    }
}
