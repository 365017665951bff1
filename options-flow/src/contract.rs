use crate::tags::OptionType;
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

/// Numeric contract identifier supplied by the data feed.
///
/// Option ids encode their own type and strike: an even id is a call struck at the id, an odd
/// id is a put struck at `id - 1`. One id is reserved for the underlying index.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default, Deserialize, Serialize,
    Display, From,
)]
pub struct ContractId(pub u32);

/// What a [`ContractId`] refers to, relative to the configured underlying id.
#[derive(Debug, Copy, Clone, PartialEq, Deserialize, Serialize)]
pub enum ContractKind {
    Underlying,
    Option {
        option_type: OptionType,
        strike: f64,
    },
}

impl ContractId {
    pub fn kind(self, underlying: ContractId) -> ContractKind {
        if self == underlying {
            return ContractKind::Underlying;
        }

        if self.0 % 2 == 0 {
            ContractKind::Option {
                option_type: OptionType::Call,
                strike: f64::from(self.0),
            }
        } else {
            ContractKind::Option {
                option_type: OptionType::Put,
                strike: f64::from(self.0 - 1),
            }
        }
    }

    /// Contract id of the option with the given type and strike.
    pub fn option(option_type: OptionType, strike: u32) -> Self {
        match option_type {
            OptionType::Call => Self(strike),
            OptionType::Put => Self(strike + 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_id_kind() {
        struct TestCase {
            input: ContractId,
            expected: ContractKind,
        }

        let underlying = ContractId(0);

        let tests = vec![
            TestCase {
                // TC0: reserved id is the underlying
                input: ContractId(0),
                expected: ContractKind::Underlying,
            },
            TestCase {
                // TC1: even id is a call at the same strike
                input: ContractId(4500),
                expected: ContractKind::Option {
                    option_type: OptionType::Call,
                    strike: 4500.0,
                },
            },
            TestCase {
                // TC2: odd id is a put at id - 1
                input: ContractId(4501),
                expected: ContractKind::Option {
                    option_type: OptionType::Put,
                    strike: 4500.0,
                },
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = test.input.kind(underlying);
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_contract_id_option_round_trips_kind() {
        let put = ContractId::option(OptionType::Put, 4200);
        assert_eq!(put, ContractId(4201));
        assert_eq!(
            put.kind(ContractId(0)),
            ContractKind::Option {
                option_type: OptionType::Put,
                strike: 4200.0
            }
        );
    }

    #[test]
    fn test_contract_id_kind_with_custom_underlying() {
        assert_eq!(
            ContractId(1).kind(ContractId(1)),
            ContractKind::Underlying
        );
        assert_eq!(
            ContractId(0).kind(ContractId(1)),
            ContractKind::Option {
                option_type: OptionType::Call,
                strike: 0.0
            }
        );
    }
}
