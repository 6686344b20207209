use serde::{Deserialize, Serialize};
use std::fmt;

/// Kitchen staff role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Cook,
    ReliefCook,
    KitchenAssistant,
    PotWasher,
    Apprentice,
}

impl Role {
    /// Plural rule-composition key used by the rule set and the evaluator
    /// (`cook` and `relief_cook` both aggregate under `cooks`).
    pub fn composition_key(self) -> &'static str {
        match self {
            Role::Cook | Role::ReliefCook => "cooks",
            Role::KitchenAssistant => "kitchen_assistants",
            Role::PotWasher => "pot_washers",
            Role::Apprentice => "apprentices",
        }
    }

    /// Tie-breaker ordering used by the heuristic's candidate scoring:
    /// cook < relief_cook < kitchen_assistant < apprentice < pot_washer.
    pub fn selection_priority(self) -> u8 {
        match self {
            Role::Cook => 0,
            Role::ReliefCook => 1,
            Role::KitchenAssistant => 2,
            Role::Apprentice => 3,
            Role::PotWasher => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Cook => "cook",
            Role::ReliefCook => "relief_cook",
            Role::KitchenAssistant => "kitchen_assistant",
            Role::PotWasher => "pot_washer",
            Role::Apprentice => "apprentice",
        }
    }

    pub fn parse(value: &str) -> Option<Role> {
        match value {
            "cook" => Some(Role::Cook),
            "relief_cook" => Some(Role::ReliefCook),
            "kitchen_assistant" => Some(Role::KitchenAssistant),
            "pot_washer" => Some(Role::PotWasher),
            "apprentice" => Some(Role::Apprentice),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composition_key_groups_cooks() {
        assert_eq!(Role::Cook.composition_key(), "cooks");
        assert_eq!(Role::ReliefCook.composition_key(), "cooks");
    }

    #[test]
    fn selection_priority_orders_pot_washer_last() {
        assert!(Role::Cook.selection_priority() < Role::PotWasher.selection_priority());
        assert!(Role::Apprentice.selection_priority() < Role::PotWasher.selection_priority());
    }

    #[test]
    fn parse_round_trips_as_str() {
        for role in [
            Role::Cook,
            Role::ReliefCook,
            Role::KitchenAssistant,
            Role::PotWasher,
            Role::Apprentice,
        ] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
    }
}
