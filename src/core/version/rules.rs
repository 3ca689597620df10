// ─── Platform Rules ───
// Allow/disallow rule lists attached to manifest library entries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::platform::Family;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub action: RuleAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<OsRule>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OsRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Qualifiers this launcher does not evaluate (`version`, `arch`), kept
    /// so custom manifests re-serialize unchanged.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Rule {
    pub fn allow(family: Option<Family>) -> Self {
        Self::scoped(RuleAction::Allow, family)
    }

    pub fn disallow(family: Option<Family>) -> Self {
        Self::scoped(RuleAction::Disallow, family)
    }

    fn scoped(action: RuleAction, family: Option<Family>) -> Self {
        Self {
            action,
            os: family.map(|f| OsRule {
                name: Some(f.as_str().to_string()),
                extra: serde_json::Map::new(),
            }),
        }
    }
}

/// Reduce `rules` to a per-family verdict.
///
/// An empty list allows every family. Otherwise every family starts
/// disallowed and rules are applied in list order, unscoped rules before
/// rules scoped to one family: an unscoped rule overwrites every family, a
/// scoped rule overwrites its own. The most specific, most recent matching
/// rule wins.
pub fn platform_map(rules: &[Rule]) -> BTreeMap<Family, bool> {
    if rules.is_empty() {
        return Family::ALL.iter().map(|f| (*f, true)).collect();
    }

    let mut verdicts: BTreeMap<Family, bool> = Family::ALL.iter().map(|f| (*f, false)).collect();

    let scope = |rule: &Rule| rule.os.as_ref().and_then(|os| os.name.clone());

    for rule in rules.iter().filter(|r| scope(r).is_none()) {
        let allowed = rule.action == RuleAction::Allow;
        for verdict in verdicts.values_mut() {
            *verdict = allowed;
        }
    }

    for rule in rules {
        let Some(name) = scope(rule) else {
            continue;
        };
        match name.parse::<Family>() {
            Ok(family) => {
                verdicts.insert(family, rule.action == RuleAction::Allow);
            }
            Err(_) => debug!("Ignoring rule for unknown platform '{}'", name),
        }
    }

    verdicts
}

/// Whether `rules` allow `family`. A rule naming `family` decides even when
/// an unscoped rule follows it, so `[disallow osx, allow]` denies osx.
pub fn evaluate(rules: &[Rule], family: Family) -> bool {
    platform_map(rules).get(&family).copied().unwrap_or(false)
}

/// Encode a per-family allow map as a rule list that [`evaluate`] reads back
/// to the same verdicts. Families missing from the map are disallowed.
pub fn rules_from_map(map: &BTreeMap<Family, bool>) -> Vec<Rule> {
    let mut rules = vec![Rule::disallow(None)];
    rules.extend(map.iter().map(|(family, allowed)| {
        if *allowed {
            Rule::allow(Some(*family))
        } else {
            Rule::disallow(Some(*family))
        }
    }));
    rules
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_rules_allow_every_family() {
        for family in Family::ALL {
            assert!(evaluate(&[], family));
        }
    }

    #[test]
    fn single_unscoped_disallow_denies_every_family() {
        let rules = vec![Rule::disallow(None)];
        for family in Family::ALL {
            assert!(!evaluate(&rules, family));
        }
    }

    #[test]
    fn scoped_allow_seeds_other_families_as_denied() {
        let rules = vec![Rule::allow(Some(Family::Windows))];
        assert!(evaluate(&rules, Family::Windows));
        assert!(!evaluate(&rules, Family::Linux));
        assert!(!evaluate(&rules, Family::Osx));
    }

    #[test]
    fn scoped_rule_outranks_unscoped_rule() {
        let rules = vec![Rule::allow(Some(Family::Windows)), Rule::disallow(None)];
        assert!(evaluate(&rules, Family::Windows));
        assert!(!evaluate(&rules, Family::Linux));
        assert!(!evaluate(&rules, Family::Osx));
    }

    #[test]
    fn scoped_disallow_survives_a_later_unscoped_allow() {
        let rules = vec![Rule::disallow(Some(Family::Osx)), Rule::allow(None)];
        assert!(!evaluate(&rules, Family::Osx));
        assert!(evaluate(&rules, Family::Linux));
        assert!(evaluate(&rules, Family::Windows));
    }

    #[test]
    fn later_rules_of_equal_scope_overwrite_earlier_ones() {
        let rules = vec![
            Rule::allow(Some(Family::Linux)),
            Rule::disallow(Some(Family::Linux)),
        ];
        assert!(!evaluate(&rules, Family::Linux));

        let rules = vec![Rule::disallow(None), Rule::allow(None)];
        assert!(evaluate(&rules, Family::Osx));
    }

    #[test]
    fn last_matching_rule_wins() {
        let rules = vec![Rule::allow(None), Rule::disallow(Some(Family::Osx))];
        assert!(evaluate(&rules, Family::Linux));
        assert!(evaluate(&rules, Family::Windows));
        assert!(!evaluate(&rules, Family::Osx));
    }

    #[test]
    fn parses_mojang_rule_json_and_ignores_unknown_platforms() {
        let rules: Vec<Rule> = serde_json::from_value(serde_json::json!([
            {"action": "allow"},
            {"action": "disallow", "os": {"name": "osx", "version": "^10\\.5\\.\\d$"}},
            {"action": "disallow", "os": {"name": "solaris"}}
        ]))
        .unwrap();
        assert!(evaluate(&rules, Family::Windows));
        assert!(!evaluate(&rules, Family::Osx));
        assert_eq!(
            rules[1].os.as_ref().unwrap().extra["version"],
            serde_json::json!("^10\\.5\\.\\d$")
        );
    }

    #[test]
    fn rules_from_map_round_trips_through_evaluate() {
        let maps = [
            BTreeMap::from([(Family::Windows, true)]),
            BTreeMap::from([(Family::Linux, false), (Family::Osx, true)]),
            BTreeMap::from([
                (Family::Windows, true),
                (Family::Linux, true),
                (Family::Osx, true),
            ]),
            BTreeMap::new(),
        ];
        for map in maps {
            let rules = rules_from_map(&map);
            for family in Family::ALL {
                assert_eq!(
                    evaluate(&rules, family),
                    map.get(&family).copied().unwrap_or(false),
                    "family {family} for map {map:?}"
                );
            }
        }
    }
}
