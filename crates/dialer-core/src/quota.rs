//! Quota evaluation.
//!
//! Pure predicate matching over a campaign's ordered quota rules. Nothing here
//! touches the store; the allocator and the qualification engine both call in
//! with rules they have already loaded.

use crate::model::{Campaign, Contact, QuotaOperator, QuotaRule};

/// First rule, in list order, whose predicate matches the contact and which
/// still has capacity.
pub fn match_rule<'a>(contact: &Contact, rules: &'a [QuotaRule]) -> Option<&'a QuotaRule> {
    rules
        .iter()
        .find(|rule| rule.has_capacity() && predicate_matches(rule, contact))
}

/// Whether the contact may be handed out under the campaign's quotas.
///
/// A campaign with quotas disabled, or with quotas enabled but no rules
/// configured, accepts every contact.
pub fn is_eligible(campaign: &Campaign, contact: &Contact) -> bool {
    if !campaign.quotas_enabled || campaign.quota_rules.is_empty() {
        return true;
    }
    match_rule(contact, &campaign.quota_rules).is_some()
}

fn predicate_matches(rule: &QuotaRule, contact: &Contact) -> bool {
    let Some(actual) = contact.field_value(&rule.contact_field) else {
        return false;
    };

    match &rule.operator {
        QuotaOperator::Equals => actual == rule.value,
        QuotaOperator::StartsWith => actual.starts_with(rule.value.as_str()),
        QuotaOperator::Unrecognized(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ContactField, ContactStatus, CustomFields};
    use chrono::Utc;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn contact(postal_code: Option<&str>, segment: Option<&str>) -> Contact {
        let mut fields = BTreeMap::new();
        if let Some(segment) = segment {
            fields.insert("segment".to_string(), segment.to_string());
        }
        let now = Utc::now();
        Contact {
            id: "c1".to_string(),
            campaign_id: "camp".to_string(),
            first_name: None,
            last_name: None,
            phone_number: "0600000000".to_string(),
            postal_code: postal_code.map(str::to_string),
            custom_fields: CustomFields::from_user_input(fields).unwrap(),
            status: ContactStatus::Pending,
            locked_by: None,
            locked_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn rule(id: &str, field: &str, op: &str, value: &str, limit: i64, current: i64) -> QuotaRule {
        QuotaRule {
            id: id.to_string(),
            contact_field: ContactField::from(field),
            operator: QuotaOperator::from(op),
            value: value.to_string(),
            limit,
            current_count: current,
        }
    }

    fn campaign(enabled: bool, rules: Vec<QuotaRule>) -> Campaign {
        let now = Utc::now();
        Campaign {
            id: "camp".to_string(),
            name: "test".to_string(),
            quotas_enabled: enabled,
            qualification_group_id: None,
            quota_rules: rules,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let rules = vec![
            rule("a", "postal_code", "starts_with", "75", 10, 0),
            rule("b", "postal_code", "equals", "75001", 10, 0),
        ];
        let c = contact(Some("75001"), None);
        assert_eq!(match_rule(&c, &rules).unwrap().id, "a");
    }

    #[test]
    fn test_exhausted_rule_falls_through() {
        let rules = vec![
            rule("a", "postal_code", "starts_with", "75", 2, 2),
            rule("b", "postal_code", "equals", "75001", 10, 0),
        ];
        assert_eq!(match_rule(&contact(Some("75001"), None), &rules).unwrap().id, "b");
        assert!(match_rule(&contact(Some("75002"), None), &rules).is_none());
    }

    #[test]
    fn test_custom_field_and_missing_values() {
        let rules = vec![rule("a", "segment", "equals", "gold", 5, 0)];
        assert!(match_rule(&contact(None, Some("gold")), &rules).is_some());
        assert!(match_rule(&contact(None, Some("silver")), &rules).is_none());
        assert!(match_rule(&contact(None, None), &rules).is_none());
    }

    #[test]
    fn test_unrecognized_operator_never_matches() {
        let rules = vec![rule("a", "postal_code", "contains", "75", 5, 0)];
        assert!(match_rule(&contact(Some("75001"), None), &rules).is_none());
    }

    #[test]
    fn test_eligibility() {
        let c = contact(Some("13001"), None);
        let rules = vec![rule("a", "postal_code", "starts_with", "75", 5, 0)];

        assert!(is_eligible(&campaign(false, rules.clone()), &c));
        assert!(!is_eligible(&campaign(true, rules), &c));
        assert!(is_eligible(&campaign(true, Vec::new()), &c));
    }

    proptest! {
        #[test]
        fn prop_match_has_capacity_and_matches(
            postal in "[0-9]{5}",
            prefixes in proptest::collection::vec(("[0-9]{1,3}", 0i64..4, 0i64..4), 0..6),
        ) {
            let rules: Vec<QuotaRule> = prefixes
                .iter()
                .enumerate()
                .map(|(i, (prefix, limit, current))| {
                    rule(&i.to_string(), "postal_code", "starts_with", prefix, *limit, *current)
                })
                .collect();
            let c = contact(Some(&postal), None);

            match match_rule(&c, &rules) {
                Some(found) => {
                    prop_assert!(found.current_count < found.limit);
                    prop_assert!(postal.starts_with(found.value.as_str()));
                    // nothing earlier in the list qualified
                    let position = rules.iter().position(|r| r.id == found.id).unwrap();
                    for earlier in &rules[..position] {
                        prop_assert!(
                            earlier.current_count >= earlier.limit
                                || !postal.starts_with(earlier.value.as_str())
                        );
                    }
                }
                None => {
                    for r in &rules {
                        prop_assert!(r.current_count >= r.limit || !postal.starts_with(r.value.as_str()));
                    }
                }
            }
        }

        #[test]
        fn prop_disabled_quotas_accept_everything(
            postal in "[0-9]{5}",
            limit in 0i64..3,
        ) {
            let rules = vec![rule("a", "postal_code", "equals", "00000", limit, limit)];
            prop_assert!(is_eligible(&campaign(false, rules), &contact(Some(&postal), None)));
        }
    }
}
