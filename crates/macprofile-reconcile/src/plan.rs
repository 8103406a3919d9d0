//! Create/update/delete decisions by identity comparison.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use macprofile_canonical::Identity;

use crate::errors::ValidationFailure;
use crate::record::{CurrentRecord, DesiredRecord, Ensure};

/// Directive for one profile name.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Desired and installed identities agree.
    NoOp {
        /// Profile name.
        name: String,
    },
    /// Desired but not installed.
    Create(DesiredRecord),
    /// Installed with a different identity.
    Update {
        /// Record to install.
        desired: DesiredRecord,
        /// Identity currently installed.
        current: Identity,
    },
    /// Installed but no longer desired.
    Delete {
        /// Profile name.
        name: String,
    },
    /// Desired record failed its own invariants; never applied.
    Reject {
        /// Profile name.
        name: String,
        /// Why the record was refused.
        failure: ValidationFailure,
    },
}

/// Discriminant of an [`Action`], for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// See [`Action::NoOp`].
    NoOp,
    /// See [`Action::Create`].
    Create,
    /// See [`Action::Update`].
    Update,
    /// See [`Action::Delete`].
    Delete,
    /// See [`Action::Reject`].
    Reject,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ActionKind::NoOp => "noop",
            ActionKind::Create => "create",
            ActionKind::Update => "update",
            ActionKind::Delete => "delete",
            ActionKind::Reject => "reject",
        };
        f.write_str(label)
    }
}

impl Action {
    /// Profile name the action targets.
    pub fn name(&self) -> &str {
        match self {
            Action::NoOp { name } | Action::Delete { name } | Action::Reject { name, .. } => name,
            Action::Create(desired) | Action::Update { desired, .. } => &desired.name,
        }
    }

    /// Discriminant.
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::NoOp { .. } => ActionKind::NoOp,
            Action::Create(_) => ActionKind::Create,
            Action::Update { .. } => ActionKind::Update,
            Action::Delete { .. } => ActionKind::Delete,
            Action::Reject { .. } => ActionKind::Reject,
        }
    }

    /// Whether applying the action changes the system.
    pub fn is_change(&self) -> bool {
        matches!(
            self,
            Action::Create(_) | Action::Update { .. } | Action::Delete { .. }
        )
    }
}

/// Indexes a system listing by name. Later duplicates win.
pub fn index_current(records: Vec<CurrentRecord>) -> BTreeMap<String, CurrentRecord> {
    records
        .into_iter()
        .map(|record| (record.name.clone(), record))
        .collect()
}

/// Compares desired against current state.
///
/// Desired records are expected to be normalized already. Actions come out in
/// ascending name order.
///
/// | desired | current | identity | action |
/// |---------|---------|----------|--------|
/// | yes     | no      |          | Create |
/// | yes     | yes     | equal    | NoOp   |
/// | yes     | yes     | differ   | Update |
/// | no      | yes     |          | Delete |
///
/// A desired record that fails [`DesiredRecord::validate`] becomes
/// [`Action::Reject`]. Records with [`Ensure::Absent`] delete an installed
/// profile and are otherwise a no-op.
pub fn plan(
    desired: &BTreeMap<String, DesiredRecord>,
    current: &BTreeMap<String, CurrentRecord>,
) -> Vec<Action> {
    let names: BTreeSet<&String> = desired.keys().chain(current.keys()).collect();

    names
        .into_iter()
        .map(|name| decide(name, desired.get(name), current.get(name)))
        .collect()
}

fn decide(name: &str, desired: Option<&DesiredRecord>, current: Option<&CurrentRecord>) -> Action {
    let name = name.to_string();
    match (desired, current) {
        (Some(record), installed) if record.ensure == Ensure::Absent => match installed {
            Some(_) => Action::Delete { name },
            None => Action::NoOp { name },
        },
        (Some(record), installed) => {
            if let Err(failure) = record.validate() {
                return Action::Reject { name, failure };
            }
            match installed {
                None => Action::Create(record.clone()),
                Some(current) if record.identity.as_ref() == Some(&current.identity) => {
                    Action::NoOp { name }
                }
                Some(current) => Action::Update {
                    desired: record.clone(),
                    current: current.identity.clone(),
                },
            }
        }
        (None, Some(_)) => Action::Delete { name },
        (None, None) => Action::NoOp { name },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use macprofile_canonical::{dict, Normalizer, ProfileDocument};

    fn desired(name: &str, identifier: &str) -> DesiredRecord {
        let doc = ProfileDocument::from_value(dict! {
            "PayloadIdentifier" => identifier,
            "PayloadContent" => vec![dict! { "a" => 1i64 }],
        })
        .unwrap();
        DesiredRecord::new(name, Some(doc)).normalize(&Normalizer::default())
    }

    fn current(name: &str, identity: &str) -> CurrentRecord {
        CurrentRecord {
            name: name.into(),
            identity: Identity::parse(identity),
            raw: ProfileDocument::default(),
        }
    }

    fn single(record: DesiredRecord) -> BTreeMap<String, DesiredRecord> {
        BTreeMap::from([(record.name.clone(), record)])
    }

    #[test]
    fn decision_table() {
        let record = desired("x", "x");
        let identity = record.identity.clone().unwrap().to_string();

        let created = plan(&single(record.clone()), &BTreeMap::new());
        assert_eq!(created[0].kind(), ActionKind::Create);

        let same = index_current(vec![current("x", &identity)]);
        assert_eq!(plan(&single(record.clone()), &same)[0].kind(), ActionKind::NoOp);

        let other = index_current(vec![current("x", "00000000-0000-5000-8000-000000000000")]);
        assert_eq!(plan(&single(record), &other)[0].kind(), ActionKind::Update);

        let deleted = plan(&BTreeMap::new(), &other);
        assert_eq!(deleted, vec![Action::Delete { name: "x".into() }]);
    }

    #[test]
    fn identity_case_does_not_trigger_update() {
        let record = desired("x", "x").with_identity(Identity::parse(
            "ABCDEF01-2345-4678-9ABC-DEF012345678",
        ));
        let record = DesiredRecord {
            document: record
                .document
                .map(|mut d| {
                    d.insert("PayloadUUID", "ABCDEF01-2345-4678-9ABC-DEF012345678".into());
                    d
                }),
            ..record
        };
        let installed = index_current(vec![current("x", "abcdef01-2345-4678-9abc-def012345678")]);
        assert_eq!(
            plan(&single(record), &installed),
            vec![Action::NoOp { name: "x".into() }]
        );
    }

    #[test]
    fn invalid_record_is_rejected_even_when_installed() {
        let record = desired("p", "q");
        let installed = index_current(vec![current("p", "abcdef01-2345-4678-9abc-def012345678")]);
        let actions = plan(&single(record), &installed);
        assert_eq!(actions.len(), 1);
        assert!(matches!(
            &actions[0],
            Action::Reject { name, failure: ValidationFailure::NameMismatch { .. } } if name == "p"
        ));
    }

    #[test]
    fn absent_records_delete_only_when_installed() {
        let absent = single(DesiredRecord::absent("gone"));
        assert_eq!(
            plan(&absent, &BTreeMap::new()),
            vec![Action::NoOp { name: "gone".into() }]
        );
        let installed = index_current(vec![current("gone", "com.example.gone")]);
        assert_eq!(
            plan(&absent, &installed),
            vec![Action::Delete { name: "gone".into() }]
        );
    }

    #[test]
    fn actions_are_ordered_by_name() {
        let mut wanted = BTreeMap::new();
        for name in ["c.c.c", "a.a.a"] {
            wanted.insert(name.to_string(), desired(name, name));
        }
        let installed = index_current(vec![current("b.b.b", "opaque")]);
        let names: Vec<String> = plan(&wanted, &installed)
            .iter()
            .map(|a| a.name().to_string())
            .collect();
        assert_eq!(names, vec!["a.a.a", "b.b.b", "c.c.c"]);
    }
}
