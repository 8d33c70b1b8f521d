//! RFC 5280 path building and validation against the trust cache.
//!
//! [`PathValidator::build_path`] searches the intermediates for a chain from a target to the
//! trust anchor and returns the first chain that validates. [`PathValidator::validate_path`]
//! runs §6.1 basic path processing (signatures, validity, revocation, name chaining, basic
//! constraints, key usage, name constraints, critical extensions and the policy tree) over an
//! assembled chain.

use crate::cert::crl::Crl;
use crate::cert::Certificate;
use crate::constants::{oid, DEFAULT_MAX_PATH_LENGTH};
use crate::policy::names::resolve_policy;
use crate::policy::{PolicyOutcome, PolicyTree};
use crate::prelude::debug;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use time::OffsetDateTime;

mod error;
mod names;

pub use error::PathValidationError;
use names::NameConstraintState;

const RECOGNIZED_EXTENSIONS: &[&str] = &[
    oid::BASIC_CONSTRAINTS,
    oid::KEY_USAGE,
    oid::CERTIFICATE_POLICIES,
    oid::POLICY_MAPPINGS,
    oid::POLICY_CONSTRAINTS,
    oid::INHIBIT_ANY_POLICY,
    oid::NAME_CONSTRAINTS,
    oid::SUBJECT_KEY_IDENTIFIER,
    oid::AUTHORITY_KEY_IDENTIFIER,
    oid::SUBJECT_ALT_NAME,
    oid::EXTENDED_KEY_USAGE,
    oid::CRL_DISTRIBUTION_POINTS,
    oid::AUTHORITY_INFO_ACCESS,
    oid::SUBJECT_INFO_ACCESS,
];

/// Path validation parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSettings {
    /// User-initial-policy-set as dotted OIDs; empty means any policy. Names from
    /// [`policy::names`](crate::policy::names) are accepted when deserialising.
    #[serde(deserialize_with = "deserialize_policies")]
    pub initial_policies: BTreeSet<String>,
    /// initial-explicit-policy.
    pub explicit_policy_required: bool,
    /// initial-policy-mapping-inhibit.
    pub policy_mapping_inhibited: bool,
    /// initial-any-policy-inhibit.
    pub any_policy_inhibited: bool,
    /// Fail when a critical certificate policies extension carries qualifiers.
    pub policy_qualifiers_rejected: bool,
    /// Maximum number of non-self-issued intermediates.
    pub max_path_length: usize,
    /// Instant validity is checked at; `None` means now.
    #[serde(skip)]
    pub validity_instant: Option<OffsetDateTime>,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            initial_policies: BTreeSet::new(),
            explicit_policy_required: true,
            policy_mapping_inhibited: false,
            any_policy_inhibited: true,
            policy_qualifiers_rejected: false,
            max_path_length: DEFAULT_MAX_PATH_LENGTH,
            validity_instant: None,
        }
    }
}

fn deserialize_policies<'de, D: Deserializer<'de>>(d: D) -> Result<BTreeSet<String>, D::Error> {
    Vec::<String>::deserialize(d)?
        .into_iter()
        .map(|value| {
            resolve_policy(&value)
                .ok_or_else(|| serde::de::Error::custom(format!("unknown policy: {value}")))
        })
        .collect()
}

/// A chain that validated, target first and anchor excluded, with its policy outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathBuildResult {
    /// Certificates from the target up to the one issued by the anchor.
    pub chain: Vec<Certificate>,
    /// Policy processing result.
    pub outcome: PolicyOutcome,
}

/// Validator over a fixed anchor, intermediate set and CRL set.
#[derive(Debug, Clone)]
pub struct PathValidator {
    anchor: Certificate,
    intermediates: Vec<Certificate>,
    crls: Vec<Crl>,
    settings: ValidationSettings,
}

impl PathValidator {
    /// Creates a validator.
    pub fn new(
        anchor: Certificate,
        intermediates: Vec<Certificate>,
        crls: Vec<Crl>,
        settings: ValidationSettings,
    ) -> Self {
        Self {
            anchor,
            intermediates,
            crls,
            settings,
        }
    }

    /// The trust anchor.
    pub fn anchor(&self) -> &Certificate {
        &self.anchor
    }

    /// The parameters in use.
    pub fn settings(&self) -> &ValidationSettings {
        &self.settings
    }

    /// Finds a chain from `target` to the anchor that validates.
    ///
    /// # Errors
    ///
    /// Returns the failure of the last complete chain tried, or
    /// [`PathValidationError::NoPath`] when no chain reaches the anchor.
    pub fn build_path(
        &self,
        target: &Certificate,
        check_revocation: bool,
    ) -> Result<PathBuildResult, PathValidationError> {
        let mut chain = vec![target.clone()];
        let mut last_error = None;
        if let Some(result) = self.extend(&mut chain, check_revocation, &mut last_error) {
            return Ok(result);
        }
        let error = last_error.unwrap_or_else(|| PathValidationError::NoPath {
            subject: target.subject().to_string(),
        });
        debug!(
            "Path building failed; subject={}, error={}",
            target.subject(),
            error
        );
        Err(error)
    }

    fn extend(
        &self,
        chain: &mut Vec<Certificate>,
        check_revocation: bool,
        last_error: &mut Option<PathValidationError>,
    ) -> Option<PathBuildResult> {
        let last = chain.last()?.clone();

        if last.issuer() == self.anchor.subject() && last.verify_issued_by(&self.anchor).is_ok() {
            match self.validate_path(chain, check_revocation) {
                Ok(outcome) => {
                    return Some(PathBuildResult {
                        chain: chain.clone(),
                        outcome,
                    })
                }
                Err(e) => *last_error = Some(e),
            }
        }

        if chain.len() > self.settings.max_path_length {
            return None;
        }
        for candidate in &self.intermediates {
            if candidate.subject() != last.issuer()
                || *candidate == self.anchor
                || chain.contains(candidate)
                || last.verify_issued_by(candidate).is_err()
            {
                continue;
            }
            chain.push(candidate.clone());
            if let Some(result) = self.extend(chain, check_revocation, last_error) {
                return Some(result);
            }
            chain.pop();
        }
        None
    }

    /// Validates `chain`, given target first and without the anchor.
    ///
    /// # Errors
    ///
    /// Returns the first [`PathValidationError`] encountered.
    pub fn validate_path(
        &self,
        chain: &[Certificate],
        check_revocation: bool,
    ) -> Result<PolicyOutcome, PathValidationError> {
        let n = chain.len();
        let intermediates = n.saturating_sub(1);
        if intermediates > self.settings.max_path_length {
            return Err(PathValidationError::PathTooLong {
                intermediates,
                max: self.settings.max_path_length,
            });
        }

        let instant = self
            .settings
            .validity_instant
            .unwrap_or_else(OffsetDateTime::now_utc);
        let mut state = State {
            tree: Some(PolicyTree::new()),
            explicit_policy: if self.settings.explicit_policy_required { 0 } else { n + 1 },
            inhibit_any_policy: if self.settings.any_policy_inhibited { 0 } else { n + 1 },
            policy_mapping: if self.settings.policy_mapping_inhibited { 0 } else { n + 1 },
            max_path_length: self.settings.max_path_length,
            names: NameConstraintState::default(),
        };
        if let Some(constraints) = self.anchor.name_constraints() {
            state.names.add(constraints);
        }

        let mut working_issuer = &self.anchor;
        for (position, cert) in chain.iter().rev().enumerate() {
            let index = position + 1;
            self.process_certificate(
                cert,
                working_issuer,
                index,
                n,
                instant,
                check_revocation,
                &mut state,
            )?;
            if index < n {
                prepare_next(cert, index, &mut state)?;
            } else {
                check_critical_extensions(cert, index)?;
            }
            working_issuer = cert;
        }

        // Wrap-up (§6.1.5).
        if state.explicit_policy > 0 {
            state.explicit_policy -= 1;
        }
        if let Some(target) = chain.first() {
            let require = target
                .profile()
                .policy_constraints
                .and_then(|pc| pc.require_explicit_policy);
            if require == Some(0) {
                state.explicit_policy = 0;
            }
        }
        let initial = &self.settings.initial_policies;
        if let Some(tree) = state.tree.as_mut() {
            if !initial.is_empty() && !initial.contains(oid::ANY_POLICY) {
                tree.intersect(n, initial);
            }
        }
        if state.tree.as_ref().is_some_and(PolicyTree::is_empty) {
            state.tree = None;
        }
        if state.explicit_policy == 0 && state.tree.is_none() {
            return Err(PathValidationError::EmptyPolicySet { index: n });
        }

        let valid_policies = state
            .tree
            .as_ref()
            .map(|tree| tree.valid_policies_at(n))
            .unwrap_or_default();
        Ok(PolicyOutcome {
            tree: state.tree,
            valid_policies,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn process_certificate(
        &self,
        cert: &Certificate,
        working_issuer: &Certificate,
        index: usize,
        n: usize,
        instant: OffsetDateTime,
        check_revocation: bool,
        state: &mut State,
    ) -> Result<(), PathValidationError> {
        let subject = || cert.subject().to_string();

        if cert.verify_issued_by(working_issuer).is_err() {
            return Err(PathValidationError::Signature {
                index,
                subject: subject(),
            });
        }
        cert.check_validity_at(instant)
            .map_err(|source| PathValidationError::Validity {
                index,
                subject: subject(),
                source,
            })?;
        if check_revocation {
            self.check_revocation(cert, working_issuer, index, instant)?;
        }
        if cert.issuer() != working_issuer.subject() {
            return Err(PathValidationError::NameChaining {
                index,
                subject: subject(),
            });
        }
        if index == n || !cert.is_self_issued() {
            if let Some(name) = state.names.first_violation(cert) {
                return Err(PathValidationError::NameConstraints { index, name });
            }
        }

        match (cert.policies(), state.tree.as_mut()) {
            (Some(policies), Some(tree)) => {
                if self.settings.policy_qualifiers_rejected
                    && policies.critical
                    && policies.policies.iter().any(|p| !p.qualifiers.is_empty())
                {
                    return Err(PathValidationError::PolicyQualifiersRejected { index });
                }
                let any_allowed =
                    state.inhibit_any_policy > 0 || (index < n && cert.is_self_issued());
                tree.process_certificate_policies(index, &policies.policies, any_allowed);
                if tree.is_empty() {
                    state.tree = None;
                }
            }
            _ => state.tree = None,
        }
        if state.explicit_policy == 0 && state.tree.is_none() {
            return Err(PathValidationError::EmptyPolicySet { index });
        }
        Ok(())
    }

    fn check_revocation(
        &self,
        cert: &Certificate,
        issuer: &Certificate,
        index: usize,
        instant: OffsetDateTime,
    ) -> Result<(), PathValidationError> {
        let mut covered = false;
        for crl in self.crls.iter().filter(|crl| crl.issuer() == cert.issuer()) {
            if !crl.is_current_at(instant) || crl.verify_signed_by(issuer).is_err() {
                continue;
            }
            if crl.is_revoked(cert) {
                return Err(PathValidationError::Revoked {
                    index,
                    subject: cert.subject().to_string(),
                });
            }
            covered = true;
        }
        if covered {
            Ok(())
        } else {
            Err(PathValidationError::RevocationUnknown {
                index,
                subject: cert.subject().to_string(),
            })
        }
    }
}

struct State {
    tree: Option<PolicyTree>,
    explicit_policy: usize,
    inhibit_any_policy: usize,
    policy_mapping: usize,
    max_path_length: usize,
    names: NameConstraintState,
}

/// Preparation for certificate `index + 1` (§6.1.4).
fn prepare_next(
    cert: &Certificate,
    index: usize,
    state: &mut State,
) -> Result<(), PathValidationError> {
    let profile = cert.profile();
    let subject = || cert.subject().to_string();

    if let Some(mappings) = profile.policy_mappings.as_ref() {
        if mappings.iter().any(|m| {
            m.issuer_domain_policy == oid::ANY_POLICY || m.subject_domain_policy == oid::ANY_POLICY
        }) {
            return Err(PathValidationError::AnyPolicyMapping { index });
        }
        if let Some(tree) = state.tree.as_mut() {
            let mut grouped: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
            for mapping in mappings {
                grouped
                    .entry(mapping.issuer_domain_policy.clone())
                    .or_default()
                    .insert(mapping.subject_domain_policy.clone());
            }
            let grouped: Vec<(String, BTreeSet<String>)> = grouped.into_iter().collect();
            let any_qualifiers = cert.policies().and_then(|policies| {
                policies
                    .policies
                    .iter()
                    .find(|p| p.policy_id == oid::ANY_POLICY)
                    .map(|p| p.qualifiers.as_slice())
            });
            tree.apply_mappings(index, &grouped, state.policy_mapping > 0, any_qualifiers);
            if tree.is_empty() {
                state.tree = None;
            }
        }
    }

    if !cert.is_self_issued() {
        state.explicit_policy = state.explicit_policy.saturating_sub(1);
        state.policy_mapping = state.policy_mapping.saturating_sub(1);
        state.inhibit_any_policy = state.inhibit_any_policy.saturating_sub(1);
    }
    if let Some(pc) = profile.policy_constraints {
        if let Some(require) = pc.require_explicit_policy.map(|r| r as usize) {
            state.explicit_policy = state.explicit_policy.min(require);
        }
        if let Some(inhibit) = pc.inhibit_policy_mapping.map(|r| r as usize) {
            state.policy_mapping = state.policy_mapping.min(inhibit);
        }
    }
    if let Some(skip) = profile.inhibit_any_policy.map(|s| s as usize) {
        state.inhibit_any_policy = state.inhibit_any_policy.min(skip);
    }
    if let Some(constraints) = profile.name_constraints.as_ref() {
        state.names.add(constraints);
    }

    if !cert.is_ca() {
        return Err(PathValidationError::NotCa {
            index,
            subject: subject(),
        });
    }
    if !cert.is_self_issued() {
        if state.max_path_length == 0 {
            return Err(PathValidationError::PathLength { index });
        }
        state.max_path_length -= 1;
    }
    if let Some(path_len) = cert.basic_constraints().and_then(|bc| bc.path_len) {
        state.max_path_length = state.max_path_length.min(path_len as usize);
    }
    if cert.key_usage().is_some_and(|ku| !ku.key_cert_sign) {
        return Err(PathValidationError::KeyCertSign {
            index,
            subject: subject(),
        });
    }
    check_critical_extensions(cert, index)
}

fn check_critical_extensions(cert: &Certificate, index: usize) -> Result<(), PathValidationError> {
    match cert
        .profile()
        .critical_extensions
        .iter()
        .find(|ext| !RECOGNIZED_EXTENSIONS.contains(&ext.as_str()))
    {
        Some(ext) => Err(PathValidationError::UnknownCriticalExtension {
            index,
            oid: ext.clone(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::test_support::{crl, issue, root, Profile};
    use rcgen::{DistinguishedName, DnType, GeneralSubtree, NameConstraints};

    const COMMON: &str = "2.16.840.1.101.3.2.1.3.6";
    const HARDWARE: &str = "2.16.840.1.101.3.2.1.3.7";

    fn with_policies(policies: &'static [&'static str]) -> Profile<'static> {
        Profile {
            policies,
            ..Profile::default()
        }
    }

    #[test]
    fn test_build_path_through_intermediate() {
        let x = root("X", &Profile::default());
        let y = issue(&x, "Y", &with_policies(&[COMMON]));
        let z = issue(&y, "Z", &with_policies(&[COMMON]));
        let validator = PathValidator::new(
            x.cert.clone(),
            vec![y.cert.clone()],
            vec![crl(&x, &[]), crl(&y, &[])],
            ValidationSettings::default(),
        );

        let result = validator.build_path(&z.cert, true).unwrap();
        assert_eq!(result.chain, vec![z.cert.clone(), y.cert.clone()]);
        assert_eq!(result.outcome.valid_policies, BTreeSet::from([COMMON.to_string()]));
        assert!(result.outcome.tree.is_some());
    }

    #[test]
    fn test_build_path_without_intermediate_fails() {
        let x = root("X", &Profile::default());
        let y = issue(&x, "Y", &with_policies(&[COMMON]));
        let z = issue(&y, "Z", &with_policies(&[COMMON]));
        let validator =
            PathValidator::new(x.cert.clone(), vec![], vec![], ValidationSettings::default());

        assert!(matches!(
            validator.build_path(&z.cert, false),
            Err(PathValidationError::NoPath { .. })
        ));
    }

    #[test]
    fn test_missing_policies_fail_when_explicit_policy_required() {
        let x = root("X", &Profile::default());
        let y = issue(&x, "Y", &Profile::default());
        let validator =
            PathValidator::new(x.cert.clone(), vec![], vec![], ValidationSettings::default());

        assert_eq!(
            validator.build_path(&y.cert, false).unwrap_err(),
            PathValidationError::EmptyPolicySet { index: 1 }
        );

        let relaxed = PathValidator::new(
            x.cert.clone(),
            vec![],
            vec![],
            ValidationSettings {
                explicit_policy_required: false,
                ..ValidationSettings::default()
            },
        );
        let outcome = relaxed.build_path(&y.cert, false).unwrap().outcome;
        assert!(outcome.tree.is_none());
        assert!(outcome.valid_policies.is_empty());
    }

    #[test]
    fn test_initial_policy_set_restricts_outcome() {
        let x = root("X", &Profile::default());
        let y = issue(&x, "Y", &with_policies(&[COMMON, HARDWARE]));
        let settings = ValidationSettings {
            initial_policies: BTreeSet::from([HARDWARE.to_string()]),
            ..ValidationSettings::default()
        };
        let validator = PathValidator::new(x.cert.clone(), vec![], vec![], settings);
        let outcome = validator.build_path(&y.cert, false).unwrap().outcome;
        assert_eq!(outcome.valid_policies, BTreeSet::from([HARDWARE.to_string()]));

        let settings = ValidationSettings {
            initial_policies: BTreeSet::from(["1.2.3.4".to_string()]),
            ..ValidationSettings::default()
        };
        let validator = PathValidator::new(x.cert.clone(), vec![], vec![], settings);
        assert!(matches!(
            validator.build_path(&y.cert, false),
            Err(PathValidationError::EmptyPolicySet { .. })
        ));
    }

    #[test]
    fn test_revocation_requires_crl_and_honours_it() {
        let x = root("X", &Profile::default());
        let y = issue(&x, "Y", &with_policies(&[COMMON]));
        let no_crl =
            PathValidator::new(x.cert.clone(), vec![], vec![], ValidationSettings::default());
        assert!(matches!(
            no_crl.build_path(&y.cert, true),
            Err(PathValidationError::RevocationUnknown { index: 1, .. })
        ));

        let revoked = PathValidator::new(
            x.cert.clone(),
            vec![],
            vec![crl(&x, &[&y.cert])],
            ValidationSettings::default(),
        );
        assert!(matches!(
            revoked.build_path(&y.cert, true),
            Err(PathValidationError::Revoked { index: 1, .. })
        ));

        let rogue = root("X", &Profile::default());
        let forged = PathValidator::new(
            x.cert.clone(),
            vec![],
            vec![crl(&rogue, &[])],
            ValidationSettings::default(),
        );
        assert!(matches!(
            forged.build_path(&y.cert, true),
            Err(PathValidationError::RevocationUnknown { .. })
        ));
    }

    #[test]
    fn test_expired_certificate_fails_validity() {
        let x = root("X", &Profile::default());
        let y = issue(
            &x,
            "Y",
            &Profile {
                policies: &[COMMON],
                expired: true,
                ..Profile::default()
            },
        );
        let validator =
            PathValidator::new(x.cert.clone(), vec![], vec![], ValidationSettings::default());

        let err = validator.validate_path(&[y.cert.clone()], false).unwrap_err();
        assert!(matches!(err, PathValidationError::Validity { index: 1, .. }));
        assert!(err.to_string().contains("validity"));
    }

    #[test]
    fn test_non_ca_intermediate_is_rejected() {
        let x = root("X", &Profile::default());
        let y = issue(
            &x,
            "Y",
            &Profile {
                policies: &[COMMON],
                not_ca: true,
                ..Profile::default()
            },
        );
        let z = issue(&y, "Z", &with_policies(&[COMMON]));
        let validator =
            PathValidator::new(x.cert.clone(), vec![], vec![], ValidationSettings::default());

        let err = validator
            .validate_path(&[z.cert.clone(), y.cert.clone()], false)
            .unwrap_err();
        assert!(matches!(err, PathValidationError::NotCa { index: 1, .. }));
    }

    #[test]
    fn test_chain_out_of_order_fails_signature() {
        let x = root("X", &Profile::default());
        let y = issue(&x, "Y", &with_policies(&[COMMON]));
        let z = issue(&y, "Z", &with_policies(&[COMMON]));
        let validator =
            PathValidator::new(x.cert.clone(), vec![], vec![], ValidationSettings::default());

        assert!(matches!(
            validator.validate_path(&[z.cert.clone()], false),
            Err(PathValidationError::Signature { index: 1, .. })
        ));
    }

    #[test]
    fn test_max_path_length_is_enforced() {
        let x = root("X", &Profile::default());
        let y = issue(&x, "Y", &with_policies(&[COMMON]));
        let z = issue(&y, "Z", &with_policies(&[COMMON]));
        let settings = ValidationSettings {
            max_path_length: 0,
            ..ValidationSettings::default()
        };
        let validator = PathValidator::new(x.cert.clone(), vec![y.cert.clone()], vec![], settings);

        assert!(validator.build_path(&y.cert, false).is_ok());
        assert!(matches!(
            validator.validate_path(&[z.cert.clone(), y.cert.clone()], false),
            Err(PathValidationError::PathTooLong { intermediates: 1, max: 0 })
        ));
        assert!(validator.build_path(&z.cert, false).is_err());
    }

    fn constrained(constraints: NameConstraints) -> Profile<'static> {
        Profile {
            policies: &[COMMON],
            name_constraints: Some(constraints),
            ..Profile::default()
        }
    }

    fn serving(dns_names: &'static [&'static str]) -> Profile<'static> {
        Profile {
            policies: &[COMMON],
            not_ca: true,
            dns_names,
            ..Profile::default()
        }
    }

    #[test]
    fn test_permitted_dns_subtree_is_enforced() {
        let x = root("X", &Profile::default());
        let y = issue(
            &x,
            "Y",
            &constrained(NameConstraints {
                permitted_subtrees: vec![GeneralSubtree::DnsName("pki.test".into())],
                excluded_subtrees: vec![],
            }),
        );
        let inside = issue(&y, "Inside", &serving(&["www.pki.test"]));
        let outside = issue(&y, "Outside", &serving(&["www.pki.test", "www.evil.test"]));
        let validator =
            PathValidator::new(x.cert.clone(), vec![], vec![], ValidationSettings::default());

        assert!(validator
            .validate_path(&[inside.cert.clone(), y.cert.clone()], false)
            .is_ok());
        assert_eq!(
            validator
                .validate_path(&[outside.cert.clone(), y.cert.clone()], false)
                .unwrap_err(),
            PathValidationError::NameConstraints {
                index: 2,
                name: "dNSName www.evil.test".to_string(),
            }
        );
    }

    #[test]
    fn test_excluded_directory_subtree_is_enforced() {
        let mut banned = DistinguishedName::new();
        banned.push(DnType::CommonName, "Z");
        let x = root("X", &Profile::default());
        let y = issue(
            &x,
            "Y",
            &constrained(NameConstraints {
                permitted_subtrees: vec![],
                excluded_subtrees: vec![GeneralSubtree::DirectoryName(banned)],
            }),
        );
        let z = issue(&y, "Z", &with_policies(&[COMMON]));
        let w = issue(&y, "W", &with_policies(&[COMMON]));
        let validator = PathValidator::new(
            x.cert.clone(),
            vec![y.cert.clone()],
            vec![],
            ValidationSettings::default(),
        );

        assert!(validator.build_path(&w.cert, false).is_ok());
        assert!(matches!(
            validator.build_path(&z.cert, false),
            Err(PathValidationError::NameConstraints { index: 2, .. })
        ));
    }

    #[test]
    fn test_anchor_name_constraints_apply_to_the_path() {
        let x = root(
            "X",
            &Profile {
                name_constraints: Some(NameConstraints {
                    permitted_subtrees: vec![GeneralSubtree::DnsName(".pki.test".into())],
                    excluded_subtrees: vec![],
                }),
                ..Profile::default()
            },
        );
        let inside = issue(&x, "Inside", &serving(&["ca.pki.test"]));
        let outside = issue(&x, "Outside", &serving(&["pki.test"]));
        let validator =
            PathValidator::new(x.cert.clone(), vec![], vec![], ValidationSettings::default());

        assert!(validator.build_path(&inside.cert, false).is_ok());
        assert!(matches!(
            validator.build_path(&outside.cert, false),
            Err(PathValidationError::NameConstraints { index: 1, .. })
        ));
    }
}
