//! Well-known Federal PKI certificate policy names.

/// Named Federal PKI policies and their OIDs.
pub const FPKI_POLICIES: &[(&str, &str)] = &[
    ("id-fpki-certpcy-rudimentaryAssurance", "2.16.840.1.101.3.2.1.3.1"),
    ("id-fpki-certpcy-basicAssurance", "2.16.840.1.101.3.2.1.3.2"),
    ("id-fpki-certpcy-mediumAssurance", "2.16.840.1.101.3.2.1.3.3"),
    ("id-fpki-certpcy-highAssurance", "2.16.840.1.101.3.2.1.3.4"),
    ("id-fpki-common-policy", "2.16.840.1.101.3.2.1.3.6"),
    ("id-fpki-common-hardware", "2.16.840.1.101.3.2.1.3.7"),
    ("id-fpki-common-devices", "2.16.840.1.101.3.2.1.3.8"),
    ("id-fpki-certpcy-mediumHardware", "2.16.840.1.101.3.2.1.3.12"),
    ("id-fpki-common-authentication", "2.16.840.1.101.3.2.1.3.13"),
    ("id-fpki-certpcy-medium-CBP", "2.16.840.1.101.3.2.1.3.14"),
    ("id-fpki-certpcy-mediumHW-CBP", "2.16.840.1.101.3.2.1.3.15"),
    ("id-fpki-common-High", "2.16.840.1.101.3.2.1.3.16"),
    ("id-fpki-common-cardAuth", "2.16.840.1.101.3.2.1.3.17"),
    ("id-fpki-certpcy-pivi-hardware", "2.16.840.1.101.3.2.1.3.18"),
    ("id-fpki-certpcy-pivi-cardAuth", "2.16.840.1.101.3.2.1.3.19"),
    ("id-fpki-certpcy-pivi-contentSigning", "2.16.840.1.101.3.2.1.3.20"),
    ("id-fpki-common-devicesHardware", "2.16.840.1.101.3.2.1.3.36"),
    ("id-fpki-common-piv-contentSigning", "2.16.840.1.101.3.2.1.3.39"),
    ("id-fpki-common-derived-pivAuth", "2.16.840.1.101.3.2.1.3.40"),
    ("id-fpki-common-derived-pivAuth-hardware", "2.16.840.1.101.3.2.1.3.41"),
];

/// Returns the OID for a named policy. Matching ignores ASCII case.
pub fn policy_oid(name: &str) -> Option<&'static str> {
    FPKI_POLICIES
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(name))
        .map(|(_, oid)| *oid)
}

/// Returns the name of a well-known policy OID.
pub fn policy_name(oid: &str) -> Option<&'static str> {
    FPKI_POLICIES
        .iter()
        .find(|(_, known)| *known == oid)
        .map(|(name, _)| *name)
}

/// Resolves a policy given either as a dotted OID or as a well-known name.
pub fn resolve_policy(value: &str) -> Option<String> {
    let value = value.trim();
    if is_dotted_oid(value) {
        return Some(value.to_string());
    }
    policy_oid(value).map(str::to_string)
}

fn is_dotted_oid(value: &str) -> bool {
    let mut arcs = 0;
    for arc in value.split('.') {
        if arc.is_empty() || !arc.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        arcs += 1;
    }
    arcs >= 2
}
