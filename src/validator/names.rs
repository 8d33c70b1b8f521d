//! Name constraint processing (RFC 5280 §4.2.1.10, §6.1.3 (b)-(c), §6.1.4 (g)).
//!
//! `directoryName` subtrees match on leading RDNs compared by their DER encoding. Forms
//! other than email, DNS, directory, URI and IP address cannot be evaluated, so a name of
//! such a form is rejected whenever any subtree of the same form is in force.

use crate::cert::der::Tlv;
use crate::cert::extensions::{GeneralName, NameConstraints};
use crate::cert::Certificate;
use url::Url;

/// Subtrees accumulated along a path.
#[derive(Debug, Default)]
pub(super) struct NameConstraintState {
    /// One entry per constraining certificate. A name must fall inside every entry that
    /// constrains its form.
    permitted: Vec<Vec<GeneralName>>,
    excluded: Vec<GeneralName>,
}

impl NameConstraintState {
    pub(super) fn add(&mut self, constraints: &NameConstraints) {
        if !constraints.permitted.is_empty() {
            self.permitted.push(constraints.permitted.clone());
        }
        self.excluded.extend(constraints.excluded.iter().cloned());
    }

    /// Returns a description of the first name of `cert` the subtrees reject.
    pub(super) fn first_violation(&self, cert: &Certificate) -> Option<String> {
        if self.permitted.is_empty() && self.excluded.is_empty() {
            return None;
        }
        subject_names(cert)
            .into_iter()
            .find(|name| !self.allows(name))
            .map(|name| match name {
                GeneralName::Directory(_) => format!("directoryName {}", cert.subject()),
                other => describe(&other),
            })
    }

    fn allows(&self, name: &GeneralName) -> bool {
        let excluded = self
            .excluded
            .iter()
            .filter(|base| base.form() == name.form())
            .any(|base| within(name, base) != Some(false));
        if excluded {
            return false;
        }
        self.permitted.iter().all(|subtrees| {
            let mut same_form = subtrees
                .iter()
                .filter(|base| base.form() == name.form())
                .peekable();
            same_form.peek().is_none() || same_form.any(|base| within(name, base) == Some(true))
        })
    }
}

/// The subject DN (when not empty), subject `emailAddress` attributes and subject
/// alternative names of `cert`.
fn subject_names(cert: &Certificate) -> Vec<GeneralName> {
    let profile = cert.profile();
    let mut names = Vec::new();
    if rdns(cert.subject().as_raw()).is_some_and(|rdns| !rdns.is_empty()) {
        names.push(GeneralName::Directory(cert.subject().as_raw().to_vec()));
    }
    names.extend(profile.subject_emails.iter().cloned().map(GeneralName::Email));
    names.extend(profile.subject_alt_names.iter().cloned());
    names
}

fn describe(name: &GeneralName) -> String {
    match name {
        GeneralName::Email(email) => format!("rfc822Name {email}"),
        GeneralName::Dns(dns) => format!("dNSName {dns}"),
        GeneralName::Directory(raw) => format!("directoryName {}", hex::encode(raw)),
        GeneralName::Uri(uri) => format!("uniformResourceIdentifier {uri}"),
        GeneralName::Ip(ip) => format!("iPAddress {}", hex::encode(ip)),
        GeneralName::Other(tag) => format!("GeneralName [{tag}]"),
    }
}

/// `Some(true)` when `name` lies inside the subtree rooted at `base`, `None` when the form
/// cannot be compared.
fn within(name: &GeneralName, base: &GeneralName) -> Option<bool> {
    match (name, base) {
        (GeneralName::Email(name), GeneralName::Email(base)) => Some(email_within(name, base)),
        (GeneralName::Dns(name), GeneralName::Dns(base)) => Some(dns_within(name, base)),
        (GeneralName::Directory(name), GeneralName::Directory(base)) => {
            let (name, base) = (rdns(name)?, rdns(base)?);
            Some(base.len() <= name.len() && base.iter().zip(&name).all(|(b, n)| b == n))
        }
        (GeneralName::Uri(name), GeneralName::Uri(base)) => Some(uri_within(name, base)),
        (GeneralName::Ip(name), GeneralName::Ip(base)) => Some(ip_within(name, base)),
        _ => None,
    }
}

fn rdns(name: &[u8]) -> Option<Vec<&[u8]>> {
    let name = Tlv::single(name).ok()?;
    if !name.is_sequence() {
        return None;
    }
    Some(name.children().ok()?.iter().map(Tlv::raw).collect())
}

/// Host match where a leading `.` in `base` admits subdomains only.
fn host_within(host: &str, base: &str) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    let base = base.trim_end_matches('.').to_ascii_lowercase();
    if base.starts_with('.') {
        host.ends_with(&base)
    } else {
        host == base
    }
}

/// DNS subtrees admit the base itself and any name formed by adding labels on the left.
fn dns_within(name: &str, base: &str) -> bool {
    let trimmed = base.trim_start_matches('.');
    if trimmed.is_empty() {
        return true;
    }
    if base.starts_with('.') {
        return host_within(name, base);
    }
    host_within(name, trimmed) || host_within(name, &format!(".{trimmed}"))
}

fn email_within(name: &str, base: &str) -> bool {
    let Some((local, host)) = name.rsplit_once('@') else {
        return false;
    };
    match base.rsplit_once('@') {
        Some((base_local, base_host)) => local == base_local && host_within(host, base_host),
        None => host_within(host, base),
    }
}

fn uri_within(name: &str, base: &str) -> bool {
    Url::parse(name)
        .ok()
        .and_then(|uri| uri.host_str().map(|host| host_within(host, base)))
        .unwrap_or(false)
}

/// An `iPAddress` subtree is the address followed by its mask.
fn ip_within(name: &[u8], base: &[u8]) -> bool {
    if base.len() != name.len() * 2 {
        return false;
    }
    let (address, mask) = base.split_at(name.len());
    name.iter()
        .zip(address)
        .zip(mask)
        .all(|((n, a), m)| n & m == a & m)
}
